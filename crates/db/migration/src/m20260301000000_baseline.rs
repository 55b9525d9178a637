use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Workspaces::Table)
                    .col(pk_id_col(manager, Workspaces::Id))
                    .col(uuid_col(Workspaces::Uuid))
                    .col(ColumnDef::new(Workspaces::Name).string().not_null())
                    .col(timestamp_col(Workspaces::CreatedAt))
                    .col(timestamp_col(Workspaces::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_workspaces_uuid")
                    .table(Workspaces::Table)
                    .col(Workspaces::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Projects::Table)
                    .col(pk_id_col(manager, Projects::Id))
                    .col(uuid_col(Projects::Uuid))
                    .col(fk_id_col(manager, Projects::WorkspaceId))
                    .col(ColumnDef::new(Projects::Name).string().not_null())
                    .col(ColumnDef::new(Projects::Description).text())
                    .col(timestamp_col(Projects::CreatedAt))
                    .col(timestamp_col(Projects::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_projects_workspace_id")
                            .from(Projects::Table, Projects::WorkspaceId)
                            .to(Workspaces::Table, Workspaces::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_projects_uuid")
                    .table(Projects::Table)
                    .col(Projects::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_projects_workspace_id")
                    .table(Projects::Table)
                    .col(Projects::WorkspaceId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Tasks::Table)
                    .col(pk_id_col(manager, Tasks::Id))
                    .col(uuid_col(Tasks::Uuid))
                    .col(fk_id_col(manager, Tasks::ProjectId))
                    .col(ColumnDef::new(Tasks::Title).string().not_null())
                    .col(ColumnDef::new(Tasks::Description).text())
                    .col(
                        ColumnDef::new(Tasks::Status)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("todo")),
                    )
                    .col(
                        ColumnDef::new(Tasks::Priority)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("medium")),
                    )
                    .col(ColumnDef::new(Tasks::Assignee).string())
                    .col(ColumnDef::new(Tasks::DueDate).timestamp())
                    .col(ColumnDef::new(Tasks::CompletedAt).timestamp())
                    .col(ColumnDef::new(Tasks::CompletedOnTime).boolean())
                    .col(ColumnDef::new(Tasks::ManagerScore).integer())
                    .col(
                        ColumnDef::new(Tasks::Blocked)
                            .boolean()
                            .not_null()
                            .default(Expr::val(false)),
                    )
                    .col(timestamp_col(Tasks::CreatedAt))
                    .col(timestamp_col(Tasks::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_project_id")
                            .from(Tasks::Table, Tasks::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_tasks_uuid")
                    .table(Tasks::Table)
                    .col(Tasks::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_tasks_project_id")
                    .table(Tasks::Table)
                    .col(Tasks::ProjectId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_tasks_assignee")
                    .table(Tasks::Table)
                    .col(Tasks::Assignee)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_tasks_status")
                    .table(Tasks::Table)
                    .col(Tasks::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(TimeLogs::Table)
                    .col(pk_id_col(manager, TimeLogs::Id))
                    .col(uuid_col(TimeLogs::Uuid))
                    .col(fk_id_col(manager, TimeLogs::WorkspaceId))
                    .col(fk_id_nullable_col(manager, TimeLogs::TaskId))
                    .col(ColumnDef::new(TimeLogs::Member).string().not_null())
                    .col(ColumnDef::new(TimeLogs::Hours).double().not_null())
                    .col(ColumnDef::new(TimeLogs::LogDate).timestamp().not_null())
                    .col(ColumnDef::new(TimeLogs::Note).text())
                    .col(timestamp_col(TimeLogs::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_time_logs_workspace_id")
                            .from(TimeLogs::Table, TimeLogs::WorkspaceId)
                            .to(Workspaces::Table, Workspaces::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_time_logs_task_id")
                            .from(TimeLogs::Table, TimeLogs::TaskId)
                            .to(Tasks::Table, Tasks::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_time_logs_uuid")
                    .table(TimeLogs::Table)
                    .col(TimeLogs::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_time_logs_member_log_date")
                    .table(TimeLogs::Table)
                    .col(TimeLogs::Member)
                    .col(TimeLogs::LogDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(ActiveTimers::Table)
                    .col(pk_id_col(manager, ActiveTimers::Id))
                    .col(uuid_col(ActiveTimers::Uuid))
                    .col(ColumnDef::new(ActiveTimers::Member).string().not_null())
                    .col(fk_id_col(manager, ActiveTimers::WorkspaceId))
                    .col(fk_id_nullable_col(manager, ActiveTimers::TaskId))
                    .col(ColumnDef::new(ActiveTimers::StartedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_active_timers_workspace_id")
                            .from(ActiveTimers::Table, ActiveTimers::WorkspaceId)
                            .to(Workspaces::Table, Workspaces::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_active_timers_member")
                    .table(ActiveTimers::Table)
                    .col(ActiveTimers::Member)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Audit log: scoping columns are snapshots, not foreign keys, so
        // records outlive the entities they describe.
        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(ActivityEvents::Table)
                    .col(pk_id_col(manager, ActivityEvents::Id))
                    .col(uuid_col(ActivityEvents::Uuid))
                    .col(
                        ColumnDef::new(ActivityEvents::EventType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ActivityEvents::Description).text().not_null())
                    .col(ColumnDef::new(ActivityEvents::PerformedBy).string().not_null())
                    .col(ColumnDef::new(ActivityEvents::PerformedByName).string())
                    .col(uuid_nullable_col(ActivityEvents::WorkspaceId))
                    .col(uuid_nullable_col(ActivityEvents::ProjectId))
                    .col(ColumnDef::new(ActivityEvents::ProjectName).string())
                    .col(uuid_nullable_col(ActivityEvents::TaskId))
                    .col(ColumnDef::new(ActivityEvents::TaskName).string())
                    .col(uuid_nullable_col(ActivityEvents::MilestoneId))
                    .col(ColumnDef::new(ActivityEvents::MilestoneName).string())
                    .col(ColumnDef::new(ActivityEvents::Field).string())
                    .col(ColumnDef::new(ActivityEvents::OldValue).text())
                    .col(ColumnDef::new(ActivityEvents::NewValue).text())
                    .col(timestamp_col(ActivityEvents::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_activity_events_uuid")
                    .table(ActivityEvents::Table)
                    .col(ActivityEvents::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_activity_events_created_at")
                    .table(ActivityEvents::Table)
                    .col(ActivityEvents::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_activity_events_event_type")
                    .table(ActivityEvents::Table)
                    .col(ActivityEvents::EventType)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_activity_events_task_id")
                    .table(ActivityEvents::Table)
                    .col(ActivityEvents::TaskId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ActivityEvents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ActiveTimers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TimeLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tasks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Projects::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Workspaces::Table).to_owned())
            .await?;
        Ok(())
    }
}

fn pk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().auto_increment().primary_key().to_owned()
}

fn fk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().to_owned()
}

fn fk_id_nullable_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.to_owned()
}

fn uuid_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col).uuid().not_null().to_owned()
}

fn uuid_nullable_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col).uuid().to_owned()
}

fn timestamp_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

#[derive(Iden)]
enum Workspaces {
    Table,
    Id,
    Uuid,
    Name,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Projects {
    Table,
    Id,
    Uuid,
    WorkspaceId,
    Name,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Tasks {
    Table,
    Id,
    Uuid,
    ProjectId,
    Title,
    Description,
    Status,
    Priority,
    Assignee,
    DueDate,
    CompletedAt,
    CompletedOnTime,
    ManagerScore,
    Blocked,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum TimeLogs {
    Table,
    Id,
    Uuid,
    WorkspaceId,
    TaskId,
    Member,
    Hours,
    LogDate,
    Note,
    CreatedAt,
}

#[derive(Iden)]
enum ActiveTimers {
    Table,
    Id,
    Uuid,
    Member,
    WorkspaceId,
    TaskId,
    StartedAt,
}

#[derive(Iden)]
enum ActivityEvents {
    Table,
    Id,
    Uuid,
    EventType,
    Description,
    PerformedBy,
    PerformedByName,
    WorkspaceId,
    ProjectId,
    ProjectName,
    TaskId,
    TaskName,
    MilestoneId,
    MilestoneName,
    Field,
    OldValue,
    NewValue,
    CreatedAt,
}
