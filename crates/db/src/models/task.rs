use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

pub use crate::types::{TaskPriority, TaskStatus};

use crate::{entities::task, models::ids};

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Task not found")]
    TaskNotFound,
    #[error("Project not found")]
    ProjectNotFound,
    #[error("Manager score must be between 1 and 5, got {0}")]
    InvalidScore(i32),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assignee: Option<String>,
    #[ts(type = "Date | null")]
    pub due_date: Option<DateTime<Utc>>,
    #[ts(type = "Date | null")]
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_on_time: Option<bool>,
    pub manager_score: Option<i32>,
    pub blocked: bool,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateTask {
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee: Option<String>,
    #[ts(type = "Date | null")]
    pub due_date: Option<DateTime<Utc>>,
}

impl CreateTask {
    pub fn from_title(project_id: Uuid, title: String) -> Self {
        Self {
            project_id,
            title,
            description: None,
            status: None,
            priority: None,
            assignee: None,
            due_date: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee: Option<String>,
    #[ts(type = "Date | null")]
    pub due_date: Option<DateTime<Utc>>,
}

/// Slim task projection for the weekly report's "what's next" list.
#[derive(Debug, Clone, Serialize, TS)]
pub struct UpcomingTask {
    pub id: Uuid,
    pub title: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    #[ts(type = "Date | null")]
    pub due_date: Option<DateTime<Utc>>,
}

// A task counts as open while it has no completion timestamp and has not
// been cancelled. Completion is tracked by `completed_at`; leaving the
// done status clears it again.
fn open_condition() -> Condition {
    Condition::all()
        .add(task::Column::CompletedAt.is_null())
        .add(task::Column::Status.ne(TaskStatus::Cancelled))
}

fn scoped(query: sea_orm::Select<task::Entity>, project_row_ids: Option<&[i64]>) -> sea_orm::Select<task::Entity> {
    match project_row_ids {
        Some(ids) => query.filter(task::Column::ProjectId.is_in(ids.iter().copied())),
        None => query,
    }
}

impl Task {
    async fn from_model<C: ConnectionTrait>(db: &C, model: task::Model) -> Result<Self, DbErr> {
        let project_uuid = ids::project_uuid_by_id(db, model.project_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;

        Ok(Self {
            id: model.uuid,
            project_id: project_uuid,
            title: model.title,
            description: model.description,
            status: model.status,
            priority: model.priority,
            assignee: model.assignee,
            due_date: model.due_date.map(Into::into),
            completed_at: model.completed_at.map(Into::into),
            completed_on_time: model.completed_on_time,
            manager_score: model.manager_score,
            blocked: model.blocked,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?;

        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        let models = task::Entity::find()
            .order_by_desc(task::Column::CreatedAt)
            .all(db)
            .await?;

        let mut tasks = Vec::with_capacity(models.len());
        for model in models {
            tasks.push(Self::from_model(db, model).await?);
        }
        Ok(tasks)
    }

    pub async fn find_by_project_id<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let project_row_id = ids::project_id_by_uuid(db, project_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;

        let models = task::Entity::find()
            .filter(task::Column::ProjectId.eq(project_row_id))
            .order_by_desc(task::Column::CreatedAt)
            .all(db)
            .await?;

        let mut tasks = Vec::with_capacity(models.len());
        for model in models {
            tasks.push(Self::from_model(db, model).await?);
        }
        Ok(tasks)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateTask,
        task_id: Uuid,
    ) -> Result<Self, TaskError> {
        let project_row_id = ids::project_id_by_uuid(db, data.project_id)
            .await?
            .ok_or(TaskError::ProjectNotFound)?;

        let status = data.status.clone().unwrap_or_default();
        let now = Utc::now();
        let (completed_at, completed_on_time) = if status == TaskStatus::Done {
            (
                Some(now),
                Some(data.due_date.map(|due| now <= due).unwrap_or(true)),
            )
        } else {
            (None, None)
        };

        let active = task::ActiveModel {
            uuid: Set(task_id),
            project_id: Set(project_row_id),
            title: Set(data.title.clone()),
            description: Set(data.description.clone()),
            status: Set(status),
            priority: Set(data.priority.clone().unwrap_or_default()),
            assignee: Set(data.assignee.clone()),
            due_date: Set(data.due_date.map(Into::into)),
            completed_at: Set(completed_at.map(Into::into)),
            completed_on_time: Set(completed_on_time),
            manager_score: Set(None),
            blocked: Set(false),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Ok(Self::from_model(db, model).await?)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        title: String,
        description: Option<String>,
        status: TaskStatus,
        priority: TaskPriority,
        assignee: Option<String>,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Self, TaskError> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(TaskError::TaskNotFound)?;

        let was_completed = record.completed_at.is_some();
        let now = Utc::now();

        let mut active: task::ActiveModel = record.into();
        active.title = Set(title);
        active.description = Set(description);
        active.status = Set(status.clone());
        active.priority = Set(priority);
        active.assignee = Set(assignee);
        active.due_date = Set(due_date.map(Into::into));

        if status == TaskStatus::Done && !was_completed {
            active.completed_at = Set(Some(now.into()));
            active.completed_on_time =
                Set(Some(due_date.map(|due| now <= due).unwrap_or(true)));
        } else if status != TaskStatus::Done && was_completed {
            active.completed_at = Set(None);
            active.completed_on_time = Set(None);
        }
        active.updated_at = Set(now.into());

        let updated = active.update(db).await?;
        Ok(Self::from_model(db, updated).await?)
    }

    pub async fn set_blocked<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        blocked: bool,
    ) -> Result<Self, TaskError> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(TaskError::TaskNotFound)?;

        let mut active: task::ActiveModel = record.into();
        active.blocked = Set(blocked);
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Ok(Self::from_model(db, updated).await?)
    }

    pub async fn set_manager_score<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        score: i32,
    ) -> Result<Self, TaskError> {
        if !(1..=5).contains(&score) {
            return Err(TaskError::InvalidScore(score));
        }

        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(TaskError::TaskNotFound)?;

        let mut active: task::ActiveModel = record.into();
        active.manager_score = Set(Some(score));
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Ok(Self::from_model(db, updated).await?)
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = task::Entity::delete_many()
            .filter(task::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Everyone who currently holds at least one task in scope. The report
    /// works from assignments, not from an employee roster.
    pub async fn distinct_assignees<C: ConnectionTrait>(
        db: &C,
        project_row_ids: Option<&[i64]>,
    ) -> Result<Vec<String>, DbErr> {
        let query = scoped(task::Entity::find(), project_row_ids)
            .select_only()
            .column(task::Column::Assignee)
            .filter(task::Column::Assignee.is_not_null())
            .filter(task::Column::Assignee.ne(""))
            .distinct();

        query.into_tuple::<String>().all(db).await
    }

    pub async fn count_completed_between<C: ConnectionTrait>(
        db: &C,
        project_row_ids: Option<&[i64]>,
        assignee: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64, DbErr> {
        scoped(task::Entity::find(), project_row_ids)
            .filter(task::Column::Assignee.eq(assignee))
            .filter(task::Column::CompletedAt.gte(start))
            .filter(task::Column::CompletedAt.lt(end))
            .count(db)
            .await
    }

    /// Tasks that existed before the window closed and were not already
    /// completed before it opened.
    pub async fn count_live_during<C: ConnectionTrait>(
        db: &C,
        project_row_ids: Option<&[i64]>,
        assignee: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64, DbErr> {
        scoped(task::Entity::find(), project_row_ids)
            .filter(task::Column::Assignee.eq(assignee))
            .filter(task::Column::CreatedAt.lt(end))
            .filter(
                Condition::any()
                    .add(task::Column::CompletedAt.is_null())
                    .add(task::Column::CompletedAt.gte(start)),
            )
            .count(db)
            .await
    }

    /// All-time completion counts: (completed, completed on time).
    pub async fn completed_totals<C: ConnectionTrait>(
        db: &C,
        project_row_ids: Option<&[i64]>,
        assignee: &str,
    ) -> Result<(u64, u64), DbErr> {
        let completed = scoped(task::Entity::find(), project_row_ids)
            .filter(task::Column::Assignee.eq(assignee))
            .filter(task::Column::CompletedAt.is_not_null())
            .count(db)
            .await?;

        let on_time = scoped(task::Entity::find(), project_row_ids)
            .filter(task::Column::Assignee.eq(assignee))
            .filter(task::Column::CompletedAt.is_not_null())
            .filter(task::Column::CompletedOnTime.eq(true))
            .count(db)
            .await?;

        Ok((completed, on_time))
    }

    /// Manager scores across the assignee's completed tasks, unscored
    /// tasks excluded.
    pub async fn manager_scores<C: ConnectionTrait>(
        db: &C,
        project_row_ids: Option<&[i64]>,
        assignee: &str,
    ) -> Result<Vec<i32>, DbErr> {
        scoped(task::Entity::find(), project_row_ids)
            .select_only()
            .column(task::Column::ManagerScore)
            .filter(task::Column::Assignee.eq(assignee))
            .filter(task::Column::CompletedAt.is_not_null())
            .filter(task::Column::ManagerScore.is_not_null())
            .into_tuple::<i32>()
            .all(db)
            .await
    }

    pub async fn count_overdue<C: ConnectionTrait>(
        db: &C,
        project_row_ids: Option<&[i64]>,
        assignee: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, DbErr> {
        scoped(task::Entity::find(), project_row_ids)
            .filter(task::Column::Assignee.eq(assignee))
            .filter(open_condition())
            .filter(task::Column::DueDate.lt(now))
            .count(db)
            .await
    }

    pub async fn count_blocked<C: ConnectionTrait>(
        db: &C,
        project_row_ids: Option<&[i64]>,
        assignee: &str,
    ) -> Result<u64, DbErr> {
        scoped(task::Entity::find(), project_row_ids)
            .filter(task::Column::Assignee.eq(assignee))
            .filter(open_condition())
            .filter(task::Column::Blocked.eq(true))
            .count(db)
            .await
    }

    /// Open tasks for an assignee, most urgent first: priority rank, then
    /// due date (undated last), then age.
    pub async fn upcoming_for_assignee<C: ConnectionTrait>(
        db: &C,
        project_row_ids: Option<&[i64]>,
        assignee: &str,
        limit: usize,
    ) -> Result<Vec<UpcomingTask>, DbErr> {
        let models = scoped(task::Entity::find(), project_row_ids)
            .filter(task::Column::Assignee.eq(assignee))
            .filter(open_condition())
            .all(db)
            .await?;

        let mut upcoming: Vec<UpcomingTask> = models
            .into_iter()
            .map(|model| UpcomingTask {
                id: model.uuid,
                title: model.title,
                priority: model.priority,
                status: model.status,
                due_date: model.due_date.map(Into::into),
            })
            .collect();

        upcoming.sort_by(|a, b| {
            a.priority
                .rank()
                .cmp(&b.priority.rank())
                .then_with(|| match (a.due_date, b.due_date) {
                    (Some(a_due), Some(b_due)) => a_due.cmp(&b_due),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                })
        });
        upcoming.truncate(limit);

        Ok(upcoming)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use crate::models::{
        project::{CreateProject, Project},
        workspace::{CreateWorkspace, Workspace},
    };

    use super::*;

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn seed_project(db: &sea_orm::DatabaseConnection) -> Uuid {
        let workspace_id = Uuid::new_v4();
        Workspace::create(
            db,
            &CreateWorkspace {
                name: "Acme".to_string(),
            },
            workspace_id,
        )
        .await
        .unwrap();

        let project_id = Uuid::new_v4();
        Project::create(
            db,
            &CreateProject {
                workspace_id,
                name: "Launch".to_string(),
                description: None,
            },
            project_id,
        )
        .await
        .unwrap();
        project_id
    }

    #[tokio::test]
    async fn completing_a_task_stamps_completion_and_on_time_flag() {
        let db = setup_db().await;
        let project_id = seed_project(&db).await;

        let due = Utc::now() + Duration::days(3);
        let task_id = Uuid::new_v4();
        let task = Task::create(
            &db,
            &CreateTask {
                project_id,
                title: "Write launch notes".to_string(),
                description: None,
                status: None,
                priority: Some(TaskPriority::High),
                assignee: Some("dana@acme.dev".to_string()),
                due_date: Some(due),
            },
            task_id,
        )
        .await
        .unwrap();
        assert!(task.completed_at.is_none());

        let updated = Task::update(
            &db,
            task_id,
            task.title.clone(),
            task.description.clone(),
            TaskStatus::Done,
            task.priority.clone(),
            task.assignee.clone(),
            task.due_date,
        )
        .await
        .unwrap();

        assert!(updated.completed_at.is_some());
        assert_eq!(updated.completed_on_time, Some(true));

        // Reopening clears the completion stamp.
        let reopened = Task::update(
            &db,
            task_id,
            updated.title.clone(),
            updated.description.clone(),
            TaskStatus::InProgress,
            updated.priority.clone(),
            updated.assignee.clone(),
            updated.due_date,
        )
        .await
        .unwrap();
        assert!(reopened.completed_at.is_none());
        assert!(reopened.completed_on_time.is_none());
    }

    #[tokio::test]
    async fn completing_past_due_is_flagged_late() {
        let db = setup_db().await;
        let project_id = seed_project(&db).await;

        let task_id = Uuid::new_v4();
        let task = Task::create(
            &db,
            &CreateTask {
                project_id,
                title: "Overdue cleanup".to_string(),
                description: None,
                status: None,
                priority: None,
                assignee: Some("dana@acme.dev".to_string()),
                due_date: Some(Utc::now() - Duration::days(1)),
            },
            task_id,
        )
        .await
        .unwrap();

        let updated = Task::update(
            &db,
            task_id,
            task.title.clone(),
            None,
            TaskStatus::Done,
            task.priority.clone(),
            task.assignee.clone(),
            task.due_date,
        )
        .await
        .unwrap();

        assert_eq!(updated.completed_on_time, Some(false));
    }

    #[tokio::test]
    async fn manager_score_is_validated() {
        let db = setup_db().await;
        let project_id = seed_project(&db).await;

        let task_id = Uuid::new_v4();
        Task::create(&db, &CreateTask::from_title(project_id, "Score me".to_string()), task_id)
            .await
            .unwrap();

        let err = Task::set_manager_score(&db, task_id, 9).await.unwrap_err();
        assert!(matches!(err, TaskError::InvalidScore(9)));

        let scored = Task::set_manager_score(&db, task_id, 4).await.unwrap();
        assert_eq!(scored.manager_score, Some(4));
    }

    #[tokio::test]
    async fn distinct_assignees_skips_unassigned_tasks() {
        let db = setup_db().await;
        let project_id = seed_project(&db).await;

        for assignee in [Some("ana@acme.dev"), Some("bo@acme.dev"), Some("ana@acme.dev"), None] {
            let mut create = CreateTask::from_title(project_id, "t".to_string());
            create.assignee = assignee.map(str::to_string);
            Task::create(&db, &create, Uuid::new_v4()).await.unwrap();
        }

        let mut assignees = Task::distinct_assignees(&db, None).await.unwrap();
        assignees.sort();
        assert_eq!(assignees, vec!["ana@acme.dev", "bo@acme.dev"]);
    }

    #[tokio::test]
    async fn upcoming_orders_by_priority_then_due_date() {
        let db = setup_db().await;
        let project_id = seed_project(&db).await;
        let assignee = "ana@acme.dev";

        let soon = Utc::now() + Duration::days(1);
        let later = Utc::now() + Duration::days(10);
        let entries = [
            ("low soon", TaskPriority::Low, Some(soon)),
            ("urgent later", TaskPriority::Urgent, Some(later)),
            ("urgent soon", TaskPriority::Urgent, Some(soon)),
            ("high undated", TaskPriority::High, None),
        ];
        for (title, priority, due_date) in entries {
            let mut create = CreateTask::from_title(project_id, title.to_string());
            create.assignee = Some(assignee.to_string());
            create.priority = Some(priority);
            create.due_date = due_date;
            Task::create(&db, &create, Uuid::new_v4()).await.unwrap();
        }

        let upcoming = Task::upcoming_for_assignee(&db, None, assignee, 10)
            .await
            .unwrap();
        let titles: Vec<&str> = upcoming.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["urgent soon", "urgent later", "high undated", "low soon"]
        );
    }
}
