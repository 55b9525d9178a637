use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, ModelTrait, QueryFilter,
    Set, TransactionSession, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::active_timer,
    models::{
        ids,
        time_log::TimeLog,
    },
};

#[derive(Debug, Error)]
pub enum TimerError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Workspace not found")]
    WorkspaceNotFound,
    #[error("Task not found")]
    TaskNotFound,
    #[error("No running timer for this member")]
    NotRunning,
}

/// At most one running timer per member. Starting a new one always
/// finalizes the previous interval into a time log first.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ActiveTimer {
    pub id: Uuid,
    pub member: String,
    pub workspace_id: Uuid,
    pub task_id: Option<Uuid>,
    #[ts(type = "Date")]
    pub started_at: DateTime<Utc>,
}

impl ActiveTimer {
    async fn from_model<C: ConnectionTrait>(
        db: &C,
        model: active_timer::Model,
    ) -> Result<Self, DbErr> {
        let workspace_uuid = ids::workspace_uuid_by_id(db, model.workspace_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Workspace not found".to_string()))?;
        let task_uuid = match model.task_id {
            Some(id) => ids::task_uuid_by_id(db, id).await?,
            None => None,
        };

        Ok(Self {
            id: model.uuid,
            member: model.member,
            workspace_id: workspace_uuid,
            task_id: task_uuid,
            started_at: model.started_at.into(),
        })
    }

    pub async fn find_by_member<C: ConnectionTrait>(
        db: &C,
        member: &str,
    ) -> Result<Option<Self>, DbErr> {
        let record = active_timer::Entity::find()
            .filter(active_timer::Column::Member.eq(member))
            .one(db)
            .await?;

        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Start a timer for `member`. Any already-running timer is closed
    /// out into a time log in the same transaction, so elapsed time is
    /// never lost by a double start.
    pub async fn start<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        member: &str,
        workspace_id: Uuid,
        task_id: Option<Uuid>,
    ) -> Result<(Self, Option<TimeLog>), TimerError> {
        let workspace_row_id = ids::workspace_id_by_uuid(db, workspace_id)
            .await?
            .ok_or(TimerError::WorkspaceNotFound)?;
        let task_row_id = match task_id {
            Some(id) => Some(
                ids::task_id_by_uuid(db, id)
                    .await?
                    .ok_or(TimerError::TaskNotFound)?,
            ),
            None => None,
        };

        let tx = db.begin().await?;

        let finalized = match active_timer::Entity::find()
            .filter(active_timer::Column::Member.eq(member))
            .one(&tx)
            .await?
        {
            Some(prior) => Some(finalize_into_log(&tx, prior).await?),
            None => None,
        };

        let active = active_timer::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            member: Set(member.to_string()),
            workspace_id: Set(workspace_row_id),
            task_id: Set(task_row_id),
            started_at: Set(Utc::now().into()),
            ..Default::default()
        };
        let model = active.insert(&tx).await?;

        tx.commit().await?;

        let timer = Self::from_model(db, model).await?;
        let finalized = match finalized {
            Some(model) => Some(TimeLog::from_model(db, model).await?),
            None => None,
        };
        Ok((timer, finalized))
    }

    /// Stop the member's running timer and record the elapsed interval.
    pub async fn stop<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        member: &str,
    ) -> Result<TimeLog, TimerError> {
        let tx = db.begin().await?;

        let prior = active_timer::Entity::find()
            .filter(active_timer::Column::Member.eq(member))
            .one(&tx)
            .await?
            .ok_or(TimerError::NotRunning)?;

        let log_model = finalize_into_log(&tx, prior).await?;
        tx.commit().await?;

        Ok(TimeLog::from_model(db, log_model).await?)
    }
}

async fn finalize_into_log<C: ConnectionTrait>(
    db: &C,
    timer: active_timer::Model,
) -> Result<crate::entities::time_log::Model, DbErr> {
    let now = Utc::now();
    let started_at: DateTime<Utc> = timer.started_at.into();
    let elapsed_hours = (now - started_at).num_seconds().max(0) as f64 / 3600.0;
    // Two-decimal precision is plenty for timesheets.
    let elapsed_hours = (elapsed_hours * 100.0).round() / 100.0;

    let log = TimeLog::insert_row(
        db,
        timer.workspace_id,
        timer.task_id,
        &timer.member,
        elapsed_hours,
        now,
        None,
        Uuid::new_v4(),
    )
    .await?;

    timer.delete(db).await?;
    Ok(log)
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use crate::models::workspace::{CreateWorkspace, Workspace};

    use super::*;

    async fn setup_workspace(db: &sea_orm::DatabaseConnection) -> Uuid {
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
        workspace_id
    }

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    #[tokio::test]
    async fn starting_twice_finalizes_the_first_interval() {
        let db = setup_db().await;
        let workspace_id = setup_workspace(&db).await;

        let (first, finalized) = ActiveTimer::start(&db, "ana@acme.dev", workspace_id, None)
            .await
            .unwrap();
        assert!(finalized.is_none());

        let (second, finalized) = ActiveTimer::start(&db, "ana@acme.dev", workspace_id, None)
            .await
            .unwrap();
        assert_ne!(first.id, second.id);
        let log = finalized.expect("first interval should be recorded");
        assert_eq!(log.member, "ana@acme.dev");
        assert!(log.hours >= 0.0);

        // Still exactly one running timer.
        let running = ActiveTimer::find_by_member(&db, "ana@acme.dev")
            .await
            .unwrap()
            .expect("running timer");
        assert_eq!(running.id, second.id);
    }

    #[tokio::test]
    async fn stop_without_running_timer_is_an_error() {
        let db = setup_db().await;
        setup_workspace(&db).await;

        let err = ActiveTimer::stop(&db, "ghost@acme.dev").await.unwrap_err();
        assert!(matches!(err, TimerError::NotRunning));
    }

    #[tokio::test]
    async fn stop_records_the_interval_and_clears_the_timer() {
        let db = setup_db().await;
        let workspace_id = setup_workspace(&db).await;

        ActiveTimer::start(&db, "ana@acme.dev", workspace_id, None)
            .await
            .unwrap();
        let log = ActiveTimer::stop(&db, "ana@acme.dev").await.unwrap();
        assert_eq!(log.workspace_id, workspace_id);

        assert!(
            ActiveTimer::find_by_member(&db, "ana@acme.dev")
                .await
                .unwrap()
                .is_none()
        );
    }
}
