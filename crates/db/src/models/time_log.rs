use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{entities::time_log, models::ids};

#[derive(Debug, Error)]
pub enum TimeLogError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Workspace not found")]
    WorkspaceNotFound,
    #[error("Task not found")]
    TaskNotFound,
    #[error("Logged hours must be positive, got {0}")]
    InvalidHours(f64),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TimeLog {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub task_id: Option<Uuid>,
    pub member: String,
    pub hours: f64,
    #[ts(type = "Date")]
    pub log_date: DateTime<Utc>,
    pub note: Option<String>,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateTimeLog {
    pub workspace_id: Uuid,
    pub task_id: Option<Uuid>,
    pub member: String,
    pub hours: f64,
    #[ts(type = "Date | null")]
    pub log_date: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

impl TimeLog {
    pub(crate) async fn from_model<C: ConnectionTrait>(
        db: &C,
        model: time_log::Model,
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
            workspace_id: workspace_uuid,
            task_id: task_uuid,
            member: model.member,
            hours: model.hours,
            log_date: model.log_date.into(),
            note: model.note,
            created_at: model.created_at.into(),
        })
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateTimeLog,
        log_id: Uuid,
    ) -> Result<Self, TimeLogError> {
        if data.hours <= 0.0 {
            return Err(TimeLogError::InvalidHours(data.hours));
        }

        let workspace_row_id = ids::workspace_id_by_uuid(db, data.workspace_id)
            .await?
            .ok_or(TimeLogError::WorkspaceNotFound)?;
        let task_row_id = match data.task_id {
            Some(id) => Some(
                ids::task_id_by_uuid(db, id)
                    .await?
                    .ok_or(TimeLogError::TaskNotFound)?,
            ),
            None => None,
        };

        let model = Self::insert_row(
            db,
            workspace_row_id,
            task_row_id,
            &data.member,
            data.hours,
            data.log_date.unwrap_or_else(Utc::now),
            data.note.clone(),
            log_id,
        )
        .await?;
        Ok(Self::from_model(db, model).await?)
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn insert_row<C: ConnectionTrait>(
        db: &C,
        workspace_row_id: i64,
        task_row_id: Option<i64>,
        member: &str,
        hours: f64,
        log_date: DateTime<Utc>,
        note: Option<String>,
        log_id: Uuid,
    ) -> Result<time_log::Model, DbErr> {
        let active = time_log::ActiveModel {
            uuid: Set(log_id),
            workspace_id: Set(workspace_row_id),
            task_id: Set(task_row_id),
            member: Set(member.to_string()),
            hours: Set(hours),
            log_date: Set(log_date.into()),
            note: Set(note),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };
        active.insert(db).await
    }

    pub async fn find_by_member<C: ConnectionTrait>(
        db: &C,
        member: &str,
    ) -> Result<Vec<Self>, DbErr> {
        let models = time_log::Entity::find()
            .filter(time_log::Column::Member.eq(member))
            .order_by_desc(time_log::Column::LogDate)
            .all(db)
            .await?;

        let mut logs = Vec::with_capacity(models.len());
        for model in models {
            logs.push(Self::from_model(db, model).await?);
        }
        Ok(logs)
    }

    /// Total hours a member logged inside `[start, end)`, optionally
    /// scoped to one workspace.
    pub async fn hours_between<C: ConnectionTrait>(
        db: &C,
        workspace_row_id: Option<i64>,
        member: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<f64, DbErr> {
        let mut query = time_log::Entity::find()
            .select_only()
            .column(time_log::Column::Hours)
            .filter(time_log::Column::Member.eq(member))
            .filter(time_log::Column::LogDate.gte(start))
            .filter(time_log::Column::LogDate.lt(end));
        if let Some(workspace_row_id) = workspace_row_id {
            query = query.filter(time_log::Column::WorkspaceId.eq(workspace_row_id));
        }

        let hours: Vec<f64> = query.into_tuple().all(db).await?;
        Ok(hours.into_iter().sum())
    }
}
