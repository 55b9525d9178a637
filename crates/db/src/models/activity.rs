use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{entities::activity_event, types::EventType};

pub const DEFAULT_PAGE_SIZE: u64 = 50;

/// One immutable audit-trail entry: who did what, to which entity, when.
/// Rows are only ever inserted; there is no update path.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ActivityEvent {
    pub id: Uuid,
    pub event_type: EventType,
    pub description: String,
    pub performed_by: String,
    pub performed_by_name: Option<String>,
    pub workspace_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub project_name: Option<String>,
    pub task_id: Option<Uuid>,
    pub task_name: Option<String>,
    pub milestone_id: Option<Uuid>,
    pub milestone_name: Option<String>,
    pub field: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct RecordActivityEvent {
    pub event_type: EventType,
    pub description: String,
    pub performed_by: String,
    pub performed_by_name: Option<String>,
    pub workspace_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub project_name: Option<String>,
    pub task_id: Option<Uuid>,
    pub task_name: Option<String>,
    pub milestone_id: Option<Uuid>,
    pub milestone_name: Option<String>,
    pub field: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl RecordActivityEvent {
    pub fn new(event_type: EventType, description: String, performed_by: String) -> Self {
        Self {
            event_type,
            description,
            performed_by,
            performed_by_name: None,
            workspace_id: None,
            project_id: None,
            project_name: None,
            task_id: None,
            task_name: None,
            milestone_id: None,
            milestone_name: None,
            field: None,
            old_value: None,
            new_value: None,
        }
    }
}

/// Optional, AND-combined query filters. `search` is a case-insensitive
/// substring match OR-ed across description, actor name, task name and
/// project name.
#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct ActivityFilter {
    pub workspace_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub event_type: Option<EventType>,
    pub performed_by: Option<String>,
    #[ts(type = "Date | null")]
    pub start_date: Option<DateTime<Utc>>,
    #[ts(type = "Date | null")]
    pub end_date: Option<DateTime<Utc>>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct ActivityLogPage {
    pub entries: Vec<ActivityEvent>,
    pub total: u64,
    pub page: u64,
    pub total_pages: u64,
}

impl ActivityEvent {
    fn from_model(model: activity_event::Model) -> Self {
        Self {
            id: model.uuid,
            event_type: model.event_type,
            description: model.description,
            performed_by: model.performed_by,
            performed_by_name: model.performed_by_name,
            workspace_id: model.workspace_id,
            project_id: model.project_id,
            project_name: model.project_name,
            task_id: model.task_id,
            task_name: model.task_name,
            milestone_id: model.milestone_id,
            milestone_name: model.milestone_name,
            field: model.field,
            old_value: model.old_value,
            new_value: model.new_value,
            created_at: model.created_at.into(),
        }
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &RecordActivityEvent,
        event_id: Uuid,
    ) -> Result<Self, DbErr> {
        let active = activity_event::ActiveModel {
            uuid: Set(event_id),
            event_type: Set(data.event_type.clone()),
            description: Set(data.description.clone()),
            performed_by: Set(data.performed_by.clone()),
            performed_by_name: Set(data.performed_by_name.clone()),
            workspace_id: Set(data.workspace_id),
            project_id: Set(data.project_id),
            project_name: Set(data.project_name.clone()),
            task_id: Set(data.task_id),
            task_name: Set(data.task_name.clone()),
            milestone_id: Set(data.milestone_id),
            milestone_name: Set(data.milestone_name.clone()),
            field: Set(data.field.clone()),
            old_value: Set(data.old_value.clone()),
            new_value: Set(data.new_value.clone()),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Ok(Self::from_model(model))
    }

    /// Paginated read over the audit trail, newest first. `page` is
    /// 1-indexed; out-of-range values are normalized rather than
    /// rejected (`page` to 1, non-positive `limit` to the default 50).
    pub async fn search<C: ConnectionTrait>(
        db: &C,
        filter: &ActivityFilter,
        page: u64,
        limit: u64,
    ) -> Result<ActivityLogPage, DbErr> {
        let page = page.max(1);
        let limit = if limit == 0 { DEFAULT_PAGE_SIZE } else { limit };

        let mut query = activity_event::Entity::find();
        if let Some(workspace_id) = filter.workspace_id {
            query = query.filter(activity_event::Column::WorkspaceId.eq(workspace_id));
        }
        if let Some(project_id) = filter.project_id {
            query = query.filter(activity_event::Column::ProjectId.eq(project_id));
        }
        if let Some(task_id) = filter.task_id {
            query = query.filter(activity_event::Column::TaskId.eq(task_id));
        }
        if let Some(event_type) = &filter.event_type {
            query = query.filter(activity_event::Column::EventType.eq(event_type.clone()));
        }
        if let Some(performed_by) = &filter.performed_by {
            query = query.filter(activity_event::Column::PerformedBy.eq(performed_by.clone()));
        }
        if let Some(start_date) = filter.start_date {
            query = query.filter(activity_event::Column::CreatedAt.gte(start_date));
        }
        if let Some(end_date) = filter.end_date {
            query = query.filter(activity_event::Column::CreatedAt.lte(end_date));
        }
        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(activity_event::Column::Description.contains(term))
                    .add(activity_event::Column::PerformedByName.contains(term))
                    .add(activity_event::Column::TaskName.contains(term))
                    .add(activity_event::Column::ProjectName.contains(term)),
            );
        }

        // Audit trails read newest-first; row id breaks same-timestamp ties.
        let query = query
            .order_by_desc(activity_event::Column::CreatedAt)
            .order_by_desc(activity_event::Column::Id);

        let paginator = query.paginate(db, limit);
        let totals = paginator.num_items_and_pages().await?;
        let models = paginator.fetch_page(page - 1).await?;

        Ok(ActivityLogPage {
            entries: models.into_iter().map(Self::from_model).collect(),
            total: totals.number_of_items,
            page,
            total_pages: totals.number_of_pages,
        })
    }
}
