use sea_orm::entity::prelude::*;

use crate::types::EventType;

// Scoping columns hold UUID/name snapshots rather than foreign keys:
// audit rows must survive deletion of the entities they mention.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "activity_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub uuid: Uuid,
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
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
