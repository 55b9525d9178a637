use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    TS,
    EnumString,
    Display,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    #[sea_orm(string_value = "todo")]
    Todo,
    #[sea_orm(string_value = "inprogress")]
    InProgress,
    #[sea_orm(string_value = "inreview")]
    InReview,
    #[sea_orm(string_value = "done")]
    Done,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    TS,
    EnumString,
    Display,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskPriority {
    #[sea_orm(string_value = "low")]
    Low,
    #[default]
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "high")]
    High,
    #[sea_orm(string_value = "urgent")]
    Urgent,
}

impl TaskPriority {
    /// Scheduling rank, most urgent first.
    pub fn rank(&self) -> u8 {
        match self {
            TaskPriority::Urgent => 0,
            TaskPriority::High => 1,
            TaskPriority::Medium => 2,
            TaskPriority::Low => 3,
        }
    }
}

/// Closed set of auditable actions. Every activity record carries exactly
/// one of these; free-form event names are not accepted.
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    TS,
    EnumString,
    Display,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventType {
    #[sea_orm(string_value = "task_created")]
    TaskCreated,
    #[sea_orm(string_value = "task_updated")]
    TaskUpdated,
    #[sea_orm(string_value = "task_deleted")]
    TaskDeleted,
    #[sea_orm(string_value = "status_changed")]
    StatusChanged,
    #[sea_orm(string_value = "assignment_changed")]
    AssignmentChanged,
    #[sea_orm(string_value = "approval_requested")]
    ApprovalRequested,
    #[sea_orm(string_value = "approval_completed")]
    ApprovalCompleted,
    #[sea_orm(string_value = "project_created")]
    ProjectCreated,
    #[sea_orm(string_value = "project_updated")]
    ProjectUpdated,
    #[sea_orm(string_value = "project_deleted")]
    ProjectDeleted,
    #[sea_orm(string_value = "milestone_created")]
    MilestoneCreated,
    #[sea_orm(string_value = "milestone_updated")]
    MilestoneUpdated,
    #[sea_orm(string_value = "comment_added")]
    CommentAdded,
    #[sea_orm(string_value = "time_logged")]
    TimeLogged,
    #[sea_orm(string_value = "blocker_flagged")]
    BlockerFlagged,
    #[sea_orm(string_value = "blocker_resolved")]
    BlockerResolved,
    #[sea_orm(string_value = "dependency_added")]
    DependencyAdded,
    #[sea_orm(string_value = "dependency_removed")]
    DependencyRemoved,
    #[sea_orm(string_value = "score_given")]
    ScoreGiven,
    #[sea_orm(string_value = "attachment_added")]
    AttachmentAdded,
    #[sea_orm(string_value = "member_added")]
    MemberAdded,
    #[sea_orm(string_value = "member_removed")]
    MemberRemoved,
}
