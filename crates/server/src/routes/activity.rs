use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::get,
};
use chrono::{DateTime, Utc};
use db::{
    models::activity::{
        ActivityEvent, ActivityFilter, ActivityLogPage, DEFAULT_PAGE_SIZE, RecordActivityEvent,
    },
    types::EventType,
};
use serde::Deserialize;
use ts_rs::TS;
use utils_core::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, http::identity::Identity};

/// Wire shape for "record event". The actor fields are optional here:
/// when a caller does not attribute the event explicitly, the request's
/// identity fills them in.
#[derive(Debug, Deserialize, TS)]
pub struct RecordEventRequest {
    pub event_type: EventType,
    pub description: String,
    pub performed_by: Option<String>,
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

#[derive(Debug, Deserialize, TS)]
pub struct ActivityQuery {
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
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Accepts the event and returns immediately. The write happens on the
/// audit queue; the caller never sees its outcome.
pub async fn record_event(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<RecordEventRequest>,
) -> (StatusCode, ResponseJson<ApiResponse<()>>) {
    let event = RecordActivityEvent {
        event_type: payload.event_type,
        description: payload.description,
        performed_by: payload.performed_by.unwrap_or_else(|| identity.actor.clone()),
        performed_by_name: payload.performed_by_name.or_else(|| identity.actor_name.clone()),
        workspace_id: payload.workspace_id,
        project_id: payload.project_id,
        project_name: payload.project_name,
        task_id: payload.task_id,
        task_name: payload.task_name,
        milestone_id: payload.milestone_id,
        milestone_name: payload.milestone_name,
        field: payload.field,
        old_value: payload.old_value,
        new_value: payload.new_value,
    };
    state.audit().record(event);

    (StatusCode::ACCEPTED, ResponseJson(ApiResponse::success(())))
}

pub async fn get_activity(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> Result<ResponseJson<ApiResponse<ActivityLogPage>>, ApiError> {
    // Out-of-range paging inputs are normalized, not rejected; everything
    // else in the query string is strictly typed and fails with 400.
    let page = query.page.filter(|p| *p >= 1).unwrap_or(1) as u64;
    let limit = query
        .limit
        .filter(|l| *l >= 1)
        .unwrap_or(DEFAULT_PAGE_SIZE as i64) as u64;

    let filter = ActivityFilter {
        workspace_id: query.workspace_id,
        project_id: query.project_id,
        task_id: query.task_id,
        event_type: query.event_type,
        performed_by: query.performed_by,
        start_date: query.start_date,
        end_date: query.end_date,
        search: query.search,
    };

    let log = ActivityEvent::search(&state.db().conn, &filter, page, limit).await?;
    Ok(ResponseJson(ApiResponse::success(log)))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/activity", get(get_activity).post(record_event))
}
