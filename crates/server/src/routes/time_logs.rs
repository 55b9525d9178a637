use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use db::{
    models::{
        activity::RecordActivityEvent,
        task::Task,
        time_log::{CreateTimeLog, TimeLog},
        timer::ActiveTimer,
    },
    types::EventType,
};
use serde::Deserialize;
use ts_rs::TS;
use utils_core::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, http::identity::Identity};

#[derive(Debug, Deserialize, TS)]
pub struct CreateTimeLogRequest {
    pub workspace_id: Uuid,
    pub task_id: Option<Uuid>,
    pub member: Option<String>,
    pub hours: f64,
    #[ts(type = "Date | null")]
    pub log_date: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, TS)]
pub struct TimeLogQuery {
    pub member: Option<String>,
}

#[derive(Debug, Deserialize, TS)]
pub struct StartTimerRequest {
    pub workspace_id: Uuid,
    pub task_id: Option<Uuid>,
}

async fn time_logged_event(
    state: &AppState,
    identity: &Identity,
    log: &TimeLog,
) -> Result<RecordActivityEvent, ApiError> {
    let mut event = RecordActivityEvent::new(
        EventType::TimeLogged,
        format!("{} logged {:.2}h", log.member, log.hours),
        identity.actor.clone(),
    );
    event.performed_by_name = identity.actor_name.clone();
    event.workspace_id = Some(log.workspace_id);
    if let Some(task_id) = log.task_id {
        event.task_id = Some(task_id);
        if let Some(task) = Task::find_by_id(&state.db().conn, task_id).await? {
            event.task_name = Some(task.title);
            event.project_id = Some(task.project_id);
        }
    }
    Ok(event)
}

pub async fn create_time_log(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<CreateTimeLogRequest>,
) -> Result<ResponseJson<ApiResponse<TimeLog>>, ApiError> {
    let member = payload.member.unwrap_or_else(|| identity.actor.clone());
    let log = TimeLog::create(
        &state.db().conn,
        &CreateTimeLog {
            workspace_id: payload.workspace_id,
            task_id: payload.task_id,
            member,
            hours: payload.hours,
            log_date: payload.log_date,
            note: payload.note,
        },
        Uuid::new_v4(),
    )
    .await?;

    let event = time_logged_event(&state, &identity, &log).await?;
    state.audit().record(event);

    Ok(ResponseJson(ApiResponse::success(log)))
}

pub async fn get_time_logs(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<TimeLogQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<TimeLog>>>, ApiError> {
    let member = query.member.unwrap_or(identity.actor);
    let logs = TimeLog::find_by_member(&state.db().conn, &member).await?;
    Ok(ResponseJson(ApiResponse::success(logs)))
}

pub async fn start_timer(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<StartTimerRequest>,
) -> Result<ResponseJson<ApiResponse<ActiveTimer>>, ApiError> {
    let (timer, finalized) = ActiveTimer::start(
        &state.db().conn,
        &identity.actor,
        payload.workspace_id,
        payload.task_id,
    )
    .await?;

    // A back-to-back start closes out the previous interval; that closed
    // interval is audited like any other logged time.
    if let Some(log) = finalized {
        let event = time_logged_event(&state, &identity, &log).await?;
        state.audit().record(event);
    }

    Ok(ResponseJson(ApiResponse::success(timer)))
}

pub async fn stop_timer(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<ResponseJson<ApiResponse<TimeLog>>, ApiError> {
    let log = ActiveTimer::stop(&state.db().conn, &identity.actor).await?;

    let event = time_logged_event(&state, &identity, &log).await?;
    state.audit().record(event);

    Ok(ResponseJson(ApiResponse::success(log)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/time-logs", get(get_time_logs).post(create_time_log))
        .route("/timers/start", post(start_timer))
        .route("/timers/stop", post(stop_timer))
}
