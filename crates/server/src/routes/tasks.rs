use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::{
    models::{
        activity::RecordActivityEvent,
        project::Project,
        task::{CreateTask, Task, UpdateTask},
    },
    types::EventType,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use ts_rs::TS;
use services::services::audit::{diff_tracked_fields, event_type_for_field};
use utils_core::response::ApiResponse;
use uuid::Uuid;

use crate::{
    AppState, error::ApiError, http::identity::Identity, middleware::load_task_middleware,
};

/// Attributes whose changes show up in the audit trail. Anything else on
/// the update payload is applied silently.
const TRACKED_TASK_FIELDS: &[&str] = &[
    "title",
    "description",
    "status",
    "assignee",
    "priority",
    "due_date",
];

#[derive(Debug, Deserialize, TS)]
pub struct TaskQuery {
    pub project_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, TS)]
pub struct BlockTaskRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, TS)]
pub struct ScoreTaskRequest {
    pub score: i32,
}

fn task_event(
    event_type: EventType,
    description: String,
    identity: &Identity,
    task: &Task,
    project: Option<&Project>,
) -> RecordActivityEvent {
    let mut event = RecordActivityEvent::new(event_type, description, identity.actor.clone());
    event.performed_by_name = identity.actor_name.clone();
    event.task_id = Some(task.id);
    event.task_name = Some(task.title.clone());
    event.project_id = Some(task.project_id);
    if let Some(project) = project {
        event.project_name = Some(project.name.clone());
        event.workspace_id = Some(project.workspace_id);
    }
    event
}

fn task_snapshot(task: &Task) -> Map<String, Value> {
    let mut snapshot = Map::new();
    snapshot.insert("title".to_string(), Value::String(task.title.clone()));
    if let Some(description) = &task.description {
        snapshot.insert("description".to_string(), Value::String(description.clone()));
    }
    snapshot.insert("status".to_string(), Value::String(task.status.to_string()));
    if let Some(assignee) = &task.assignee {
        snapshot.insert("assignee".to_string(), Value::String(assignee.clone()));
    }
    snapshot.insert(
        "priority".to_string(),
        Value::String(task.priority.to_string()),
    );
    if let Some(due_date) = task.due_date {
        snapshot.insert("due_date".to_string(), Value::String(due_date.to_rfc3339()));
    }
    snapshot
}

// Only fields present on the payload enter the snapshot: an omitted field
// is "no change requested", not "clear this".
fn update_snapshot(payload: &UpdateTask) -> Map<String, Value> {
    let mut snapshot = Map::new();
    if let Some(title) = &payload.title {
        snapshot.insert("title".to_string(), Value::String(title.clone()));
    }
    if let Some(description) = &payload.description {
        snapshot.insert("description".to_string(), Value::String(description.clone()));
    }
    if let Some(status) = &payload.status {
        snapshot.insert("status".to_string(), Value::String(status.to_string()));
    }
    if let Some(assignee) = &payload.assignee {
        snapshot.insert("assignee".to_string(), Value::String(assignee.clone()));
    }
    if let Some(priority) = &payload.priority {
        snapshot.insert(
            "priority".to_string(),
            Value::String(priority.to_string()),
        );
    }
    if let Some(due_date) = payload.due_date {
        snapshot.insert("due_date".to_string(), Value::String(due_date.to_rfc3339()));
    }
    snapshot
}

pub async fn get_tasks(
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Task>>>, ApiError> {
    let tasks = match query.project_id {
        Some(project_id) => Task::find_by_project_id(&state.db().conn, project_id).await?,
        None => Task::find_all(&state.db().conn).await?,
    };
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

pub async fn get_task(
    Extension(task): Extension<Task>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<CreateTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let id = Uuid::new_v4();

    tracing::debug!(
        "Creating task '{}' in project {}",
        payload.title,
        payload.project_id
    );

    let task = Task::create(&state.db().conn, &payload, id).await?;
    let project = Project::find_by_id(&state.db().conn, task.project_id).await?;

    state.audit().record(task_event(
        EventType::TaskCreated,
        format!("{} created task \"{}\"", identity.actor, task.title),
        &identity,
        &task,
        project.as_ref(),
    ));

    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn update_task(
    Extension(existing_task): Extension<Task>,
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let before = task_snapshot(&existing_task);
    let after = update_snapshot(&payload);
    let changes = diff_tracked_fields(&before, &after, TRACKED_TASK_FIELDS);

    // Use existing values if not provided in update
    let title = payload.title.unwrap_or_else(|| existing_task.title.clone());
    let description = match payload.description {
        Some(s) if s.trim().is_empty() => None, // Empty string = clear description
        Some(s) => Some(s),                     // Non-empty string = update description
        None => existing_task.description.clone(), // Field omitted = keep existing
    };
    let status = payload.status.unwrap_or_else(|| existing_task.status.clone());
    let priority = payload
        .priority
        .unwrap_or_else(|| existing_task.priority.clone());
    let assignee = payload.assignee.or_else(|| existing_task.assignee.clone());
    let due_date = payload.due_date.or(existing_task.due_date);

    let task = Task::update(
        &state.db().conn,
        existing_task.id,
        title,
        description,
        status,
        priority,
        assignee,
        due_date,
    )
    .await?;

    let project = Project::find_by_id(&state.db().conn, task.project_id).await?;

    if changes.is_empty() {
        // A no-op update still gets a trail entry.
        state.audit().record(task_event(
            EventType::TaskUpdated,
            format!("{} updated task \"{}\"", identity.actor, task.title),
            &identity,
            &task,
            project.as_ref(),
        ));
    } else {
        // One record per changed field.
        for change in changes {
            let event_type = event_type_for_field(&change.field);
            let mut event = task_event(
                event_type,
                format!(
                    "{} changed {} of \"{}\" from \"{}\" to \"{}\"",
                    identity.actor, change.field, task.title, change.old_value, change.new_value
                ),
                &identity,
                &task,
                project.as_ref(),
            );
            event.field = Some(change.field);
            event.old_value = Some(change.old_value);
            event.new_value = Some(change.new_value);
            state.audit().record(event);
        }
    }

    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn delete_task(
    Extension(task): Extension<Task>,
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let project = Project::find_by_id(&state.db().conn, task.project_id).await?;
    let rows = Task::delete(&state.db().conn, task.id).await?;

    if rows > 0 {
        state.audit().record(task_event(
            EventType::TaskDeleted,
            format!("{} deleted task \"{}\"", identity.actor, task.title),
            &identity,
            &task,
            project.as_ref(),
        ));
    }

    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn block_task(
    Extension(task): Extension<Task>,
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Json(payload): Json<BlockTaskRequest>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = Task::set_blocked(&state.db().conn, task.id, true).await?;
    let project = Project::find_by_id(&state.db().conn, task.project_id).await?;

    let description = match payload.reason.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(reason) => format!(
            "{} flagged a blocker on \"{}\": {}",
            identity.actor, task.title, reason
        ),
        None => format!("{} flagged a blocker on \"{}\"", identity.actor, task.title),
    };
    state.audit().record(task_event(
        EventType::BlockerFlagged,
        description,
        &identity,
        &task,
        project.as_ref(),
    ));

    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn unblock_task(
    Extension(task): Extension<Task>,
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = Task::set_blocked(&state.db().conn, task.id, false).await?;
    let project = Project::find_by_id(&state.db().conn, task.project_id).await?;

    state.audit().record(task_event(
        EventType::BlockerResolved,
        format!("{} resolved the blocker on \"{}\"", identity.actor, task.title),
        &identity,
        &task,
        project.as_ref(),
    ));

    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn score_task(
    Extension(task): Extension<Task>,
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Json(payload): Json<ScoreTaskRequest>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = Task::set_manager_score(&state.db().conn, task.id, payload.score).await?;
    let project = Project::find_by_id(&state.db().conn, task.project_id).await?;

    let mut event = task_event(
        EventType::ScoreGiven,
        format!(
            "{} scored \"{}\" {}/5",
            identity.actor, task.title, payload.score
        ),
        &identity,
        &task,
        project.as_ref(),
    );
    event.new_value = Some(payload.score.to_string());
    state.audit().record(event);

    Ok(ResponseJson(ApiResponse::success(task)))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let task_id_router = Router::new()
        .route("/", get(get_task).put(update_task).delete(delete_task))
        .route("/block", post(block_task))
        .route("/unblock", post(unblock_task))
        .route("/score", post(score_task))
        .layer(from_fn_with_state(state.clone(), load_task_middleware));

    Router::new()
        .route("/tasks", get(get_tasks).post(create_task))
        .nest("/tasks/{task_id}", task_id_router)
}
