use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::get,
};
use db::{
    models::{
        activity::RecordActivityEvent,
        project::{CreateProject, Project, UpdateProject},
    },
    types::EventType,
};
use serde::Deserialize;
use ts_rs::TS;
use utils_core::response::ApiResponse;
use uuid::Uuid;

use crate::{
    AppState, error::ApiError, http::identity::Identity, middleware::load_project_middleware,
};

#[derive(Debug, Deserialize, TS)]
pub struct ProjectQuery {
    pub workspace_id: Option<Uuid>,
}

fn project_event(
    event_type: EventType,
    description: String,
    identity: &Identity,
    project: &Project,
) -> RecordActivityEvent {
    let mut event = RecordActivityEvent::new(event_type, description, identity.actor.clone());
    event.performed_by_name = identity.actor_name.clone();
    event.workspace_id = Some(project.workspace_id);
    event.project_id = Some(project.id);
    event.project_name = Some(project.name.clone());
    event
}

pub async fn get_projects(
    State(state): State<AppState>,
    Query(query): Query<ProjectQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Project>>>, ApiError> {
    let projects = match query.workspace_id {
        Some(workspace_id) => {
            Project::find_by_workspace_id(&state.db().conn, workspace_id).await?
        }
        None => Project::find_all(&state.db().conn).await?,
    };
    Ok(ResponseJson(ApiResponse::success(projects)))
}

pub async fn get_project(
    Extension(project): Extension<Project>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<CreateProject>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    let id = Uuid::new_v4();
    let project = Project::create(&state.db().conn, &payload, id).await?;

    state.audit().record(project_event(
        EventType::ProjectCreated,
        format!("{} created project \"{}\"", identity.actor, project.name),
        &identity,
        &project,
    ));

    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn update_project(
    Extension(existing): Extension<Project>,
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProject>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    let project = Project::update(&state.db().conn, existing.id, &payload).await?;

    state.audit().record(project_event(
        EventType::ProjectUpdated,
        format!("{} updated project \"{}\"", identity.actor, project.name),
        &identity,
        &project,
    ));

    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn delete_project(
    Extension(project): Extension<Project>,
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let rows = Project::delete(&state.db().conn, project.id).await?;
    if rows > 0 {
        state.audit().record(project_event(
            EventType::ProjectDeleted,
            format!("{} deleted project \"{}\"", identity.actor, project.name),
            &identity,
            &project,
        ));
    }

    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let project_id_router = Router::new()
        .route(
            "/",
            get(get_project).put(update_project).delete(delete_project),
        )
        .layer(from_fn_with_state(state.clone(), load_project_middleware));

    Router::new()
        .route("/projects", get(get_projects).post(create_project))
        .nest("/projects/{project_id}", project_id_router)
}
