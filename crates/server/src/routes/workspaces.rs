use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::workspace::{CreateWorkspace, Workspace};
use utils_core::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

pub async fn get_workspaces(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Workspace>>>, ApiError> {
    let workspaces = Workspace::find_all(&state.db().conn).await?;
    Ok(ResponseJson(ApiResponse::success(workspaces)))
}

pub async fn get_workspace(
    Extension(workspace): Extension<Workspace>,
) -> Result<ResponseJson<ApiResponse<Workspace>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(workspace)))
}

pub async fn create_workspace(
    State(state): State<AppState>,
    Json(payload): Json<CreateWorkspace>,
) -> Result<ResponseJson<ApiResponse<Workspace>>, ApiError> {
    let id = Uuid::new_v4();
    let workspace = Workspace::create(&state.db().conn, &payload, id).await?;

    tracing::debug!("Created workspace '{}'", workspace.name);
    Ok(ResponseJson(ApiResponse::success(workspace)))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let workspace_id_router = Router::new()
        .route("/", get(get_workspace))
        .layer(from_fn_with_state(
            state.clone(),
            crate::middleware::load_workspace_middleware,
        ));

    Router::new()
        .route("/workspaces", get(get_workspaces).post(create_workspace))
        .nest("/workspaces/{workspace_id}", workspace_id_router)
}
