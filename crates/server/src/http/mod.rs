use axum::{Json, Router, middleware::from_fn, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utils_core::response::ApiResponse;

use crate::{AppState, routes};

pub mod identity;

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(routes::workspaces::router(&state))
        .merge(routes::projects::router(&state))
        .merge(routes::tasks::router(&state))
        .merge(routes::time_logs::router())
        .merge(routes::activity::router())
        .merge(routes::reports::router())
        .layer(from_fn(identity::attach_identity));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("ok"))
}
