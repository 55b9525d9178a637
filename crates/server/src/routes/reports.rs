use axum::{
    Router,
    extract::{Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use serde::Deserialize;
use ts_rs::TS;
use services::services::reporting::WeeklyReport;
use utils_core::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize, TS)]
pub struct WeeklyReportQuery {
    pub workspace_id: Option<String>,
    pub week_offset: Option<i64>,
}

pub async fn get_weekly_report(
    State(state): State<AppState>,
    Query(query): Query<WeeklyReportQuery>,
) -> Result<ResponseJson<ApiResponse<WeeklyReport>>, ApiError> {
    let workspace_id = match query.workspace_id.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(raw) => Some(
            Uuid::parse_str(raw)
                .map_err(|_| ApiError::BadRequest(format!("Invalid workspace id: {raw}")))?,
        ),
    };
    let week_offset = query.week_offset.unwrap_or(0);

    let report = state
        .reporting()
        .weekly_report(workspace_id, week_offset)
        .await?;
    Ok(ResponseJson(ApiResponse::success(report)))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/reports/weekly", get(get_weekly_report))
}
