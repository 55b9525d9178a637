use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::{
    DbErr,
    models::{
        project::ProjectError, task::TaskError, time_log::TimeLogError, timer::TimerError,
        workspace::WorkspaceError,
    },
};
use services::services::reporting::ReportError;
use thiserror::Error;
use utils_core::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    TimeLog(#[from] TimeLogError),
    #[error(transparent)]
    Timer(#[from] TimerError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = match &self {
            ApiError::Workspace(err) => match err {
                WorkspaceError::WorkspaceNotFound => (StatusCode::NOT_FOUND, "WorkspaceError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "WorkspaceError"),
            },
            ApiError::Project(err) => match err {
                ProjectError::ProjectNotFound | ProjectError::WorkspaceNotFound => {
                    (StatusCode::NOT_FOUND, "ProjectError")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "ProjectError"),
            },
            ApiError::Task(err) => match err {
                TaskError::TaskNotFound | TaskError::ProjectNotFound => {
                    (StatusCode::NOT_FOUND, "TaskError")
                }
                TaskError::InvalidScore(_) => (StatusCode::BAD_REQUEST, "TaskError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "TaskError"),
            },
            ApiError::TimeLog(err) => match err {
                TimeLogError::WorkspaceNotFound | TimeLogError::TaskNotFound => {
                    (StatusCode::NOT_FOUND, "TimeLogError")
                }
                TimeLogError::InvalidHours(_) => (StatusCode::BAD_REQUEST, "TimeLogError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "TimeLogError"),
            },
            ApiError::Timer(err) => match err {
                TimerError::NotRunning => (StatusCode::CONFLICT, "TimerError"),
                TimerError::WorkspaceNotFound | TimerError::TaskNotFound => {
                    (StatusCode::NOT_FOUND, "TimerError")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "TimerError"),
            },
            ApiError::Report(err) => match err {
                ReportError::WorkspaceNotFound => (StatusCode::NOT_FOUND, "ReportError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "ReportError"),
            },
            ApiError::Database(db_err) => match db_err {
                DbErr::RecordNotFound(_) => (StatusCode::NOT_FOUND, "DatabaseError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
            },
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        };

        let error_message = match &self {
            ApiError::NotFound(msg) | ApiError::BadRequest(msg) | ApiError::Internal(msg) => {
                msg.clone()
            }
            _ => format!("{}: {}", error_type, self),
        };

        if status_code.is_server_error() {
            tracing::error!(
                status = %status_code,
                error_type,
                error = %self,
                "API request failed"
            );
        }
        let response = ApiResponse::<()>::error(&error_message);
        (status_code, Json(response)).into_response()
    }
}

impl From<&'static str> for ApiError {
    fn from(msg: &'static str) -> Self {
        ApiError::BadRequest(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_maps_to_expected_http_statuses() {
        assert_eq!(
            ApiError::BadRequest("bad".to_string())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound("missing".to_string())
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Internal("boom".to_string())
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn domain_errors_map_to_expected_http_statuses() {
        assert_eq!(
            ApiError::from(TaskError::TaskNotFound)
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(TaskError::InvalidScore(7))
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(TimerError::NotRunning)
                .into_response()
                .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(ReportError::WorkspaceNotFound)
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(TimeLogError::InvalidHours(-1.0))
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(DbErr::RecordNotFound("task".to_string()))
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
    }
}
