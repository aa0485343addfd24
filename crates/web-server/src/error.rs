use analytics::AnalyticsError;
use analyzer::error::AnalyzerError;
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Analyzer error: {0}")]
    Analyzer(#[from] AnalyzerError),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Converts our custom `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            AppError::Analyzer(AnalyzerError::Analytics(err)) => match err {
                AnalyticsError::InvalidRange(_) | AnalyticsError::InvalidInput(_) => {
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                AnalyticsError::InsufficientData(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
                }
            },
            AppError::Analyzer(AnalyzerError::Database(db_err)) => {
                tracing::error!(error = ?db_err, "Database error.");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal database error occurred".to_string(),
                )
            }
            AppError::Analyzer(AnalyzerError::Measurements(core_err)) => {
                tracing::error!(error = ?core_err, "Malformed measurements from the store.");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An error occurred during analysis".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
