use axum::{Json, extract::rejection::QueryRejection, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::logging::DataSource;
use crate::model::SafetyDataError;

/// Failure of an API request. Every variant answers HTTP 500 with the
/// error's message; there are no structured error codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    SafetyData(#[from] SafetyDataError),
    /// Query string that does not deserialize, e.g. a repeated `date`.
    #[error("invalid query string: {0}")]
    Query(#[from] QueryRejection),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        error!(source = %DataSource::Server, status = %status, error = %self, "api_error");

        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

/// Startup failure of the HTTP server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] SafetyDataError),
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}
