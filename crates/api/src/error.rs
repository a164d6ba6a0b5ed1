//! Error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tally_core::balance::LedgerError;
use tally_shared::AppError;
use tracing::error;

/// A ledger error rendered as `{"error": CODE, "message": text}`.
#[derive(Debug)]
pub struct ApiError(pub LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = self.0.error_code();

        if status.is_server_error() {
            error!(error = %self.0, code, "Request failed");
        }

        let message = AppError::from(self.0).public_message();
        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}
