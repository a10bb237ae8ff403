use crate::api::Envelope;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ledger_core::LedgerError;
use tracing::error;

/// Anything a handler can fail with, rendered as `{status: "error", data: message}`.
#[derive(Debug)]
pub enum ApiError {
    Ledger(LedgerError),
    InvalidInput(String),
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) | ApiError::Ledger(LedgerError::MalformedInput(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Ledger(LedgerError::ProofNotFound { .. })
            | ApiError::Ledger(LedgerError::MiningCancelled) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Ledger(e) if e.is_integrity() => StatusCode::CONFLICT,
            ApiError::Ledger(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Ledger(e) => write!(f, "{e}"),
            ApiError::InvalidInput(msg) | ApiError::Internal(msg) => f.write_str(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(%status, error = %self, "request failed");
        }
        (status, Json(Envelope::error(self.to_string()))).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}
