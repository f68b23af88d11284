//! API error handling
//!
//! Maps the domain error taxonomy onto HTTP statuses. The JSON body carries
//! the stable `error_code()` string so clients can branch without parsing
//! messages.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use marketpay_types::SettleError;

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// A domain error crossing the HTTP boundary
#[derive(Debug)]
pub struct ApiError(pub SettleError);

impl ApiError {
    /// HTTP status for the wrapped domain error
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            SettleError::Validation { .. }
            | SettleError::CurrencyMismatch { .. }
            | SettleError::AmountOverflow
            | SettleError::AmountOutOfRange { .. } => StatusCode::BAD_REQUEST,

            SettleError::InvalidSignature => StatusCode::UNAUTHORIZED,
            SettleError::Unauthorized { .. } => StatusCode::FORBIDDEN,

            SettleError::OrderNotFound { .. }
            | SettleError::EscrowNotFound { .. }
            | SettleError::DisputeNotFound { .. } => StatusCode::NOT_FOUND,

            SettleError::Conflict { .. } | SettleError::DisputeAlreadyOpen { .. } => {
                StatusCode::CONFLICT
            }

            SettleError::ExternalGateway { .. } => StatusCode::BAD_GATEWAY,
            SettleError::PollTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,

            SettleError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SettleError> for ApiError {
    fn from(err: SettleError) -> Self {
        Self(err)
    }
}

/// JSON error body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub msg: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = ErrorResponse {
            code: self.0.error_code().to_string(),
            msg: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (SettleError::validation("amount", "negative"), StatusCode::BAD_REQUEST),
            (SettleError::InvalidSignature, StatusCode::UNAUTHORIZED),
            (SettleError::unauthorized("not a party"), StatusCode::FORBIDDEN),
            (
                SettleError::OrderNotFound {
                    reference: "ref-1".to_string(),
                },
                StatusCode::NOT_FOUND,
            ),
            (SettleError::conflict("already settled"), StatusCode::CONFLICT),
            (
                SettleError::ExternalGateway {
                    reason: "unreachable".to_string(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                SettleError::PollTimeout {
                    reference: "ref-1".to_string(),
                    attempts: 30,
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (SettleError::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status_code(), status);
        }
    }
}
