//! JSON envelope and error-to-status mapping for the HTTP API.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use tramnet_core::error::{ErrorCode, NetworkError, RouteError};

/// Every API body: `{success, data, message, error_code}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub error_code: Option<&'static str>,
}

impl<T: Serialize> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error_code: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
            error_code: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            error_code: Some(code.code()),
        }
    }
}

/// Failure of an API request.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("stop '{0}' does not exist")]
    StopNotFound(String),

    #[error("{0}")]
    NotInitialized(String),

    #[error("{0}")]
    Storage(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Network(error) => error.code(),
            Self::Route(error) => error.code(),
            Self::StopNotFound(_) => ErrorCode::UnknownStop,
            Self::NotInitialized(_) => ErrorCode::NotInitialized,
            Self::Storage(_) => ErrorCode::StorageFailure,
            Self::Internal(_) => ErrorCode::InternalUnexpected,
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self.code() {
            ErrorCode::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorCode::UnknownReference | ErrorCode::UnknownStop | ErrorCode::NoPath => {
                StatusCode::NOT_FOUND
            }
            ErrorCode::DuplicateConnection | ErrorCode::InactiveStop => StatusCode::CONFLICT,
            ErrorCode::NotInitialized => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = %self.code(), "request failed");
        } else {
            tracing::debug!(error = %self, code = %self.code(), "request rejected");
        }
        HttpResponse::build(status).json(ApiResponse::error(self.code(), self.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tramnet_core::error::EntityKind;

    #[test]
    fn status_mapping_follows_failure_kind() {
        let cases = [
            (
                ApiError::Network(NetworkError::Validation {
                    field: "weight",
                    reason: "zero".into(),
                }),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Network(NetworkError::Reference {
                    kind: EntityKind::Stop,
                    id: "X".into(),
                }),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::Network(NetworkError::DuplicateConnection {
                    a: "A".into(),
                    b: "B".into(),
                }),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::Route(RouteError::InactiveStop("R".into())),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::Route(RouteError::NoPath {
                    from: "A".into(),
                    to: "B".into(),
                }),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::NotInitialized("no network database".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (ApiError::Storage("disk full".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(error.status_code(), status, "{error}");
        }
    }

    #[test]
    fn error_envelope_carries_code_and_message() {
        let body = serde_json::to_value(ApiResponse::error(ErrorCode::NoPath, "no route"))
            .expect("serialize");
        assert_eq!(body["success"], false);
        assert_eq!(body["error_code"], "E3003");
        assert_eq!(body["message"], "no route");
        assert!(body["data"].is_null());
    }
}
