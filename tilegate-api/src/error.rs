//! Error Types for the Tilegate API
//!
//! This module defines error handling for the HTTP layer:
//! - ApiError struct carrying a code and a human-readable message
//! - ErrorCode enum mapping each error category to an HTTP status
//! - IntoResponse implementation for Axum HTTP responses
//!
//! Error bodies are plain text. Every renderer-side failure is reported as a
//! `400`; only failures of the gateway itself are `5xx`.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tilegate_core::{CacheError, ConfigError, GatewayError, RenderError};

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Caller Errors (400)
    // ========================================================================
    /// Request contains invalid input data (e.g. an empty query)
    InvalidInput,

    /// The renderer could not be run or produced unusable output
    RenderFailed,

    /// The renderer reported that it cannot produce the tile
    RenderRejected,

    /// The renderer did not finish in time
    RenderTimeout,

    // ========================================================================
    // Not Found (404)
    // ========================================================================
    NotFound,

    // ========================================================================
    // Server Errors (500, 503)
    // ========================================================================
    /// Internal server error
    InternalError,

    /// A dependency (cache root, renderer) is unusable
    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidInput
            | ErrorCode::RenderFailed
            | ErrorCode::RenderRejected
            | ErrorCode::RenderTimeout => StatusCode::BAD_REQUEST,

            ErrorCode::NotFound => StatusCode::NOT_FOUND,

            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "Invalid input",
            ErrorCode::RenderFailed => "Failed to render tile",
            ErrorCode::RenderRejected => "cannot generate tile",
            ErrorCode::RenderTimeout => "Failed to render tile: renderer timed out",
            ErrorCode::NotFound => "Not found",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Error returned by every handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message, sent as the response body
    pub message: String,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.message,
        )
            .into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM DOMAIN ERRORS
// ============================================================================

impl From<RenderError> for ApiError {
    fn from(err: RenderError) -> Self {
        let code = match &err {
            RenderError::ExecutionFailed { .. } | RenderError::MalformedResponse { .. } => {
                ErrorCode::RenderFailed
            }
            RenderError::Timeout { .. } => ErrorCode::RenderTimeout,
            RenderError::Rejected { .. } | RenderError::MessageParseFailed => {
                ErrorCode::RenderRejected
            }
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        // Log the full error; the cache layout is not the caller's business.
        tracing::error!(error = %err, "Tile cache error");
        match err {
            CacheError::Root { .. } => ApiError::service_unavailable("Tile cache is unavailable"),
            CacheError::Read { .. } | CacheError::Write { .. } => {
                ApiError::internal_error("Tile cache operation failed")
            }
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::internal_error(err.to_string())
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::EmptyQuery => ApiError::invalid_input(err.to_string()),
            GatewayError::Render(e) => e.into(),
            GatewayError::Cache(e) => e.into(),
            GatewayError::Config(e) => e.into(),
        }
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(ErrorCode::InvalidInput.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::RenderFailed.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::RenderRejected.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::RenderTimeout.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::ServiceUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ErrorCode::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_renderer_failures_never_5xx() {
        let failures = [
            RenderError::ExecutionFailed {
                detail: "exit status: 1".to_string(),
            },
            RenderError::Timeout {
                after: Duration::from_secs(30),
            },
            RenderError::Rejected {
                message: "msDrawMap(): no layers".to_string(),
            },
            RenderError::MessageParseFailed,
            RenderError::MalformedResponse {
                reason: "missing Content-Type header".to_string(),
            },
        ];
        for failure in failures {
            let err = ApiError::from(GatewayError::from(failure));
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST, "{}", err);
        }
    }

    #[test]
    fn test_gateway_error_messages_carried() {
        let err = ApiError::from(GatewayError::EmptyQuery);
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert_eq!(err.message, "Query parameters cannot be empty");

        let err = ApiError::from(GatewayError::from(RenderError::Rejected {
            message: "Invalid LAYERS parameter".to_string(),
        }));
        assert_eq!(err.code, ErrorCode::RenderRejected);
        assert_eq!(err.message, "cannot generate tile. Invalid LAYERS parameter");

        let err = ApiError::from(GatewayError::from(RenderError::MessageParseFailed));
        assert_eq!(err.message, "cannot generate tile");
    }

    #[test]
    fn test_cache_root_error_is_unavailable() {
        let err = ApiError::from(CacheError::Root {
            path: "cache".to_string(),
            reason: "read-only".to_string(),
        });
        assert_eq!(err.code, ErrorCode::ServiceUnavailable);
    }

    #[test]
    fn test_into_response_is_plain_text() {
        let response = ApiError::invalid_input("Query parameters cannot be empty").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).map(|v| v.as_bytes()),
            Some(&b"text/plain; charset=utf-8"[..])
        );
    }

    #[test]
    fn test_from_code_uses_default_message() {
        let err = ApiError::from_code(ErrorCode::NotFound);
        assert_eq!(err.message, "Not found");
        assert_eq!(err.to_string(), "NotFound: Not found");
    }
}
