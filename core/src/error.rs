//! Error types for the catalog client.
//!
//! # Design
//! `ApiError` covers a single round-trip. Its `Display` strings are the exact
//! messages callers see in a failed `ApiResult`, so they are part of the
//! contract. `CreateApiError` covers the composite create operation, where a
//! failed cleanup must stay distinguishable from an ordinary failure.

use thiserror::Error;

/// Errors produced while executing one catalog operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("HTTP Error: {status} {status_text}")]
    Http { status: u16, status_text: String },

    /// The response body was not the expected JSON envelope.
    #[error("Failed to parse response")]
    Parse,

    /// The request never produced a response (connection refused, DNS, ...).
    #[error("{0}")]
    Transport(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The backend reported `success: false` inside a 2xx body.
    #[error("{0}")]
    Backend(String),

    /// The backend reported success but omitted the `data` payload.
    #[error("response contained no data")]
    MissingData,
}

/// Failure raised by a `Transport` before any response was received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        ApiError::Transport(err.0)
    }
}

/// Which parameter category the composite create was persisting when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterStage {
    Request,
    Response,
}

impl std::fmt::Display for ParameterStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterStage::Request => f.write_str("request"),
            ParameterStage::Response => f.write_str("response"),
        }
    }
}

/// Errors produced by `Catalog::create_api_with_parameters`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreateApiError {
    /// Creating the API itself failed; nothing was persisted.
    #[error("{0}")]
    CreateApi(String),

    /// Persisting parameters failed and the created API was deleted again.
    #[error("Failed to create {0} parameters")]
    Parameters(ParameterStage),

    /// Persisting parameters failed and deleting the created API failed too.
    /// The API record is left behind on the server.
    #[error(
        "Failed to create {stage} parameters and failed to remove API {api_id} ({cleanup_error}); manual cleanup required"
    )]
    CleanupFailed {
        api_id: u32,
        stage: ParameterStage,
        cleanup_error: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_formats_status_line() {
        let err = ApiError::Http {
            status: 404,
            status_text: "Not Found".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP Error: 404 Not Found");
    }

    #[test]
    fn parse_error_has_fixed_message() {
        assert_eq!(ApiError::Parse.to_string(), "Failed to parse response");
    }

    #[test]
    fn transport_error_is_passed_through() {
        let err: ApiError = TransportError("connection refused".to_string()).into();
        assert_eq!(err.to_string(), "connection refused");
    }

    #[test]
    fn parameter_failures_name_the_stage() {
        assert_eq!(
            CreateApiError::Parameters(ParameterStage::Request).to_string(),
            "Failed to create request parameters"
        );
        assert_eq!(
            CreateApiError::Parameters(ParameterStage::Response).to_string(),
            "Failed to create response parameters"
        );
    }

    #[test]
    fn cleanup_failure_is_distinct() {
        let err = CreateApiError::CleanupFailed {
            api_id: 12,
            stage: ParameterStage::Request,
            cleanup_error: "HTTP Error: 500 Internal Server Error".to_string(),
        };
        let message = err.to_string();
        assert!(message.starts_with("Failed to create request parameters and failed to remove API 12"));
        assert!(message.contains("manual cleanup required"));
    }
}
