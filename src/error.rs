//! Domain-specific error types for the VSME disclosure service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::clients::GeneratorError;

/// Main error type for the disclosure service
#[derive(Error, Debug)]
pub enum VsmeError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Model API key is not configured")]
    MissingApiKey,

    #[error("Text generation failed: {message}")]
    Upstream { message: String },

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Missing authorization header")]
    Unauthorized,

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Import error: {message}")]
    Import { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl VsmeError {
    pub fn status(&self) -> StatusCode {
        match self {
            VsmeError::Unauthorized => StatusCode::UNAUTHORIZED,
            VsmeError::MissingApiKey
            | VsmeError::Upstream { .. }
            | VsmeError::Validation { .. }
            | VsmeError::Serialization { .. } => StatusCode::BAD_REQUEST,
            VsmeError::Config { .. }
            | VsmeError::Store { .. }
            | VsmeError::Import { .. }
            | VsmeError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for VsmeError {
    fn from(err: anyhow::Error) -> Self {
        VsmeError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for VsmeError {
    fn from(err: serde_json::Error) -> Self {
        VsmeError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<csv::Error> for VsmeError {
    fn from(err: csv::Error) -> Self {
        VsmeError::Import {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for VsmeError {
    fn from(err: std::io::Error) -> Self {
        VsmeError::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

impl From<GeneratorError> for VsmeError {
    fn from(err: GeneratorError) -> Self {
        match err {
            GeneratorError::MissingApiKey => VsmeError::MissingApiKey,
            other => VsmeError::Upstream {
                message: other.to_string(),
            },
        }
    }
}

/// Convert VsmeError to a JSON error response
impl IntoResponse for VsmeError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{}", self);
        } else {
            tracing::warn!(status = status.as_u16(), "{}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Result type alias for disclosure service operations
pub type Result<T> = std::result::Result<T, VsmeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_failures_map_to_bad_request() {
        assert_eq!(VsmeError::MissingApiKey.status(), StatusCode::BAD_REQUEST);
        let upstream: VsmeError = GeneratorError::Http {
            status: 503,
            body: "overloaded".to_string(),
        }
        .into();
        assert_eq!(upstream.status(), StatusCode::BAD_REQUEST);
        assert!(upstream.to_string().contains("503"));
    }

    #[test]
    fn missing_key_survives_conversion() {
        let err: VsmeError = GeneratorError::MissingApiKey.into();
        assert!(matches!(err, VsmeError::MissingApiKey));
    }

    #[test]
    fn store_failures_are_server_errors() {
        let err = VsmeError::Store {
            message: "connection refused".to_string(),
        };
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(VsmeError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    }
}
