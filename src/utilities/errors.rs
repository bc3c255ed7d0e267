//! Error types for the chat relay.
//!
//! Generation failures are recovered inside each persona; only the
//! [`ChatError`] taxonomy ever reaches a client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Errors raised by a text-generation engine.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The engine could not be reached or answered with garbage.
    #[error("Generation engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The engine did not answer within the configured timeout.
    #[error("Generation engine timed out")]
    EngineTimeout,

    /// The request violated the adapter contract (empty prompt, zero tokens).
    #[error("Invalid generation request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::EngineTimeout
        } else {
            Self::EngineUnavailable(err.to_string())
        }
    }
}

/// Errors surfaced by the request dispatcher.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The message was empty after trimming.
    #[error("Message cannot be empty")]
    EmptyMessage,

    /// The persona tag is not one of the accepted set.
    #[error("Invalid model type '{0}'. Choose from: cat, goldfish, sloth")]
    InvalidModel(String),

    /// The body was not JSON, or a field had the wrong type.
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// The generation engine has not finished loading.
    #[error("Models not loaded yet")]
    NotReady,

    /// Anything a persona did not turn into a fallback reply.
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ChatError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::EmptyMessage | Self::InvalidModel(_) | Self::InvalidBody(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the caller is at fault.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "chat request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid YAML for [`crate::utilities::config::ChatConfig`].
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A value is out of range or inconsistent with another.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
