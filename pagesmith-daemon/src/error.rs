use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::protocol::ErrorResponse;

/// Error surface for server startup and runtime.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("cannot start runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] pagesmith_core::ConfigError),

    #[error("template error: {0}")]
    Generator(#[from] pagesmith_generator::GenerateError),

    #[error("hosting client error: {0}")]
    Hosting(#[from] pagesmith_pipeline::HostingError),

    #[error("callback client error: {0}")]
    Callback(String),
}

/// Rejections returned synchronously by `POST /deploy`.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("invalid secret")]
    AuthRejected,

    #[error("malformed request: {0}")]
    MalformedRequest(String),
}

impl IntakeError {
    pub fn status(&self) -> StatusCode {
        match self {
            IntakeError::AuthRejected => StatusCode::FORBIDDEN,
            IntakeError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
