use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Could not connect to Ollama at {url}. Make sure Ollama is running (ollama serve)")]
    Unreachable { url: String },
    #[error("Ollama target {url} is not a usable URL: {reason}")]
    InvalidTarget { url: String, reason: String },
    #[error("Request to Ollama timed out ({url})")]
    Timeout { url: String },
    #[error("Ollama API request failed: {body}")]
    UpstreamStatus { status: u16, body: String },
    #[error("Failed to fetch models from Ollama: {0}")]
    ModelListing(String),
    #[error("unexpected response from Ollama: {0}")]
    InvalidResponse(String),
    #[error(
        "No models available in Ollama. Please install a model first using 'ollama pull model:latest'"
    )]
    NoModels,
    #[error("Model '{model}' not found. Available models: {available:?}")]
    ModelNotFound {
        model: String,
        available: Vec<String>,
    },
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error("config store error: {0}")]
    Store(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// Sorts a transport failure into bad target URL, timeout, malformed response
    /// or unreachable daemon.
    pub fn from_transport(err: reqwest::Error, url: &str) -> Self {
        if err.is_builder() {
            GatewayError::InvalidTarget {
                url: url.to_string(),
                reason: err.to_string(),
            }
        } else if err.is_timeout() {
            GatewayError::Timeout {
                url: url.to_string(),
            }
        } else if err.is_decode() {
            GatewayError::InvalidResponse(err.to_string())
        } else {
            GatewayError::Unreachable {
                url: url.to_string(),
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Unreachable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::UpstreamStatus { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            GatewayError::NoModels
            | GatewayError::ModelNotFound { .. }
            | GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::InvalidTarget { .. }
            | GatewayError::ModelListing(_)
            | GatewayError::InvalidResponse(_)
            | GatewayError::Store(_)
            | GatewayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "detail": self.to_string(),
            "status_code": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Caps an upstream body for log lines and error details.
pub fn truncate_body(body: &str, max: usize) -> &str {
    if body.len() <= max {
        return body;
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
