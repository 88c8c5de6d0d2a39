use crate::models::ClientId;
use axum::{http::StatusCode, Json};
use serde_json::{json, Value};
use thiserror::Error;

/// Failures surfaced by the API client and the console workflows built on it.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Local, pre-network rejection. The request was never sent.
    #[error("{0}")]
    Validation(String),
    #[error("{message}")]
    Api { status: u16, message: String },
    /// The backend refused the session token.
    #[error("{0}")]
    Auth(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response from server: {0}")]
    Decode(String),
    #[error("could not store session: {0}")]
    Storage(String),
    #[error("a change to client {0} is still in progress")]
    Busy(ClientId),
    #[error("a new client is still being saved")]
    AddPending,
    #[error("request cancelled")]
    Cancelled,
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// HTTP status for errors that came back from the server.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Auth(_) => Some(401),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Error response for the relay's HTTP handlers: a status and a JSON `{"error": ...}` body.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub error: Value,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: Value::String(message.into()),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: Value::String(err.to_string()),
        }
    }

    /// Passes an upstream error body through untouched.
    pub fn upstream(body: Value) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: body,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::internal(err)
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(json!({ "error": self.error }))).into_response()
    }
}
