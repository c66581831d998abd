use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::constants;

#[derive(Error, Debug)]
pub enum ClinicError {
    #[error("not found: {0}")]
    NotFound(&'static str),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("validation failed for '{field}': {code}")]
    Validation { field: &'static str, code: &'static str },

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error("conflict: {0}")]
    Conflict(&'static str),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parsing failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ClinicError>;

impl ClinicError {
    pub fn bad_request(code: &str) -> Self {
        ClinicError::BadRequest(code.to_string())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        ClinicError::Storage { message: message.into() }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ClinicError::NotFound(_) => StatusCode::NOT_FOUND,
            ClinicError::BadRequest(_) | ClinicError::Validation { .. } => StatusCode::BAD_REQUEST,
            ClinicError::Unauthorized => StatusCode::UNAUTHORIZED,
            ClinicError::Forbidden(_) => StatusCode::FORBIDDEN,
            ClinicError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message exposed to clients. Internal failures collapse to a
    /// single code; their details only go to the log.
    pub fn public_message(&self) -> String {
        match self {
            ClinicError::NotFound(code) | ClinicError::Forbidden(code) | ClinicError::Conflict(code) => {
                code.to_string()
            }
            ClinicError::BadRequest(message) => message.clone(),
            ClinicError::Validation { field, code } => format!("{field}: {code}"),
            ClinicError::Unauthorized => constants::UNAUTHORIZED.to_string(),
            _ => constants::SOMETHING_WENT_WRONG.to_string(),
        }
    }
}

macro_rules! rejection_is_bad_request {
    ($($rejection:ty),*) => {
        $(
            impl From<$rejection> for ClinicError {
                fn from(rejection: $rejection) -> Self {
                    ClinicError::BadRequest(rejection.body_text())
                }
            }
        )*
    };
}

rejection_is_bad_request!(JsonRejection, QueryRejection, PathRejection);

impl IntoResponse for ClinicError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "status_code": status.as_u16(),
            "error": status.canonical_reason().unwrap_or("Error"),
            "message": self.public_message(),
        }));

        (status, body).into_response()
    }
}
