//! HTTP handlers, one module per actor namespace.

pub mod account;
pub mod administrative;
pub mod doctor;
pub mod extract;
pub mod patient;
pub mod response;

pub use response::{Created, Sanitized};

use axum::response::IntoResponse;
use axum::Json;

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "clinic-backend",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
