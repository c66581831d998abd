#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use clinic_backend::app::ModuleRegistry;
use clinic_backend::config::Config;
use clinic_backend::server::create_router;
use clinic_backend::storage::InMemoryStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const TEST_CONFIG: &str = r#"
[auth]
hash_memory_kib = 1024
hash_iterations = 1

[auth.administrative]
access_secret = "administrative-access-secret-for-integration"
refresh_secret = "administrative-refresh-secret-for-integration"

[auth.doctor]
access_secret = "doctor-access-secret-for-integration-tests"
refresh_secret = "doctor-refresh-secret-for-integration-tests"

[auth.patient]
access_secret = "patient-access-secret-for-integration-tests"
refresh_secret = "patient-refresh-secret-for-integration-tests"

[super_admin]
email = "root@clinic.test"
password = "rootpass123"
"#;

pub const ADMIN_EMAIL: &str = "root@clinic.test";
pub const ADMIN_PASSWORD: &str = "rootpass123";

/// The full router over an in-memory store, with the super admin seeded
pub struct TestApp {
    pub router: Router,
    pub registry: Arc<ModuleRegistry>,
}

impl TestApp {
    pub async fn new() -> anyhow::Result<Self> {
        let config = Config::from_toml_str(TEST_CONFIG)?;
        config.validate()?;

        let registry = ModuleRegistry::new(Arc::new(InMemoryStore::new()), config.clone());
        registry.staff().seed_super_admin(&config.super_admin).await?;

        Ok(Self { router: create_router(Arc::clone(&registry)), registry })
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> anyhow::Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
        Ok((status, value))
    }

    pub async fn get(&self, uri: &str, token: &str) -> anyhow::Result<(StatusCode, Value)> {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> anyhow::Result<(StatusCode, Value)> {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    /// Logs in and returns the whole response body
    pub async fn login(&self, namespace: &str, credentials: Value) -> anyhow::Result<Value> {
        let (status, body) = self
            .post(&format!("/api/v1/{namespace}/account/login"), None, credentials)
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "login to {namespace} failed with {status}: {body}");
        Ok(body)
    }

    pub async fn admin_token(&self) -> anyhow::Result<String> {
        let body = self
            .login("administrative", json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
            .await?;
        Ok(token(&body, "access_token"))
    }

    /// Registers a doctor through the admin API and returns their access token and id
    pub async fn doctor(&self, admin: &str, username: &str) -> anyhow::Result<(String, String)> {
        let (status, body) = self
            .post(
                "/api/v1/administrative/doctor/register",
                Some(admin),
                json!({
                    "username": username,
                    "email": format!("{username}@clinic.org"),
                    "password": "doctor123",
                    "confirm_password": "doctor123",
                    "first_name": "Lisa",
                    "last_name": "Cuddy",
                    "phone_number": "+16095550111",
                    "specialization": "Endocrinology"
                }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "doctor registration failed with {status}: {body}");

        let login = self
            .login("doctor", json!({ "username": username, "password": "doctor123" }))
            .await?;
        Ok((token(&login, "access_token"), token(&body, "id")))
    }

    /// Registers a patient through the admin API and returns their access token and id
    pub async fn patient(&self, admin: &str, username: &str) -> anyhow::Result<(String, String)> {
        let (status, body) = self
            .post(
                "/api/v1/administrative/patient/register",
                Some(admin),
                json!({
                    "username": username,
                    "email": format!("{username}@mail.org"),
                    "password": "patient123",
                    "confirm_password": "patient123",
                    "phone_number": "+16095550122",
                    "date_of_birth": "1988-09-14"
                }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "patient registration failed with {status}: {body}");

        let login = self
            .login("patient", json!({ "username": username, "password": "patient123" }))
            .await?;
        Ok((token(&login, "access_token"), token(&body, "id")))
    }
}

pub fn token(body: &Value, field: &str) -> String {
    body[field].as_str().unwrap_or_default().to_string()
}

/// True if any object nested in `value` carries a credential field
pub fn leaks_credentials(value: &Value) -> bool {
    match value {
        Value::Object(map) => {
            // Login bodies hand the raw refresh token back next to the access token
            let stored_token = map.contains_key("refresh_token") && !map.contains_key("access_token");
            map.contains_key("password") || stored_token || map.values().any(leaks_credentials)
        }
        Value::Array(items) => items.iter().any(leaks_credentials),
        _ => false,
    }
}
