//! Login, profile, logout, refresh and password reset, written once and
//! mounted under every actor namespace.

use crate::app::{AccountArea, ModuleRegistry};
use crate::auth::{Auth, RefreshAuth};
use crate::error::Result;
use crate::handlers::extract::Payload;
use crate::handlers::response::{public_json, Sanitized};
use crate::types::{LoginRequest, ResetPasswordRequest};
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

pub async fn login<A: AccountArea>(
    State(registry): State<Arc<ModuleRegistry>>,
    Payload(request): Payload<LoginRequest>,
) -> Result<Json<Value>> {
    let identifier = request.identifier(A::ACTOR)?;
    let service = A::service(&registry);
    let login = A::workflow(&service).login(identifier, &request.password).await?;

    // Only the account is sanitized; the raw refresh token goes back to the client
    Ok(Json(json!({
        "access_token": login.access_token,
        "refresh_token": login.refresh_token,
        "user": public_json(&login.user)?,
    })))
}

pub async fn profile<A: AccountArea>(Auth(account): Auth<A>) -> Sanitized<A> {
    Sanitized(account)
}

pub async fn logout<A: AccountArea>(
    State(registry): State<Arc<ModuleRegistry>>,
    Auth(account): Auth<A>,
) -> Result<Json<Value>> {
    let service = A::service(&registry);
    A::workflow(&service).logout(account).await?;
    Ok(Json(json!({ "message": "Logged out successfully" })))
}

pub async fn refresh<A: AccountArea>(
    State(registry): State<Arc<ModuleRegistry>>,
    auth: RefreshAuth<A>,
) -> Result<Json<Value>> {
    let service = A::service(&registry);
    let refreshed = A::workflow(&service).refresh(&auth.account, &auth.token).await?;
    Ok(Json(json!({ "access_token": refreshed.access_token })))
}

pub async fn reset_password<A: AccountArea>(
    State(registry): State<Arc<ModuleRegistry>>,
    Auth(account): Auth<A>,
    Payload(request): Payload<ResetPasswordRequest>,
) -> Result<Sanitized<A>> {
    let service = A::service(&registry);
    let account = A::workflow(&service).reset_password(account, &request).await?;
    Ok(Sanitized(account))
}

/// The account routes shared by every actor class
pub fn routes<A: AccountArea>() -> Router<Arc<ModuleRegistry>> {
    Router::new()
        .route("/login", post(login::<A>))
        .route("/profile", get(profile::<A>))
        .route("/logout", get(logout::<A>))
        .route("/refresh", get(refresh::<A>))
        .route("/reset-password", post(reset_password::<A>))
}
