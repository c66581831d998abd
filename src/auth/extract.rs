//! Axum extractors that turn a bearer token into the authenticated account.

use crate::app::ModuleRegistry;
use crate::auth::TokenKind;
use crate::domain::{Account, Doctor, Patient, Staff};
use crate::error::{ClinicError, Result};
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use std::sync::Arc;
use tracing::debug;

fn bearer_token(parts: &Parts) -> Result<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(ClinicError::Unauthorized)
}

async fn authenticate<A: Account>(parts: &Parts, registry: &ModuleRegistry, kind: TokenKind) -> Result<(A, String)> {
    let token = bearer_token(parts)?;
    let claims = registry.tokens().verify(token, A::ACTOR, kind)?;

    // The account may have been deleted after the token was issued
    let Some(account) = registry.repository::<A>().find_by_id(claims.sub).await? else {
        debug!("Token subject {} no longer exists", claims.sub);
        return Err(ClinicError::Unauthorized);
    };
    Ok((account, token.to_string()))
}

/// Account authenticated by an access token of its own actor class
pub struct Auth<A>(pub A);

#[async_trait]
impl<A: Account> FromRequestParts<Arc<ModuleRegistry>> for Auth<A> {
    type Rejection = ClinicError;

    async fn from_request_parts(parts: &mut Parts, registry: &Arc<ModuleRegistry>) -> Result<Self> {
        let (account, _) = authenticate(parts, registry, TokenKind::Access).await?;
        Ok(Auth(account))
    }
}

/// Account authenticated by a refresh token, with the raw token kept so it
/// can be compared against the stored hash.
pub struct RefreshAuth<A> {
    pub account: A,
    pub token: String,
}

#[async_trait]
impl<A: Account> FromRequestParts<Arc<ModuleRegistry>> for RefreshAuth<A> {
    type Rejection = ClinicError;

    async fn from_request_parts(parts: &mut Parts, registry: &Arc<ModuleRegistry>) -> Result<Self> {
        let (account, token) = authenticate(parts, registry, TokenKind::Refresh).await?;
        Ok(RefreshAuth { account, token })
    }
}

pub type AuthStaff = Auth<Staff>;
pub type AuthDoctor = Auth<Doctor>;
pub type AuthPatient = Auth<Patient>;
pub type RefreshStaff = RefreshAuth<Staff>;
pub type RefreshDoctor = RefreshAuth<Doctor>;
pub type RefreshPatient = RefreshAuth<Patient>;
