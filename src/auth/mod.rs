//! Password hashing and token issuance.

pub mod extract;

pub use extract::{Auth, AuthDoctor, AuthPatient, AuthStaff, RefreshAuth, RefreshDoctor, RefreshPatient, RefreshStaff};

use crate::config::AuthConfig;
use crate::constants;
use crate::domain::{Account, Actor, Staff, StaffRole};
use crate::error::{ClinicError, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Algorithm, Argon2, Params, PasswordHash, PasswordVerifier, Version,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims for JWT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub username: String,
    pub actor: Actor,
    #[serde(default)]
    pub roles: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Issues and verifies the HS256 tokens of every actor class, and hashes
/// the secrets stored with accounts.
#[derive(Clone)]
pub struct TokenService {
    config: Arc<AuthConfig>,
}

impl TokenService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config: Arc::new(config) }
    }

    fn secret(&self, actor: Actor, kind: TokenKind) -> &[u8] {
        let secrets = self.config.secrets(actor);
        match kind {
            TokenKind::Access => secrets.access_secret.as_bytes(),
            TokenKind::Refresh => secrets.refresh_secret.as_bytes(),
        }
    }

    pub fn issue<A: Account>(&self, account: &A, kind: TokenKind) -> Result<String> {
        let id = account
            .id()
            .ok_or_else(|| ClinicError::Internal("cannot issue a token for an unsaved account".to_string()))?;

        let now = Utc::now().timestamp();
        let ttl = match kind {
            TokenKind::Access => self.config.access_token_ttl_secs,
            TokenKind::Refresh => self.config.refresh_token_ttl_secs,
        };

        let claims = Claims {
            sub: id,
            email: account.email().to_string(),
            username: account.username().to_string(),
            actor: A::ACTOR,
            roles: account.roles(),
            exp: now + ttl,
            iat: now,
        };

        let key = EncodingKey::from_secret(self.secret(A::ACTOR, kind));
        Ok(encode(&Header::default(), &claims, &key)?)
    }

    /// Decodes `token` with the secret of `actor`/`kind`. Any failure,
    /// including a token minted for another actor class, is `Unauthorized`.
    pub fn verify(&self, token: &str, actor: Actor, kind: TokenKind) -> Result<Claims> {
        let key = DecodingKey::from_secret(self.secret(actor, kind));
        let data = decode::<Claims>(token, &key, &Validation::default()).map_err(|e| {
            debug!("Rejected {} {:?} token: {}", actor, kind, e);
            ClinicError::Unauthorized
        })?;

        if data.claims.actor != actor {
            debug!("Rejected token for {} presented on {} route", data.claims.actor, actor);
            return Err(ClinicError::Unauthorized);
        }
        Ok(data.claims)
    }

    fn argon2(&self) -> Result<Argon2<'static>> {
        let params = Params::new(self.config.hash_memory_kib, self.config.hash_iterations, 1, None)
            .map_err(|e| ClinicError::PasswordHash(format!("invalid argon2 parameters: {e}")))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    fn hash_now(&self, secret: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()?
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ClinicError::PasswordHash(format!("Failed to hash with Argon2: {e}")))
    }

    fn verify_now(secret: &str, hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| ClinicError::PasswordHash(format!("Failed to parse Argon2 hash: {e}")))?;
        match Argon2::default().verify_password(secret.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(ClinicError::PasswordHash(format!("Failed to verify Argon2 hash: {e}"))),
        }
    }

    /// Hashes a password (or refresh token) into a PHC string on the
    /// blocking pool
    pub async fn hash(&self, secret: &str) -> Result<String> {
        let tokens = self.clone();
        let secret = secret.to_string();
        tokio::task::spawn_blocking(move || tokens.hash_now(&secret))
            .await
            .map_err(|e| ClinicError::Internal(format!("password hashing task failed: {e}")))?
    }

    /// Checks `secret` against a stored PHC string. Parameters come from the
    /// hash itself.
    pub async fn verify_hash(&self, secret: &str, hash: &str) -> Result<bool> {
        let secret = secret.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || Self::verify_now(&secret, &hash))
            .await
            .map_err(|e| ClinicError::Internal(format!("password verification task failed: {e}")))?
    }
}

/// Fails with 403 unless `staff` holds `role`. `super_admin` passes every check.
pub fn require_role(staff: &Staff, role: StaffRole) -> Result<()> {
    if staff.has_role(role) {
        Ok(())
    } else {
        Err(ClinicError::Forbidden(constants::YOU_ARE_NOT_AUTHORIZED_TO_PERFORM_THIS_ACTION))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Doctor;

    fn test_auth_config() -> AuthConfig {
        crate::config::test_config().auth
    }

    fn doctor() -> Doctor {
        let now = Utc::now();
        Doctor {
            id: Some(Uuid::new_v4()),
            username: "house".to_string(),
            email: "house@clinic.org".to_string(),
            password: String::new(),
            first_name: "Gregory".to_string(),
            last_name: "House".to_string(),
            phone_number: "+15555550100".to_string(),
            specialization: "Diagnostics".to_string(),
            patients: vec![],
            appointments: vec![],
            refresh_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let tokens = TokenService::new(test_auth_config());
        let hash = tokens.hash("secret123").await.unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(tokens.verify_hash("secret123", &hash).await.unwrap());
        assert!(!tokens.verify_hash("secret124", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_hash_is_an_error() {
        let tokens = TokenService::new(test_auth_config());
        assert!(tokens.verify_hash("secret123", "not-a-phc-string").await.is_err());
    }

    #[test]
    fn test_token_round_trip() {
        let tokens = TokenService::new(test_auth_config());
        let doctor = doctor();
        let token = tokens.issue(&doctor, TokenKind::Access).unwrap();

        let claims = tokens.verify(&token, Actor::Doctor, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, doctor.id.unwrap());
        assert_eq!(claims.username, "house");
        assert_eq!(claims.actor, Actor::Doctor);
    }

    #[test]
    fn test_token_rejected_across_actor_classes_and_kinds() {
        let tokens = TokenService::new(test_auth_config());
        let token = tokens.issue(&doctor(), TokenKind::Access).unwrap();

        assert!(matches!(
            tokens.verify(&token, Actor::Patient, TokenKind::Access),
            Err(ClinicError::Unauthorized)
        ));
        assert!(matches!(
            tokens.verify(&token, Actor::Doctor, TokenKind::Refresh),
            Err(ClinicError::Unauthorized)
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let config = AuthConfig { access_token_ttl_secs: -120, ..test_auth_config() };
        let tokens = TokenService::new(config);
        let token = tokens.issue(&doctor(), TokenKind::Access).unwrap();
        assert!(tokens.verify(&token, Actor::Doctor, TokenKind::Access).is_err());
    }

    #[test]
    fn test_require_role() {
        let now = Utc::now();
        let mut staff = Staff {
            id: None,
            username: "frontdesk".to_string(),
            email: "desk@clinic.org".to_string(),
            password: String::new(),
            roles: vec![StaffRole::Staff],
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        assert!(require_role(&staff, StaffRole::Staff).is_ok());
        assert!(matches!(require_role(&staff, StaffRole::Admin), Err(ClinicError::Forbidden(_))));

        staff.roles = vec![StaffRole::SuperAdmin];
        assert!(require_role(&staff, StaffRole::Admin).is_ok());
    }
}
