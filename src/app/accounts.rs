use crate::app::{DoctorService, ModuleRegistry, PatientService, StaffService};
use crate::auth::{TokenKind, TokenService};
use crate::constants;
use crate::domain::{Account, Doctor, Patient, Staff};
use crate::error::{ClinicError, Result};
use crate::metrics::AccountMetrics;
use crate::repository::Repository;
use crate::types::ResetPasswordRequest;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
pub struct LoginResponse<A> {
    pub access_token: String,
    pub refresh_token: String,
    pub user: A,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Login, logout, token refresh and password reset for one actor class
pub struct AccountWorkflow<A: Account> {
    repo: Repository<A>,
    tokens: TokenService,
}

impl<A: Account> AccountWorkflow<A> {
    pub fn new(repo: Repository<A>, tokens: TokenService) -> Self {
        Self { repo, tokens }
    }

    /// Unknown accounts and wrong passwords fail with the same code
    pub async fn login(&self, identifier: &str, password: &str) -> Result<LoginResponse<A>> {
        let actor = A::ACTOR.as_str();
        let found = self.repo.find_one(|a| a.matches_login(identifier)).await?;

        let Some(mut account) = found else {
            AccountMetrics::record_login_failure(actor);
            return Err(ClinicError::NotFound(constants::USER_NOT_FOUND));
        };
        if !self.tokens.verify_hash(password, account.password_hash()).await? {
            AccountMetrics::record_login_failure(actor);
            warn!("Rejected {} login for {}: bad password", actor, identifier);
            return Err(ClinicError::NotFound(constants::INVALID_PASSWORD));
        }

        let access_token = self.tokens.issue(&account, TokenKind::Access)?;
        let refresh_token = self.tokens.issue(&account, TokenKind::Refresh)?;
        account.set_refresh_token_hash(Some(self.tokens.hash(&refresh_token).await?));
        self.repo.update(&mut account).await?;

        AccountMetrics::record_login(actor);
        info!("{} {} logged in", actor, account.username());
        Ok(LoginResponse { access_token, refresh_token, user: account })
    }

    pub async fn logout(&self, mut account: A) -> Result<()> {
        account.set_refresh_token_hash(None);
        self.repo.update(&mut account).await?;
        info!("{} {} logged out", A::ACTOR, account.username());
        Ok(())
    }

    /// Issues a new access token if `presented` is the refresh token last
    /// handed out to this account.
    pub async fn refresh(&self, account: &A, presented: &str) -> Result<RefreshResponse> {
        let Some(stored) = account.refresh_token_hash() else {
            return Err(ClinicError::Unauthorized);
        };
        if !self.tokens.verify_hash(presented, stored).await? {
            warn!("Refresh token mismatch for {} {}", A::ACTOR, account.username());
            return Err(ClinicError::Unauthorized);
        }

        let access_token = self.tokens.issue(account, TokenKind::Access)?;
        Ok(RefreshResponse { access_token })
    }

    pub async fn reset_password(&self, mut account: A, request: &ResetPasswordRequest) -> Result<A> {
        request.validate()?;
        if !request.email.trim().eq_ignore_ascii_case(account.email()) {
            return Err(ClinicError::Forbidden(constants::YOU_ARE_NOT_AUTHORIZED_TO_PERFORM_THIS_ACTION));
        }
        if self.tokens.verify_hash(&request.password, account.password_hash()).await? {
            return Err(ClinicError::bad_request(constants::PASSWORD_HAS_BEEN_USED_RECENTLY));
        }

        account.set_password_hash(self.tokens.hash(&request.password).await?);
        self.repo.update(&mut account).await?;
        info!("{} {} reset their password", A::ACTOR, account.username());
        Ok(account)
    }
}

/// Maps an account type to the service that owns its workflow, so account
/// routes can be written once for every actor class.
pub trait AccountArea: Account {
    type Service: Send + Sync + 'static;

    fn service(registry: &ModuleRegistry) -> Arc<Self::Service>;
    fn workflow(service: &Self::Service) -> &AccountWorkflow<Self>;
}

impl AccountArea for Staff {
    type Service = StaffService;

    fn service(registry: &ModuleRegistry) -> Arc<StaffService> {
        registry.staff()
    }

    fn workflow(service: &StaffService) -> &AccountWorkflow<Self> {
        service.account()
    }
}

impl AccountArea for Doctor {
    type Service = DoctorService;

    fn service(registry: &ModuleRegistry) -> Arc<DoctorService> {
        registry.doctors()
    }

    fn workflow(service: &DoctorService) -> &AccountWorkflow<Self> {
        service.account()
    }
}

impl AccountArea for Patient {
    type Service = PatientService;

    fn service(registry: &ModuleRegistry) -> Arc<PatientService> {
        registry.patients()
    }

    fn workflow(service: &PatientService) -> &AccountWorkflow<Self> {
        service.account()
    }
}
