use crate::app::accounts::AccountWorkflow;
use crate::auth::TokenService;
use crate::config::SuperAdminConfig;
use crate::constants;
use crate::domain::{Staff, StaffRole};
use crate::error::{ClinicError, Result};
use crate::repository::Repository;
use crate::types::CreateStaffRequest;
use chrono::Utc;
use tracing::info;

pub struct StaffService {
    repo: Repository<Staff>,
    tokens: TokenService,
    account: AccountWorkflow<Staff>,
}

impl StaffService {
    pub fn new(repo: Repository<Staff>, tokens: TokenService) -> Self {
        let account = AccountWorkflow::new(repo.clone(), tokens.clone());
        Self { repo, tokens, account }
    }

    pub fn account(&self) -> &AccountWorkflow<Staff> {
        &self.account
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Staff>> {
        let email = email.trim().to_lowercase();
        self.repo.find_one(|s| s.email.to_lowercase() == email).await
    }

    pub async fn create(&self, request: CreateStaffRequest) -> Result<Staff> {
        request.validate()?;
        if self.find_by_email(&request.email).await?.is_some() {
            return Err(ClinicError::Conflict(constants::EMAIL_ALREADY_EXISTS));
        }

        let now = Utc::now();
        let mut staff = Staff {
            id: None,
            username: request.username.trim().to_string(),
            email: request.email.trim().to_lowercase(),
            password: self.tokens.hash(&request.password).await?,
            roles: request.roles,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        self.repo.create(&mut staff).await?;

        info!("Created staff member {} with roles {:?}", staff.email, staff.roles);
        Ok(staff)
    }

    /// Creates the configured super admin unless an account with that email
    /// already exists. Returns whether a record was written.
    pub async fn seed_super_admin(&self, config: &SuperAdminConfig) -> Result<bool> {
        let (Some(email), Some(password)) = (config.email.as_deref(), config.password.as_deref()) else {
            return Err(ClinicError::Config(
                "SUPER_ADMIN_EMAIL and SUPER_ADMIN_PASSWORD must be set to seed the super admin".to_string(),
            ));
        };

        if self.find_by_email(email).await?.is_some() {
            info!("Super admin {} already exists", email);
            return Ok(false);
        }

        let now = Utc::now();
        let mut admin = Staff {
            id: None,
            username: config.username.clone(),
            email: email.trim().to_lowercase(),
            password: self.tokens.hash(password).await?,
            roles: vec![StaffRole::SuperAdmin],
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        self.repo.create(&mut admin).await?;

        info!("Seeded super admin {}", admin.email);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use crate::app::ModuleRegistry;
    use crate::config::test_config;
    use crate::constants;
    use crate::domain::StaffRole;
    use crate::error::ClinicError;
    use crate::storage::InMemoryStore;
    use crate::types::{CreateStaffRequest, ResetPasswordRequest};
    use std::sync::Arc;

    fn staff_request(email: &str) -> CreateStaffRequest {
        CreateStaffRequest {
            username: "frontdesk".to_string(),
            email: email.to_string(),
            password: "desk1234".to_string(),
            confirm_password: "desk1234".to_string(),
            roles: vec![StaffRole::Staff],
        }
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let config = test_config();
        let registry = ModuleRegistry::new(Arc::new(InMemoryStore::new()), config.clone());
        let staff = registry.staff();

        assert!(staff.seed_super_admin(&config.super_admin).await.unwrap());
        assert!(!staff.seed_super_admin(&config.super_admin).await.unwrap());

        let admin = staff.find_by_email("root@clinic.test").await.unwrap().unwrap();
        assert_eq!(admin.roles, vec![StaffRole::SuperAdmin]);
        assert_eq!(admin.username, "superadmin");
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let registry = ModuleRegistry::new(Arc::new(InMemoryStore::new()), test_config());
        let staff = registry.staff();

        staff.create(staff_request("desk@clinic.org")).await.unwrap();
        let err = staff.create(staff_request("Desk@Clinic.org")).await.unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(constants::EMAIL_ALREADY_EXISTS)));
    }

    #[tokio::test]
    async fn test_email_letter_case_is_ignored() {
        let registry = ModuleRegistry::new(Arc::new(InMemoryStore::new()), test_config());
        let staff = registry.staff();

        let nurse = staff.create(staff_request("Nurse@Clinic.org")).await.unwrap();
        assert_eq!(nurse.email, "nurse@clinic.org");
        assert!(staff.create(staff_request("nurse@clinic.org")).await.is_err());

        assert!(staff.account().login("nurse@clinic.org", "desk1234").await.is_ok());
        assert!(staff.account().login("NURSE@clinic.ORG", "desk1234").await.is_ok());
    }

    #[tokio::test]
    async fn test_login_refresh_and_logout() {
        let registry = ModuleRegistry::new(Arc::new(InMemoryStore::new()), test_config());
        let staff = registry.staff();
        staff.create(staff_request("desk@clinic.org")).await.unwrap();

        let wrong = staff.account().login("desk@clinic.org", "nope12345").await.unwrap_err();
        assert!(matches!(wrong, ClinicError::NotFound(constants::USER_NOT_FOUND)));
        let unknown = staff.account().login("who@clinic.org", "desk1234").await.unwrap_err();
        assert!(matches!(unknown, ClinicError::NotFound(constants::USER_NOT_FOUND)));

        let login = staff.account().login("desk@clinic.org", "desk1234").await.unwrap();
        assert!(login.user.refresh_token.is_some());

        let refreshed = staff.account().refresh(&login.user, &login.refresh_token).await.unwrap();
        assert!(!refreshed.access_token.is_empty());
        assert!(staff.account().refresh(&login.user, "forged").await.is_err());

        staff.account().logout(login.user.clone()).await.unwrap();
        let after = staff.find_by_email("desk@clinic.org").await.unwrap().unwrap();
        assert!(after.refresh_token.is_none());
        assert!(matches!(
            staff.account().refresh(&after, &login.refresh_token).await,
            Err(ClinicError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_reset_password_rules() {
        let registry = ModuleRegistry::new(Arc::new(InMemoryStore::new()), test_config());
        let staff = registry.staff();
        let member = staff.create(staff_request("desk@clinic.org")).await.unwrap();

        let reuse = ResetPasswordRequest {
            email: "desk@clinic.org".to_string(),
            password: "desk1234".to_string(),
            confirm_password: "desk1234".to_string(),
        };
        let err = staff.account().reset_password(member.clone(), &reuse).await.unwrap_err();
        assert_eq!(err.public_message(), constants::PASSWORD_HAS_BEEN_USED_RECENTLY);

        let other_email = ResetPasswordRequest { email: "boss@clinic.org".to_string(), ..reuse.clone() };
        let err = staff.account().reset_password(member.clone(), &other_email).await.unwrap_err();
        assert!(matches!(err, ClinicError::Forbidden(_)));

        let fresh = ResetPasswordRequest {
            password: "newpass99".to_string(),
            confirm_password: "newpass99".to_string(),
            ..reuse
        };
        staff.account().reset_password(member, &fresh).await.unwrap();
        assert!(staff.account().login("desk@clinic.org", "newpass99").await.is_ok());
    }
}
