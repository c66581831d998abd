use crate::domain::Actor;
use crate::error::{ClinicError, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use tracing::info;

/// Secrets shorter than this are rejected at startup
pub const MIN_SECRET_LEN: usize = 32;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub super_admin: SuperAdminConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 3000 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: String,
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { dir: "logs".to_string(), file_name: "clinic.log".to_string() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus exporter port. No exporter is installed when unset.
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// libSQL file path or remote URL. The in-memory store is used when unset.
    pub url: Option<String>,
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TokenSecrets {
    pub access_secret: String,
    pub refresh_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    /// Argon2 memory cost in KiB
    pub hash_memory_kib: u32,
    pub hash_iterations: u32,
    pub administrative: TokenSecrets,
    pub doctor: TokenSecrets,
    pub patient: TokenSecrets,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_ttl_secs: 60 * 60,
            refresh_token_ttl_secs: 60 * 60 * 24 * 7,
            hash_memory_kib: 19 * 1024,
            hash_iterations: 2,
            administrative: TokenSecrets::default(),
            doctor: TokenSecrets::default(),
            patient: TokenSecrets::default(),
        }
    }
}

impl AuthConfig {
    pub fn secrets(&self, actor: Actor) -> &TokenSecrets {
        match actor {
            Actor::Administrative => &self.administrative,
            Actor::Doctor => &self.doctor,
            Actor::Patient => &self.patient,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SuperAdminConfig {
    pub username: String,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Default for SuperAdminConfig {
    fn default() -> Self {
        Self { username: "superadmin".to_string(), email: None, password: None }
    }
}

impl Config {
    /// Loads `.env`, then the TOML file named by `CLINIC_CONFIG` (or
    /// `config.toml` if present), then applies environment overrides.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let config_path = env::var("CLINIC_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = if Path::new(&config_path).exists() {
            info!("Loading configuration from {}", config_path);
            let content = fs::read_to_string(&config_path).map_err(|e| {
                ClinicError::Config(format!("Failed to read config file '{}': {}", config_path, e))
            })?;
            Self::from_toml_str(&content)?
        } else {
            Config::default()
        };

        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Overrides file values with whatever `lookup` returns for the
    /// well-known variable names.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let set = |target: &mut String, key: &str| {
            if let Some(value) = lookup(key) {
                *target = value;
            }
        };

        set(&mut self.server.host, "HOST");
        set(&mut self.logging.dir, "LOG_DIR");
        set(&mut self.auth.administrative.access_secret, "ACCESS_TOKEN_SECRET_BACKOFFICE");
        set(&mut self.auth.administrative.refresh_secret, "REFRESH_TOKEN_SECRET_BACKOFFICE");
        set(&mut self.auth.doctor.access_secret, "ACCESS_TOKEN_SECRET_DOCTOR");
        set(&mut self.auth.doctor.refresh_secret, "REFRESH_TOKEN_SECRET_DOCTOR");
        set(&mut self.auth.patient.access_secret, "ACCESS_TOKEN_SECRET_PATIENT");
        set(&mut self.auth.patient.refresh_secret, "REFRESH_TOKEN_SECRET_PATIENT");
        set(&mut self.super_admin.username, "SUPER_ADMIN_USERNAME");

        if let Some(port) = lookup("PORT") {
            self.server.port = parse_number("PORT", &port)?;
        }
        if let Some(port) = lookup("METRICS_PORT") {
            self.metrics.port = Some(parse_number("METRICS_PORT", &port)?);
        }
        if let Some(ttl) = lookup("ACCESS_TOKEN_EXPIRATION_TIME") {
            self.auth.access_token_ttl_secs = parse_number("ACCESS_TOKEN_EXPIRATION_TIME", &ttl)?;
        }
        if let Some(ttl) = lookup("REFRESH_TOKEN_EXPIRATION_TIME") {
            self.auth.refresh_token_ttl_secs = parse_number("REFRESH_TOKEN_EXPIRATION_TIME", &ttl)?;
        }
        if let Some(memory) = lookup("HASH_MEMORY_KIB") {
            self.auth.hash_memory_kib = parse_number("HASH_MEMORY_KIB", &memory)?;
        }
        if let Some(iterations) = lookup("HASH_ITERATIONS") {
            self.auth.hash_iterations = parse_number("HASH_ITERATIONS", &iterations)?;
        }
        if let Some(url) = lookup("DATABASE_URL").or_else(|| lookup("LIBSQL_URL")) {
            self.database.url = Some(url);
        }
        if let Some(token) = lookup("LIBSQL_AUTH_TOKEN") {
            self.database.auth_token = Some(token);
        }
        if let Some(email) = lookup("SUPER_ADMIN_EMAIL") {
            self.super_admin.email = Some(email);
        }
        if let Some(password) = lookup("SUPER_ADMIN_PASSWORD") {
            self.super_admin.password = Some(password);
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        for actor in [Actor::Administrative, Actor::Doctor, Actor::Patient] {
            let secrets = self.auth.secrets(actor);
            if secrets.access_secret.len() < MIN_SECRET_LEN || secrets.refresh_secret.len() < MIN_SECRET_LEN {
                return Err(ClinicError::Config(format!(
                    "{} token secrets must be at least {} characters",
                    actor, MIN_SECRET_LEN
                )));
            }
            if secrets.access_secret == secrets.refresh_secret {
                return Err(ClinicError::Config(format!(
                    "{} access and refresh secrets must differ",
                    actor
                )));
            }
        }

        if self.auth.access_token_ttl_secs <= 0 || self.auth.refresh_token_ttl_secs <= 0 {
            return Err(ClinicError::Config("token lifetimes must be positive".to_string()));
        }

        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ClinicError::Config(format!("{key} must be a number, got '{value}'")))
}

/// Valid configuration with cheap hashing for unit tests
#[cfg(test)]
pub(crate) fn test_config() -> Config {
    let secrets = |name: &str| TokenSecrets {
        access_secret: format!("{name}-access-secret-for-unit-tests-only"),
        refresh_secret: format!("{name}-refresh-secret-for-unit-tests-only"),
    };
    Config {
        auth: AuthConfig {
            hash_memory_kib: 1024,
            hash_iterations: 1,
            administrative: secrets("administrative"),
            doctor: secrets("doctor"),
            patient: secrets("patient"),
            ..AuthConfig::default()
        },
        super_admin: SuperAdminConfig {
            email: Some("root@clinic.test".to_string()),
            password: Some("rootpass123".to_string()),
            ..SuperAdminConfig::default()
        },
        ..Config::default()
    }
}
