use anyhow::{bail, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub storage_backend: StorageBackend,
    pub submission_cooldown_secs: u64,
    pub signup_code_ttl_hours: i64,
    pub reset_link_ttl_minutes: i64,
    pub session_ttl_hours: i64,
    pub session_idle_secs: u64,
    pub site_url: String,
    pub resend_api_key: Option<String>,
    pub mail_from: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let storage_backend = match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .to_lowercase()
            .as_str()
        {
            "postgres" => StorageBackend::Postgres,
            "memory" => StorageBackend::Memory,
            other => bail!("Unknown STORAGE_BACKEND '{}'", other),
        };

        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/quote_portal".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "your-secret-key".to_string()),
            storage_backend,
            submission_cooldown_secs: env::var("SUBMISSION_COOLDOWN_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,
            signup_code_ttl_hours: env::var("SIGNUP_CODE_TTL_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()?,
            reset_link_ttl_minutes: env::var("RESET_LINK_TTL_MINUTES")
                .unwrap_or_else(|_| "60".to_string())
                .parse()?,
            session_ttl_hours: env::var("SESSION_TTL_HOURS")
                .unwrap_or_else(|_| "168".to_string()) // 7 days
                .parse()?,
            session_idle_secs: env::var("SESSION_IDLE_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()?,
            site_url: env::var("SITE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            resend_api_key: env::var("RESEND_API_KEY").ok().filter(|key| !key.is_empty()),
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "Your Website <onboarding@resend.dev>".to_string()),
        })
    }

    /// Settings suitable for tests and local demos: in-memory storage, no mail delivery.
    pub fn for_memory() -> Self {
        Config {
            database_url: String::new(),
            port: 0,
            jwt_secret: "test-secret".to_string(),
            storage_backend: StorageBackend::Memory,
            submission_cooldown_secs: 10,
            signup_code_ttl_hours: 24,
            reset_link_ttl_minutes: 60,
            session_ttl_hours: 168,
            session_idle_secs: 3600,
            site_url: "http://localhost:3000".to_string(),
            resend_api_key: None,
            mail_from: "Your Website <onboarding@resend.dev>".to_string(),
        }
    }

    pub fn submission_cooldown(&self) -> Duration {
        Duration::from_secs(self.submission_cooldown_secs)
    }

    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }

    pub fn signup_code_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.signup_code_ttl_hours)
    }

    pub fn reset_link_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.reset_link_ttl_minutes)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_defaults_from_env() {
        env::remove_var("STORAGE_BACKEND");
        env::remove_var("SUBMISSION_COOLDOWN_SECS");
        env::remove_var("RESEND_API_KEY");

        let config = Config::from_env().unwrap();
        assert_eq!(config.storage_backend, StorageBackend::Postgres);
        assert_eq!(config.submission_cooldown(), Duration::from_secs(10));
        assert_eq!(config.signup_code_ttl(), chrono::Duration::hours(24));
        assert_eq!(config.reset_link_ttl(), chrono::Duration::hours(1));
        assert!(config.resend_api_key.is_none());
    }

    #[test]
    #[serial]
    fn test_memory_backend_and_overrides() {
        env::set_var("STORAGE_BACKEND", "Memory");
        env::set_var("SUBMISSION_COOLDOWN_SECS", "3");

        let config = Config::from_env().unwrap();
        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert_eq!(config.submission_cooldown(), Duration::from_secs(3));

        env::set_var("STORAGE_BACKEND", "sqlite");
        assert!(Config::from_env().is_err());

        env::remove_var("STORAGE_BACKEND");
        env::remove_var("SUBMISSION_COOLDOWN_SECS");
    }
}
