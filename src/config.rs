//! Runtime configuration loaded from the environment.
//!
//! `.env` files are read by `main` through `dotenvy` before this runs, so the
//! same variables work for local development and deployment.

use url::Url;
use uuid::Uuid;

/// Fixed identity the ledger grants unrestricted reads to when test mode is on.
pub const DEFAULT_TEST_USER_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Application configuration.
///
/// `Debug` is implemented by hand so the service keys never reach the log.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    /// Base URL of the hosted identity service (GoTrue compatible).
    pub auth_url: Url,
    pub auth_anon_key: String,
    /// Base URL of the shared public-data Hub.
    pub hub_url: Url,
    pub hub_api_key: String,
    /// Timeout applied to every outbound HTTP call.
    pub http_timeout_secs: u64,
    pub test_mode: bool,
    pub test_user_id: Uuid,
    pub audit_retention_days: i32,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &"[REDACTED]")
            .field("bind_addr", &self.bind_addr)
            .field("db_max_connections", &self.db_max_connections)
            .field("auth_url", &self.auth_url)
            .field("auth_anon_key", &"[REDACTED]")
            .field("hub_url", &self.hub_url)
            .field("hub_api_key", &"[REDACTED]")
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("test_mode", &self.test_mode)
            .field("test_user_id", &self.test_user_id)
            .field("audit_retention_days", &self.audit_retention_days)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `DATABASE_URL` (required)
    /// - `BIND_ADDR` (default: `127.0.0.1:8080`)
    /// - `DB_MAX_CONNECTIONS` (default: 8)
    /// - `AUTH_URL` (required), `AUTH_ANON_KEY` (required)
    /// - `HUB_API_URL` (default: `http://localhost:3722`), `HUB_API_KEY` (default: empty)
    /// - `HUB_TIMEOUT_SECS` (default: 30)
    /// - `LEDGER_TEST_MODE` (default: false), `LEDGER_TEST_USER_ID`
    /// - `AUDIT_RETENTION_DAYS` (default: 365)
    pub fn from_env() -> Result<Self, ConfigError> {
        let test_user_id = match std::env::var("LEDGER_TEST_USER_ID") {
            Ok(raw) => Uuid::parse_str(raw.trim())
                .map_err(|e| ConfigError::Invalid("LEDGER_TEST_USER_ID".to_string(), e.to_string()))?,
            Err(_) => default_test_user_id(),
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            db_max_connections: env_parsed("DB_MAX_CONNECTIONS", 8),
            auth_url: parse_url("AUTH_URL", &required("AUTH_URL")?)?,
            auth_anon_key: required("AUTH_ANON_KEY")?,
            hub_url: env_url("HUB_API_URL", "http://localhost:3722")?,
            hub_api_key: std::env::var("HUB_API_KEY").unwrap_or_default(),
            http_timeout_secs: env_parsed("HUB_TIMEOUT_SECS", 30),
            test_mode: std::env::var("LEDGER_TEST_MODE")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            test_user_id,
            audit_retention_days: env_parsed("AUDIT_RETENTION_DAYS", 365),
        })
    }

    /// Configuration pointing at local mock servers, for tests.
    pub fn local_mock(auth_url: &str, hub_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: String::new(),
            bind_addr: "127.0.0.1:0".to_string(),
            db_max_connections: 2,
            auth_url: parse_url("auth", auth_url)?,
            auth_anon_key: "anon-key".to_string(),
            hub_url: parse_url("hub", hub_url)?,
            hub_api_key: "hub-key".to_string(),
            http_timeout_secs: 5,
            test_mode: false,
            test_user_id: default_test_user_id(),
            audit_retention_days: 365,
        })
    }

    /// The identity that bypasses owner filtering, if test mode is enabled.
    pub fn test_account(&self) -> Option<Uuid> {
        self.test_mode.then_some(self.test_user_id)
    }
}

fn default_test_user_id() -> Uuid {
    Uuid::parse_str(DEFAULT_TEST_USER_ID).unwrap_or(Uuid::nil())
}

fn required(var: &str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(var.to_string())),
    }
}

fn env_parsed<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    parse_url(var, &raw)
}

fn parse_url(var: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid(var.to_string(), e.to_string()))
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_mock_builds_valid_config() {
        let cfg = AppConfig::local_mock("http://127.0.0.1:9000", "http://127.0.0.1:9001").unwrap();
        assert_eq!(cfg.auth_url.as_str(), "http://127.0.0.1:9000/");
        assert_eq!(cfg.hub_url.as_str(), "http://127.0.0.1:9001/");
        assert_eq!(cfg.test_account(), None);
    }

    #[test]
    fn test_account_requires_test_mode() {
        let mut cfg = AppConfig::local_mock("http://a.test", "http://b.test").unwrap();
        cfg.test_mode = true;
        assert_eq!(cfg.test_account(), Some(default_test_user_id()));
    }

    #[test]
    fn env_url_uses_default_when_var_absent() {
        let url = env_url("NONEXISTENT_LEDGER_VAR_12345", "https://hub.example.com").unwrap();
        assert_eq!(url.as_str(), "https://hub.example.com/");
    }

    #[test]
    fn parse_url_rejects_garbage() {
        assert!(parse_url("HUB_API_URL", "not a url").is_err());
    }

    #[test]
    fn flags_accept_common_truthy_values() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" 1 "));
        assert!(parse_flag("YES"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn debug_redacts_keys() {
        let cfg = AppConfig::local_mock("http://a.test", "http://b.test").unwrap();
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("anon-key"));
        assert!(!rendered.contains("hub-key"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
