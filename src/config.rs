//! Configuration types, built from environment variables and injected into
//! each component at construction. No process-global state.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default sent-folder candidates, tried in order. Gmail names its sent
/// folder differently from everyone else.
const DEFAULT_SENT_FOLDERS: &[&str] = &["Sent", "[Gmail]/Sent Mail", "Sent Items"];

/// Default inbox-folder candidates.
const DEFAULT_INBOX_FOLDERS: &[&str] = &["INBOX"];

/// Full run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub imap: ImapConfig,
    pub retry: RetryConfig,
    pub enrich: EnrichConfig,
    /// Trailing window: how far back to look for sent messages.
    pub window_days: i64,
    /// Where the JSONL report is written.
    pub report_path: String,
}

/// IMAP connection and folder configuration.
#[derive(Debug, Clone)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    /// Sent-folder candidate names, tried in order.
    pub sent_folders: Vec<String>,
    /// Inbox-folder candidate names, tried in order.
    pub inbox_folders: Vec<String>,
    /// Per-read socket timeout.
    pub io_timeout: Duration,
}

/// Retry behaviour for the initial connection.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            backoff_factor: 2.0,
        }
    }
}

/// Enrichment endpoint configuration.
#[derive(Debug, Clone)]
pub struct EnrichConfig {
    pub base_url: String,
    pub api_key: SecretString,
    pub model: String,
    pub timeout: Duration,
    /// Field names the enricher is asked to extract, in order.
    pub target_fields: Vec<String>,
    /// Field that receives the raw response when it cannot be parsed.
    pub catch_all_field: String,
}

impl Config {
    /// Build config from environment variables.
    ///
    /// `IMAP_HOST`, `IMAP_USERNAME`, `IMAP_PASSWORD` and `ENRICH_BASE_URL`
    /// are required; everything else has defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let imap = ImapConfig {
            host: require_env("IMAP_HOST")?,
            port: parse_env("IMAP_PORT", 993)?,
            username: require_env("IMAP_USERNAME")?,
            password: SecretString::from(require_env("IMAP_PASSWORD")?),
            sent_folders: list_env("IMAP_SENT_FOLDERS", DEFAULT_SENT_FOLDERS),
            inbox_folders: list_env("IMAP_INBOX_FOLDERS", DEFAULT_INBOX_FOLDERS),
            io_timeout: Duration::from_secs(parse_env("IMAP_IO_TIMEOUT_SECS", 30)?),
        };

        let retry = RetryConfig {
            max_attempts: parse_env("RETRY_MAX_ATTEMPTS", 3)?,
            base_delay: Duration::from_secs(parse_env("RETRY_BASE_DELAY_SECS", 2)?),
            backoff_factor: parse_env("RETRY_BACKOFF_FACTOR", 2.0)?,
        };

        let enrich = EnrichConfig {
            base_url: require_env("ENRICH_BASE_URL")?,
            api_key: SecretString::from(std::env::var("ENRICH_API_KEY").unwrap_or_default()),
            model: std::env::var("ENRICH_MODEL").unwrap_or_else(|_| "local-model".to_string()),
            timeout: Duration::from_secs(parse_env("ENRICH_TIMEOUT_SECS", 30)?),
            target_fields: list_env("ENRICH_FIELDS", &["price", "availability", "comment"]),
            catch_all_field: std::env::var("ENRICH_CATCH_ALL_FIELD")
                .unwrap_or_else(|_| "comment".to_string()),
        };

        Ok(Self {
            imap,
            retry,
            enrich,
            window_days: parse_env("WINDOW_DAYS", 30)?,
            report_path: std::env::var("REPORT_PATH")
                .unwrap_or_else(|_| "./replies.jsonl".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("cannot parse {raw:?}"),
        }),
        Err(_) => Ok(default),
    }
}

fn list_env(key: &str, default: &[&str]) -> Vec<String> {
    let configured: Vec<String> = std::env::var(key)
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if configured.is_empty() {
        default.iter().map(|s| s.to_string()).collect()
    } else {
        configured
    }
}
