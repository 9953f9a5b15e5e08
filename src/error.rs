//! Error types for reply-tracker.

/// Top-level error type for the run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Mailbox error: {0}")]
    Mail(#[from] MailError),

    #[error("Enrichment error: {0}")]
    Enrich(#[from] EnrichError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Mailbox-session errors, converted from raw protocol/IO failures at the
/// session boundary. Only the connection-level conditions are fatal to the
/// whole run; the resolver treats everything else as "this strategy found
/// nothing" and moves on.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Connection to {host} failed: {reason}")]
    Connection { host: String, reason: String },

    #[error("Authentication failed for {username}: {reason}")]
    AuthFailed { username: String, reason: String },

    #[error("None of the candidate folders exist: {tried}")]
    FolderNotFound { tried: String },

    #[error("Search failed: {0}")]
    Search(String),

    #[error("Failed to fetch message {id}: {reason}")]
    Fetch { id: u32, reason: String },
}

impl MailError {
    /// Whether this condition should abort the run. A lost connection
    /// cannot be searched around; everything else is per-item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MailError::Connection { .. }
                | MailError::AuthFailed { .. }
                | MailError::FolderNotFound { .. }
        )
    }
}

/// Enrichment endpoint errors.
#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    #[error("Enrichment request failed: {0}")]
    RequestFailed(String),

    #[error("Enrichment endpoint returned status {status}: {body}")]
    BadStatus { status: u16, body: String },
}

/// Report sink errors.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Failed to write report row: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the run.
pub type Result<T> = std::result::Result<T, Error>;
