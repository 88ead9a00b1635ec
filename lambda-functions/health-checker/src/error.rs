//! Error types for the health checker

use thiserror::Error;

/// Result type alias using the health checker's error type
pub type Result<T> = std::result::Result<T, HealthCheckError>;

/// Failures while fetching database credentials from Secrets Manager
#[derive(Error, Debug)]
pub enum SecretError {
    #[error("Secret {0} not found")]
    NotFound(String),

    #[error("Access denied to Secrets Manager for secret {name}: {source}")]
    AccessDenied {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Secret {0} has no SecretString")]
    Empty(String),

    #[error("Secret payload is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Every way a health check cycle can fail
#[derive(Error, Debug)]
pub enum HealthCheckError {
    /// Invalid or unparsable configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Secret(#[from] SecretError),

    /// Connection or query failure against the audit database
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Metrics error: {0}")]
    Metrics(String),

    /// Malformed schedule expression or failed schedule lookup
    #[error("Schedule error: {0}")]
    Schedule(String),

    /// Schedule expression that cannot be extrapolated (cron, at, non-minute rates)
    #[error("Unsupported schedule expression: {0}")]
    UnsupportedSchedule(String),
}

impl HealthCheckError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn schedule(msg: impl Into<String>) -> Self {
        Self::Schedule(msg.into())
    }
}
