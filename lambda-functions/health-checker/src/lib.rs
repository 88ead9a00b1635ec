pub mod config;
pub mod database;
pub mod error;
pub mod evaluator;
pub mod metrics;
pub mod models;
pub mod notifier;
pub mod schedule;
pub mod secrets;
pub mod service;

pub use config::Config;
pub use database::{AuditStore, MySqlAuditStore};
pub use error::{HealthCheckError, Result, SecretError};
pub use metrics::{CloudWatchMetrics, MetricsPublisher};
pub use models::{AuditRow, CheckResult, ErrorEntry, ErrorReason, RunStatus, Verdict};
pub use notifier::{Alert, Notifier, SnsNotifier};
pub use schedule::{EventBridgeScheduleSource, ScheduleExpression, ScheduleSource};
pub use secrets::{DbCredentials, SecretProvider, SecretsManagerProvider};
pub use service::{HealthCheckService, Request, Response};
