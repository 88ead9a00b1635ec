//! Runtime configuration, resolved once at cold start

use bon::Builder;
use serde::Serialize;

use crate::error::{HealthCheckError, Result};

pub const DEFAULT_ERROR_THRESHOLD: f64 = 0.8;
pub const DEFAULT_ALERT_TOPIC_ARN: &str = "arn:aws:sns:ap-southeast-2:542726313726:Email_Alerts";
pub const DEFAULT_DATABASE_SECRET: &str = "db_creds";
pub const DEFAULT_SCHEDULE_NAME: &str = "3_min_schedule";
pub const DEFAULT_POOL_SIZE: u32 = 4;
pub const DEFAULT_METRICS_NAMESPACE: &str = "HealthChecker";
pub const DEFAULT_SCHEDULE_TOLERANCE_SECS: i64 = 60;

fn default_functions() -> Vec<String> {
    vec![
        "ENWL_power_scraper".to_string(),
        "live_station_scraper".to_string(),
    ]
}

#[derive(Builder, Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    /// Lambda functions whose prior-day runs are audited, in check order
    #[builder(default = default_functions())]
    pub functions_to_check: Vec<String>,

    /// Error rate at or above which an alert is published
    #[builder(default = DEFAULT_ERROR_THRESHOLD)]
    pub error_threshold: f64,

    #[builder(into, default = DEFAULT_ALERT_TOPIC_ARN.to_string())]
    pub alert_topic_arn: String,

    #[builder(into, default = DEFAULT_DATABASE_SECRET.to_string())]
    pub database_secret: String,

    #[builder(into, default = DEFAULT_SCHEDULE_NAME.to_string())]
    pub schedule_name: String,

    #[builder(default = DEFAULT_POOL_SIZE)]
    pub db_pool_size: u32,

    #[builder(default = true)]
    pub publish_metrics: bool,

    #[builder(into, default = DEFAULT_METRICS_NAMESPACE.to_string())]
    pub metrics_namespace: String,

    /// Compare actual start times against the EventBridge rate expression
    #[builder(default = false)]
    pub schedule_check: bool,

    #[builder(default = DEFAULT_SCHEDULE_TOLERANCE_SECS)]
    pub schedule_tolerance_secs: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup. Unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let config = Self::builder()
            .maybe_functions_to_check(get("FUNCTIONS_TO_CHECK").map(|raw| parse_list(&raw)))
            .maybe_error_threshold(parse_opt(get("ERROR_THRESHOLD"), "ERROR_THRESHOLD")?)
            .maybe_alert_topic_arn(get("ALERT_TOPIC_ARN"))
            .maybe_database_secret(get("DATABASE_SECRET"))
            .maybe_schedule_name(get("SCHEDULE_NAME"))
            .maybe_db_pool_size(parse_opt(get("DB_POOL_SIZE"), "DB_POOL_SIZE")?)
            .maybe_publish_metrics(
                get("PUBLISH_METRICS")
                    .map(|raw| parse_bool(&raw, "PUBLISH_METRICS"))
                    .transpose()?,
            )
            .maybe_metrics_namespace(get("METRICS_NAMESPACE"))
            .maybe_schedule_check(
                get("SCHEDULE_CHECK_ENABLED")
                    .map(|raw| parse_bool(&raw, "SCHEDULE_CHECK_ENABLED"))
                    .transpose()?,
            )
            .maybe_schedule_tolerance_secs(parse_opt(
                get("SCHEDULE_TOLERANCE_SECONDS"),
                "SCHEDULE_TOLERANCE_SECONDS",
            )?)
            .build();

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.functions_to_check.is_empty() {
            return Err(HealthCheckError::config("FUNCTIONS_TO_CHECK must name at least one function"));
        }
        if !(self.error_threshold > 0.0 && self.error_threshold <= 1.0) {
            return Err(HealthCheckError::config(format!(
                "ERROR_THRESHOLD must be in (0, 1], got {}",
                self.error_threshold
            )));
        }
        if self.db_pool_size == 0 {
            return Err(HealthCheckError::config("DB_POOL_SIZE must be at least 1"));
        }
        if self.schedule_tolerance_secs < 0 {
            return Err(HealthCheckError::config(
                "SCHEDULE_TOLERANCE_SECONDS must not be negative",
            ));
        }
        Ok(())
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

fn parse_opt<T>(raw: Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|value| {
        value
            .trim()
            .parse::<T>()
            .map_err(|e| HealthCheckError::config(format!("invalid {key} {value:?}: {e}")))
    })
    .transpose()
}

fn parse_bool(raw: &str, key: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(HealthCheckError::config(format!(
            "invalid {key} {other:?}: expected a boolean"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_empty() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.error_threshold, 0.8);
        assert_eq!(config.database_secret, "db_creds");
        assert_eq!(config.schedule_name, "3_min_schedule");
        assert_eq!(config.db_pool_size, 4);
        assert!(config.publish_metrics);
        assert!(!config.schedule_check);
        assert_eq!(
            config.functions_to_check,
            vec!["ENWL_power_scraper", "live_station_scraper"]
        );
    }

    #[test]
    fn test_overrides_from_environment() {
        let config = Config::from_lookup(lookup_from(&[
            ("FUNCTIONS_TO_CHECK", " scraper_a, ,scraper_b "),
            ("ERROR_THRESHOLD", "0.5"),
            ("ALERT_TOPIC_ARN", "arn:aws:sns:us-east-1:123456789012:alerts"),
            ("DB_POOL_SIZE", "8"),
            ("PUBLISH_METRICS", "No"),
            ("SCHEDULE_CHECK_ENABLED", "1"),
            ("SCHEDULE_TOLERANCE_SECONDS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.functions_to_check, vec!["scraper_a", "scraper_b"]);
        assert_eq!(config.error_threshold, 0.5);
        assert_eq!(
            config.alert_topic_arn,
            "arn:aws:sns:us-east-1:123456789012:alerts"
        );
        assert_eq!(config.db_pool_size, 8);
        assert!(!config.publish_metrics);
        assert!(config.schedule_check);
        assert_eq!(config.schedule_tolerance_secs, 5);
    }

    #[test]
    fn test_blank_values_keep_defaults() {
        let config = Config::from_lookup(lookup_from(&[("ERROR_THRESHOLD", "  ")])).unwrap();
        assert_eq!(config.error_threshold, DEFAULT_ERROR_THRESHOLD);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let bad_number = Config::from_lookup(lookup_from(&[("DB_POOL_SIZE", "four")]));
        assert!(matches!(bad_number, Err(HealthCheckError::Config(_))));

        let bad_bool = Config::from_lookup(lookup_from(&[("PUBLISH_METRICS", "maybe")]));
        assert!(matches!(bad_bool, Err(HealthCheckError::Config(_))));

        let zero_pool = Config::from_lookup(lookup_from(&[("DB_POOL_SIZE", "0")]));
        assert!(matches!(zero_pool, Err(HealthCheckError::Config(_))));

        let threshold = Config::from_lookup(lookup_from(&[("ERROR_THRESHOLD", "1.5")]));
        assert!(matches!(threshold, Err(HealthCheckError::Config(_))));

        let no_functions = Config::from_lookup(lookup_from(&[("FUNCTIONS_TO_CHECK", ", ,")]));
        assert!(matches!(no_functions, Err(HealthCheckError::Config(_))));
    }

    #[test]
    fn test_builder_accepts_partial_fields() {
        let config = Config::builder()
            .functions_to_check(vec!["only_one".to_string()])
            .alert_topic_arn("arn:aws:sns:eu-west-1:000000000000:topic")
            .build();

        assert_eq!(config.functions_to_check, vec!["only_one"]);
        assert_eq!(config.alert_topic_arn, "arn:aws:sns:eu-west-1:000000000000:topic");
        assert_eq!(config.error_threshold, DEFAULT_ERROR_THRESHOLD);
    }
}
