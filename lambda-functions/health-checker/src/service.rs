use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::database::AuditStore;
use crate::error::{HealthCheckError, Result};
use crate::evaluator;
use crate::metrics::MetricsPublisher;
use crate::models::{AuditRow, CheckResult, Verdict};
use crate::notifier::{Alert, Notifier};
use crate::schedule::{self, ScheduleExpression, ScheduleSource};

pub const SUCCESS_BODY: &str = "Health check completed successfully";

/// Trigger payload: an EventBridge schedule event delivered through SNS.
/// Only logged, never interpreted.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct Request {
    #[serde(rename = "Records", default)]
    pub records: Vec<SnsRecord>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SnsRecord {
    #[serde(rename = "EventSource")]
    pub event_source: Option<String>,
    #[serde(rename = "Sns")]
    pub sns: Option<SnsMessage>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SnsMessage {
    #[serde(rename = "MessageId")]
    pub message_id: Option<String>,
    #[serde(rename = "TopicArn")]
    pub topic_arn: Option<String>,
    #[serde(rename = "Timestamp")]
    pub timestamp: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Response {
    pub status_code: u16,
    pub body: String,
    pub date_checked: NaiveDate,
    pub results: Vec<CheckResult>,
}

pub struct HealthCheckService {
    store: Box<dyn AuditStore>,
    notifier: Box<dyn Notifier>,
    metrics: Option<Box<dyn MetricsPublisher>>,
    schedule: Option<Box<dyn ScheduleSource>>,
    config: Config,
}

impl HealthCheckService {
    pub fn new(store: Box<dyn AuditStore>, notifier: Box<dyn Notifier>, config: Config) -> Self {
        Self {
            store,
            notifier,
            metrics: None,
            schedule: None,
            config,
        }
    }

    pub fn with_metrics(mut self, metrics: Box<dyn MetricsPublisher>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_schedule_source(mut self, schedule: Box<dyn ScheduleSource>) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// The UTC calendar day before `today`.
    pub fn prior_day(today: NaiveDate) -> NaiveDate {
        today - Duration::days(1)
    }

    pub async fn check_function(&self, function_name: &str, date: NaiveDate) -> Result<CheckResult> {
        let rows = self
            .store
            .fetch_rows(function_name, date)
            .await
            .inspect_err(|e| {
                warn!("Failed to find any rows for the {} function: {}", function_name, e);
            })?;

        info!("Parsing {} audit rows for function {}", rows.len(), function_name);
        let result = evaluator::evaluate(function_name, date, &rows, self.config.error_threshold);

        for entry in &result.errors {
            info!("Run {} of {} failed: {}", entry.run_id, function_name, entry.reason);
        }

        match (result.verdict, result.error_rate) {
            (Verdict::ThresholdBreached, Some(rate)) => {
                warn!(
                    "Error rate for {} on {} was {}, >= acceptable rate of {}",
                    function_name, date, rate, self.config.error_threshold
                );
                let alert =
                    Alert::threshold_breach(function_name, date, rate, self.config.error_threshold);
                self.notifier.publish(&alert).await?;
            }
            (Verdict::NoInvocations, _) => {
                warn!("No invocations of {} recorded on {}", function_name, date);
                self.notifier
                    .publish(&Alert::no_invocations(function_name, date))
                    .await?;
            }
            (_, rate) => {
                info!(
                    "Error rate for {} on {} was {}",
                    function_name,
                    date,
                    rate.unwrap_or_default()
                );
            }
        }

        if self.config.publish_metrics {
            if let Some(metrics) = &self.metrics {
                if let Err(e) = metrics.publish_check(&result).await {
                    error!("Failed to publish metrics for {}: {}", function_name, e);
                }
            }
        }

        if self.config.schedule_check {
            self.compare_schedule(function_name, &rows).await?;
        }

        Ok(result)
    }

    /// Log any start times that drift from the configured rate schedule.
    async fn compare_schedule(&self, function_name: &str, rows: &[AuditRow]) -> Result<()> {
        let Some(source) = &self.schedule else {
            return Ok(());
        };

        let raw = source.schedule_expression(&self.config.schedule_name).await?;
        let expression = match ScheduleExpression::parse(&raw) {
            Ok(expression) => expression,
            Err(HealthCheckError::UnsupportedSchedule(expr)) => {
                warn!("Skipping schedule comparison for {}: {} not supported", function_name, expr);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let tolerance = Duration::seconds(self.config.schedule_tolerance_secs);
        let diffs = schedule::check_rows(expression, rows, tolerance);
        if diffs.is_empty() {
            info!("Start times of {} match schedule {}", function_name, raw);
        } else {
            warn!(
                "{} start times of {} deviate from schedule {}: {:?}",
                diffs.len(),
                function_name,
                raw,
                diffs
            );
        }
        Ok(())
    }

    /// Check every configured function for the day before `today`.
    ///
    /// The first failing function aborts the whole cycle.
    pub async fn run_health_check(&self, today: NaiveDate) -> Result<Response> {
        let date = Self::prior_day(today);
        info!(
            "Starting health check of {} functions for {}",
            self.config.functions_to_check.len(),
            date
        );

        let mut results = Vec::with_capacity(self.config.functions_to_check.len());
        for function_name in &self.config.functions_to_check {
            let result = self
                .check_function(function_name, date)
                .await
                .inspect_err(|e| error!("Health check aborted at {}: {}", function_name, e))?;
            results.push(result);
        }

        Ok(Response {
            status_code: 200,
            body: SUCCESS_BODY.to_string(),
            date_checked: date,
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prior_day_crosses_month_and_year() {
        let new_year = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(
            HealthCheckService::prior_day(new_year),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
        );

        let leap = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(
            HealthCheckService::prior_day(leap),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
    }

    #[test]
    fn test_request_deserialization() {
        let json = r#"{
            "Records": [{
                "EventSource": "aws:sns",
                "EventVersion": "1.0",
                "Sns": {
                    "Type": "Notification",
                    "MessageId": "240c0160-9eb0-541b-b08a-601994906cf4",
                    "TopicArn": "arn:aws:sns:ap-southeast-2:542726313726:All_scrapers",
                    "Subject": null,
                    "Timestamp": "2025-10-27T05:49:20.652Z"
                }
            }]
        }"#;
        let request: Request = serde_json::from_str(json).unwrap();
        assert_eq!(request.records.len(), 1);
        assert_eq!(request.records[0].event_source.as_deref(), Some("aws:sns"));
        let sns = request.records[0].sns.as_ref().unwrap();
        assert_eq!(
            sns.message_id.as_deref(),
            Some("240c0160-9eb0-541b-b08a-601994906cf4")
        );

        let empty: Request = serde_json::from_str("{}").unwrap();
        assert!(empty.records.is_empty());
    }

    #[test]
    fn test_response_serialization() {
        let response = Response {
            status_code: 200,
            body: SUCCESS_BODY.to_string(),
            date_checked: NaiveDate::from_ymd_opt(2025, 10, 26).unwrap(),
            results: Vec::new(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status_code\":200"));
        assert!(json.contains("Health check completed successfully"));
        assert!(json.contains("\"date_checked\":\"2025-10-26\""));
    }
}
