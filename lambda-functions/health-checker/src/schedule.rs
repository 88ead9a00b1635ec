//! Comparison of actual run start times against the EventBridge schedule.
//!
//! Only `rate(N minutes)` expressions can be extrapolated. The expected day is
//! anchored on the earliest recorded run, since rate schedules drift relative
//! to midnight.

use async_trait::async_trait;
use aws_sdk_scheduler::Client as SchedulerClient;
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::{HealthCheckError, Result};
use crate::models::AuditRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleExpression {
    RateMinutes(u32),
}

impl ScheduleExpression {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();

        if raw.starts_with("cron(") || raw.starts_with("at(") {
            warn!("Cron or one-off expression used for function schedule: {}", raw);
            return Err(HealthCheckError::UnsupportedSchedule(raw.to_string()));
        }

        let inner = raw
            .strip_prefix("rate(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| HealthCheckError::schedule(format!("unrecognised expression {raw:?}")))?;

        let mut parts = inner.split_whitespace();
        let (Some(value), Some(unit), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(HealthCheckError::schedule(format!(
                "expected rate(<value> <unit>), got {raw:?}"
            )));
        };

        let value: u32 = value
            .parse()
            .ok()
            .filter(|v| *v > 0)
            .ok_or_else(|| HealthCheckError::schedule(format!("invalid rate value in {raw:?}")))?;

        match unit {
            "minute" | "minutes" => Ok(Self::RateMinutes(value)),
            "hour" | "hours" | "day" | "days" => {
                warn!("Rate in a granularity other than minutes used: {}", raw);
                Err(HealthCheckError::UnsupportedSchedule(raw.to_string()))
            }
            other => Err(HealthCheckError::schedule(format!(
                "unknown rate unit {other:?} in {raw:?}"
            ))),
        }
    }

    pub fn interval(&self) -> Duration {
        match self {
            Self::RateMinutes(minutes) => Duration::minutes(i64::from(*minutes)),
        }
    }
}

/// Expected start times for the 24 hours beginning at `earliest`.
pub fn expected_run_times(earliest: NaiveDateTime, interval: Duration) -> Vec<NaiveDateTime> {
    if interval <= Duration::zero() {
        return Vec::new();
    }

    let end = earliest + Duration::days(1);
    let mut times = Vec::new();
    let mut next = earliest;
    while next < end {
        times.push(next);
        next += interval;
    }
    times
}

/// Start times of the given runs in chronological order.
pub fn actual_run_times(rows: &[AuditRow]) -> Vec<NaiveDateTime> {
    let mut times: Vec<_> = rows.iter().map(|row| row.function_start_time).collect();
    times.sort();
    times
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RunTimeDiff {
    pub index: usize,
    pub expected: Option<NaiveDateTime>,
    pub actual: Option<NaiveDateTime>,
}

/// Positional diff of expected against actual start times.
///
/// Pairs further apart than `tolerance` are reported. When the lists differ in
/// length, the unmatched tail is reported with the missing side set to `None`.
pub fn compare_run_times(
    expected: &[NaiveDateTime],
    actual: &[NaiveDateTime],
    tolerance: Duration,
) -> Vec<RunTimeDiff> {
    let len = expected.len().max(actual.len());

    (0..len)
        .filter_map(|index| {
            let exp = expected.get(index).copied();
            let act = actual.get(index).copied();
            let differs = match (exp, act) {
                (Some(e), Some(a)) => (a - e).abs() > tolerance,
                _ => true,
            };
            differs.then_some(RunTimeDiff {
                index,
                expected: exp,
                actual: act,
            })
        })
        .collect()
}

/// Run the full comparison for one function's rows of a day.
pub fn check_rows(
    expression: ScheduleExpression,
    rows: &[AuditRow],
    tolerance: Duration,
) -> Vec<RunTimeDiff> {
    let actual = actual_run_times(rows);
    let Some(earliest) = actual.first().copied() else {
        return Vec::new();
    };

    let expected = expected_run_times(earliest, expression.interval());
    info!(
        "{} expected runs vs {} actual runs",
        expected.len(),
        actual.len()
    );
    compare_run_times(&expected, &actual, tolerance)
}

#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn schedule_expression(&self, schedule_name: &str) -> Result<String>;
}

pub struct EventBridgeScheduleSource {
    client: SchedulerClient,
}

impl EventBridgeScheduleSource {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: SchedulerClient::new(config),
        }
    }
}

#[async_trait]
impl ScheduleSource for EventBridgeScheduleSource {
    async fn schedule_expression(&self, schedule_name: &str) -> Result<String> {
        let output = self
            .client
            .get_schedule()
            .name(schedule_name)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to get schedule {}: {}", schedule_name, e);
                HealthCheckError::schedule(e.to_string())
            })?;

        output
            .schedule_expression()
            .map(String::from)
            .ok_or_else(|| {
                HealthCheckError::schedule(format!("schedule {schedule_name} has no expression"))
            })
    }
}
