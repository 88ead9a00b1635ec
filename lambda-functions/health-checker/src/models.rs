use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const SUCCESS_WITH_DATA: &str = "SUCCESS_WITH_DATA";
pub const SUCCESS_NO_DATA: &str = "SUCCESS_NO_DATA";

/// One row of the `runAudits` table
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AuditRow {
    pub run_id: String,
    pub function_name: String,
    pub function_start_time: NaiveDateTime,
    pub records_written: i64,
    pub records_read: i64,
    pub status: String,
}

impl AuditRow {
    pub fn run_status(&self) -> RunStatus {
        RunStatus::parse(&self.status)
    }

    pub fn records_match(&self) -> bool {
        self.records_written == self.records_read
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    SuccessWithData,
    SuccessNoData,
    Other(String),
}

impl RunStatus {
    /// Case-insensitive parse of an audit status string
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            SUCCESS_WITH_DATA => Self::SuccessWithData,
            SUCCESS_NO_DATA => Self::SuccessNoData,
            _ => Self::Other(raw.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::SuccessWithData | Self::SuccessNoData)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SuccessWithData => write!(f, "{}", SUCCESS_WITH_DATA),
            Self::SuccessNoData => write!(f, "{}", SUCCESS_NO_DATA),
            Self::Other(raw) => write!(f, "{}", raw),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorReason {
    RecordMismatch { written: i64, read: i64 },
    UnsuccessfulStatus { status: String },
}

impl fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RecordMismatch { written, read } => {
                write!(f, "Records read != records written: {} != {}", written, read)
            }
            Self::UnsuccessfulStatus { status } => {
                write!(f, "Status was not successful: {}", status)
            }
        }
    }
}

/// A run that failed validation
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ErrorEntry {
    pub run_id: String,
    pub reason: ErrorReason,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    ThresholdBreached,
    NoInvocations,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "pass"),
            Self::ThresholdBreached => write!(f, "threshold_breached"),
            Self::NoInvocations => write!(f, "no_invocations"),
        }
    }
}

/// Outcome of checking one function for one day
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub function_name: String,
    pub date_checked: NaiveDate,
    pub invocations: usize,
    pub failures: usize,
    pub error_rate: Option<f64>,
    pub verdict: Verdict,
    pub errors: Vec<ErrorEntry>,
}

impl CheckResult {
    pub fn needs_alert(&self) -> bool {
        self.verdict != Verdict::Pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_parse_is_case_insensitive() {
        assert_eq!(RunStatus::parse("success_with_data"), RunStatus::SuccessWithData);
        assert_eq!(RunStatus::parse("Success_No_Data"), RunStatus::SuccessNoData);
        assert_eq!(RunStatus::parse("FAIL"), RunStatus::Other("FAIL".to_string()));
        assert!(RunStatus::parse("SUCCESS_WITH_DATA").is_success());
        assert!(!RunStatus::parse("SUCCESS").is_success());
    }

    #[test]
    fn test_error_reason_messages() {
        let mismatch = ErrorReason::RecordMismatch { written: 3, read: 5 };
        assert_eq!(mismatch.to_string(), "Records read != records written: 3 != 5");

        let status = ErrorReason::UnsuccessfulStatus {
            status: "TIMEOUT".to_string(),
        };
        assert_eq!(status.to_string(), "Status was not successful: TIMEOUT");
    }

    #[test]
    fn test_check_result_serialization() {
        let result = CheckResult {
            function_name: "live_station_scraper".to_string(),
            date_checked: NaiveDate::from_ymd_opt(2025, 10, 26).unwrap(),
            invocations: 2,
            failures: 1,
            error_rate: Some(0.5),
            verdict: Verdict::Pass,
            errors: vec![ErrorEntry {
                run_id: "42".to_string(),
                reason: ErrorReason::RecordMismatch { written: 3, read: 5 },
            }],
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["function_name"], "live_station_scraper");
        assert_eq!(json["date_checked"], "2025-10-26");
        assert_eq!(json["error_rate"], 0.5);
        assert_eq!(json["verdict"], "pass");
        assert_eq!(json["errors"][0]["reason"]["kind"], "record_mismatch");
        assert!(!result.needs_alert());
    }
}
