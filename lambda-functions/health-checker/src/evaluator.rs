//! Classification of audit rows and error-rate verdicts.

use chrono::NaiveDate;

use crate::models::{AuditRow, CheckResult, ErrorEntry, ErrorReason, Verdict};

/// Flag every row that failed validation, preserving input order.
///
/// A record-count mismatch takes precedence over the status check.
pub fn classify(rows: &[AuditRow]) -> Vec<ErrorEntry> {
    rows.iter()
        .filter_map(|row| {
            let reason = if !row.records_match() {
                ErrorReason::RecordMismatch {
                    written: row.records_written,
                    read: row.records_read,
                }
            } else if !row.run_status().is_success() {
                ErrorReason::UnsuccessfulStatus {
                    status: row.status.clone(),
                }
            } else {
                return None;
            };

            Some(ErrorEntry {
                run_id: row.run_id.clone(),
                reason,
            })
        })
        .collect()
}

/// Fraction of failed runs, or `None` when nothing ran.
pub fn error_rate(failures: usize, total: usize) -> Option<f64> {
    if total == 0 {
        return None;
    }
    Some(failures as f64 / total as f64)
}

pub fn evaluate(
    function_name: &str,
    date: NaiveDate,
    rows: &[AuditRow],
    threshold: f64,
) -> CheckResult {
    let errors = classify(rows);
    let rate = error_rate(errors.len(), rows.len());

    let verdict = match rate {
        None => Verdict::NoInvocations,
        Some(rate) if rate >= threshold => Verdict::ThresholdBreached,
        Some(_) => Verdict::Pass,
    };

    CheckResult {
        function_name: function_name.to_string(),
        date_checked: date,
        invocations: rows.len(),
        failures: errors.len(),
        error_rate: rate,
        verdict,
        errors,
    }
}
