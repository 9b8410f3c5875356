//! Error handling for edavki
//!
//! Defines the domain error kinds raised by the conversion and report
//! pipeline, and a unified Result alias using anyhow for context chaining
//! in the orchestration layers (importer, rate feed, export, CLI).

use chrono::NaiveDate;
use thiserror::Error;

/// Core error types for the report pipeline
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("no exchange rate on or up to {horizon_days} days before {date}")]
    RateUnavailable { date: NaiveDate, horizon_days: i64 },

    #[error("exchange rate series is empty")]
    EmptyRateSeries,

    #[error("malformed record in sheet '{sheet}' row {row}: {reason}")]
    MalformedRecord {
        sheet: String,
        row: usize,
        reason: String,
    },

    #[error("lookup table error: {0}")]
    Lookup(String),
}

impl ReportError {
    pub fn malformed(sheet: &str, row: usize, reason: impl Into<String>) -> Self {
        ReportError::MalformedRecord {
            sheet: sheet.to_string(),
            row,
            reason: reason.into(),
        }
    }
}

/// Result type alias for orchestration code
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_unavailable_message_names_date() {
        let err = ReportError::RateUnavailable {
            date: NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
            horizon_days: 14,
        };
        assert_eq!(
            err.to_string(),
            "no exchange rate on or up to 14 days before 2024-01-04"
        );
    }

    #[test]
    fn test_malformed_record_formatting() {
        let err = ReportError::malformed("Closed Positions", 7, "units must be positive");
        assert_eq!(
            err.to_string(),
            "malformed record in sheet 'Closed Positions' row 7: units must be positive"
        );
    }

    #[test]
    fn test_anyhow_context_chains_errors() {
        use anyhow::Context;
        let result: Result<()> = Err(ReportError::EmptyRateSeries).context("failed to load rates");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("failed to load rates"));
        assert!(format!("{:?}", err).contains("exchange rate series is empty"));
    }
}
