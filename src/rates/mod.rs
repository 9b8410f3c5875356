// Rates module - daily reference exchange rates with backward lookback

pub mod ecb;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::error::ReportError;

/// Default number of calendar days a lookup may fall back before giving up.
/// The ECB series skips weekends and TARGET holidays; the longest regular gap
/// (Easter) is four days.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 14;

/// One published exchange rate: units of source currency per reference unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateSample {
    pub date: NaiveDate,
    pub rate: Decimal,
}

impl RateSample {
    pub fn new(date: NaiveDate, rate: Decimal) -> Self {
        Self { date, rate }
    }
}

/// Time series of rate samples answering "effective rate as of date D"
///
/// The series is sorted once, descending by date, when the index is built.
/// Lookups binary-search for the latest sample on or before the requested
/// date and reject matches further back than the lookback horizon.
#[derive(Debug, Clone)]
pub struct CurrencyRateIndex {
    samples: Vec<RateSample>,
    horizon_days: i64,
}

impl CurrencyRateIndex {
    /// Build an index from samples in any order
    pub fn new(samples: Vec<RateSample>) -> Result<Self, ReportError> {
        Self::with_horizon(samples, DEFAULT_LOOKBACK_DAYS)
    }

    pub fn with_horizon(mut samples: Vec<RateSample>, horizon_days: i64) -> Result<Self, ReportError> {
        if samples.is_empty() {
            return Err(ReportError::EmptyRateSeries);
        }

        samples.sort_by(|a, b| b.date.cmp(&a.date));
        samples.dedup_by_key(|s| s.date);

        debug!(
            "Rate index built: {} samples, {} .. {}, horizon {} days",
            samples.len(),
            samples[samples.len() - 1].date,
            samples[0].date,
            horizon_days
        );

        Ok(Self {
            samples,
            horizon_days: horizon_days.max(0),
        })
    }

    /// Sample with the largest date on or before `date`, within the horizon
    pub fn sample_as_of(&self, date: NaiveDate) -> Result<&RateSample, ReportError> {
        // Descending order: every sample before the partition point is newer than `date`
        let idx = self.samples.partition_point(|s| s.date > date);

        match self.samples.get(idx) {
            Some(sample) if (date - sample.date).num_days() <= self.horizon_days => Ok(sample),
            _ => Err(ReportError::RateUnavailable {
                date,
                horizon_days: self.horizon_days,
            }),
        }
    }

    /// Effective rate on `date`, looking back over missing days
    pub fn rate_as_of(&self, date: NaiveDate) -> Result<Decimal, ReportError> {
        self.sample_as_of(date).map(|s| s.rate)
    }

    /// Convert a source-currency amount into the reference currency
    pub fn to_reference(&self, amount: Decimal, date: NaiveDate) -> Result<Decimal, ReportError> {
        Ok(amount / self.rate_as_of(date)?)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn horizon_days(&self) -> i64 {
        self.horizon_days
    }

    /// Most recent sample in the series
    pub fn latest(&self) -> &RateSample {
        &self.samples[0]
    }
}
