//! Compacting of adjacent, logically identical records
//!
//! Brokers split a single order into several fills, and pay one dividend in
//! several lines on the same day. After sorting, such records sit next to each
//! other and differ only in their summable amounts; compacting folds each such
//! run into one record.
//!
//! Only neighbours are ever compared. Two identical records separated by a
//! different one stay separate, so callers must sort by the same key first.

use chrono::NaiveDate;
use itertools::Itertools;
use rust_decimal::Decimal;

use crate::records::{ClosedPosition, DividendRecord, InstrumentClass};

/// Records that can absorb an identical neighbour
pub trait Compactable: Sized {
    type Key: PartialEq;

    /// Every non-summable field; records merge only on an exact match
    fn compact_key(&self) -> Self::Key;

    /// Sum the summable fields of `other` into `self`
    fn absorb(self, other: Self) -> Self;
}

/// Merge every element into its predecessor while `key` stays equal.
///
/// Produces a new sequence with no two adjacent elements sharing a key,
/// without reordering anything. The key is taken from the already merged
/// record, so it must not depend on anything `merge` changes.
pub fn compact_by<T, K, F, M>(records: Vec<T>, key: F, merge: M) -> Vec<T>
where
    K: PartialEq,
    F: Fn(&T) -> K,
    M: Fn(T, T) -> T,
{
    records
        .into_iter()
        .coalesce(|prev, next| {
            if key(&prev) == key(&next) {
                Ok(merge(prev, next))
            } else {
                Err((prev, next))
            }
        })
        .collect()
}

pub fn compact<T: Compactable>(records: Vec<T>) -> Vec<T> {
    compact_by(records, T::compact_key, T::absorb)
}

impl Compactable for DividendRecord {
    type Key = (String, NaiveDate);

    fn compact_key(&self) -> Self::Key {
        (self.full_name.clone(), self.payment_date)
    }

    fn absorb(mut self, other: Self) -> Self {
        self.net_dividend += other.net_dividend;
        self.foreign_tax += other.foreign_tax;
        self
    }
}

impl Compactable for ClosedPosition {
    type Key = (
        String,
        NaiveDate,
        NaiveDate,
        Decimal,
        Decimal,
        InstrumentClass,
        u32,
        bool,
    );

    fn compact_key(&self) -> Self::Key {
        (
            self.full_name.clone(),
            self.open_date,
            self.close_date,
            self.open_rate_native,
            self.close_rate_native,
            self.class,
            self.leverage,
            self.is_long,
        )
    }

    fn absorb(mut self, other: Self) -> Self {
        self.start_value += other.start_value;
        self.close_value += other.close_value;
        self.profit += other.profit;
        self.units += other.units;
        self
    }
}
