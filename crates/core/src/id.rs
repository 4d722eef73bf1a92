//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of an inventory record (the "order number").
///
/// Freshly issued numbers are millisecond timestamps, but records imported
/// from older tables may carry arbitrary text, so the value is kept as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value when the order number is a plain millisecond stamp.
    pub fn as_millis(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl core::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for OrderNumber {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_id("OrderNumber: empty"));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(DomainError::invalid_id(format!(
                "OrderNumber: control characters in {trimmed:?}"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<u64> for OrderNumber {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

/// Issues order numbers from wall-clock milliseconds.
///
/// Numbers are strictly increasing within a generator even when several
/// records are registered in the same millisecond (bulk intake). Call
/// [`OrderNumberGenerator::observe`] with numbers already on disk so a fresh
/// process never reissues one.
#[derive(Debug, Default)]
pub struct OrderNumberGenerator {
    last: AtomicU64,
}

impl OrderNumberGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an existing order number so later numbers sort after it.
    pub fn observe(&self, existing: &OrderNumber) {
        if let Some(ms) = existing.as_millis() {
            self.last.fetch_max(ms, Ordering::SeqCst);
        }
    }

    /// Next order number for a record created at `now` (local wall clock).
    pub fn next(&self, now: NaiveDateTime) -> OrderNumber {
        let stamp = u64::try_from(now.and_utc().timestamp_millis()).unwrap_or(0);
        let mut issued = stamp;
        // fetch_update only fails when the closure returns None, which it never does.
        let _ = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                issued = stamp.max(last.saturating_add(1));
                Some(issued)
            });
        OrderNumber::from(issued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(ms: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_milli_opt(12, 0, 0, ms)
            .unwrap()
    }

    #[test]
    fn parse_rejects_blank_order_numbers() {
        assert!("   ".parse::<OrderNumber>().is_err());
        assert_eq!("  ORDER001 ".parse::<OrderNumber>().unwrap().as_str(), "ORDER001");
    }

    #[test]
    fn generator_is_strictly_increasing_within_one_millisecond() {
        let orders = OrderNumberGenerator::new();
        let a = orders.next(at(5)).as_millis().unwrap();
        let b = orders.next(at(5)).as_millis().unwrap();
        let c = orders.next(at(5)).as_millis().unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn generator_skips_past_observed_numbers() {
        let orders = OrderNumberGenerator::new();
        let existing = orders.next(at(900));
        let fresh = OrderNumberGenerator::new();
        fresh.observe(&existing);
        fresh.observe(&"LEGACY-7".parse().unwrap());

        let next = fresh.next(at(100));
        assert!(next.as_millis().unwrap() > existing.as_millis().unwrap());
    }

    #[test]
    fn generator_saturates_at_the_largest_number() {
        let orders = OrderNumberGenerator::new();
        orders.observe(&OrderNumber::from(u64::MAX));

        assert_eq!(orders.next(at(1)).as_millis(), Some(u64::MAX));
    }
}
