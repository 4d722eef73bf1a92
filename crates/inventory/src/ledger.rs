//! Outbound ledger: the append-only list of shipments attached to a record.
//!
//! Persisted as a single text cell: entries joined with `;`, each entry
//! `timestamp|counter|tracking_number|quantity|unit_price`.

use core::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use stockbook_core::{DomainError, DomainResult, Money, ValueObject};

/// Wall-clock format used for ledger timestamps.
pub const LEDGER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const ENTRY_SEPARATOR: char = ';';
const FIELD_SEPARATOR: char = '|';

/// One outbound shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEntry {
    pub timestamp: NaiveDateTime,
    pub counter: String,
    pub tracking_number: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl ValueObject for OutboundEntry {}

impl OutboundEntry {
    /// Value shipped by this entry.
    pub fn value(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

impl core::fmt::Display for OutboundEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}|{}",
            self.timestamp.format(LEDGER_TIME_FORMAT),
            self.counter,
            self.tracking_number,
            self.quantity,
            self.unit_price
        )
    }
}

impl FromStr for OutboundEntry {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || DomainError::malformed("outbound_log", s);

        let parts: Vec<&str> = s.split(FIELD_SEPARATOR).collect();
        let [timestamp, counter, tracking_number, quantity, unit_price] = parts.as_slice() else {
            return Err(malformed());
        };

        Ok(Self {
            timestamp: NaiveDateTime::parse_from_str(timestamp.trim(), LEDGER_TIME_FORMAT)
                .map_err(|_| malformed())?,
            counter: counter.to_string(),
            tracking_number: tracking_number.to_string(),
            quantity: quantity.trim().parse().map_err(|_| malformed())?,
            unit_price: unit_price.parse().map_err(|_| malformed())?,
        })
    }
}

/// Ordered, append-only outbound log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutboundLog(Vec<OutboundEntry>);

impl OutboundLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the persisted cell. Blank text is an empty log.
    pub fn parse(text: &str) -> DomainResult<Self> {
        text.split(ENTRY_SEPARATOR)
            .filter(|chunk| !chunk.trim().is_empty())
            .map(str::parse::<OutboundEntry>)
            .collect::<DomainResult<Vec<_>>>()
            .map(Self)
    }

    pub fn entries(&self) -> &[OutboundEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, entry: OutboundEntry) {
        self.0.push(entry);
    }

    /// Total quantity shipped across all entries.
    pub fn shipped_quantity(&self) -> u64 {
        self.0.iter().map(|e| u64::from(e.quantity)).sum()
    }

    /// Whether any entry shipped under `tracking_number`.
    pub fn mentions_tracking(&self, tracking_number: &str) -> bool {
        self.0.iter().any(|e| e.tracking_number == tracking_number)
    }
}

impl core::fmt::Display for OutboundLog {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (i, entry) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{ENTRY_SEPARATOR}")?;
            }
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}

/// Validate a counter or tracking number destined for the ledger cell.
///
/// Must be non-blank and must not contain the ledger separators.
pub fn validate_label(field: &str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    if value.contains([ENTRY_SEPARATOR, FIELD_SEPARATOR]) {
        return Err(DomainError::validation(format!(
            "{field} cannot contain '{ENTRY_SEPARATOR}' or '{FIELD_SEPARATOR}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn entry(counter: &str, tracking: &str, quantity: u32) -> OutboundEntry {
        OutboundEntry {
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 9)
                .unwrap()
                .and_hms_opt(14, 5, 0)
                .unwrap(),
            counter: counter.to_string(),
            tracking_number: tracking.to_string(),
            quantity,
            unit_price: Money::new(dec!(5)),
        }
    }

    #[test]
    fn entry_encodes_in_cell_format() {
        assert_eq!(entry("C1", "T1", 5).to_string(), "2024-03-09 14:05:00|C1|T1|5|5.00");
    }

    #[test]
    fn log_joins_entries_with_semicolons() {
        let mut log = OutboundLog::new();
        log.push(entry("C1", "T1", 5));
        log.push(entry("C2", "T2", 3));

        let cell = log.to_string();
        assert_eq!(
            cell,
            "2024-03-09 14:05:00|C1|T1|5|5.00;2024-03-09 14:05:00|C2|T2|3|5.00"
        );
        assert_eq!(OutboundLog::parse(&cell).unwrap(), log);
        assert_eq!(log.shipped_quantity(), 8);
        assert!(log.mentions_tracking("T2"));
    }

    #[test]
    fn blank_cell_is_empty_log() {
        assert!(OutboundLog::parse("").unwrap().is_empty());
        assert!(OutboundLog::parse(" ; ").unwrap().is_empty());
    }

    #[test]
    fn malformed_entries_fail_closed() {
        for cell in [
            "2024-03-09 14:05:00|C1|T1|five|5.00",
            "2024-03-09 14:05:00|C1|T1|5",
            "yesterday|C1|T1|5|5.00",
            "2024-03-09 14:05:00|C1|T1|5|cheap",
        ] {
            let err = OutboundLog::parse(cell).unwrap_err();
            assert!(
                matches!(err, DomainError::MalformedRecord { field: "outbound_log", .. }),
                "{cell}: {err:?}"
            );
        }
    }

    #[test]
    fn labels_reject_separators() {
        assert!(validate_label("counter", "A|B").is_err());
        assert!(validate_label("counter", "A;B").is_err());
        assert!(validate_label("counter", "  ").is_err());
        assert!(validate_label("counter", "Stall 3").is_ok());
    }
}
