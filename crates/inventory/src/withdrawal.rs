//! Outbound operations on a single record, all-or-nothing.
//!
//! Each helper runs the command against a copy of the record; the caller's
//! record is never touched, so a rejected operation leaves nothing behind.

use chrono::NaiveDateTime;

use stockbook_core::{DomainResult, Money};
use stockbook_events::execute;

use crate::record::{InventoryCommand, InventoryEvent, InventoryRecord, ShipAll, Withdraw};

/// Withdraw `quantity` units, returning the updated record.
pub fn apply_withdrawal(
    record: &InventoryRecord,
    quantity: u32,
    tracking_number: &str,
    counter: &str,
    occurred_at: NaiveDateTime,
) -> DomainResult<InventoryRecord> {
    let command = InventoryCommand::Withdraw(Withdraw {
        order_number: record.order_number().clone(),
        quantity,
        tracking_number: tracking_number.trim().to_string(),
        counter: counter.trim().to_string(),
        occurred_at,
    });
    run(record, &command)
}

/// Ship whatever remains on the record, optionally recording a shipping price.
pub fn ship_all(
    record: &InventoryRecord,
    tracking_number: &str,
    counter: &str,
    shipping_price: Option<Money>,
    occurred_at: NaiveDateTime,
) -> DomainResult<InventoryRecord> {
    let command = InventoryCommand::ShipAll(ShipAll {
        order_number: record.order_number().clone(),
        tracking_number: tracking_number.trim().to_string(),
        counter: counter.trim().to_string(),
        shipping_price,
        occurred_at,
    });
    run(record, &command)
}

/// Run any command against a copy of `record`.
///
/// Returns the evolved copy together with the events it produced.
pub fn run_on_copy(
    record: &InventoryRecord,
    command: &InventoryCommand,
) -> DomainResult<(InventoryRecord, Vec<InventoryEvent>)> {
    let mut next = record.clone();
    let events = execute(&mut next, command)?;
    Ok((next, events))
}

fn run(record: &InventoryRecord, command: &InventoryCommand) -> DomainResult<InventoryRecord> {
    run_on_copy(record, command).map(|(next, _)| next)
}
