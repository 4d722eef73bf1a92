//! Read-only reports over the raw rows of a table.
//!
//! Reports never fail on bad cells: an empty cell counts as zero, a malformed
//! one also counts as zero but is tallied in `skipped_cells` and logged.

use std::cell::Cell;

use serde::Serialize;
use tracing::warn;

use stockbook_core::{DomainResult, Money, OrderNumber};
use stockbook_inventory::{OutboundEntry, OutboundLog, OutboundStatus, UNSETTLED};

use crate::table::RecordRow;

/// One group of a profit report. Groups keep first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfitGroup {
    pub key: String,
    pub profit: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupplierCount {
    pub supplier: String,
    pub inbound_count: usize,
}

/// Summary figures for a set of rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    /// Fully shipped rows: market − settlement − shipping.
    pub sold_profit: Money,
    /// Remaining value of rows not fully shipped.
    pub inventory_value: Money,
    /// Shipping price of fully shipped rows.
    pub shipping_cost: Money,
    pub commission_cost: Money,
    /// Settlement price of rows still owed to the supplier.
    pub unsettled_amount: Money,
    pub market_total: Money,
    pub row_count: usize,
    pub quantity_total: u64,
    /// Cells that held text where a number was expected.
    pub skipped_cells: usize,
}

/// Lenient cell parser that remembers how many cells it had to skip.
#[derive(Debug, Default)]
struct Lenient {
    skipped: Cell<usize>,
}

impl Lenient {
    fn money(&self, row: &RecordRow, column: &'static str, text: &str) -> Money {
        if text.trim().is_empty() {
            return Money::ZERO;
        }
        text.parse().unwrap_or_else(|_| {
            self.skip(row, column, text);
            Money::ZERO
        })
    }

    fn quantity(&self, row: &RecordRow, column: &'static str, text: &str) -> u64 {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return 0;
        }
        trimmed
            .parse::<u64>()
            .or_else(|_| trimmed.parse::<f64>().map(|v| v.max(0.0) as u64))
            .unwrap_or_else(|_| {
                self.skip(row, column, text);
                0
            })
    }

    fn skip(&self, row: &RecordRow, column: &'static str, text: &str) {
        self.skipped.set(self.skipped.get() + 1);
        warn!(order_number = %row.order_number, column, value = text, "unreadable cell counted as zero");
    }
}

/// Market price minus settlement price, `None` when either cell is unreadable.
pub fn row_profit(row: &RecordRow) -> Option<Money> {
    let parse = |text: &str| -> Option<Money> {
        if text.trim().is_empty() {
            Some(Money::ZERO)
        } else {
            text.parse().ok()
        }
    };
    Some(parse(&row.market_price)? - parse(&row.settlement_price)?)
}

fn group_profit(rows: &[RecordRow], key: impl Fn(&RecordRow) -> &str) -> Vec<ProfitGroup> {
    let lenient = Lenient::default();
    let mut groups: Vec<ProfitGroup> = Vec::new();
    for row in rows {
        let profit = lenient.money(row, "行情价格", &row.market_price)
            - lenient.money(row, "结算价", &row.settlement_price);
        let name = key(row);
        match groups.iter_mut().find(|g| g.key == name) {
            Some(group) => group.profit += profit,
            None => groups.push(ProfitGroup {
                key: name.to_string(),
                profit,
            }),
        }
    }
    groups
}

pub fn profit_by_product(rows: &[RecordRow]) -> Vec<ProfitGroup> {
    group_profit(rows, |row| row.product.as_str())
}

pub fn profit_by_supplier(rows: &[RecordRow]) -> Vec<ProfitGroup> {
    group_profit(rows, |row| row.supplier.as_str())
}

/// Rows shipped under `tracking_number`, either as the pinned first shipment
/// or anywhere in the outbound ledger.
pub fn by_tracking_number<'a>(rows: &'a [RecordRow], tracking_number: &str) -> Vec<&'a RecordRow> {
    let wanted = tracking_number.trim();
    rows.iter()
        .filter(|row| {
            row.tracking_number.trim() == wanted
                || OutboundLog::parse(&row.outbound_log)
                    .map(|log| log.mentions_tracking(wanted))
                    .unwrap_or(false)
        })
        .collect()
}

pub fn inbound_count_by_supplier(rows: &[RecordRow]) -> Vec<SupplierCount> {
    let mut counts: Vec<SupplierCount> = Vec::new();
    for row in rows {
        match counts.iter_mut().find(|c| c.supplier == row.supplier) {
            Some(count) => count.inbound_count += 1,
            None => counts.push(SupplierCount {
                supplier: row.supplier.clone(),
                inbound_count: 1,
            }),
        }
    }
    counts
}

pub fn metrics(rows: &[RecordRow]) -> Metrics {
    let lenient = Lenient::default();
    let mut m = Metrics {
        row_count: rows.len(),
        ..Metrics::default()
    };

    for row in rows {
        let settlement = lenient.money(row, "结算价", &row.settlement_price);
        let market = lenient.money(row, "行情价格", &row.market_price);

        m.commission_cost += lenient.money(row, "佣金", &row.commission);
        if row.status() == Some(OutboundStatus::FullyShipped) {
            let shipping = lenient.money(row, "快递价格", &row.shipping_price);
            m.sold_profit += market - settlement - shipping;
            m.shipping_cost += shipping;
        } else if row.remaining_value.trim().is_empty() {
            // Older rows without a remaining value were never partially shipped.
            m.inventory_value += settlement;
        } else {
            m.inventory_value += lenient.money(row, "剩余价值", &row.remaining_value);
        }
        if row.settlement_status.trim() == UNSETTLED {
            m.unsettled_amount += settlement;
        }
        m.market_total += market;
        m.quantity_total += lenient.quantity(row, "商品数量", &row.total_quantity);
    }

    m.skipped_cells = lenient.skipped.get();
    m
}

/// Parsed outbound ledger of one record. Unlike the reports, a malformed
/// ledger is an error here.
pub fn outbound_details(
    rows: &[RecordRow],
    order_number: &OrderNumber,
) -> DomainResult<Vec<OutboundEntry>> {
    let row = rows
        .iter()
        .find(|row| row.has_order_number(order_number))
        .ok_or_else(|| stockbook_core::DomainError::not_found(order_number.as_str()))?;
    Ok(OutboundLog::parse(&row.outbound_log)?.entries().to_vec())
}
