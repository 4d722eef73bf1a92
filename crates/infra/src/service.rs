//! Inventory service: the single writer for one table.
//!
//! Every mutation is read-all, change one record, rewrite-all under a mutex,
//! then publish the resulting events. The table file is the source of truth;
//! a failed publish is logged and does not undo the write.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::{info, warn};

use stockbook_core::{DomainError, Money, OrderNumber, OrderNumberGenerator};
use stockbook_events::{Event, EventBus};
use stockbook_inventory::{
    BulkInbound, Delete, InboundRegistration, InventoryCommand, InventoryEvent, InventoryRecord,
    LineError, Modify, RecordDeleted, RecordPatch, Register, ShipAll, Withdraw, run_on_copy,
};

use crate::table::{RecordRow, StoreError, TableStore};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of a bulk intake.
#[derive(Debug)]
pub struct BulkOutcome {
    pub registered: Vec<InventoryRecord>,
    pub rejected: Vec<LineError>,
}

/// A row that fails conservation or cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditFinding {
    pub order_number: String,
    pub problem: DomainError,
}

pub struct InventoryService<B> {
    store: Mutex<TableStore>,
    orders: OrderNumberGenerator,
    bus: B,
}

impl<B> InventoryService<B>
where
    B: EventBus<InventoryEvent>,
{
    /// Wrap `store`. Existing order numbers are observed so new ones never collide.
    pub fn open(store: TableStore, bus: B) -> Result<Self, ServiceError> {
        let orders = OrderNumberGenerator::new();
        for row in store.load()? {
            if let Ok(order_number) = row.order_number.parse::<OrderNumber>() {
                orders.observe(&order_number);
            }
        }
        Ok(Self {
            store: Mutex::new(store),
            orders,
            bus,
        })
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    fn lock(&self) -> MutexGuard<'_, TableStore> {
        // The guard protects no in-memory state beyond the path, so a panic
        // in another writer leaves nothing inconsistent behind.
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(
        &self,
        registration: InboundRegistration,
        now: NaiveDateTime,
    ) -> Result<InventoryRecord, ServiceError> {
        let store = self.lock();
        let (record, events) = self.decide_register(registration, now)?;

        let mut rows = store.load()?;
        rows.push(RecordRow::from_record(&record));
        store.rewrite(&rows)?;

        info!(
            order_number = %record.order_number(),
            product = %record.details().product,
            quantity = record.total_quantity(),
            settlement_price = %record.pricing().settlement_price,
            "inbound registered"
        );
        self.publish(events);
        Ok(record)
    }

    /// Register every valid line in one rewrite; invalid lines are reported back.
    pub fn register_bulk(
        &self,
        bulk: BulkInbound,
        now: NaiveDateTime,
    ) -> Result<BulkOutcome, ServiceError> {
        let (registrations, rejected) = bulk.into_registrations()?;
        for line in &rejected {
            warn!(line = line.line, product = %line.product, error = %line.error, "bulk line rejected");
        }

        let store = self.lock();
        let mut registered = Vec::with_capacity(registrations.len());
        let mut events = Vec::new();
        for registration in registrations {
            let (record, produced) = self.decide_register(registration, now)?;
            registered.push(record);
            events.extend(produced);
        }

        if !registered.is_empty() {
            let mut rows = store.load()?;
            rows.extend(registered.iter().map(RecordRow::from_record));
            store.rewrite(&rows)?;
        }

        info!(
            registered = registered.len(),
            rejected = rejected.len(),
            "bulk inbound registered"
        );
        self.publish(events);
        Ok(BulkOutcome {
            registered,
            rejected,
        })
    }

    fn decide_register(
        &self,
        registration: InboundRegistration,
        now: NaiveDateTime,
    ) -> Result<(InventoryRecord, Vec<InventoryEvent>), DomainError> {
        registration.validate()?;
        let order_number = self.orders.next(now);
        let command = InventoryCommand::Register(Register {
            order_number: order_number.clone(),
            registration,
            occurred_at: now,
        });
        run_on_copy(&InventoryRecord::empty(order_number), &command)
    }

    /// Partial outbound.
    pub fn withdraw(
        &self,
        order_number: &OrderNumber,
        quantity: u32,
        tracking_number: &str,
        counter: &str,
        now: NaiveDateTime,
    ) -> Result<InventoryRecord, ServiceError> {
        let command = InventoryCommand::Withdraw(Withdraw {
            order_number: order_number.clone(),
            quantity,
            tracking_number: tracking_number.trim().to_string(),
            counter: counter.trim().to_string(),
            occurred_at: now,
        });
        let record = self.update(order_number, &command)?;
        info!(
            order_number = %order_number,
            quantity,
            tracking_number = tracking_number.trim(),
            counter = counter.trim(),
            remaining = record.remaining_quantity(),
            "stock withdrawn"
        );
        Ok(record)
    }

    /// Full outbound of whatever remains.
    pub fn ship_all(
        &self,
        order_number: &OrderNumber,
        tracking_number: &str,
        counter: &str,
        shipping_price: Option<Money>,
        now: NaiveDateTime,
    ) -> Result<InventoryRecord, ServiceError> {
        let command = InventoryCommand::ShipAll(ShipAll {
            order_number: order_number.clone(),
            tracking_number: tracking_number.trim().to_string(),
            counter: counter.trim().to_string(),
            shipping_price,
            occurred_at: now,
        });
        let record = self.update(order_number, &command)?;
        info!(
            order_number = %order_number,
            tracking_number = tracking_number.trim(),
            counter = counter.trim(),
            "record fully shipped"
        );
        Ok(record)
    }

    pub fn modify(
        &self,
        order_number: &OrderNumber,
        patch: RecordPatch,
        now: NaiveDateTime,
    ) -> Result<InventoryRecord, ServiceError> {
        let changed = patch.changed_fields().join(",");
        let command = InventoryCommand::Modify(Modify {
            order_number: order_number.clone(),
            patch,
            occurred_at: now,
        });
        let record = self.update(order_number, &command)?;
        info!(order_number = %order_number, changed = %changed, "record modified");
        Ok(record)
    }

    /// Remove a record. Its row is dropped even when it no longer parses.
    pub fn delete(
        &self,
        order_number: &OrderNumber,
        now: NaiveDateTime,
    ) -> Result<RecordRow, ServiceError> {
        let store = self.lock();
        let mut rows = store.load()?;
        let index = rows
            .iter()
            .position(|row| row.has_order_number(order_number))
            .ok_or_else(|| DomainError::not_found(order_number.as_str()))?;

        let events = match rows[index].to_record() {
            Ok(record) => {
                let command = InventoryCommand::Delete(Delete {
                    order_number: order_number.clone(),
                    occurred_at: now,
                });
                run_on_copy(&record, &command)?.1
            }
            Err(err) => {
                warn!(order_number = %order_number, error = %err, "deleting unreadable row");
                vec![InventoryEvent::RecordDeleted(RecordDeleted {
                    order_number: order_number.clone(),
                    occurred_at: now,
                })]
            }
        };

        let removed = rows.remove(index);
        store.rewrite(&rows)?;
        info!(order_number = %order_number, product = %removed.product, "record deleted");
        self.publish(events);
        Ok(removed)
    }

    /// Parse and return one record.
    pub fn get(&self, order_number: &OrderNumber) -> Result<InventoryRecord, ServiceError> {
        let rows = self.lock().load()?;
        let row = rows
            .iter()
            .find(|row| row.has_order_number(order_number))
            .ok_or_else(|| DomainError::not_found(order_number.as_str()))?;
        Ok(row.to_record()?)
    }

    /// All rows as stored.
    pub fn list(&self) -> Result<Vec<RecordRow>, ServiceError> {
        Ok(self.lock().load()?)
    }

    /// Rows that do not parse or whose ledger disagrees with their quantities.
    pub fn audit(&self) -> Result<Vec<AuditFinding>, ServiceError> {
        let findings: Vec<AuditFinding> = self
            .list()?
            .iter()
            .filter_map(|row| {
                let problem = match row.to_record() {
                    Ok(record) => record.check_conservation().err()?,
                    Err(err) => err,
                };
                Some(AuditFinding {
                    order_number: row.order_number.clone(),
                    problem,
                })
            })
            .collect();

        for finding in &findings {
            warn!(order_number = %finding.order_number, problem = %finding.problem, "audit finding");
        }
        Ok(findings)
    }

    /// Apply `command` to the record it targets and persist the result.
    fn update(
        &self,
        order_number: &OrderNumber,
        command: &InventoryCommand,
    ) -> Result<InventoryRecord, ServiceError> {
        let store = self.lock();
        let outcome = store.mutate(order_number, |row| {
            let current = row.to_record()?;
            let (next, events) = run_on_copy(&current, command)?;
            *row = RecordRow::from_record(&next);
            Ok::<_, ServiceError>((next, events))
        });

        let (record, events) = match outcome {
            Ok(Some(done)) => done,
            Ok(None) => return Err(DomainError::not_found(order_number.as_str()).into()),
            Err(err) => {
                warn!(order_number = %order_number, error = %err, "operation rejected");
                return Err(err);
            }
        };
        self.publish(events);
        Ok(record)
    }

    fn publish(&self, events: Vec<InventoryEvent>) {
        for event in events {
            let event_type = event.event_type();
            if let Err(err) = self.bus.publish(event) {
                warn!(event_type, error = ?err, "event publication failed");
            }
        }
    }
}
