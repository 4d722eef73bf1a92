use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use stockbook_core::{Aggregate, AggregateRoot, DomainError, DomainResult, Money, OrderNumber};
use stockbook_events::Event;

use crate::ledger::{LEDGER_TIME_FORMAT, OutboundEntry, OutboundLog, validate_label};
use crate::patch::RecordPatch;
use crate::registration::InboundRegistration;

/// Shipping state of a record, derived from its quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundStatus {
    NotShipped,
    PartiallyShipped,
    FullyShipped,
}

impl OutboundStatus {
    pub fn derive(remaining_quantity: u32, total_quantity: u32) -> Self {
        if remaining_quantity == 0 {
            OutboundStatus::FullyShipped
        } else if remaining_quantity < total_quantity {
            OutboundStatus::PartiallyShipped
        } else {
            OutboundStatus::NotShipped
        }
    }
}

/// Descriptive fields of an intake. None of these take part in stock accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDetails {
    pub supplier: String,
    pub inbound_time: String,
    pub barcode: String,
    pub product: String,
    pub unit: String,
    pub inbound_tracking: String,
    pub source: String,
    pub color: String,
    pub settlement_status: String,
    pub profit: String,
    pub note: String,
}

/// Price fields of a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    pub buy_price: Option<Money>,
    pub commission: Option<Money>,
    /// Buy price plus commission, fixed when the record is registered.
    pub settlement_price: Money,
    pub market_price: Option<Money>,
    pub shipping_price: Option<Money>,
}

/// Stock accounting state.
///
/// Invariant (conservation): `remaining_quantity + outbound_log.shipped_quantity()
/// == total_quantity` for every record created or shipped through this crate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockState {
    pub total_quantity: u32,
    pub remaining_quantity: u32,
    /// Cached `settlement_price / total_quantity`; older rows may lack it.
    pub unit_price: Option<Money>,
    pub remaining_value: Money,
    /// Counter of the first shipment; never overwritten afterwards.
    pub counter: String,
    /// Tracking number of the first shipment; never overwritten afterwards.
    pub tracking_number: String,
    pub outbound_log: OutboundLog,
}

/// Aggregate root: one inbound intake and everything shipped out of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryRecord {
    order_number: OrderNumber,
    details: RecordDetails,
    pricing: Pricing,
    stock: StockState,
    created: bool,
}

impl InventoryRecord {
    /// Not-yet-registered record, ready to handle a `Register` command.
    pub fn empty(order_number: OrderNumber) -> Self {
        Self {
            order_number,
            details: RecordDetails::default(),
            pricing: Pricing::default(),
            stock: StockState::default(),
            created: false,
        }
    }

    /// Rebuild a record from persisted parts.
    ///
    /// Only checks what every other operation relies on (`remaining <= total`);
    /// conservation against the ledger is reported by [`Self::check_conservation`].
    pub fn restore(
        order_number: OrderNumber,
        details: RecordDetails,
        pricing: Pricing,
        stock: StockState,
    ) -> DomainResult<Self> {
        if stock.remaining_quantity > stock.total_quantity {
            return Err(DomainError::invariant(format!(
                "record {order_number}: remaining quantity {} exceeds total {}",
                stock.remaining_quantity, stock.total_quantity
            )));
        }
        Ok(Self {
            order_number,
            details,
            pricing,
            stock,
            created: true,
        })
    }

    pub fn order_number(&self) -> &OrderNumber {
        &self.order_number
    }

    pub fn details(&self) -> &RecordDetails {
        &self.details
    }

    pub fn pricing(&self) -> &Pricing {
        &self.pricing
    }

    pub fn stock(&self) -> &StockState {
        &self.stock
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn total_quantity(&self) -> u32 {
        self.stock.total_quantity
    }

    pub fn remaining_quantity(&self) -> u32 {
        self.stock.remaining_quantity
    }

    pub fn remaining_value(&self) -> Money {
        self.stock.remaining_value
    }

    pub fn outbound_log(&self) -> &OutboundLog {
        &self.stock.outbound_log
    }

    pub fn outbound_status(&self) -> OutboundStatus {
        OutboundStatus::derive(self.stock.remaining_quantity, self.stock.total_quantity)
    }

    /// Cached unit price, or the value it would be cached as.
    pub fn effective_unit_price(&self) -> Money {
        self.stock
            .unit_price
            .unwrap_or_else(|| self.pricing.settlement_price.per_unit(self.stock.total_quantity))
    }

    /// Units that have left stock. Rows shipped by older versions carry no
    /// ledger entries, so this is not the ledger sum.
    pub fn shipped_quantity(&self) -> u32 {
        self.stock
            .total_quantity
            .saturating_sub(self.stock.remaining_quantity)
    }

    /// Units accounted for by the outbound ledger.
    pub fn logged_quantity(&self) -> u64 {
        self.stock.outbound_log.shipped_quantity()
    }

    pub fn is_conserved(&self) -> bool {
        u64::from(self.stock.remaining_quantity) + self.logged_quantity()
            == u64::from(self.stock.total_quantity)
    }

    pub fn check_conservation(&self) -> DomainResult<()> {
        if self.is_conserved() {
            return Ok(());
        }
        Err(DomainError::invariant(format!(
            "record {}: remaining {} + shipped {} != total {}",
            self.order_number,
            self.stock.remaining_quantity,
            self.logged_quantity(),
            self.stock.total_quantity
        )))
    }
}

impl AggregateRoot for InventoryRecord {
    type Id = OrderNumber;

    fn id(&self) -> &Self::Id {
        &self.order_number
    }
}

/// Command: Register (inbound intake).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Register {
    pub order_number: OrderNumber,
    pub registration: InboundRegistration,
    pub occurred_at: NaiveDateTime,
}

/// Command: Withdraw (partial outbound).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdraw {
    pub order_number: OrderNumber,
    pub quantity: u32,
    pub tracking_number: String,
    pub counter: String,
    pub occurred_at: NaiveDateTime,
}

/// Command: ShipAll (full outbound of whatever remains).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipAll {
    pub order_number: OrderNumber,
    pub tracking_number: String,
    pub counter: String,
    pub shipping_price: Option<Money>,
    pub occurred_at: NaiveDateTime,
}

/// Command: Modify (direct field edit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modify {
    pub order_number: OrderNumber,
    pub patch: RecordPatch,
    pub occurred_at: NaiveDateTime,
}

/// Command: Delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delete {
    pub order_number: OrderNumber,
    pub occurred_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryCommand {
    Register(Register),
    Withdraw(Withdraw),
    ShipAll(ShipAll),
    Modify(Modify),
    Delete(Delete),
}

/// Event: RecordRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRegistered {
    pub order_number: OrderNumber,
    pub details: RecordDetails,
    pub pricing: Pricing,
    pub quantity: u32,
    pub unit_price: Money,
    pub occurred_at: NaiveDateTime,
}

/// Event: StockWithdrawn. `entry` is exactly what gets appended to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockWithdrawn {
    pub order_number: OrderNumber,
    pub entry: OutboundEntry,
    pub shipping_price: Option<Money>,
}

/// Event: RecordModified. Carries the resolved values, not the raw patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordModified {
    pub order_number: OrderNumber,
    pub details: RecordDetails,
    pub pricing: Pricing,
    pub total_quantity: u32,
    pub unit_price: Money,
    pub changed: Vec<String>,
    pub occurred_at: NaiveDateTime,
}

/// Event: RecordDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDeleted {
    pub order_number: OrderNumber,
    pub occurred_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEvent {
    RecordRegistered(RecordRegistered),
    StockWithdrawn(StockWithdrawn),
    RecordModified(RecordModified),
    RecordDeleted(RecordDeleted),
}

impl InventoryEvent {
    pub fn order_number(&self) -> &OrderNumber {
        match self {
            InventoryEvent::RecordRegistered(e) => &e.order_number,
            InventoryEvent::StockWithdrawn(e) => &e.order_number,
            InventoryEvent::RecordModified(e) => &e.order_number,
            InventoryEvent::RecordDeleted(e) => &e.order_number,
        }
    }
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::RecordRegistered(_) => "inventory.record.registered",
            InventoryEvent::StockWithdrawn(_) => "inventory.record.stock_withdrawn",
            InventoryEvent::RecordModified(_) => "inventory.record.modified",
            InventoryEvent::RecordDeleted(_) => "inventory.record.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> NaiveDateTime {
        match self {
            InventoryEvent::RecordRegistered(e) => e.occurred_at,
            InventoryEvent::StockWithdrawn(e) => e.entry.timestamp,
            InventoryEvent::RecordModified(e) => e.occurred_at,
            InventoryEvent::RecordDeleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for InventoryRecord {
    type Command = InventoryCommand;
    type Event = InventoryEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InventoryEvent::RecordRegistered(e) => {
                self.order_number = e.order_number.clone();
                self.details = e.details.clone();
                self.pricing = e.pricing.clone();
                self.stock = StockState {
                    total_quantity: e.quantity,
                    remaining_quantity: e.quantity,
                    unit_price: Some(e.unit_price),
                    remaining_value: e.pricing.settlement_price.to_cents(),
                    ..StockState::default()
                };
                self.created = true;
            }
            InventoryEvent::StockWithdrawn(e) => {
                let stock = &mut self.stock;
                stock.remaining_quantity = stock.remaining_quantity.saturating_sub(e.entry.quantity);
                let unit_price = *stock.unit_price.get_or_insert(e.entry.unit_price);
                stock.remaining_value = unit_price.times(stock.remaining_quantity);

                if stock.counter.is_empty() {
                    stock.counter = e.entry.counter.clone();
                }
                if stock.tracking_number.is_empty() {
                    stock.tracking_number = e.entry.tracking_number.clone();
                }
                stock.outbound_log.push(e.entry.clone());

                if let Some(price) = e.shipping_price {
                    self.pricing.shipping_price = Some(price);
                }
            }
            InventoryEvent::RecordModified(e) => {
                self.details = e.details.clone();
                self.pricing = e.pricing.clone();

                let shipped = self.shipped_quantity();
                let stock = &mut self.stock;
                stock.total_quantity = e.total_quantity;
                stock.remaining_quantity = e.total_quantity.saturating_sub(shipped);
                stock.unit_price = Some(e.unit_price);
                stock.remaining_value = e.unit_price.times(stock.remaining_quantity);
            }
            InventoryEvent::RecordDeleted(_) => {
                self.created = false;
            }
        }
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InventoryCommand::Register(cmd) => self.handle_register(cmd),
            InventoryCommand::Withdraw(cmd) => self.handle_withdraw(cmd),
            InventoryCommand::ShipAll(cmd) => self.handle_ship_all(cmd),
            InventoryCommand::Modify(cmd) => self.handle_modify(cmd),
            InventoryCommand::Delete(cmd) => self.handle_delete(cmd),
        }
    }
}

impl InventoryRecord {
    fn ensure_existing(&self, order_number: &OrderNumber) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(order_number.as_str()));
        }
        if &self.order_number != order_number {
            return Err(DomainError::invariant("order_number mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &Register) -> Result<Vec<InventoryEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict(format!(
                "record {} already exists",
                cmd.order_number
            )));
        }
        let reg = &cmd.registration;
        reg.validate()?;

        let inbound_time = if reg.inbound_time.trim().is_empty() {
            cmd.occurred_at.format(LEDGER_TIME_FORMAT).to_string()
        } else {
            reg.inbound_time.clone()
        };
        let settlement_price = reg.settlement_price();

        Ok(vec![InventoryEvent::RecordRegistered(RecordRegistered {
            order_number: cmd.order_number.clone(),
            details: RecordDetails {
                supplier: reg.supplier.clone(),
                inbound_time,
                barcode: reg.barcode.clone(),
                product: reg.product.clone(),
                unit: reg.unit.clone(),
                inbound_tracking: reg.inbound_tracking.clone(),
                color: reg.color.clone(),
                settlement_status: reg.settlement_status.clone(),
                ..RecordDetails::default()
            },
            pricing: Pricing {
                buy_price: Some(reg.buy_price),
                commission: Some(reg.commission),
                settlement_price,
                ..Pricing::default()
            },
            quantity: reg.quantity,
            unit_price: settlement_price.per_unit(reg.quantity),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_withdraw(&self, cmd: &Withdraw) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_existing(&cmd.order_number)?;

        if cmd.quantity == 0 {
            return Err(DomainError::invalid_quantity("quantity must be a positive integer"));
        }
        validate_label("tracking number", &cmd.tracking_number)?;
        validate_label("counter", &cmd.counter)?;

        if cmd.quantity > self.stock.remaining_quantity {
            return Err(DomainError::InsufficientStock {
                requested: cmd.quantity,
                remaining: self.stock.remaining_quantity,
            });
        }

        Ok(vec![self.withdrawn(
            cmd.quantity,
            &cmd.tracking_number,
            &cmd.counter,
            None,
            cmd.occurred_at,
        )])
    }

    fn handle_ship_all(&self, cmd: &ShipAll) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_existing(&cmd.order_number)?;

        if self.stock.remaining_quantity == 0 {
            return Err(DomainError::AlreadyShipped(cmd.order_number.to_string()));
        }
        validate_label("tracking number", &cmd.tracking_number)?;
        validate_label("counter", &cmd.counter)?;
        if cmd.shipping_price.is_some_and(|p| p.is_negative()) {
            return Err(DomainError::validation("shipping price cannot be negative"));
        }

        Ok(vec![self.withdrawn(
            self.stock.remaining_quantity,
            &cmd.tracking_number,
            &cmd.counter,
            cmd.shipping_price,
            cmd.occurred_at,
        )])
    }

    fn withdrawn(
        &self,
        quantity: u32,
        tracking_number: &str,
        counter: &str,
        shipping_price: Option<Money>,
        occurred_at: NaiveDateTime,
    ) -> InventoryEvent {
        InventoryEvent::StockWithdrawn(StockWithdrawn {
            order_number: self.order_number.clone(),
            entry: OutboundEntry {
                timestamp: occurred_at,
                counter: counter.to_string(),
                tracking_number: tracking_number.to_string(),
                quantity,
                unit_price: self.effective_unit_price(),
            },
            shipping_price,
        })
    }

    fn handle_modify(&self, cmd: &Modify) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_existing(&cmd.order_number)?;

        let patch = &cmd.patch;
        if patch.is_empty() {
            return Err(DomainError::validation("nothing to modify"));
        }

        let total_quantity = patch.quantity.unwrap_or(self.stock.total_quantity);
        if total_quantity == 0 {
            return Err(DomainError::invalid_quantity("quantity must be a positive integer"));
        }
        let shipped = self.shipped_quantity();
        if total_quantity < shipped {
            return Err(DomainError::invalid_quantity(format!(
                "quantity {total_quantity} is below the {shipped} units already shipped"
            )));
        }

        let mut details = self.details.clone();
        patch.apply_details(&mut details);
        let pricing = self.modified_pricing(patch)?;
        let unit_price = pricing.settlement_price.per_unit(total_quantity);

        Ok(vec![InventoryEvent::RecordModified(RecordModified {
            order_number: self.order_number.clone(),
            details,
            pricing,
            total_quantity,
            unit_price,
            changed: patch.changed_fields().into_iter().map(str::to_string).collect(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn modified_pricing(&self, patch: &RecordPatch) -> Result<Pricing, DomainError> {
        let current = &self.pricing;
        let buy_price = patch.buy_price.or(current.buy_price);
        let commission = patch.commission.or(current.commission);

        for (name, value) in [
            ("buy price", patch.buy_price),
            ("commission", patch.commission),
            ("market price", patch.market_price),
            ("shipping price", patch.shipping_price),
        ] {
            if value.is_some_and(|v| v.is_negative()) {
                return Err(DomainError::validation(format!("{name} cannot be negative")));
            }
        }

        let settlement_price = match (buy_price, commission) {
            (Some(buy), Some(commission)) => (buy + commission).to_cents(),
            _ if patch.buy_price.is_some() || patch.commission.is_some() => {
                return Err(DomainError::validation(
                    "buy price and commission are both required to recompute the settlement price",
                ));
            }
            _ => current.settlement_price,
        };

        Ok(Pricing {
            buy_price,
            commission,
            settlement_price,
            market_price: patch.market_price.or(current.market_price),
            shipping_price: patch.shipping_price.or(current.shipping_price),
        })
    }

    fn handle_delete(&self, cmd: &Delete) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_existing(&cmd.order_number)?;
        Ok(vec![InventoryEvent::RecordDeleted(RecordDeleted {
            order_number: cmd.order_number.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use stockbook_events::execute;

    fn test_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn order() -> OrderNumber {
        "ORDER001".parse().unwrap()
    }

    fn registration(buy: Money, commission: Money, quantity: u32) -> InboundRegistration {
        InboundRegistration {
            supplier: "SupplierA".to_string(),
            product: "ProductA".to_string(),
            unit: "pcs".to_string(),
            buy_price: buy,
            commission,
            quantity,
            ..InboundRegistration::default()
        }
    }

    fn registered(quantity: u32) -> InventoryRecord {
        let mut record = InventoryRecord::empty(order());
        execute(
            &mut record,
            &InventoryCommand::Register(Register {
                order_number: order(),
                registration: registration(Money::new(dec!(90)), Money::new(dec!(10)), quantity),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        record
    }

    fn withdraw(quantity: u32, tracking: &str, counter: &str) -> InventoryCommand {
        InventoryCommand::Withdraw(Withdraw {
            order_number: order(),
            quantity,
            tracking_number: tracking.to_string(),
            counter: counter.to_string(),
            occurred_at: test_time(),
        })
    }

    #[test]
    fn register_computes_settlement_and_unit_price() {
        let record = registered(20);

        assert_eq!(record.pricing().settlement_price, Money::new(dec!(100)));
        assert_eq!(record.stock().unit_price, Some(Money::new(dec!(5))));
        assert_eq!(record.remaining_quantity(), 20);
        assert_eq!(record.remaining_value(), Money::new(dec!(100)));
        assert_eq!(record.outbound_status(), OutboundStatus::NotShipped);
        assert_eq!(record.details().inbound_time, "2024-05-01 09:30:00");
        assert!(record.outbound_log().is_empty());
    }

    #[test]
    fn register_twice_is_a_conflict() {
        let record = registered(20);
        let err = record
            .handle(&InventoryCommand::Register(Register {
                order_number: order(),
                registration: registration(Money::new(dec!(1)), Money::ZERO, 1),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn commands_on_unregistered_record_are_not_found() {
        let record = InventoryRecord::empty(order());
        let err = record.handle(&withdraw(1, "T1", "C1")).unwrap_err();
        assert_eq!(err, DomainError::NotFound("ORDER001".to_string()));
    }

    #[test]
    fn zero_quantity_is_rejected_before_stock_check() {
        let record = registered(20);
        let err = record.handle(&withdraw(0, "T1", "C1")).unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity(_)));
    }

    #[test]
    fn withdrawal_with_blank_labels_is_rejected() {
        let record = registered(20);
        assert!(matches!(
            record.handle(&withdraw(1, "", "C1")).unwrap_err(),
            DomainError::Validation(_)
        ));
        assert!(matches!(
            record.handle(&withdraw(1, "T1", " ")).unwrap_err(),
            DomainError::Validation(_)
        ));
    }

    #[test]
    fn withdrawal_lazily_caches_missing_unit_price() {
        let mut legacy = InventoryRecord::restore(
            order(),
            RecordDetails::default(),
            Pricing {
                settlement_price: Money::new(dec!(100)),
                ..Pricing::default()
            },
            StockState {
                total_quantity: 20,
                remaining_quantity: 20,
                unit_price: None,
                remaining_value: Money::new(dec!(100)),
                ..StockState::default()
            },
        )
        .unwrap();

        execute(&mut legacy, &withdraw(4, "T1", "C1")).unwrap();

        assert_eq!(legacy.stock().unit_price, Some(Money::new(dec!(5))));
        assert_eq!(legacy.remaining_value(), Money::new(dec!(80)));
        assert_eq!(legacy.outbound_log().entries()[0].unit_price, Money::new(dec!(5)));
    }

    #[test]
    fn ship_all_appends_the_whole_remainder_to_the_ledger() {
        let mut record = registered(20);
        execute(&mut record, &withdraw(5, "T1", "C1")).unwrap();

        execute(
            &mut record,
            &InventoryCommand::ShipAll(ShipAll {
                order_number: order(),
                tracking_number: "T2".to_string(),
                counter: "C2".to_string(),
                shipping_price: Some(Money::new(dec!(12))),
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        assert_eq!(record.remaining_quantity(), 0);
        assert_eq!(record.remaining_value(), Money::ZERO);
        assert_eq!(record.outbound_status(), OutboundStatus::FullyShipped);
        assert_eq!(record.outbound_log().entries()[1].quantity, 15);
        assert_eq!(record.pricing().shipping_price, Some(Money::new(dec!(12))));
        assert_eq!(record.stock().counter, "C1");
        assert!(record.is_conserved());
    }

    #[test]
    fn ship_all_on_shipped_record_is_rejected() {
        let mut record = registered(2);
        execute(&mut record, &withdraw(2, "T1", "C1")).unwrap();

        let err = record
            .handle(&InventoryCommand::ShipAll(ShipAll {
                order_number: order(),
                tracking_number: "T2".to_string(),
                counter: "C2".to_string(),
                shipping_price: None,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::AlreadyShipped("ORDER001".to_string()));
    }

    #[test]
    fn modify_recomputes_prices_and_keeps_conservation() {
        let mut record = registered(20);
        execute(&mut record, &withdraw(5, "T1", "C1")).unwrap();

        execute(
            &mut record,
            &InventoryCommand::Modify(Modify {
                order_number: order(),
                patch: RecordPatch {
                    commission: Some(Money::new(dec!(30))),
                    quantity: Some(30),
                    ..RecordPatch::default()
                },
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        assert_eq!(record.pricing().settlement_price, Money::new(dec!(120)));
        assert_eq!(record.stock().unit_price, Some(Money::new(dec!(4))));
        assert_eq!(record.remaining_quantity(), 25);
        assert_eq!(record.remaining_value(), Money::new(dec!(100)));
        assert!(record.is_conserved());
    }

    #[test]
    fn modify_cannot_drop_quantity_below_shipped() {
        let mut record = registered(20);
        execute(&mut record, &withdraw(12, "T1", "C1")).unwrap();

        let err = record
            .handle(&InventoryCommand::Modify(Modify {
                order_number: order(),
                patch: RecordPatch {
                    quantity: Some(10),
                    ..RecordPatch::default()
                },
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity(_)));
    }

    fn modify(patch: RecordPatch) -> InventoryCommand {
        InventoryCommand::Modify(Modify {
            order_number: order(),
            patch,
            occurred_at: test_time(),
        })
    }

    #[test]
    fn modify_keeps_stock_of_rows_shipped_without_ledger() {
        let mut sold = InventoryRecord::restore(
            order(),
            RecordDetails::default(),
            Pricing {
                settlement_price: Money::new(dec!(100)),
                ..Pricing::default()
            },
            StockState {
                total_quantity: 20,
                remaining_quantity: 0,
                ..StockState::default()
            },
        )
        .unwrap();
        assert_eq!(sold.shipped_quantity(), 20);

        execute(
            &mut sold,
            &modify(RecordPatch {
                note: Some("hello".to_string()),
                ..RecordPatch::default()
            }),
        )
        .unwrap();
        assert_eq!(sold.remaining_quantity(), 0);
        assert_eq!(sold.remaining_value(), Money::ZERO);
        assert_eq!(sold.outbound_status(), OutboundStatus::FullyShipped);

        let err = sold
            .handle(&modify(RecordPatch {
                quantity: Some(10),
                ..RecordPatch::default()
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity(_)));

        execute(
            &mut sold,
            &modify(RecordPatch {
                quantity: Some(25),
                ..RecordPatch::default()
            }),
        )
        .unwrap();
        assert_eq!(sold.remaining_quantity(), 5);
        assert_eq!(sold.outbound_status(), OutboundStatus::PartiallyShipped);
    }

    #[test]
    fn modify_needs_both_price_parts_on_legacy_rows() {
        let legacy = InventoryRecord::restore(
            order(),
            RecordDetails::default(),
            Pricing {
                settlement_price: Money::new(dec!(50)),
                ..Pricing::default()
            },
            StockState {
                total_quantity: 5,
                remaining_quantity: 5,
                remaining_value: Money::new(dec!(50)),
                ..StockState::default()
            },
        )
        .unwrap();

        let err = legacy
            .handle(&InventoryCommand::Modify(Modify {
                order_number: order(),
                patch: RecordPatch {
                    buy_price: Some(Money::new(dec!(40))),
                    ..RecordPatch::default()
                },
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn restore_rejects_remaining_above_total() {
        let err = InventoryRecord::restore(
            order(),
            RecordDetails::default(),
            Pricing::default(),
            StockState {
                total_quantity: 3,
                remaining_quantity: 4,
                ..StockState::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn delete_marks_record_gone() {
        let mut record = registered(1);
        let events = execute(
            &mut record,
            &InventoryCommand::Delete(Delete {
                order_number: order(),
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        assert_eq!(events[0].event_type(), "inventory.record.deleted");
        assert!(!record.is_created());
    }
}
