//! Inventory domain: records, their outbound ledger, and inbound registration.
//!
//! Pure business rules implemented as deterministic domain logic (no IO, no
//! storage). Persistence lives in `stockbook-infra`.

pub mod ledger;
pub mod patch;
pub mod record;
pub mod registration;
pub mod withdrawal;

pub use ledger::{LEDGER_TIME_FORMAT, OutboundEntry, OutboundLog, validate_label};
pub use patch::RecordPatch;
pub use record::{
    Delete, InventoryCommand, InventoryEvent, InventoryRecord, Modify, OutboundStatus, Pricing,
    RecordDeleted, RecordDetails, RecordModified, RecordRegistered, Register, ShipAll,
    StockState, StockWithdrawn, Withdraw,
};
pub use registration::{
    BulkInbound, BulkLine, InboundRegistration, LineError, SETTLED, UNSETTLED, parse_quantity,
};
pub use withdrawal::{apply_withdrawal, run_on_copy, ship_all};
