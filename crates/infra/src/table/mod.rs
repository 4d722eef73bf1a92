//! CSV-backed inventory tables.
//!
//! One file per table, one row per inventory record, all cells stored as text.

pub mod row;
pub mod store;

pub use row::{HEADER, RecordRow, parse_status, status_label};
pub use store::{StoreError, TableStore};
