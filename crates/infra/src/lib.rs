//! Infrastructure layer: CSV tables, settings, config, backups and the
//! service that ties them to the inventory domain.

pub mod backup;
pub mod catalog;
pub mod config;
pub mod fs;
pub mod queries;
pub mod service;
pub mod settings;
pub mod table;
pub mod workers;

pub use backup::{BackupError, BackupInfo, BackupManager};
pub use catalog::{CatalogError, TableCatalog};
pub use config::AppConfig;
pub use service::{AuditFinding, BulkOutcome, InventoryService, ServiceError};
pub use settings::{BackupSettings, Settings, SettingsError, SettingsStore};
pub use table::{RecordRow, StoreError, TableStore};
