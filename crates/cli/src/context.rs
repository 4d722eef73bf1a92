use std::sync::Arc;

use anyhow::{Context as _, Result, bail};
use chrono::{Local, NaiveDateTime};
use tracing::debug;

use stockbook_events::{Event, EventBus, InMemoryEventBus, Subscription};
use stockbook_infra::settings::Settings;
use stockbook_infra::{AppConfig, BackupManager, InventoryService, SettingsStore, TableCatalog};
use stockbook_inventory::InventoryEvent;

pub type Bus = Arc<InMemoryEventBus<InventoryEvent>>;

/// Everything a command needs, built once per invocation.
pub struct AppContext {
    pub config: AppConfig,
    pub settings: SettingsStore,
    pub catalog: TableCatalog,
    pub backups: BackupManager,
    pub json: bool,
    table_override: Option<String>,
    bus: Bus,
    events: Subscription<InventoryEvent>,
}

impl AppContext {
    pub fn new(config: AppConfig, table_override: Option<String>, json: bool) -> Result<Self> {
        config
            .ensure_dirs()
            .context("failed to create data directories")?;

        let settings = SettingsStore::new(config.settings_path());
        let catalog = TableCatalog::new(&config.data_dir, settings.clone());
        let backups = BackupManager::new(&config.data_dir, &config.backup_dir);
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        let events = bus.subscribe();

        Ok(Self {
            config,
            settings,
            catalog,
            backups,
            json,
            table_override,
            bus,
            events,
        })
    }

    pub fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    pub fn load_settings(&self) -> Result<Settings> {
        self.settings.load().context("failed to load settings")
    }

    /// Table chosen with `--table`, or the active one.
    pub fn table(&self) -> Result<String> {
        match &self.table_override {
            Some(name) => {
                let tables = self.catalog.list()?;
                if !tables.iter().any(|t| t == name) {
                    bail!("unknown table {name:?} (known: {})", tables.join(", "));
                }
                Ok(name.clone())
            }
            None => Ok(self.catalog.active()?),
        }
    }

    pub fn service(&self) -> Result<(String, InventoryService<Bus>)> {
        let table = self.table()?;
        let store = stockbook_infra::TableStore::open(self.catalog.table_path(&table))
            .with_context(|| format!("failed to open table {table:?}"))?;
        let service = InventoryService::open(store, self.bus.clone())
            .with_context(|| format!("failed to read table {table:?}"))?;
        Ok((table, service))
    }

    /// Backup before a mutating operation, when enabled in settings.
    pub fn backup_before(&self, table: &str, operation: &str) -> Result<()> {
        let settings = self.load_settings()?;
        if !self.catalog.table_path(table).exists() {
            return Ok(());
        }
        self.backups
            .backup_on_operation(table, operation, &settings.backup, self.now())
            .with_context(|| format!("failed to back up table {table:?} before {operation}"))?;
        Ok(())
    }

    /// Log the events published during this invocation.
    pub fn flush_events(&self) {
        for event in self.events.drain() {
            debug!(
                event_type = event.event_type(),
                order_number = %event.order_number(),
                "event published"
            );
        }
    }
}
