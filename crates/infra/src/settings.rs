//! Business preferences persisted as `settings.json`.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use stockbook_core::Money;

use crate::fs::{AtomicWriteError, write_atomic};

pub const DEFAULT_TABLE: &str = "default";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("reading settings {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("settings {path} are not valid JSON: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Persist(#[from] AtomicWriteError),

    #[error("{0}")]
    Invalid(String),
}

/// Page whose visible columns can be configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    Inbound,
    Outbound,
    DataQuery,
}

impl Page {
    pub fn default_columns(self) -> &'static [&'static str] {
        match self {
            Page::Inbound => &["入库快递单号", "货商姓名", "商品名称", "商品数量", "入库时间", "颜色/配置"],
            Page::Outbound => &[
                "单号",
                "商品名称",
                "商品数量",
                "剩余数量",
                "剩余价值",
                "颜色/配置",
                "货商姓名",
                "入库时间",
            ],
            Page::DataQuery => &[
                "单号",
                "货商姓名",
                "入库时间",
                "商品名称",
                "商品数量",
                "买价",
                "佣金",
                "结算价",
                "出库状态",
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupSettings {
    pub enabled: bool,
    pub backup_on_operation: bool,
    pub auto_backup_interval_hours: u64,
    pub max_backups: usize,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            backup_on_operation: true,
            auto_backup_interval_hours: 24,
            max_backups: 10,
        }
    }
}

/// Values prefilled on the inbound form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub buy_price: Option<Money>,
    pub commission: Option<Money>,
    pub quantity: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub suppliers: Vec<String>,
    pub counters: Vec<String>,
    pub tables: Vec<String>,
    pub active_table: String,
    pub defaults: Defaults,
    pub display_columns: BTreeMap<Page, Vec<String>>,
    pub backup: BackupSettings,
    pub barcode_mappings: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            suppliers: Vec::new(),
            counters: Vec::new(),
            tables: vec![DEFAULT_TABLE.to_string()],
            active_table: DEFAULT_TABLE.to_string(),
            defaults: Defaults::default(),
            display_columns: BTreeMap::new(),
            backup: BackupSettings::default(),
            barcode_mappings: BTreeMap::new(),
        }
    }
}

/// A named list edited by add/rename/delete (suppliers, counters).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameList {
    Suppliers,
    Counters,
}

impl Settings {
    fn list_mut(&mut self, list: NameList) -> &mut Vec<String> {
        match list {
            NameList::Suppliers => &mut self.suppliers,
            NameList::Counters => &mut self.counters,
        }
    }

    pub fn list(&self, list: NameList) -> &[String] {
        match list {
            NameList::Suppliers => &self.suppliers,
            NameList::Counters => &self.counters,
        }
    }

    /// Returns whether the name was added (blank and duplicate names are ignored).
    pub fn add_name(&mut self, list: NameList, name: &str) -> bool {
        let name = name.trim();
        let names = self.list_mut(list);
        if name.is_empty() || names.iter().any(|n| n == name) {
            return false;
        }
        names.push(name.to_string());
        true
    }

    /// Rename in place, keeping position. Refused when `new` is blank or taken.
    pub fn rename_name(&mut self, list: NameList, old: &str, new: &str) -> bool {
        let new = new.trim();
        let names = self.list_mut(list);
        if new.is_empty() || names.iter().any(|n| n == new) {
            return false;
        }
        match names.iter_mut().find(|n| n.as_str() == old.trim()) {
            Some(slot) => {
                *slot = new.to_string();
                true
            }
            None => false,
        }
    }

    pub fn remove_name(&mut self, list: NameList, name: &str) -> bool {
        let names = self.list_mut(list);
        let before = names.len();
        names.retain(|n| n != name.trim());
        names.len() != before
    }

    pub fn display_columns(&self, page: Page) -> Vec<String> {
        match self.display_columns.get(&page) {
            Some(columns) if !columns.is_empty() => columns.clone(),
            _ => page.default_columns().iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn set_display_columns(&mut self, page: Page, columns: Vec<String>) -> Result<(), SettingsError> {
        if columns.is_empty() {
            return Err(SettingsError::Invalid("at least one column must be displayed".into()));
        }
        self.display_columns.insert(page, columns);
        Ok(())
    }

    pub fn reset_display_columns(&mut self, page: Page) {
        self.display_columns.remove(&page);
    }

    /// Product bound to `barcode`, if any.
    pub fn product_for_barcode(&self, barcode: &str) -> Option<&str> {
        self.barcode_mappings
            .get(barcode.trim())
            .map(String::as_str)
            .filter(|product| !product.is_empty())
    }

    pub fn set_barcode_mapping(&mut self, barcode: &str, product: &str) -> Result<(), SettingsError> {
        let barcode = barcode.trim();
        if barcode.is_empty() {
            return Err(SettingsError::Invalid("barcode cannot be empty".into()));
        }
        self.barcode_mappings
            .insert(barcode.to_string(), product.trim().to_string());
        Ok(())
    }

    pub fn remove_barcode_mapping(&mut self, barcode: &str) -> bool {
        self.barcode_mappings.remove(barcode.trim()).is_some()
    }

    fn normalized(mut self) -> Self {
        self.barcode_mappings = std::mem::take(&mut self.barcode_mappings)
            .into_iter()
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .filter(|(k, _)| !k.is_empty())
            .collect();
        self
    }
}

/// Loads and saves [`Settings`]; every save rewrites the whole file atomically.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, writing the defaults when the file does not exist yet.
    pub fn load(&self) -> Result<Settings, SettingsError> {
        if !self.path.exists() {
            let settings = Settings::default();
            self.save(&settings)?;
            return Ok(settings);
        }

        let bytes = std::fs::read(&self.path).map_err(|source| SettingsError::Io {
            path: self.path.clone(),
            source,
        })?;
        let settings: Settings = serde_json::from_slice(&bytes).map_err(|source| SettingsError::Json {
            path: self.path.clone(),
            source,
        })?;
        Ok(settings.normalized())
    }

    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let dir = crate::fs::parent_dir(&self.path);
        std::fs::create_dir_all(dir).map_err(|source| SettingsError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let bytes = serde_json::to_vec_pretty(&settings.clone().normalized()).map_err(|source| {
            SettingsError::Json {
                path: self.path.clone(),
                source,
            }
        })?;
        write_atomic(&self.path, &bytes)?;
        Ok(())
    }

    /// Load, apply `f`, save. Returns what `f` returned.
    pub fn update<T>(
        &self,
        what: &str,
        f: impl FnOnce(&mut Settings) -> Result<T, SettingsError>,
    ) -> Result<T, SettingsError> {
        let mut settings = self.load()?;
        let out = f(&mut settings)?;
        self.save(&settings)?;
        info!(change = what, "settings updated");
        Ok(out)
    }
}
