//! Table catalog: which tables exist and which one is active.
//!
//! Tables are `<data_dir>/<name>.csv`; the list and the active table live in
//! settings. Deleting a table forgets it but keeps its file.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::settings::{SettingsError, SettingsStore};
use crate::table::{StoreError, TableStore};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("renaming table file {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("invalid table name {0:?}")]
    InvalidName(String),

    #[error("table {0:?} does not exist")]
    NotFound(String),

    #[error("table {0:?} already exists")]
    Exists(String),

    #[error("cannot delete the last table {0:?}")]
    LastTable(String),
}

#[derive(Debug, Clone)]
pub struct TableCatalog {
    data_dir: PathBuf,
    settings: SettingsStore,
}

impl TableCatalog {
    pub fn new(data_dir: impl Into<PathBuf>, settings: SettingsStore) -> Self {
        Self {
            data_dir: data_dir.into(),
            settings,
        }
    }

    pub fn table_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{name}.csv"))
    }

    pub fn list(&self) -> Result<Vec<String>, CatalogError> {
        Ok(self.settings.load()?.tables)
    }

    pub fn active(&self) -> Result<String, CatalogError> {
        Ok(self.settings.load()?.active_table)
    }

    /// Open (creating if needed) the active table.
    pub fn open_active(&self) -> Result<(String, TableStore), CatalogError> {
        let name = self.active()?;
        let store = TableStore::open(self.table_path(&name))?;
        Ok((name, store))
    }

    pub fn add(&self, name: &str) -> Result<(), CatalogError> {
        let name = validate_name(name)?;
        self.settings.update("table.add", |settings| {
            if settings.tables.iter().any(|t| t == name) {
                return Err(SettingsError::Invalid(format!("table {name:?} already exists")));
            }
            settings.tables.push(name.to_string());
            Ok(())
        })?;
        TableStore::open(self.table_path(name))?;
        info!(table = name, "table added");
        Ok(())
    }

    /// Rename a table and its file. Refused when the target name or file exists.
    pub fn rename(&self, old: &str, new: &str) -> Result<(), CatalogError> {
        let new = validate_name(new)?;
        let tables = self.list()?;
        if !tables.iter().any(|t| t == old) {
            return Err(CatalogError::NotFound(old.to_string()));
        }
        let (from, to) = (self.table_path(old), self.table_path(new));
        if tables.iter().any(|t| t == new) || to.exists() {
            return Err(CatalogError::Exists(new.to_string()));
        }

        if from.exists() {
            std::fs::rename(&from, &to).map_err(|source| CatalogError::Io {
                path: from.clone(),
                source,
            })?;
        }
        self.settings.update("table.rename", |settings| {
            for table in settings.tables.iter_mut().filter(|t| t.as_str() == old) {
                *table = new.to_string();
            }
            if settings.active_table == old {
                settings.active_table = new.to_string();
            }
            Ok(())
        })?;
        info!(from = old, to = new, "table renamed");
        Ok(())
    }

    /// Forget a table. Its file stays on disk.
    pub fn delete(&self, name: &str) -> Result<(), CatalogError> {
        let tables = self.list()?;
        if !tables.iter().any(|t| t == name) {
            return Err(CatalogError::NotFound(name.to_string()));
        }
        if tables.len() == 1 {
            return Err(CatalogError::LastTable(name.to_string()));
        }

        self.settings.update("table.delete", |settings| {
            settings.tables.retain(|t| t != name);
            if settings.active_table == name {
                settings.active_table = settings.tables.first().cloned().unwrap_or_default();
            }
            Ok(())
        })?;
        info!(table = name, "table removed from catalog");
        Ok(())
    }

    pub fn switch(&self, name: &str) -> Result<(), CatalogError> {
        if !self.list()?.iter().any(|t| t == name) {
            return Err(CatalogError::NotFound(name.to_string()));
        }
        self.settings.update("table.switch", |settings| {
            settings.active_table = name.to_string();
            Ok(())
        })?;
        info!(table = name, "active table switched");
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<&str, CatalogError> {
    let trimmed = name.trim();
    let bad = trimmed.is_empty()
        || trimmed.starts_with('.')
        || trimmed.contains(['/', '\\', ':'])
        || trimmed.chars().any(char::is_control);
    if bad {
        return Err(CatalogError::InvalidName(name.to_string()));
    }
    Ok(trimmed)
}
