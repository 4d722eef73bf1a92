//! Table backups: timestamped copies with a JSON sidecar, pruned to a limit.

use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::fs::{AtomicWriteError, write_atomic};
use crate::settings::BackupSettings;

const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("backup io error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("backup metadata {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Persist(#[from] AtomicWriteError),

    #[error("table file {0} does not exist")]
    MissingTable(PathBuf),

    #[error("invalid backup file name {0:?}")]
    InvalidName(String),

    #[error("backup {0:?} not found")]
    NotFound(String),
}

/// Sidecar describing one backup file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupInfo {
    pub file_name: String,
    pub table: String,
    pub kind: String,
    /// `YYYYmmdd_HHMMSS`, local time.
    pub created_at: String,
    #[serde(default)]
    pub size_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct BackupManager {
    data_dir: PathBuf,
    backup_dir: PathBuf,
}

impl BackupManager {
    pub fn new(data_dir: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            backup_dir: backup_dir.into(),
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.data_dir.join(format!("{table}.csv"))
    }

    fn io_err(path: &Path) -> impl FnOnce(io::Error) -> BackupError + '_ {
        move |source| BackupError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Copy `<table>.csv` to `<table>_<stamp>_<kind>.csv`, write its sidecar,
    /// then prune to `settings.max_backups`.
    pub fn create_backup(
        &self,
        table: &str,
        kind: &str,
        settings: &BackupSettings,
        now: NaiveDateTime,
    ) -> Result<BackupInfo, BackupError> {
        let source = self.table_path(table);
        if !source.exists() {
            return Err(BackupError::MissingTable(source));
        }
        std::fs::create_dir_all(&self.backup_dir).map_err(Self::io_err(&self.backup_dir))?;

        let created_at = now.format(STAMP_FORMAT).to_string();
        let file_name = format!("{table}_{created_at}_{kind}.csv");
        let target = self.backup_dir.join(&file_name);
        let size_bytes = std::fs::copy(&source, &target).map_err(Self::io_err(&target))?;

        let info = BackupInfo {
            file_name,
            table: table.to_string(),
            kind: kind.to_string(),
            created_at,
            size_bytes,
        };
        let sidecar = sidecar_path(&target);
        let bytes = serde_json::to_vec_pretty(&info).map_err(|source| BackupError::Json {
            path: sidecar.clone(),
            source,
        })?;
        write_atomic(&sidecar, &bytes)?;

        info!(table, kind, file = %info.file_name, "backup created");
        self.prune(settings.max_backups)?;
        Ok(info)
    }

    /// Backup taken before a mutating operation, when enabled in settings.
    pub fn backup_on_operation(
        &self,
        table: &str,
        operation: &str,
        settings: &BackupSettings,
        now: NaiveDateTime,
    ) -> Result<Option<BackupInfo>, BackupError> {
        if !(settings.enabled && settings.backup_on_operation) {
            return Ok(None);
        }
        self.create_backup(table, &format!("operation_{operation}"), settings, now)
            .map(Some)
    }

    /// All backups, newest first.
    pub fn list(&self) -> Result<Vec<BackupInfo>, BackupError> {
        if !self.backup_dir.exists() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();
        let entries = std::fs::read_dir(&self.backup_dir).map_err(Self::io_err(&self.backup_dir))?;
        for entry in entries {
            let path = entry.map_err(Self::io_err(&self.backup_dir))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            backups.push(self.describe(&path)?);
        }

        backups.sort_by(|a, b| {
            (b.created_at.as_str(), b.file_name.as_str()).cmp(&(a.created_at.as_str(), a.file_name.as_str()))
        });
        Ok(backups)
    }

    /// Sidecar contents, or what can be inferred from the file itself.
    fn describe(&self, path: &Path) -> Result<BackupInfo, BackupError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let metadata = std::fs::metadata(path).map_err(Self::io_err(path))?;

        let sidecar = sidecar_path(path);
        if let Ok(bytes) = std::fs::read(&sidecar) {
            match serde_json::from_slice::<BackupInfo>(&bytes) {
                Ok(info) => {
                    return Ok(BackupInfo {
                        size_bytes: metadata.len(),
                        ..info
                    });
                }
                Err(err) => warn!(file = %sidecar.display(), error = %err, "ignoring unreadable backup sidecar"),
            }
        }

        let created_at = metadata
            .modified()
            .map(|t| {
                chrono::DateTime::<chrono::Local>::from(t)
                    .naive_local()
                    .format(STAMP_FORMAT)
                    .to_string()
            })
            .unwrap_or_default();
        Ok(BackupInfo {
            file_name,
            table: String::new(),
            kind: String::new(),
            created_at,
            size_bytes: metadata.len(),
        })
    }

    /// Keep the newest `max_backups` (at least one); delete the rest with their sidecars.
    pub fn prune(&self, max_backups: usize) -> Result<usize, BackupError> {
        let stale: Vec<BackupInfo> = self.list()?.into_iter().skip(max_backups.max(1)).collect();
        for info in &stale {
            self.remove_files(&info.file_name)?;
            info!(file = %info.file_name, "old backup pruned");
        }
        Ok(stale.len())
    }

    /// Replace `<table>.csv` with a backup, after backing up the current file.
    pub fn restore(
        &self,
        table: &str,
        file_name: &str,
        settings: &BackupSettings,
        now: NaiveDateTime,
    ) -> Result<(), BackupError> {
        let path = self.backup_path(file_name)?;
        let bytes = std::fs::read(&path).map_err(Self::io_err(&path))?;

        if self.table_path(table).exists() {
            self.create_backup(table, "before_restore", settings, now)?;
        }
        std::fs::create_dir_all(&self.data_dir).map_err(Self::io_err(&self.data_dir))?;
        write_atomic(&self.table_path(table), &bytes)?;

        info!(table, file = file_name, "backup restored");
        Ok(())
    }

    pub fn delete(&self, file_name: &str) -> Result<(), BackupError> {
        self.backup_path(file_name)?;
        self.remove_files(file_name)?;
        info!(file = file_name, "backup deleted");
        Ok(())
    }

    /// Path of an existing backup, refusing anything outside the backup dir.
    fn backup_path(&self, file_name: &str) -> Result<PathBuf, BackupError> {
        let valid = file_name.ends_with(".csv")
            && !file_name.starts_with('.')
            && !file_name.contains(['/', '\\'])
            && Path::new(file_name).file_name().is_some();
        if !valid {
            return Err(BackupError::InvalidName(file_name.to_string()));
        }
        let path = self.backup_dir.join(file_name);
        if !path.is_file() {
            return Err(BackupError::NotFound(file_name.to_string()));
        }
        Ok(path)
    }

    fn remove_files(&self, file_name: &str) -> Result<(), BackupError> {
        let path = self.backup_dir.join(file_name);
        std::fs::remove_file(&path).map_err(Self::io_err(&path))?;
        let sidecar = sidecar_path(&path);
        if sidecar.exists() {
            std::fs::remove_file(&sidecar).map_err(Self::io_err(&sidecar))?;
        }
        Ok(())
    }
}

fn sidecar_path(backup: &Path) -> PathBuf {
    backup.with_extension("json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 8, 1)
            .unwrap()
            .and_hms_opt(12, 0, second)
            .unwrap()
    }

    fn setup() -> (tempfile::TempDir, BackupManager) {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::write(data.join("default.csv"), "v1").unwrap();
        let manager = BackupManager::new(data, dir.path().join("backups"));
        (dir, manager)
    }

    #[test]
    fn create_writes_copy_and_sidecar() {
        let (_dir, manager) = setup();

        let info = manager
            .create_backup("default", "manual", &BackupSettings::default(), at(0))
            .unwrap();

        assert_eq!(info.file_name, "default_20240801_120000_manual.csv");
        let copy = manager.backup_dir().join(&info.file_name);
        assert_eq!(std::fs::read_to_string(&copy).unwrap(), "v1");
        assert!(copy.with_extension("json").exists());
        assert_eq!(manager.list().unwrap(), vec![info]);
    }

    #[test]
    fn prune_keeps_newest_and_drops_sidecars() {
        let (_dir, manager) = setup();
        let settings = BackupSettings {
            max_backups: 2,
            ..BackupSettings::default()
        };

        for second in 0..4 {
            manager.create_backup("default", "auto", &settings, at(second)).unwrap();
        }

        let names: Vec<_> = manager.list().unwrap().into_iter().map(|b| b.file_name).collect();
        assert_eq!(
            names,
            vec!["default_20240801_120003_auto.csv", "default_20240801_120002_auto.csv"]
        );
        let files = std::fs::read_dir(manager.backup_dir()).unwrap().count();
        assert_eq!(files, 4);
    }

    #[test]
    fn operation_backups_follow_settings() {
        let (_dir, manager) = setup();
        let off = BackupSettings {
            backup_on_operation: false,
            ..BackupSettings::default()
        };

        assert!(manager.backup_on_operation("default", "withdraw", &off, at(0)).unwrap().is_none());
        let taken = manager
            .backup_on_operation("default", "withdraw", &BackupSettings::default(), at(1))
            .unwrap()
            .unwrap();
        assert_eq!(taken.kind, "operation_withdraw");
    }

    #[test]
    fn restore_saves_current_state_first() {
        let (dir, manager) = setup();
        let settings = BackupSettings::default();
        let first = manager.create_backup("default", "manual", &settings, at(0)).unwrap();
        std::fs::write(dir.path().join("data").join("default.csv"), "v2").unwrap();

        manager.restore("default", &first.file_name, &settings, at(5)).unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("data").join("default.csv")).unwrap(),
            "v1"
        );
        let kinds: Vec<_> = manager.list().unwrap().into_iter().map(|b| b.kind).collect();
        assert_eq!(kinds, vec!["before_restore", "manual"]);
    }

    #[test]
    fn delete_rejects_paths_and_unknown_files() {
        let (_dir, manager) = setup();
        let info = manager
            .create_backup("default", "manual", &BackupSettings::default(), at(0))
            .unwrap();

        assert!(matches!(manager.delete("../default.csv"), Err(BackupError::InvalidName(_))));
        assert!(matches!(manager.delete("nope.csv"), Err(BackupError::NotFound(_))));
        manager.delete(&info.file_name).unwrap();
        assert!(manager.list().unwrap().is_empty());
        assert_eq!(std::fs::read_dir(manager.backup_dir()).unwrap().count(), 0);
    }

    #[test]
    fn missing_table_is_an_error() {
        let (_dir, manager) = setup();
        assert!(matches!(
            manager.create_backup("ghost", "manual", &BackupSettings::default(), at(0)),
            Err(BackupError::MissingTable(_))
        ));
    }
}
