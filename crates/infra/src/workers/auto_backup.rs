use std::io;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use chrono::Local;
use tracing::{debug, info, warn};

use super::WorkerHandle;
use crate::backup::BackupManager;
use crate::settings::SettingsStore;

/// Periodic backup of the active table.
///
/// Each tick re-reads settings, so toggling backups or switching tables takes
/// effect without restarting the worker. The worker only copies files.
#[derive(Debug)]
pub struct AutoBackupWorker;

impl AutoBackupWorker {
    /// Spawn the worker thread; the first backup happens one `interval` from now.
    pub fn spawn(
        manager: BackupManager,
        settings: SettingsStore,
        interval: Duration,
    ) -> io::Result<WorkerHandle> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let join = thread::Builder::new()
            .name("auto-backup".to_string())
            .spawn(move || worker_loop(&manager, &settings, interval, &shutdown_rx))?;

        info!(interval_secs = interval.as_secs(), "auto backup started");
        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }

    /// Interval configured in settings, in hours (at least one).
    pub fn configured_interval(settings: &SettingsStore) -> Duration {
        let hours = settings
            .load()
            .map(|s| s.backup.auto_backup_interval_hours)
            .unwrap_or(24)
            .max(1);
        Duration::from_secs(hours * 3600)
    }
}

fn worker_loop(
    manager: &BackupManager,
    settings: &SettingsStore,
    interval: Duration,
    shutdown_rx: &mpsc::Receiver<()>,
) {
    loop {
        match shutdown_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => tick(manager, settings),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    info!("auto backup stopped");
}

fn tick(manager: &BackupManager, settings: &SettingsStore) {
    let current = match settings.load() {
        Ok(current) => current,
        Err(err) => {
            warn!(error = %err, "auto backup skipped: settings unreadable");
            return;
        }
    };
    if !current.backup.enabled {
        debug!("auto backup disabled");
        return;
    }

    let now = Local::now().naive_local();
    if let Err(err) = manager.create_backup(&current.active_table, "auto", &current.backup, now) {
        warn!(table = %current.active_table, error = %err, "auto backup failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::DEFAULT_TABLE;

    #[test]
    fn worker_backs_up_until_shut_down() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::write(data.join(format!("{DEFAULT_TABLE}.csv")), "rows").unwrap();
        let manager = BackupManager::new(&data, dir.path().join("backups"));
        let settings = SettingsStore::new(dir.path().join("settings.json"));

        let handle =
            AutoBackupWorker::spawn(manager.clone(), settings, Duration::from_millis(20)).unwrap();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while manager.list().unwrap().is_empty() && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        handle.shutdown();

        let backups = manager.list().unwrap();
        assert!(!backups.is_empty());
        assert!(backups.iter().all(|b| b.kind == "auto"));
    }

    #[test]
    fn disabled_backups_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let manager = BackupManager::new(dir.path().join("data"), dir.path().join("backups"));
        let settings = SettingsStore::new(dir.path().join("settings.json"));
        settings
            .update("backup", |s| {
                s.backup.enabled = false;
                Ok(())
            })
            .unwrap();

        tick(&manager, &settings);

        assert!(manager.list().unwrap().is_empty());
    }

    #[test]
    fn interval_is_at_least_one_hour() {
        let dir = tempfile::tempdir().unwrap();
        let settings = SettingsStore::new(dir.path().join("settings.json"));
        settings
            .update("backup", |s| {
                s.backup.auto_backup_interval_hours = 0;
                Ok(())
            })
            .unwrap();

        assert_eq!(AutoBackupWorker::configured_interval(&settings), Duration::from_secs(3600));
    }
}
