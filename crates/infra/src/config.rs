//! Application configuration (paths and logging).
//!
//! Sources, lowest precedence first: built-in defaults, `stockbook.toml` (or
//! an explicit file), then `STOCKBOOK_*` environment variables with `__` as
//! the nesting separator (`STOCKBOOK_LOG__LEVEL=debug`).

use std::io;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use tracing::debug;

use stockbook_observability::LogConfig;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "stockbook.toml";

const ENV_PREFIX: &str = "STOCKBOOK";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// Directory holding one `<table>.csv` per table.
    pub data_dir: PathBuf,
    /// Directory holding `settings.json`.
    pub config_dir: PathBuf,
    pub backup_dir: PathBuf,
    #[serde(default)]
    pub log: LogConfig,
}

impl AppConfig {
    /// Load from defaults, the config file and the process environment.
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, Self::environment())
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
    }

    fn load_with(path: Option<&Path>, environment: Environment) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config = Config::builder()
            .set_default("data_dir", "data")?
            .set_default("config_dir", "config")?
            .set_default("backup_dir", "backups")?
            .set_default("log.level", "info")?
            .set_default("log.format", "pretty")?
            .add_source(file)
            .add_source(environment)
            .build()?;

        let app: AppConfig = config.try_deserialize()?;
        debug!(data_dir = %app.data_dir.display(), "configuration loaded");
        Ok(app)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.data_dir.join(format!("{table}.csv"))
    }

    /// Create the data, config and backup directories if missing.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        for dir in [&self.data_dir, &self.config_dir, &self.backup_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::Map;
    use stockbook_observability::LogFormat;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let source: Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::environment().source(Some(source))
    }

    #[test]
    fn defaults_apply_without_file_or_env() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");

        let config = AppConfig::load_with(None, env(&[])).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.log, LogConfig::default());
        assert!(AppConfig::load_with(Some(&missing), env(&[])).is_err());
    }

    #[test]
    fn file_then_environment_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stockbook.toml");
        std::fs::write(
            &path,
            "data_dir = \"/srv/stock/data\"\nbackup_dir = \"/srv/stock/backups\"\n\n[log]\nformat = \"json\"\n",
        )
        .unwrap();

        let config = AppConfig::load_with(
            Some(&path),
            env(&[
                ("STOCKBOOK_BACKUP_DIR", "/mnt/backups"),
                ("STOCKBOOK_LOG__LEVEL", "debug"),
            ]),
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/srv/stock/data"));
        assert_eq!(config.backup_dir, PathBuf::from("/mnt/backups"));
        assert_eq!(config.config_dir, PathBuf::from("config"));
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn table_and_settings_paths_live_in_their_dirs() {
        let config = AppConfig::load_with(None, env(&[])).unwrap();
        assert_eq!(config.table_path("default"), PathBuf::from("data/default.csv"));
        assert_eq!(config.settings_path(), PathBuf::from("config/settings.json"));
    }
}
