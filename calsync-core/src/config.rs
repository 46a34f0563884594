//! Process-wide calsync configuration.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{SyncError, SyncResult};
use crate::mapping::SqliteStore;

/// Settings read from `~/.config/calsync/config.toml`, overridable with
/// `CALSYNC_*` environment variables (e.g. `CALSYNC_DEFAULT_FEED`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncConfig {
    /// Feed used when an adapter does not pick one.
    pub default_feed: Option<String>,

    /// Where the mapping database lives. `~` is expanded.
    pub database_path: Option<PathBuf>,
}

impl SyncConfig {
    pub fn config_path() -> SyncResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| SyncError::Config("Could not determine config directory".into()))?
            .join("calsync");

        Ok(config_dir.join("config.toml"))
    }

    pub fn load() -> SyncResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from a specific file. A missing file is not an error.
    pub fn load_from(path: &Path) -> SyncResult<Self> {
        Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(Environment::with_prefix("CALSYNC"))
            .build()
            .map_err(|e| SyncError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| SyncError::Config(e.to_string()))
    }

    pub fn database_path(&self) -> SyncResult<PathBuf> {
        match &self.database_path {
            Some(path) => {
                let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
                Ok(PathBuf::from(expanded))
            }
            None => Ok(dirs::data_dir()
                .ok_or_else(|| SyncError::Config("Could not determine data directory".into()))?
                .join("calsync")
                .join("mappings.db")),
        }
    }

    pub fn open_store(&self) -> SyncResult<SqliteStore> {
        SqliteStore::open(&self.database_path()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SyncConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "default_feed = \"clinic@group.calendar.google.com\"\n\
             database_path = \"/var/lib/calsync/mappings.db\"\n",
        )
        .unwrap();

        let config = SyncConfig::load_from(&path).unwrap();

        assert_eq!(
            config.default_feed.as_deref(),
            Some("clinic@group.calendar.google.com")
        );
        assert_eq!(
            config.database_path().unwrap(),
            PathBuf::from("/var/lib/calsync/mappings.db")
        );
    }

    #[test]
    fn test_tilde_is_expanded() {
        let config = SyncConfig {
            default_feed: None,
            database_path: Some(PathBuf::from("~/calsync.db")),
        };
        let path = config.database_path().unwrap();
        assert!(!path.to_string_lossy().starts_with('~'));
        assert!(path.ends_with("calsync.db"));
    }

    #[test]
    fn test_open_store_creates_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = SyncConfig {
            default_feed: None,
            database_path: Some(dir.path().join("mappings.db")),
        };
        config.open_store().unwrap();
        assert!(dir.path().join("mappings.db").exists());
    }
}
