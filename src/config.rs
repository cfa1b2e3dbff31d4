//! Configuration loading from environment variables.
//!
//! The resulting [`Config`] is passed explicitly to whatever needs it;
//! nothing here is global.

use crate::store::{
    FileStore, MemoryStore, RecordStore, SheetStore, SqliteStore, DEFAULT_MAX_RECORDS,
};
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Which persistence adapter to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    File,
    Sqlite,
    Sheet,
    Memory,
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "file" | "json" => Ok(BackendKind::File),
            "sqlite" | "db" => Ok(BackendKind::Sqlite),
            "sheet" | "sheets" => Ok(BackendKind::Sheet),
            "memory" => Ok(BackendKind::Memory),
            other => bail!("unknown backend '{}' (expected file, sqlite, sheet or memory)", other),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Active persistence adapter
    pub backend: BackendKind,

    /// JSON file used by the file backend
    pub data_file: PathBuf,

    /// Database file used by the sqlite backend
    pub database_path: PathBuf,

    /// Spreadsheet web app base URL (no `?action=` query)
    pub sheet_url: Option<String>,

    /// Cap on records returned by a fetch
    pub max_records: usize,

    /// Address the HTTP server binds to
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend: BackendKind::File,
            data_file: PathBuf::from("data.json"),
            database_path: PathBuf::from("health.db"),
            sheet_url: None,
            max_records: DEFAULT_MAX_RECORDS,
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables (and `.env` if present).
    ///
    /// All variables are optional:
    /// - `HEALTH_BACKEND`: `file` (default), `sqlite`, `sheet` or `memory`
    /// - `HEALTH_DATA_FILE`: JSON file for the file backend (default: `data.json`)
    /// - `HEALTH_DB_PATH`: database for the sqlite backend (default: `health.db`)
    /// - `SHEET_URL`: spreadsheet web app URL, required by the sheet backend
    /// - `HEALTH_MAX_RECORDS`: fetch cap (default: 5000)
    /// - `HEALTH_BIND_ADDR`: server address (default: `0.0.0.0:3000`)
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unparseable value, or the
    /// sheet backend is selected without `SHEET_URL`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but reading from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(backend) = lookup("HEALTH_BACKEND") {
            config.backend = backend.parse().context("HEALTH_BACKEND")?;
        }
        if let Some(path) = lookup("HEALTH_DATA_FILE") {
            config.data_file = PathBuf::from(path);
        }
        if let Some(path) = lookup("HEALTH_DB_PATH") {
            config.database_path = PathBuf::from(path);
        }
        config.sheet_url = lookup("SHEET_URL").filter(|url| !url.trim().is_empty());
        if let Some(max) = lookup("HEALTH_MAX_RECORDS") {
            config.max_records = max
                .trim()
                .parse()
                .with_context(|| format!("HEALTH_MAX_RECORDS is not a number: '{}'", max))?;
        }
        if let Some(addr) = lookup("HEALTH_BIND_ADDR") {
            config.bind_addr = addr;
        }

        if config.backend == BackendKind::Sheet && config.sheet_url.is_none() {
            bail!("HEALTH_BACKEND=sheet requires SHEET_URL");
        }

        Ok(config)
    }

    /// Build the configured persistence adapter.
    pub fn open_store(&self) -> Result<Arc<dyn RecordStore>> {
        let store: Arc<dyn RecordStore> = match self.backend {
            BackendKind::File => Arc::new(FileStore::new(&self.data_file)),
            BackendKind::Sqlite => Arc::new(
                SqliteStore::open(&self.database_path).with_context(|| {
                    format!("Failed to open database {}", self.database_path.display())
                })?,
            ),
            BackendKind::Sheet => Arc::new(self.open_sheet()?.context("SHEET_URL not set")?),
            BackendKind::Memory => Arc::new(MemoryStore::new()),
        };

        Ok(store)
    }

    /// Spreadsheet client for the proxy endpoints, when a URL is configured.
    pub fn open_sheet(&self) -> Result<Option<SheetStore>> {
        self.sheet_url
            .as_deref()
            .map(|url| SheetStore::new(url).context("Failed to create HTTP client"))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.backend, BackendKind::File);
        assert_eq!(config.data_file, PathBuf::from("data.json"));
        assert_eq!(config.max_records, 5000);
        assert!(config.sheet_url.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("HEALTH_BACKEND", "SQLite"),
            ("HEALTH_DB_PATH", "/tmp/x.db"),
            ("HEALTH_MAX_RECORDS", "10"),
            ("HEALTH_BIND_ADDR", "127.0.0.1:8080"),
        ]))
        .unwrap();

        assert_eq!(config.backend, BackendKind::Sqlite);
        assert_eq!(config.database_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.max_records, 10);
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_sheet_backend_requires_url() {
        let err = Config::from_lookup(lookup(&[("HEALTH_BACKEND", "sheet")])).unwrap_err();
        assert!(err.to_string().contains("SHEET_URL"));

        let blank = Config::from_lookup(lookup(&[("HEALTH_BACKEND", "sheet"), ("SHEET_URL", " ")]));
        assert!(blank.is_err());
    }

    #[test]
    fn test_bad_values_are_errors() {
        assert!(Config::from_lookup(lookup(&[("HEALTH_BACKEND", "firebase")])).is_err());
        assert!(Config::from_lookup(lookup(&[("HEALTH_MAX_RECORDS", "lots")])).is_err());
    }

    #[test]
    fn test_open_memory_store() {
        let config = Config::from_lookup(lookup(&[("HEALTH_BACKEND", "memory")])).unwrap();
        let store = config.open_store().unwrap();
        assert_eq!(store.name(), "memory");
    }
}
