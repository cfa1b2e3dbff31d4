// 📁 File Store - a JSON array on disk (data.json)
// An unreadable file reads as "no data"; writing over one is refused.

use super::RecordStore;
use crate::error::StoreError;
use crate::record::{newest_first, Record};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw rows as stored. Rows that fail to decode as records are kept
    /// here so a rewrite never drops them. A missing or blank file has no
    /// rows; any other read or parse failure is an error.
    fn load_rows(&self) -> Result<Vec<Value>, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str::<Vec<Value>>(&text)?)
    }

    /// Lenient variant for reads: an unusable file is "no data".
    fn read_rows(&self) -> Vec<Value> {
        self.load_rows().unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Data file unusable, treating as empty");
            Vec::new()
        })
    }
}

impl RecordStore for FileStore {
    fn name(&self) -> &'static str {
        "file"
    }

    fn submit(&self, record: &Record) -> Result<Option<usize>, StoreError> {
        let _guard = self.write_lock.lock()?;

        // Rewriting over a file we could not parse would wipe it
        let mut rows = self.load_rows().map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "Refusing to overwrite unusable data file");
            e
        })?;
        rows.push(serde_json::to_value(record)?);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(&rows)?)?;

        debug!(path = %self.path.display(), id = record.id, total = rows.len(), "Record appended");
        Ok(Some(rows.len()))
    }

    fn fetch_all(&self, limit: usize) -> Result<Vec<Record>, StoreError> {
        let records = self
            .read_rows()
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<Record>(row) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed row in data file");
                    None
                }
            })
            .collect();

        Ok(newest_first(records, limit))
    }
}
