// 🗄️ Persistence Adapters
// One interface, swappable backends picked at startup from Config.

pub mod file;
pub mod memory;
pub mod sheet;
pub mod sqlite;

#[cfg(test)]
pub(crate) mod test_upstream;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use sheet::SheetStore;
pub use sqlite::SqliteStore;

use crate::error::StoreError;
use crate::record::Record;

/// Default cap on how many records a fetch returns.
pub const DEFAULT_MAX_RECORDS: usize = 5000;

/// Backing store for health records.
///
/// Collections are append-only: there is no update or delete. `fetch_all`
/// returns records newest first (id descending), at most `limit` of them.
pub trait RecordStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Persist a new record. Returns the collection size afterwards when the
    /// backend reports it.
    fn submit(&self, record: &Record) -> Result<Option<usize>, StoreError>;

    fn fetch_all(&self, limit: usize) -> Result<Vec<Record>, StoreError>;
}
