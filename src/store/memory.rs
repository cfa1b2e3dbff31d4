// 🧠 Memory Store - process-local collection
// Stands in for browser local storage; nothing survives a restart.

use super::RecordStore;
use crate::error::StoreError;
use crate::record::{newest_first, Record};
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<Record>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<Record>) -> Self {
        MemoryStore {
            records: Mutex::new(records),
        }
    }
}

impl RecordStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn submit(&self, record: &Record) -> Result<Option<usize>, StoreError> {
        let mut records = self.records.lock()?;
        records.push(record.clone());
        Ok(Some(records.len()))
    }

    fn fetch_all(&self, limit: usize) -> Result<Vec<Record>, StoreError> {
        let records = self.records.lock()?.clone();
        Ok(newest_first(records, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::HealthInput;
    use crate::store::DEFAULT_MAX_RECORDS;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        let input = HealthInput::default();

        store.submit(&Record::new(1, &input)).unwrap();
        assert_eq!(store.submit(&Record::new(2, &input)).unwrap(), Some(2));

        let records = store.fetch_all(DEFAULT_MAX_RECORDS).unwrap();
        assert_eq!(records[0].id, 2);
    }
}
