// 📡 Record Feed - push the current collection to listeners
// Subscribing delivers a snapshot right away; every submit or refresh
// delivers a new one. Dropping the Subscription unsubscribes.

use crate::error::StoreError;
use crate::record::Record;
use crate::store::RecordStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{error, info, warn};

/// Receives collection updates. Called on the thread that triggered them.
pub trait RecordListener: Send + Sync {
    fn on_update(&self, records: &[Record]);

    fn on_error(&self, error: &StoreError);
}

type Listeners = Mutex<Vec<(u64, Arc<dyn RecordListener>)>>;

// A listener that panicked elsewhere cannot leave the list half-edited,
// so a poisoned registry is still usable.
fn lock_listeners(listeners: &Listeners) -> MutexGuard<'_, Vec<(u64, Arc<dyn RecordListener>)>> {
    listeners.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
        warn!("Listener registry lock was poisoned, recovering");
        poisoned.into_inner()
    })
}

pub struct RecordFeed {
    store: Arc<dyn RecordStore>,
    limit: usize,
    listeners: Arc<Listeners>,
    next_id: AtomicU64,
}

/// Handle returned by [`RecordFeed::subscribe`].
pub struct Subscription {
    id: u64,
    listeners: Weak<Listeners>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            lock_listeners(&listeners).retain(|(id, _)| *id != self.id);
        }
    }
}

impl RecordFeed {
    pub fn new(store: Arc<dyn RecordStore>, limit: usize) -> Self {
        RecordFeed {
            store,
            limit,
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn listener_count(&self) -> usize {
        lock_listeners(&self.listeners).len()
    }

    /// Register a listener and deliver the current collection to it.
    pub fn subscribe(&self, listener: Arc<dyn RecordListener>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        match self.store.fetch_all(self.limit) {
            Ok(records) => listener.on_update(&records),
            Err(e) => {
                error!(backend = self.store.name(), error = %e, "Initial fetch failed");
                listener.on_error(&e);
            }
        }

        lock_listeners(&self.listeners).push((id, listener));

        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Store a record, then push the refreshed collection. A failed submit
    /// is reported to the caller only; listeners keep their last snapshot.
    pub fn submit(&self, record: &Record) -> Result<Option<usize>, StoreError> {
        let total = self.store.submit(record).map_err(|e| {
            error!(backend = self.store.name(), id = record.id, error = %e, "Submit failed");
            e
        })?;

        info!(backend = self.store.name(), id = record.id, risco = %record.risk, "Record saved");
        self.refresh();
        Ok(total)
    }

    /// Re-read the store and notify every listener.
    pub fn refresh(&self) {
        let listeners: Vec<Arc<dyn RecordListener>> = lock_listeners(&self.listeners)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        match self.store.fetch_all(self.limit) {
            Ok(records) => listeners.iter().for_each(|l| l.on_update(&records)),
            Err(e) => {
                error!(backend = self.store.name(), error = %e, "Refresh failed");
                listeners.iter().for_each(|l| l.on_error(&e));
            }
        }
    }
}
