//! Typed access to the shared instance list
//!
//! Wraps any `KvStore` handle and one key holding the JSON array of
//! instance records. Reads fail soft; the change signal is delivered on the
//! owner's next poll and never reports the owner's own writes.

use sharedstore::{KvStore, validate_key};
use tracing::{debug, warn};

use crate::domain::{InstanceRecord, Snapshot};
use crate::error::{SyncError, SyncResult};

/// Default shared key name
pub const DEFAULT_KEY: &str = "windows";

type ChangeListener = Box<dyn FnMut()>;

/// Shared instance list stored under a single key
pub struct SharedStateStore {
    kv: Box<dyn KvStore>,
    key: String,
    watching: bool,
    listeners: Vec<ChangeListener>,
}

impl SharedStateStore {
    /// Wrap a store handle; only an invalid key is rejected
    pub fn new(kv: impl KvStore + 'static, key: impl Into<String>) -> SyncResult<Self> {
        let key = key.into();
        validate_key(&key)?;

        let mut store = Self {
            kv: Box::new(kv),
            key,
            watching: false,
            listeners: Vec::new(),
        };
        store.ensure_watching();
        Ok(store)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read and decode the shared snapshot
    pub fn try_read(&self) -> SyncResult<Snapshot> {
        match self.kv.get(&self.key)? {
            Some(text) => Ok(decode(&text)?),
            None => Ok(Snapshot::new()),
        }
    }

    /// Read the shared snapshot, treating any failure as empty
    pub fn read(&self) -> Snapshot {
        self.try_read().unwrap_or_else(|e| {
            warn!(key = %self.key, error = %e, "Reading shared snapshot failed, treating as empty");
            Snapshot::new()
        })
    }

    /// Overwrite the shared snapshot
    pub fn write(&mut self, snapshot: &Snapshot) -> SyncResult<()> {
        let text = serde_json::to_string(snapshot)?;
        self.kv.set(&self.key, &text)?;
        debug!(key = %self.key, count = snapshot.len(), "Wrote shared snapshot");
        Ok(())
    }

    /// Drop everything in the underlying store
    pub fn clear(&mut self) -> SyncResult<()> {
        self.kv.clear()?;
        warn!(key = %self.key, "Cleared shared store");
        Ok(())
    }

    /// Register a callback for changes made by other handles
    pub fn on_external_change(&mut self, listener: impl FnMut() + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Deliver pending external-change notifications
    ///
    /// Returns whether the key was changed by someone else since the last poll.
    pub fn poll_external_change(&mut self) -> bool {
        if !self.ensure_watching() {
            return false;
        }

        let changed = match self.kv.external_changes() {
            Ok(keys) => keys.iter().any(|k| *k == self.key),
            Err(e) => {
                debug!(error = %e, "Polling external changes failed");
                false
            }
        };

        if changed {
            for listener in &mut self.listeners {
                listener();
            }
        }
        changed
    }

    fn ensure_watching(&mut self) -> bool {
        if !self.watching {
            match self.kv.watch(&self.key) {
                Ok(()) => self.watching = true,
                Err(e) => debug!(key = %self.key, error = %e, "Cannot watch shared key yet"),
            }
        }
        self.watching
    }
}

/// Decode the shared value, skipping entries this version cannot read
fn decode(text: &str) -> Result<Snapshot, serde_json::Error> {
    let values: Vec<serde_json::Value> = serde_json::from_str(text)?;
    let records = values.into_iter().filter_map(|value| {
        serde_json::from_value::<InstanceRecord>(value)
            .map_err(|e| debug!(error = %e, "Skipping unreadable instance record"))
            .ok()
    });
    Ok(Snapshot::from_records(records))
}
