//! In-process shared store
//!
//! A `MemoryHub` plays the role of the shared medium; each `MemoryStore`
//! handle plays one participant. Writes through one handle are queued as
//! external changes for every *other* handle watching that key.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{KvStore, StoreError, StoreResult, validate_key};

#[derive(Default)]
struct HubState {
    entries: HashMap<String, String>,
    /// Keys watched by each handle
    watchers: HashMap<u64, BTreeSet<String>>,
    /// External changes not yet collected, per handle
    pending: HashMap<u64, BTreeSet<String>>,
    next_handle: u64,
    disabled: bool,
}

impl HubState {
    fn mark_changed(&mut self, writer: u64, key: &str) {
        for (handle, keys) in &self.watchers {
            if *handle != writer && keys.contains(key) {
                self.pending.entry(*handle).or_default().insert(key.to_string());
            }
        }
    }
}

/// Shared medium for in-process participants
#[derive(Clone, Default)]
pub struct MemoryHub {
    state: Arc<Mutex<HubState>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new participant handle
    pub fn handle(&self) -> MemoryStore {
        let id = {
            let mut state = self.state();
            state.next_handle += 1;
            state.next_handle
        };
        MemoryStore {
            id,
            state: Arc::clone(&self.state),
        }
    }

    /// Make every operation fail, as if the medium were disabled or full
    pub fn set_disabled(&self, disabled: bool) {
        self.state().disabled = disabled;
    }

    /// Raw value of a key, bypassing any handle
    pub fn peek(&self, key: &str) -> Option<String> {
        self.state().entries.get(key).cloned()
    }

    /// Overwrite a key as an anonymous outside writer
    pub fn poke(&self, key: &str, value: &str) {
        let mut state = self.state();
        state.entries.insert(key.to_string(), value.to_string());
        state.mark_changed(0, key);
    }

    fn state(&self) -> MutexGuard<'_, HubState> {
        recover(&self.state)
    }
}

// Every update to `HubState` completes before the guard drops, so a
// poisoned lock still holds consistent data.
fn recover(state: &Mutex<HubState>) -> MutexGuard<'_, HubState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One participant's handle onto a `MemoryHub`
pub struct MemoryStore {
    id: u64,
    state: Arc<Mutex<HubState>>,
}

impl MemoryStore {
    fn lock(&self) -> StoreResult<MutexGuard<'_, HubState>> {
        let state = recover(&self.state);
        if state.disabled {
            return Err(StoreError::Disabled);
        }
        Ok(state)
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        let mut state = recover(&self.state);
        state.watchers.remove(&self.id);
        state.pending.remove(&self.id);
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        validate_key(key)?;
        Ok(self.lock()?.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        validate_key(key)?;
        let mut state = self.lock()?;
        state.entries.insert(key.to_string(), value.to_string());
        state.mark_changed(self.id, key);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        validate_key(key)?;
        let mut state = self.lock()?;
        if state.entries.remove(key).is_some() {
            state.mark_changed(self.id, key);
        }
        Ok(())
    }

    fn clear(&mut self) -> StoreResult<()> {
        let mut state = self.lock()?;
        let keys: Vec<String> = state.entries.drain().map(|(k, _)| k).collect();
        for key in keys {
            state.mark_changed(self.id, &key);
        }
        Ok(())
    }

    fn watch(&mut self, key: &str) -> StoreResult<()> {
        validate_key(key)?;
        let id = self.id;
        self.lock()?.watchers.entry(id).or_default().insert(key.to_string());
        Ok(())
    }

    fn external_changes(&mut self) -> StoreResult<Vec<String>> {
        let id = self.id;
        let mut state = self.lock()?;
        Ok(state.pending.remove(&id).map(|keys| keys.into_iter().collect()).unwrap_or_default())
    }
}
