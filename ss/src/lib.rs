//! SharedStore - key-value storage shared between independent processes
//!
//! A minimal storage medium for processes that coordinate without a server.
//! Every handle can read and overwrite any key (last write wins), and every
//! handle can ask which watched keys were changed by *someone else* since it
//! last looked. A handle is never told about its own writes.
//!
//! # Architecture
//!
//! ```text
//! {store_dir}/
//! ├── .lock            # advisory lock serializing writers
//! ├── windows.kv       # one file per key, replaced atomically
//! └── ...
//! ```
//!
//! # Example
//!
//! ```ignore
//! use sharedstore::{DirStore, KvStore};
//!
//! let mut store = DirStore::open("/tmp/winsync")?;
//! store.watch("windows")?;
//! store.set("windows", "[]")?;
//! for key in store.external_changes()? {
//!     println!("{} changed elsewhere", key);
//! }
//! ```

pub mod dir;
mod error;
pub mod memory;

pub use dir::DirStore;
pub use error::{StoreError, StoreResult};
pub use memory::{MemoryHub, MemoryStore};

/// A handle onto a process-shared key-value medium
///
/// Implementations provide no transactions: a read followed by a write can
/// race with another handle's write, and the later write wins.
pub trait KvStore {
    /// Read the current value of a key
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Overwrite a key
    fn set(&mut self, key: &str, value: &str) -> StoreResult<()>;

    /// Remove a key if present
    fn remove(&mut self, key: &str) -> StoreResult<()>;

    /// Remove every key in the store
    fn clear(&mut self) -> StoreResult<()>;

    /// Start tracking a key for external changes
    ///
    /// The current value becomes the baseline; changes made before this call
    /// are not reported.
    fn watch(&mut self, key: &str) -> StoreResult<()>;

    /// Watched keys modified by other handles since the previous call
    fn external_changes(&mut self) -> StoreResult<Vec<String>>;
}

impl<T: KvStore + ?Sized> KvStore for Box<T> {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        (**self).remove(key)
    }

    fn clear(&mut self) -> StoreResult<()> {
        (**self).clear()
    }

    fn watch(&mut self, key: &str) -> StoreResult<()> {
        (**self).watch(key)
    }

    fn external_changes(&mut self) -> StoreResult<Vec<String>> {
        (**self).external_changes()
    }
}

/// Check that a key is usable as a file stem on every platform
pub fn validate_key(key: &str) -> StoreResult<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}
