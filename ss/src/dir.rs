//! Directory-backed store: one file per key
//!
//! Any number of processes may open the same directory. Values are replaced
//! atomically (write to a temp file, rename over the entry), so readers never
//! observe a torn value and take no lock. Writers and `clear` are serialized
//! by an advisory lock on a sidecar file. The lock is only ever tried: a
//! peer holding it (possibly a stopped process) makes the write fail with
//! `Unavailable` instead of blocking. None of this makes read-modify-write
//! cycles atomic; callers get last-writer-wins semantics.

use fs2::FileExt;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::{KvStore, StoreError, StoreResult, validate_key};

const LOCK_FILE: &str = ".lock";
const ENTRY_EXT: &str = "kv";

/// Held advisory lock, released on drop
struct LockGuard(File);

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.0);
    }
}

/// A store rooted at a directory on the local filesystem
pub struct DirStore {
    base_path: PathBuf,
    /// Fingerprint of the value last written or observed by this handle
    watched: BTreeMap<String, Option<u64>>,
}

impl DirStore {
    /// Open or create a store at the given directory
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).map_err(|e| StoreError::io(&base_path, e))?;
        debug!(?base_path, "Opened shared store");
        Ok(Self {
            base_path,
            watched: BTreeMap::new(),
        })
    }

    /// Directory backing this store
    pub fn path(&self) -> &Path {
        &self.base_path
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.{}", key, ENTRY_EXT))
    }

    fn lock(&self) -> StoreResult<LockGuard> {
        let lock_path = self.base_path.join(LOCK_FILE);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| StoreError::io(&lock_path, e))?;

        if let Err(e) = FileExt::try_lock_exclusive(&file) {
            debug!(?lock_path, error = %e, "Store lock is held by a peer");
            return Err(StoreError::io(&lock_path, e));
        }

        Ok(LockGuard(file))
    }

    fn read_entry(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.entry_path(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    fn remember(&mut self, key: &str, value: Option<&str>) {
        if let Some(known) = self.watched.get_mut(key) {
            *known = value.map(fingerprint);
        }
    }
}

impl KvStore for DirStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        validate_key(key)?;
        self.read_entry(key)
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        validate_key(key)?;
        let path = self.entry_path(key);
        {
            let _guard = self.lock()?;
            let mut tmp = tempfile::NamedTempFile::new_in(&self.base_path).map_err(|e| StoreError::io(&path, e))?;
            tmp.write_all(value.as_bytes()).map_err(|e| StoreError::io(&path, e))?;
            tmp.persist(&path).map_err(|e| StoreError::io(&path, e.error))?;
        }
        trace!(key, bytes = value.len(), "Wrote entry");
        self.remember(key, Some(value));
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        validate_key(key)?;
        let path = self.entry_path(key);
        {
            let _guard = self.lock()?;
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::io(path, e)),
            }
        }
        self.remember(key, None);
        Ok(())
    }

    fn clear(&mut self) -> StoreResult<()> {
        let mut removed = 0usize;
        {
            let _guard = self.lock()?;
            let entries = fs::read_dir(&self.base_path).map_err(|e| StoreError::io(&self.base_path, e))?;
            for entry in entries {
                let path = entry.map_err(|e| StoreError::io(&self.base_path, e))?.path();
                if path.extension().map(|e| e == ENTRY_EXT).unwrap_or(false) {
                    match fs::remove_file(&path) {
                        Ok(()) => removed += 1,
                        Err(e) if e.kind() == ErrorKind::NotFound => {}
                        Err(e) => return Err(StoreError::io(path, e)),
                    }
                }
            }
        }
        for known in self.watched.values_mut() {
            *known = None;
        }
        debug!(removed, base_path = ?self.base_path, "Cleared shared store");
        Ok(())
    }

    fn watch(&mut self, key: &str) -> StoreResult<()> {
        let current = self.get(key)?;
        self.watched.insert(key.to_string(), current.as_deref().map(fingerprint));
        Ok(())
    }

    fn external_changes(&mut self) -> StoreResult<Vec<String>> {
        let keys: Vec<String> = self.watched.keys().cloned().collect();
        let mut changed = Vec::new();

        for key in keys {
            let current = self.get(&key)?.as_deref().map(fingerprint);
            if let Some(known) = self.watched.get_mut(&key)
                && *known != current
            {
                *known = current;
                changed.push(key);
            }
        }

        Ok(changed)
    }
}

/// Content hash for change detection (not cryptographic)
fn fingerprint(value: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_and_get() {
        let temp = TempDir::new().unwrap();
        let mut store = DirStore::open(temp.path().join("store")).unwrap();

        assert_eq!(store.get("windows").unwrap(), None);
        store.set("windows", "[1,2]").unwrap();
        assert_eq!(store.get("windows").unwrap().as_deref(), Some("[1,2]"));

        store.set("windows", "[]").unwrap();
        assert_eq!(store.get("windows").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_own_writes_are_not_external() {
        let temp = TempDir::new().unwrap();
        let mut a = DirStore::open(temp.path()).unwrap();
        let mut b = DirStore::open(temp.path()).unwrap();
        a.watch("windows").unwrap();
        b.watch("windows").unwrap();

        a.set("windows", "[1]").unwrap();

        assert!(a.external_changes().unwrap().is_empty());
        assert_eq!(b.external_changes().unwrap(), vec!["windows".to_string()]);
        assert!(b.external_changes().unwrap().is_empty());
    }

    #[test]
    fn test_changes_before_watch_are_not_reported() {
        let temp = TempDir::new().unwrap();
        let mut a = DirStore::open(temp.path()).unwrap();
        let mut b = DirStore::open(temp.path()).unwrap();

        a.set("windows", "[1]").unwrap();
        b.watch("windows").unwrap();

        assert!(b.external_changes().unwrap().is_empty());
    }

    #[test]
    fn test_unwatched_keys_are_ignored() {
        let temp = TempDir::new().unwrap();
        let mut a = DirStore::open(temp.path()).unwrap();
        let mut b = DirStore::open(temp.path()).unwrap();
        b.watch("windows").unwrap();

        a.set("other", "x").unwrap();

        assert!(b.external_changes().unwrap().is_empty());
    }

    #[test]
    fn test_remove_by_peer_is_reported() {
        let temp = TempDir::new().unwrap();
        let mut a = DirStore::open(temp.path()).unwrap();
        let mut b = DirStore::open(temp.path()).unwrap();
        a.set("windows", "[1]").unwrap();
        b.watch("windows").unwrap();

        a.remove("windows").unwrap();
        a.remove("windows").unwrap();

        assert_eq!(b.external_changes().unwrap(), vec!["windows".to_string()]);
        assert_eq!(b.get("windows").unwrap(), None);
    }

    #[test]
    fn test_clear_removes_entries_only() {
        let temp = TempDir::new().unwrap();
        let mut store = DirStore::open(temp.path()).unwrap();
        store.set("windows", "[1]").unwrap();
        store.set("count", "3").unwrap();
        fs::write(temp.path().join("notes.txt"), "keep").unwrap();

        store.clear().unwrap();

        assert_eq!(store.get("windows").unwrap(), None);
        assert_eq!(store.get("count").unwrap(), None);
        assert!(temp.path().join("notes.txt").exists());
    }

    #[test]
    fn test_invalid_key_rejected() {
        let temp = TempDir::new().unwrap();
        let mut store = DirStore::open(temp.path()).unwrap();

        let err = store.set("../windows", "[]").unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
    }

    #[test]
    fn test_held_lock_does_not_block() {
        let temp = TempDir::new().unwrap();
        let mut store = DirStore::open(temp.path()).unwrap();
        store.set("windows", "[1]").unwrap();

        let peer = OpenOptions::new()
            .read(true)
            .write(true)
            .open(temp.path().join(LOCK_FILE))
            .unwrap();
        FileExt::lock_exclusive(&peer).unwrap();

        let started = std::time::Instant::now();
        assert_eq!(store.get("windows").unwrap().as_deref(), Some("[1]"));
        let err = store.set("windows", "[2]").unwrap_err();
        assert!(matches!(err, StoreError::Unavailable { .. }));
        assert!(matches!(store.clear().unwrap_err(), StoreError::Unavailable { .. }));
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
        assert_eq!(store.get("windows").unwrap().as_deref(), Some("[1]"));

        FileExt::unlock(&peer).unwrap();
        store.set("windows", "[2]").unwrap();
        assert_eq!(store.get("windows").unwrap().as_deref(), Some("[2]"));
    }

    #[test]
    fn test_open_on_file_is_unavailable() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("not-a-dir");
        fs::write(&file_path, "x").unwrap();

        let err = DirStore::open(&file_path).err().unwrap();
        assert!(matches!(err, StoreError::Unavailable { .. }));
    }
}
