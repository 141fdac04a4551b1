//! In-memory cache of every known instance
//!
//! The registry is owned by the local tick and is its only writer. It holds
//! this instance's own record as the authority for its content: whatever a
//! peer wrote to the shared list, our own shape and metadata come from here.

use tracing::debug;

use crate::domain::{InstanceId, InstanceRecord, MetaData, Shape, Snapshot};

/// This instance's view of the group
#[derive(Debug, Clone)]
pub struct InstanceRegistry {
    own: InstanceRecord,
    known: Snapshot,
    last_published: Option<i64>,
}

impl InstanceRegistry {
    pub fn new(id: InstanceId, shape: Shape, meta_data: MetaData, now_millis: i64) -> Self {
        let own = InstanceRecord::new(id, shape, meta_data, now_millis);
        let known = Snapshot::from_records([own.clone()]);
        Self {
            own,
            known,
            last_published: None,
        }
    }

    pub fn self_id(&self) -> InstanceId {
        self.own.id
    }

    pub fn self_record(&self) -> &InstanceRecord {
        &self.own
    }

    /// Current sorted view, own record included
    pub fn snapshot(&self) -> &Snapshot {
        &self.known
    }

    /// Update our own shape, and metadata when given
    ///
    /// Returns whether anything visible changed.
    pub fn upsert_self(&mut self, shape: Shape, meta_data: Option<MetaData>) -> bool {
        let mut changed = false;
        if self.own.shape != shape {
            self.own.shape = shape;
            changed = true;
        }
        if let Some(meta_data) = meta_data
            && self.own.meta_data != meta_data
        {
            self.own.meta_data = meta_data;
            changed = true;
        }
        self.known.upsert(self.own.clone());
        changed
    }

    /// Replace the cache with a freshly read snapshot
    ///
    /// Peers' records are taken as read. Our own record is re-applied from the
    /// local copy, so a shape change made after our last write is never lost
    /// to a stale read, and a lost-update race that dropped us is repaired.
    pub fn merge_external(&mut self, snapshot: Snapshot) {
        self.known = snapshot;
        if let Some(seen) = self.known.get(self.own.id)
            && !seen.same_content(&self.own)
        {
            debug!(id = %self.own.id, "Shared copy of own record is behind, keeping local");
        }
        self.known.upsert(self.own.clone());
    }

    /// Stamp our own heartbeat; never moves backwards
    pub fn refresh_heartbeat(&mut self, now_millis: i64) {
        self.own.last_heartbeat = self.own.last_heartbeat.max(now_millis);
        self.known.upsert(self.own.clone());
    }

    /// Drop peers whose heartbeat is older than the TTL
    pub fn prune(&mut self, now_millis: i64, ttl_millis: i64) -> Vec<InstanceId> {
        self.known.remove_stale(now_millis, ttl_millis, self.own.id)
    }

    /// Record a successful write of the cache to the shared medium
    pub fn mark_published(&mut self, now_millis: i64) {
        self.last_published = Some(now_millis);
    }

    /// Time of our last successful write, if any
    pub fn last_published(&self) -> Option<i64> {
        self.last_published
    }

    /// Re-enter the group under a new id
    pub fn rotate_id(&mut self, new_id: InstanceId) -> InstanceId {
        let old_id = self.own.id;
        self.known.remove(old_id);
        self.own.id = new_id;
        self.known.upsert(self.own.clone());
        self.last_published = None;
        old_id
    }
}
