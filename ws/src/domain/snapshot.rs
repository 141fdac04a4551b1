//! Id-ordered view of every known instance
//!
//! Ordering by id ascending is the one stable contract consumers rely on:
//! renderers pair the i-th record with their i-th visual.

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

use super::{InstanceId, InstanceRecord};

/// Instance records sorted by id, at most one per id
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Snapshot(Vec<InstanceRecord>);

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from records in any order
    ///
    /// When an id appears more than once, the record with the freshest
    /// heartbeat wins.
    pub fn from_records(records: impl IntoIterator<Item = InstanceRecord>) -> Self {
        let mut records: Vec<InstanceRecord> = records.into_iter().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id).then(b.last_heartbeat.cmp(&a.last_heartbeat)));
        records.dedup_by(|later, earlier| later.id == earlier.id);
        Self(records)
    }

    pub fn records(&self) -> &[InstanceRecord] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, InstanceRecord> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ids(&self) -> Vec<InstanceId> {
        self.0.iter().map(|r| r.id).collect()
    }

    pub fn get(&self, id: InstanceId) -> Option<&InstanceRecord> {
        self.position(id).ok().map(|idx| &self.0[idx])
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.position(id).is_ok()
    }

    /// Insert a record or replace the one with the same id
    pub fn upsert(&mut self, record: InstanceRecord) {
        match self.position(record.id) {
            Ok(idx) => self.0[idx] = record,
            Err(idx) => self.0.insert(idx, record),
        }
    }

    pub fn remove(&mut self, id: InstanceId) -> Option<InstanceRecord> {
        self.position(id).ok().map(|idx| self.0.remove(idx))
    }

    /// Drop every record stale at `now_millis` except `keep`, returning the dropped ids
    pub fn remove_stale(&mut self, now_millis: i64, ttl_millis: i64, keep: InstanceId) -> Vec<InstanceId> {
        let mut removed = Vec::new();
        self.0.retain(|r| {
            let stale = r.id != keep && r.is_stale(now_millis, ttl_millis);
            if stale {
                removed.push(r.id);
            }
            !stale
        });
        removed
    }

    /// Same ids with the same shapes and metadata, heartbeats aside
    pub fn same_topology(&self, other: &Snapshot) -> bool {
        self.0.len() == other.0.len() && self.0.iter().zip(other.0.iter()).all(|(a, b)| a.same_content(b))
    }

    /// What changed going from `self` to `newer`
    pub fn diff(&self, newer: &Snapshot) -> TopologyChange {
        let mut change = TopologyChange::default();
        let mut old = self.0.iter().peekable();
        let mut new = newer.0.iter().peekable();

        loop {
            match (old.peek(), new.peek()) {
                (Some(o), Some(n)) => match o.id.cmp(&n.id) {
                    Ordering::Less => {
                        change.removed.push(o.id);
                        old.next();
                    }
                    Ordering::Greater => {
                        change.added.push(n.id);
                        new.next();
                    }
                    Ordering::Equal => {
                        if !o.same_content(n) {
                            change.reshaped.push(n.id);
                        }
                        old.next();
                        new.next();
                    }
                },
                (Some(o), None) => {
                    change.removed.push(o.id);
                    old.next();
                }
                (None, Some(n)) => {
                    change.added.push(n.id);
                    new.next();
                }
                (None, None) => break,
            }
        }

        change
    }

    fn position(&self, id: InstanceId) -> Result<usize, usize> {
        self.0.binary_search_by(|r| r.id.cmp(&id))
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a InstanceRecord;
    type IntoIter = std::slice::Iter<'a, InstanceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Membership and content differences between two snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyChange {
    pub added: Vec<InstanceId>,
    pub removed: Vec<InstanceId>,
    /// Ids present in both whose shape or metadata differ
    pub reshaped: Vec<InstanceId>,
}

impl TopologyChange {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.reshaped.is_empty()
    }

    /// Whether the set of ids changed
    pub fn membership_changed(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }
}

impl fmt::Display for TopologyChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups = [("+", &self.added), ("-", &self.removed), ("~", &self.reshaped)];
        let mut first = true;
        for (sigil, ids) in groups {
            for id in ids {
                if !first {
                    write!(f, " ")?;
                }
                write!(f, "{}{}", sigil, id)?;
                first = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MetaData, Shape};
    use proptest::prelude::*;

    fn record(id: i64, x: i32, heartbeat: i64) -> InstanceRecord {
        InstanceRecord::new(InstanceId::new(id), Shape::new(x, 0, 100, 100), MetaData::new(), heartbeat)
    }

    #[test]
    fn test_from_records_sorts_and_dedups() {
        let snap = Snapshot::from_records(vec![record(3, 0, 10), record(1, 0, 10), record(3, 7, 20), record(2, 0, 5)]);

        assert_eq!(snap.ids(), vec![InstanceId::new(1), InstanceId::new(2), InstanceId::new(3)]);
        // freshest duplicate wins
        assert_eq!(snap.get(InstanceId::new(3)).unwrap().shape.x, 7);
    }

    #[test]
    fn test_upsert_and_remove() {
        let mut snap = Snapshot::new();
        snap.upsert(record(5, 0, 0));
        snap.upsert(record(2, 0, 0));
        snap.upsert(record(5, 9, 1));

        assert_eq!(snap.ids(), vec![InstanceId::new(2), InstanceId::new(5)]);
        assert_eq!(snap.get(InstanceId::new(5)).unwrap().shape.x, 9);

        assert!(snap.remove(InstanceId::new(2)).is_some());
        assert!(snap.remove(InstanceId::new(2)).is_none());
        assert_eq!(snap.len(), 1);
    }

    #[test]
    fn test_remove_stale_keeps_self() {
        let mut snap = Snapshot::from_records(vec![record(1, 0, 0), record(2, 0, 900), record(3, 0, 100)]);

        let removed = snap.remove_stale(1_000, 300, InstanceId::new(1));

        assert_eq!(removed, vec![InstanceId::new(3)]);
        assert_eq!(snap.ids(), vec![InstanceId::new(1), InstanceId::new(2)]);
    }

    #[test]
    fn test_same_topology_ignores_heartbeats() {
        let a = Snapshot::from_records(vec![record(1, 0, 0), record(2, 0, 0)]);
        let b = Snapshot::from_records(vec![record(1, 0, 50), record(2, 0, 60)]);
        let c = Snapshot::from_records(vec![record(1, 0, 0), record(2, 1, 0)]);
        let d = Snapshot::from_records(vec![record(1, 0, 0)]);

        assert!(a.same_topology(&b));
        assert!(!a.same_topology(&c));
        assert!(!a.same_topology(&d));
    }

    #[test]
    fn test_diff() {
        let old = Snapshot::from_records(vec![record(1, 0, 0), record(2, 0, 0), record(4, 0, 0)]);
        let new = Snapshot::from_records(vec![record(2, 5, 0), record(3, 0, 0), record(4, 0, 99)]);

        let change = old.diff(&new);
        assert_eq!(change.added, vec![InstanceId::new(3)]);
        assert_eq!(change.removed, vec![InstanceId::new(1)]);
        assert_eq!(change.reshaped, vec![InstanceId::new(2)]);
        assert!(change.membership_changed());
        assert_eq!(change.to_string(), "+3 -1 ~2");

        assert!(new.diff(&new).is_empty());
    }

    proptest! {
        #[test]
        fn prop_snapshot_always_sorted_by_id(
            entries in prop::collection::vec((-50i64..50, -1000i32..1000, 0i64..1000), 0..40),
            upserts in prop::collection::vec((-50i64..50, -1000i32..1000, 0i64..1000), 0..20),
        ) {
            let mut snap = Snapshot::from_records(entries.iter().map(|&(id, x, hb)| record(id, x, hb)));
            for &(id, x, hb) in &upserts {
                snap.upsert(record(id, x, hb));
            }

            let ids = snap.ids();
            prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));

            let mut expected: Vec<i64> = entries.iter().chain(upserts.iter()).map(|&(id, _, _)| id).collect();
            expected.sort_unstable();
            expected.dedup();
            prop_assert_eq!(ids.iter().map(|id| id.as_i64()).collect::<Vec<_>>(), expected);
        }
    }
}
