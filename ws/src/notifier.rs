//! Change notification for local consumers
//!
//! Two callbacks: one for this window's own shape, one for the group's
//! topology. The topology callback only fires when ids, shapes or metadata
//! differ from the last reported snapshot; heartbeat-only churn is silent.

use tracing::debug;

use crate::domain::{Snapshot, TopologyChange};

type ShapeCallback = Box<dyn FnMut(bool)>;
type ChangeCallback = Box<dyn FnMut()>;

/// Deduplicating dispatcher for shape and topology callbacks
#[derive(Default)]
pub struct ChangeNotifier {
    baseline: Snapshot,
    on_shape: Option<ShapeCallback>,
    on_change: Option<ChangeCallback>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with `easing = true` when the consumer should animate
    pub fn set_shape_callback(&mut self, callback: impl FnMut(bool) + 'static) {
        self.on_shape = Some(Box::new(callback));
    }

    pub fn set_change_callback(&mut self, callback: impl FnMut() + 'static) {
        self.on_change = Some(Box::new(callback));
    }

    /// Reset the reference snapshot without notifying
    pub fn prime(&mut self, baseline: Snapshot) {
        self.baseline = baseline;
    }

    /// Last snapshot reported to the topology callback
    pub fn baseline(&self) -> &Snapshot {
        &self.baseline
    }

    pub fn shape_changed(&mut self, easing: bool) {
        if let Some(callback) = self.on_shape.as_mut() {
            callback(easing);
        }
    }

    /// Compare against the baseline and notify on a real difference
    pub fn observe(&mut self, current: &Snapshot) -> Option<TopologyChange> {
        if current.same_topology(&self.baseline) {
            return None;
        }

        let change = self.baseline.diff(current);
        debug!(%change, "Topology changed");
        self.baseline = current.clone();
        if let Some(callback) = self.on_change.as_mut() {
            callback();
        }
        Some(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InstanceId, InstanceRecord, MetaData, Shape};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn record(id: i64, x: i32, heartbeat: i64) -> InstanceRecord {
        InstanceRecord::new(InstanceId::new(id), Shape::new(x, 0, 10, 10), MetaData::new(), heartbeat)
    }

    fn counting(notifier: &mut ChangeNotifier) -> Rc<Cell<u32>> {
        let count = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count);
        notifier.set_change_callback(move || counter.set(counter.get() + 1));
        count
    }

    #[test]
    fn test_observe_fires_once_per_change() {
        let mut notifier = ChangeNotifier::new();
        let count = counting(&mut notifier);
        notifier.prime(Snapshot::from_records(vec![record(1, 0, 0)]));

        let grown = Snapshot::from_records(vec![record(1, 0, 0), record(2, 0, 0)]);
        let change = notifier.observe(&grown).unwrap();
        assert_eq!(change.added, vec![InstanceId::new(2)]);
        assert!(notifier.observe(&grown).is_none());

        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_heartbeat_only_changes_are_silent() {
        let mut notifier = ChangeNotifier::new();
        let count = counting(&mut notifier);
        notifier.prime(Snapshot::from_records(vec![record(1, 0, 0), record(2, 0, 0)]));

        for hb in 1..10 {
            let snap = Snapshot::from_records(vec![record(1, 0, hb * 100), record(2, 0, hb * 100)]);
            assert!(notifier.observe(&snap).is_none());
        }
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_peer_shape_change_fires() {
        let mut notifier = ChangeNotifier::new();
        let count = counting(&mut notifier);
        notifier.prime(Snapshot::from_records(vec![record(1, 0, 0), record(2, 0, 0)]));

        let change = notifier
            .observe(&Snapshot::from_records(vec![record(1, 0, 0), record(2, 40, 0)]))
            .unwrap();

        assert_eq!(change.reshaped, vec![InstanceId::new(2)]);
        assert!(!change.membership_changed());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_shape_callback_gets_easing_flag() {
        let mut notifier = ChangeNotifier::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        notifier.set_shape_callback(move |easing| sink.borrow_mut().push(easing));

        notifier.shape_changed(true);
        notifier.shape_changed(false);

        assert_eq!(*seen.borrow(), vec![true, false]);
    }

    #[test]
    fn test_no_callbacks_registered() {
        let mut notifier = ChangeNotifier::new();
        notifier.shape_changed(true);
        assert!(notifier.observe(&Snapshot::from_records(vec![record(1, 0, 0)])).is_some());
    }
}
