//! WindowManager: the consumer-facing facade
//!
//! A render loop (or any other host) drives it once per tick:
//!
//! ```ignore
//! let mut wm = WindowManager::new(store, HeartbeatPolicy::default(), shape_source);
//! wm.set_win_change_callback(|| println!("topology changed"));
//! wm.init(meta);
//! loop {
//!     wm.update();
//!     for (i, win) in wm.get_windows().iter().enumerate() {
//!         // position the i-th visual at win.shape.center()
//!     }
//! }
//! ```
//!
//! Callbacks run while the manager is mutably borrowed, so they cannot call
//! back into it. Consumers record that something happened (a flag, a
//! channel) and call `get_windows()` after `update()` returns, or inspect the
//! returned `TickReport` instead.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::domain::{InstanceId, InstanceRecord, MetaData};
use crate::error::SyncResult;
use crate::heartbeat::{HeartbeatPolicy, HeartbeatScheduler, TickReport};
use crate::notifier::ChangeNotifier;
use crate::registry::InstanceRegistry;
use crate::shape_source::ShapeSource;
use crate::store::SharedStateStore;

enum Lifecycle {
    /// Constructed, `init` not called yet
    Pending,
    Active(InstanceRegistry),
    Departed,
}

/// One instance's participation in the window group
pub struct WindowManager {
    store: SharedStateStore,
    scheduler: HeartbeatScheduler,
    notifier: ChangeNotifier,
    clock: Arc<dyn Clock>,
    shape_source: Box<dyn ShapeSource>,
    requested_id: Option<InstanceId>,
    state: Lifecycle,
}

impl WindowManager {
    pub fn new(store: SharedStateStore, policy: HeartbeatPolicy, shape_source: impl ShapeSource + 'static) -> Self {
        Self {
            store,
            scheduler: HeartbeatScheduler::new(policy),
            notifier: ChangeNotifier::new(),
            clock: Arc::new(SystemClock),
            shape_source: Box::new(shape_source),
            requested_id: None,
            state: Lifecycle::Pending,
        }
    }

    /// Use a different time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Register under this id instead of generating one
    pub fn with_id(mut self, id: InstanceId) -> Self {
        self.requested_id = Some(id);
        self
    }

    /// Called with an easing flag when this window's own shape changes
    pub fn set_win_shape_change_callback(&mut self, callback: impl FnMut(bool) + 'static) {
        self.notifier.set_shape_callback(callback);
    }

    /// Called when the set of windows, or any window's shape or metadata, changes
    pub fn set_win_change_callback(&mut self, callback: impl FnMut() + 'static) {
        self.notifier.set_change_callback(callback);
    }

    /// Called during `update()` when another instance wrote the shared list
    pub fn on_external_change(&mut self, callback: impl FnMut() + 'static) {
        self.store.on_external_change(callback);
    }

    /// Join the group
    ///
    /// Performs the first heartbeat write and primes change detection. If
    /// peers are already present, the change callback fires once here so the
    /// first `update()` does not report them again.
    pub fn init(&mut self, meta_data: MetaData) -> InstanceId {
        if let Lifecycle::Active(registry) = &self.state {
            warn!(id = %registry.self_id(), "init called twice, ignoring");
            return registry.self_id();
        }

        let now = self.clock.now_millis();
        let shape = self.shape_source.current_shape();
        let id = self.requested_id.take().unwrap_or_else(|| InstanceId::generate(now));

        let mut registry = InstanceRegistry::new(id, shape, meta_data, now);
        self.notifier.prime(registry.snapshot().clone());
        self.store.poll_external_change();

        let report = self.scheduler.tick(&mut registry, &mut self.store, now);
        self.notifier.observe(registry.snapshot());

        info!(
            %id,
            %shape,
            peers = registry.snapshot().len().saturating_sub(1),
            published = report.published,
            "Registered instance"
        );

        self.state = Lifecycle::Active(registry);
        id
    }

    /// Run one tick: pick up our shape, heartbeat, prune, notify
    ///
    /// Does nothing before `init` or after `depart`.
    pub fn update(&mut self) -> TickReport {
        let Lifecycle::Active(registry) = &mut self.state else {
            return TickReport::default();
        };

        let now = self.clock.now_millis();
        let shape = self.shape_source.current_shape();
        let shape_changed = registry.upsert_self(shape, None);
        if shape_changed {
            debug!(id = %registry.self_id(), %shape, "Own shape changed");
            self.notifier.shape_changed(true);
        }

        let external_change = self.store.poll_external_change();
        let mut report = self.scheduler.tick(registry, &mut self.store, now);
        report.shape_changed = shape_changed;
        report.external_change = external_change;
        report.topology = self.notifier.observe(registry.snapshot());
        report
    }

    /// Every known window, sorted by id ascending
    pub fn get_windows(&self) -> &[InstanceRecord] {
        match &self.state {
            Lifecycle::Active(registry) => registry.snapshot().records(),
            _ => &[],
        }
    }

    /// This instance's own record
    pub fn this_window(&self) -> Option<&InstanceRecord> {
        match &self.state {
            Lifecycle::Active(registry) => Some(registry.self_record()),
            _ => None,
        }
    }

    pub fn id(&self) -> Option<InstanceId> {
        self.this_window().map(|r| r.id)
    }

    pub fn policy(&self) -> &HeartbeatPolicy {
        self.scheduler.policy()
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, Lifecycle::Active(_))
    }

    /// Whether the last tick could reach the shared store
    pub fn store_available(&self) -> bool {
        self.scheduler.store_available()
    }

    /// Leave the group, removing our record from the shared list
    ///
    /// Best effort: peers prune us by staleness anyway if this never runs or
    /// fails. The manager stops participating either way; a later `init`
    /// re-enters under a new id.
    pub fn depart(&mut self) -> SyncResult<()> {
        if !self.is_active() {
            return Ok(());
        }
        let Lifecycle::Active(registry) = std::mem::replace(&mut self.state, Lifecycle::Departed) else {
            return Ok(());
        };

        let id = registry.self_id();
        let mut shared = self.store.try_read()?;
        if shared.remove(id).is_some() {
            self.store.write(&shared)?;
        }
        info!(%id, "Departed");
        Ok(())
    }

    /// Wipe all shared state (administrative reset)
    pub fn clear_shared_state(&mut self) -> SyncResult<()> {
        self.store.clear()
    }
}
