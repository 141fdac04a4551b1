//! Heartbeat: the read-merge-refresh-prune-write cycle
//!
//! Runs once per `update()`. Concurrent cycles in other instances can
//! overwrite ours (last write wins); whatever they drop is re-published on
//! our next cycle, so views converge within a few heartbeat intervals.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::domain::{InstanceId, Snapshot, TopologyChange};
use crate::error::SyncError;
use crate::registry::InstanceRegistry;
use crate::store::SharedStateStore;

/// Default heartbeat interval in milliseconds
pub const DEFAULT_INTERVAL_MS: u64 = 100;

/// Default TTL as a multiple of the heartbeat interval
pub const DEFAULT_STALENESS_FACTOR: u32 = 3;

/// Heartbeat cadence and staleness threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatPolicy {
    /// Expected time between `update()` calls
    pub interval: Duration,
    /// Peers older than `interval * staleness_factor` are pruned
    pub staleness_factor: u32,
}

impl Default for HeartbeatPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            staleness_factor: DEFAULT_STALENESS_FACTOR,
        }
    }
}

impl HeartbeatPolicy {
    pub fn new(interval: Duration, staleness_factor: u32) -> Self {
        Self {
            interval,
            staleness_factor,
        }
    }

    /// Maximum heartbeat age before a peer is considered gone
    pub fn ttl(&self) -> Duration {
        self.interval * self.staleness_factor
    }

    pub fn ttl_millis(&self) -> i64 {
        i64::try_from(self.ttl().as_millis()).unwrap_or(i64::MAX)
    }
}

/// Outcome of one `update()` cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Peers removed for staleness in this cycle
    pub pruned: Vec<InstanceId>,
    /// Old and new id when this instance found itself pruned and re-entered
    pub rotated: Option<(InstanceId, InstanceId)>,
    /// Whether the merged snapshot was written back
    pub published: bool,
    /// Whether the shared store could be used this cycle
    pub store_available: bool,
    /// Whether the stored value was unreadable and got replaced
    pub malformed: bool,
    /// Whether another instance wrote the key since the previous cycle
    pub external_change: bool,
    /// Whether our own shape changed this cycle
    pub shape_changed: bool,
    /// Topology difference reported to the change callback, if any
    pub topology: Option<TopologyChange>,
}

/// Drives the per-tick heartbeat cycle
#[derive(Debug, Clone)]
pub struct HeartbeatScheduler {
    policy: HeartbeatPolicy,
    store_available: bool,
}

impl HeartbeatScheduler {
    pub fn new(policy: HeartbeatPolicy) -> Self {
        Self {
            policy,
            store_available: true,
        }
    }

    pub fn policy(&self) -> &HeartbeatPolicy {
        &self.policy
    }

    /// Whether the last cycle could reach the shared store
    pub fn store_available(&self) -> bool {
        self.store_available
    }

    /// Run one cycle against the shared store
    pub fn tick(&mut self, registry: &mut InstanceRegistry, store: &mut SharedStateStore, now_millis: i64) -> TickReport {
        let ttl = self.policy.ttl_millis();
        let mut report = TickReport::default();

        // 1. read
        let (shared, mut available) = match store.try_read() {
            Ok(snapshot) => (snapshot, true),
            Err(SyncError::MalformedSnapshot(e)) => {
                warn!(error = %e, "Shared snapshot unreadable, overwriting");
                report.malformed = true;
                (Snapshot::new(), true)
            }
            Err(e) => {
                if self.store_available {
                    warn!(error = %e, "Shared store unavailable, running single-instance");
                }
                (Snapshot::new(), false)
            }
        };

        // A removed id stays removed: if a peer pruned us while we were
        // silent, come back under a new one.
        if available
            && !shared.contains(registry.self_id())
            && let Some(published) = registry.last_published()
            && now_millis.saturating_sub(published) > ttl
        {
            let new_id = InstanceId::generate(now_millis);
            let old_id = registry.rotate_id(new_id);
            info!(%old_id, %new_id, "Own record was pruned by a peer, re-entering under new id");
            report.rotated = Some((old_id, new_id));
        }

        // 2. merge, 3. refresh
        registry.merge_external(shared);
        registry.refresh_heartbeat(now_millis);

        // 4. prune
        report.pruned = registry.prune(now_millis, ttl);
        if !report.pruned.is_empty() {
            info!(pruned = ?report.pruned, "Pruned stale instances");
        }

        // 5. write back
        if available {
            match store.write(registry.snapshot()) {
                Ok(()) => {
                    registry.mark_published(now_millis);
                    report.published = true;
                }
                Err(e) => {
                    warn!(error = %e, "Publishing snapshot failed, running single-instance");
                    registry.merge_external(Snapshot::new());
                    available = false;
                }
            }
        }

        if available && !self.store_available {
            info!("Shared store available again");
        }
        self.store_available = available;
        report.store_available = available;

        debug!(
            id = %registry.self_id(),
            count = registry.snapshot().len(),
            published = report.published,
            "Heartbeat"
        );
        report
    }
}
