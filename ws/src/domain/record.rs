//! Per-instance record published to the shared medium

use serde::{Deserialize, Serialize};

use super::{InstanceId, Shape};

/// Opaque key-value blob supplied by the consumer at init
pub type MetaData = serde_json::Map<String, serde_json::Value>;

/// Everything the group knows about one instance
///
/// The wire names match what other runtimes write to the same key. Unknown
/// fields are ignored and missing optional fields default, so instances
/// running different versions can share one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceRecord {
    pub id: InstanceId,
    pub shape: Shape,
    #[serde(default)]
    pub meta_data: MetaData,
    /// Unix millis of the owner's last heartbeat
    #[serde(default)]
    pub last_heartbeat: i64,
}

impl InstanceRecord {
    pub fn new(id: InstanceId, shape: Shape, meta_data: MetaData, now_millis: i64) -> Self {
        Self {
            id,
            shape,
            meta_data,
            last_heartbeat: now_millis,
        }
    }

    /// Same instance with the same visible content, heartbeat aside
    pub fn same_content(&self, other: &Self) -> bool {
        self.id == other.id && self.shape == other.shape && self.meta_data == other.meta_data
    }

    /// Heartbeat age at `now_millis`, zero for records from the future
    pub fn age(&self, now_millis: i64) -> i64 {
        now_millis.saturating_sub(self.last_heartbeat).max(0)
    }

    /// Whether the owner has missed its heartbeats for longer than `ttl_millis`
    pub fn is_stale(&self, now_millis: i64, ttl_millis: i64) -> bool {
        now_millis.saturating_sub(self.last_heartbeat) > ttl_millis
    }
}
