//! Domain types for winsync
//!
//! Instance identity, window geometry, the per-instance record published to
//! the shared medium, and the id-ordered snapshot consumers read.

mod id;
mod record;
mod shape;
mod snapshot;

pub use id::InstanceId;
pub use record::{InstanceRecord, MetaData};
pub use shape::Shape;
pub use snapshot::{Snapshot, TopologyChange};
