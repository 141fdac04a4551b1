//! winsync - serverless discovery and liveness for cooperating windows
//!
//! Independent instances of one application (separate windows, separate
//! processes) find each other, publish where they are on screen, and notice
//! when a peer goes away, using nothing but a shared key-value medium.
//!
//! # Core Concepts
//!
//! - **Shared list, no owner**: one key holds every instance's record; any
//!   instance may rewrite it and the last write wins
//! - **Heartbeats, not goodbyes**: a window can vanish without notice, so
//!   liveness is a timestamp that peers compare against a TTL
//! - **Self-healing**: a record dropped by a racing write is re-published on
//!   the owner's next heartbeat
//! - **Id order is the contract**: `get_windows()` is always sorted by id
//!
//! # Modules
//!
//! - [`domain`] - Instance ids, shapes, records, snapshots
//! - [`store`] - Typed access to the shared key
//! - [`registry`] - Local cache of known instances
//! - [`heartbeat`] - Read-merge-refresh-prune-write cycle
//! - [`notifier`] - Shape and topology callbacks
//! - [`manager`] - The `WindowManager` facade
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod heartbeat;
pub mod manager;
pub mod notifier;
pub mod registry;
pub mod shape_source;
pub mod store;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, HeartbeatConfig, StoreConfig};
pub use domain::{InstanceId, InstanceRecord, MetaData, Shape, Snapshot, TopologyChange};
pub use error::{SyncError, SyncResult};
pub use heartbeat::{HeartbeatPolicy, HeartbeatScheduler, TickReport};
pub use manager::WindowManager;
pub use notifier::ChangeNotifier;
pub use registry::InstanceRegistry;
pub use shape_source::{FileShapeSource, ShapeSource};
pub use store::{DEFAULT_KEY, SharedStateStore};
