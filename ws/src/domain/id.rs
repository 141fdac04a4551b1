//! Instance ID generation
//!
//! There is no central allocator, so every instance picks its own id: the
//! creation time in milliseconds shifted left by 10 bits, with 10 random low
//! bits. Two instances collide only when they start in the same millisecond
//! and draw the same low bits (1 in 1024 for that case); the collision is an
//! accepted risk and is not detected. Ids stay below 2^53 so they survive
//! JSON number round trips in other runtimes, and sorting by id roughly
//! follows start order.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

const RANDOM_BITS: u32 = 10;

/// Identity of one participating instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(i64);

impl InstanceId {
    /// Wrap a caller-supplied id
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Generate a fresh id seeded by the given time
    pub fn generate(now_millis: i64) -> Self {
        let low: i64 = rand::rng().random_range(0..(1 << RANDOM_BITS));
        Self((now_millis.max(0) << RANDOM_BITS) | low)
    }

    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for InstanceId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}
