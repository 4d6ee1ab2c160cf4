//! ID types for actors that own collision surfaces.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for actor IDs.
static ACTOR_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Handle to an object in the host world.
///
/// Predictions only ever copy these around; the host decides what an id
/// refers to and whether it is still alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(u64);

impl ActorId {
    /// Creates a new unique actor ID.
    #[must_use]
    pub fn new() -> Self {
        Self(ACTOR_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Creates an actor ID from a raw value (for deserialization).
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Null/invalid actor ID.
    pub const NULL: Self = Self(0);

    /// Checks if this is a valid (non-null) actor ID.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}
