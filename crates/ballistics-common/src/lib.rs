//! # Ballistics Common
//!
//! Common types, utilities, and shared abstractions for the ballistics crates.
//!
//! This crate provides foundational types used across all subsystems:
//! - Vector math re-exported from `glam`, plus a few safe helpers
//! - ID types (ActorId)
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod ids;
pub mod math;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::math::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_id_generation() {
        let id1 = ActorId::new();
        let id2 = ActorId::new();
        assert_ne!(id1, id2);
        assert!(id1.is_valid());
    }

    #[test]
    fn test_prelude_exposes_math() {
        let dir = safe_normalize(Vec3::new(0.0, 3.0, 4.0));
        assert!((dir.length() - 1.0).abs() < 1e-6);
    }
}
