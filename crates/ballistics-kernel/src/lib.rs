//! # Ballistics Kernel
//!
//! Point-mass projectile simulation against a pluggable collision world.
//!
//! This crate provides:
//! - Environments (gravity, wind, air density) for velocity rules
//! - Velocity rules: a trait, a drag model, and closure support
//! - Projectile profiles (muzzle velocity range, trace settings)
//! - The collision query adapter and an in-memory scene of primitive shapes
//! - Trajectory prediction with a fixed-step trapezoidal integrator
//! - Iterative aim solving against moving targets
//!
//! ## Prediction
//!
//! [`trajectory::predict`] is a pure function of its inputs. It never
//! mutates the world and returns the same result for the same arguments.
//! Every swept segment goes through [`collision::CollisionWorld`], so a
//! host engine plugs in by implementing one method.
//!
//! ## Aiming
//!
//! [`aim::solve_aim`] runs a fixed number of predict-and-re-aim rounds.
//! Each round's flight time moves the predicted target along its velocity.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod aim;
pub mod atmosphere;
pub mod collision;
pub mod projectile;
pub mod trajectory;
pub mod velocity;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::aim::*;
    pub use crate::atmosphere::*;
    pub use crate::collision::*;
    pub use crate::projectile::*;
    pub use crate::trajectory::*;
    pub use crate::velocity::*;
}

pub use prelude::*;
