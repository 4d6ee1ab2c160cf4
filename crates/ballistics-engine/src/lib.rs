//! Ballistics Engine - configuration, projectile assets and scenario runs
//! for the `ballistics` command-line tool.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod projectile_loader;
pub mod scenario;
