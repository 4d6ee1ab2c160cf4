//! Error types for the ballistics crates.

use thiserror::Error;

/// Top-level error type for ballistics operations.
#[derive(Debug, Error)]
pub enum BallisticsError {
    /// The projectile profile is missing or unusable
    #[error("Invalid projectile profile: {0}")]
    InvalidProfile(#[from] ProfileError),
}

/// Reasons a projectile profile is rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProfileError {
    /// Profile has no name
    #[error("profile has an empty name")]
    EmptyName,

    /// Muzzle velocity is NaN or infinite
    #[error("profile {0} has a non-finite muzzle velocity")]
    NonFiniteSpeed(String),

    /// Muzzle velocity below zero
    #[error("profile {name} has negative muzzle velocity {speed}")]
    NegativeSpeed {
        /// Profile name
        name: String,
        /// Offending speed
        speed: f32,
    },

    /// Minimum muzzle velocity above maximum
    #[error("profile {name} has muzzle velocity range [{min}, {max}] with min > max")]
    InvertedRange {
        /// Profile name
        name: String,
        /// Range minimum
        min: f32,
        /// Range maximum
        max: f32,
    },

    /// The velocity model parameters are unusable
    #[error("profile {name} has an invalid flight model: {reason}")]
    InvalidModel {
        /// Profile name
        name: String,
        /// What is wrong with the model
        reason: String,
    },

    /// Lookup by name found nothing
    #[error("no projectile profile named {0:?}")]
    Unknown(String),
}

/// Result type alias for ballistics operations.
pub type BallisticsResult<T> = Result<T, BallisticsError>;
