//! Projectile profiles.
//!
//! A [`ProjectileProfile`] is the immutable description of a round: how fast
//! it leaves the muzzle, how its velocity evolves in flight, and how it
//! interacts with collision queries.
//!
//! # Example
//!
//! ```
//! use ballistics_kernel::projectile::ProjectileProfile;
//! use ballistics_kernel::velocity::DragModel;
//!
//! let profile = ProjectileProfile::new("7.62x51")
//!     .with_muzzle_velocity(820.0, 860.0)
//!     .with_rule(DragModel::default());
//!
//! assert!(profile.validate().is_ok());
//! assert!((profile.nominal_muzzle_speed() - 840.0).abs() < 1e-3);
//! ```

use std::fmt;
use std::sync::Arc;

use ballistics_common::{lerp_f32, ProfileError, Vec3};

use crate::atmosphere::Environment;
use crate::collision::TraceChannel;
use crate::velocity::{DragModel, VelocityRule};

/// Default muzzle velocity range, m/s.
pub const DEFAULT_MUZZLE_VELOCITY: (f32, f32) = (800.0, 800.0);

/// Immutable description of a projectile.
#[derive(Clone)]
pub struct ProjectileProfile {
    /// Display name.
    pub name: String,
    /// Lower end of the muzzle velocity range.
    pub muzzle_velocity_min: f32,
    /// Upper end of the muzzle velocity range.
    pub muzzle_velocity_max: f32,
    /// Channel used for collision queries.
    pub trace_channel: TraceChannel::Flags,
    /// Ignore the firing actor during collision queries.
    pub safe_launch: bool,
    /// Trace against complex (per-triangle) geometry.
    pub trace_complex: bool,
    /// In-flight velocity update.
    rule: Arc<dyn VelocityRule>,
    /// Model parameters kept for validation, when the rule is a [`DragModel`].
    drag_model: Option<DragModel>,
}

impl fmt::Debug for ProjectileProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectileProfile")
            .field("name", &self.name)
            .field("muzzle_velocity_min", &self.muzzle_velocity_min)
            .field("muzzle_velocity_max", &self.muzzle_velocity_max)
            .field("trace_channel", &self.trace_channel)
            .field("safe_launch", &self.safe_launch)
            .field("trace_complex", &self.trace_complex)
            .field("drag_model", &self.drag_model)
            .finish_non_exhaustive()
    }
}

impl ProjectileProfile {
    /// Create a profile with default muzzle velocity and a standard drag model.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let model = DragModel::default();
        Self {
            name: name.into(),
            muzzle_velocity_min: DEFAULT_MUZZLE_VELOCITY.0,
            muzzle_velocity_max: DEFAULT_MUZZLE_VELOCITY.1,
            trace_channel: TraceChannel::PROJECTILE,
            safe_launch: true,
            trace_complex: false,
            rule: Arc::new(model),
            drag_model: Some(model),
        }
    }

    /// Set the muzzle velocity range.
    #[must_use]
    pub fn with_muzzle_velocity(mut self, min: f32, max: f32) -> Self {
        self.muzzle_velocity_min = min;
        self.muzzle_velocity_max = max;
        self
    }

    /// Use a drag model as the velocity rule.
    #[must_use]
    pub fn with_rule(mut self, model: DragModel) -> Self {
        self.rule = Arc::new(model);
        self.drag_model = Some(model);
        self
    }

    /// Use an arbitrary velocity rule.
    #[must_use]
    pub fn with_custom_rule<R>(mut self, rule: R) -> Self
    where
        R: VelocityRule + 'static,
    {
        self.rule = Arc::new(rule);
        self.drag_model = None;
        self
    }

    /// Set the collision channel.
    #[must_use]
    pub fn with_channel(mut self, channel: TraceChannel::Flags) -> Self {
        self.trace_channel = channel;
        self
    }

    /// Set whether the firer is ignored.
    #[must_use]
    pub fn with_safe_launch(mut self, safe_launch: bool) -> Self {
        self.safe_launch = safe_launch;
        self
    }

    /// Set whether complex collision is used.
    #[must_use]
    pub fn with_trace_complex(mut self, trace_complex: bool) -> Self {
        self.trace_complex = trace_complex;
        self
    }

    /// The drag model, if the rule is one.
    #[must_use]
    pub fn drag_model(&self) -> Option<&DragModel> {
        self.drag_model.as_ref()
    }

    /// Check the profile is usable for a prediction.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.name.trim().is_empty() {
            return Err(ProfileError::EmptyName);
        }

        let (min, max) = (self.muzzle_velocity_min, self.muzzle_velocity_max);
        if !min.is_finite() || !max.is_finite() {
            return Err(ProfileError::NonFiniteSpeed(self.name.clone()));
        }
        if min < 0.0 || max < 0.0 {
            return Err(ProfileError::NegativeSpeed {
                name: self.name.clone(),
                speed: min.min(max),
            });
        }
        if min > max {
            return Err(ProfileError::InvertedRange {
                name: self.name.clone(),
                min,
                max,
            });
        }

        if let Some(model) = &self.drag_model {
            model.validate().map_err(|reason| ProfileError::InvalidModel {
                name: self.name.clone(),
                reason,
            })?;
        }

        Ok(())
    }

    /// Midpoint of the muzzle velocity range.
    #[must_use]
    pub fn nominal_muzzle_speed(&self) -> f32 {
        lerp_f32(self.muzzle_velocity_min, self.muzzle_velocity_max, 0.5)
    }

    /// Uniform sample of the muzzle velocity range.
    pub fn sample_muzzle_speed(&self, rng: &mut fastrand::Rng) -> f32 {
        lerp_f32(self.muzzle_velocity_min, self.muzzle_velocity_max, rng.f32())
    }

    /// Apply the velocity rule for one step.
    #[must_use]
    pub fn next_velocity(
        &self,
        env: &dyn Environment,
        position: Vec3,
        velocity: Vec3,
        step: f32,
    ) -> Vec3 {
        self.rule.next_velocity(env, position, velocity, step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atmosphere::Vacuum;
    use crate::velocity::Inertial;

    #[test]
    fn test_profile_defaults() {
        let profile = ProjectileProfile::new("ball");
        assert_eq!(profile.trace_channel, TraceChannel::PROJECTILE);
        assert!(profile.safe_launch);
        assert!(!profile.trace_complex);
        assert!(profile.drag_model().is_some());
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_nominal_speed_is_midpoint() {
        let profile = ProjectileProfile::new("ball").with_muzzle_velocity(700.0, 900.0);
        assert!((profile.nominal_muzzle_speed() - 800.0).abs() < 1e-3);
    }

    #[test]
    fn test_sampled_speed_in_range() {
        let profile = ProjectileProfile::new("ball").with_muzzle_velocity(700.0, 900.0);
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..100 {
            let speed = profile.sample_muzzle_speed(&mut rng);
            assert!((700.0..=900.0).contains(&speed));
        }
    }

    #[test]
    fn test_validate_rejects_bad_profiles() {
        assert_eq!(
            ProjectileProfile::new(" ").validate(),
            Err(ProfileError::EmptyName)
        );
        assert!(matches!(
            ProjectileProfile::new("a").with_muzzle_velocity(900.0, 800.0).validate(),
            Err(ProfileError::InvertedRange { .. })
        ));
        assert!(matches!(
            ProjectileProfile::new("a").with_muzzle_velocity(-1.0, 800.0).validate(),
            Err(ProfileError::NegativeSpeed { .. })
        ));
        assert!(matches!(
            ProjectileProfile::new("a").with_muzzle_velocity(f32::NAN, 800.0).validate(),
            Err(ProfileError::NonFiniteSpeed(_))
        ));
        assert!(matches!(
            ProjectileProfile::new("a")
                .with_rule(DragModel::default().with_drag(-0.1, 0.3, 0.1))
                .validate(),
            Err(ProfileError::InvalidModel { .. })
        ));
    }

    #[test]
    fn test_custom_rule_drops_drag_model() {
        let profile = ProjectileProfile::new("laser").with_custom_rule(Inertial);
        assert!(profile.drag_model().is_none());
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(profile.next_velocity(&Vacuum, Vec3::ZERO, v, 0.1), v);
    }
}
