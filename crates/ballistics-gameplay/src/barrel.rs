//! Weapon barrel.
//!
//! This module provides:
//! - Barrel transform and muzzle velocity multipliers
//! - Velocity inheritance from a moving carrier body
//! - Hit prediction from the barrel or an arbitrary location
//! - Aim direction solving against moving targets

use ballistics_common::{lerp_f32, safe_normalize, ActorId, BallisticsResult, Quat, Vec3};
use ballistics_kernel::aim::{solve_aim, AimRequest, AimSolution};
use ballistics_kernel::atmosphere::Environment;
use ballistics_kernel::collision::CollisionWorld;
use ballistics_kernel::projectile::ProjectileProfile;
use ballistics_kernel::trajectory::{predict, LaunchState, PredictParams, Prediction};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ============================================================================
// Carrier body
// ============================================================================

/// Rigid body the barrel is mounted on.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CarrierBody {
    /// Linear velocity of the centre of mass.
    pub linear_velocity: Vec3,
    /// Angular velocity, radians per second about each axis.
    pub angular_velocity: Vec3,
    /// Centre of mass in world space.
    pub center_of_mass: Vec3,
}

impl CarrierBody {
    /// Create a carrier moving without rotation.
    #[must_use]
    pub fn moving(linear_velocity: Vec3) -> Self {
        Self {
            linear_velocity,
            ..Self::default()
        }
    }

    /// Set angular velocity about a centre of mass.
    #[must_use]
    pub const fn with_spin(mut self, angular_velocity: Vec3, center_of_mass: Vec3) -> Self {
        self.angular_velocity = angular_velocity;
        self.center_of_mass = center_of_mass;
        self
    }

    /// Velocity of the body at a world point.
    #[must_use]
    pub fn velocity_at_point(&self, point: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(point - self.center_of_mass)
    }
}

// ============================================================================
// Barrel
// ============================================================================

const fn default_multiplier() -> f32 {
    1.0
}

const fn default_inherit() -> f32 {
    1.0
}

/// A weapon barrel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Barrel {
    /// Muzzle location.
    #[serde(default)]
    pub location: Vec3,
    /// Orientation; the barrel fires along local +X.
    #[serde(default)]
    pub rotation: Quat,
    /// Lower bound of the muzzle velocity multiplier.
    #[serde(default = "default_multiplier")]
    pub muzzle_velocity_multiplier_min: f32,
    /// Upper bound of the muzzle velocity multiplier.
    #[serde(default = "default_multiplier")]
    pub muzzle_velocity_multiplier_max: f32,
    /// Velocity added to every launch.
    #[serde(default)]
    pub additional_velocity: Vec3,
    /// Fraction of carrier velocity passed on to the projectile.
    #[serde(default = "default_inherit")]
    pub inherit_velocity: f32,
    /// Body the barrel is attached to, if it moves.
    #[serde(default)]
    pub carrier: Option<CarrierBody>,
    /// Actor firing the barrel.
    #[serde(default)]
    pub owner: Option<ActorId>,
}

impl Default for Barrel {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Quat::IDENTITY)
    }
}

impl Barrel {
    /// Create a barrel at a location and orientation.
    #[must_use]
    pub fn new(location: Vec3, rotation: Quat) -> Self {
        Self {
            location,
            rotation,
            muzzle_velocity_multiplier_min: default_multiplier(),
            muzzle_velocity_multiplier_max: default_multiplier(),
            additional_velocity: Vec3::ZERO,
            inherit_velocity: default_inherit(),
            carrier: None,
            owner: None,
        }
    }

    /// Create a barrel pointing along `direction`.
    #[must_use]
    pub fn looking_along(location: Vec3, direction: Vec3) -> Self {
        let direction = safe_normalize(direction);
        Self::new(location, Quat::from_rotation_arc(Vec3::X, direction))
    }

    /// Set the muzzle velocity multiplier range.
    #[must_use]
    pub fn with_multiplier(mut self, min: f32, max: f32) -> Self {
        self.muzzle_velocity_multiplier_min = min;
        self.muzzle_velocity_multiplier_max = max;
        self
    }

    /// Set the additional launch velocity.
    #[must_use]
    pub fn with_additional_velocity(mut self, velocity: Vec3) -> Self {
        self.additional_velocity = velocity;
        self
    }

    /// Attach to a carrier body, inheriting `factor` of its velocity.
    #[must_use]
    pub fn with_carrier(mut self, carrier: CarrierBody, factor: f32) -> Self {
        self.carrier = Some(carrier);
        self.inherit_velocity = factor;
        self
    }

    /// Set the firing actor.
    #[must_use]
    pub fn with_owner(mut self, owner: ActorId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Firing direction.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Midpoint of the multiplier range.
    #[must_use]
    pub fn nominal_multiplier(&self) -> f32 {
        lerp_f32(
            self.muzzle_velocity_multiplier_min,
            self.muzzle_velocity_multiplier_max,
            0.5,
        )
    }

    /// Muzzle speed of an average shot.
    #[must_use]
    pub fn nominal_muzzle_speed(&self, profile: &ProjectileProfile) -> f32 {
        self.nominal_multiplier() * profile.nominal_muzzle_speed()
    }

    /// Velocity added on top of the muzzle velocity at `start`.
    #[must_use]
    pub fn extra_velocity(&self, start: Vec3) -> Vec3 {
        let inherited = self
            .carrier
            .map_or(Vec3::ZERO, |body| body.velocity_at_point(start) * self.inherit_velocity);
        self.additional_velocity + inherited
    }

    /// Launch state of an average shot.
    #[must_use]
    pub fn launch_state(&self, profile: &ProjectileProfile, start: Vec3, aim: Vec3) -> LaunchState {
        self.launch_with_speed(start, aim, self.nominal_muzzle_speed(profile))
    }

    /// Launch state of a shot with randomised muzzle speed.
    pub fn sampled_launch_state(
        &self,
        profile: &ProjectileProfile,
        start: Vec3,
        aim: Vec3,
        rng: &mut fastrand::Rng,
    ) -> LaunchState {
        let multiplier = lerp_f32(
            self.muzzle_velocity_multiplier_min,
            self.muzzle_velocity_multiplier_max,
            rng.f32(),
        );
        self.launch_with_speed(start, aim, multiplier * profile.sample_muzzle_speed(rng))
    }

    fn launch_with_speed(&self, start: Vec3, aim: Vec3, speed: f32) -> LaunchState {
        let launch =
            LaunchState::new(start, aim, speed).with_added_velocity(self.extra_velocity(start));
        match self.owner {
            Some(owner) => launch.with_owner(owner),
            None => launch,
        }
    }

    /// Predict where a shot fired from the barrel lands.
    pub fn predict_hit<W>(
        &self,
        world: &W,
        env: &dyn Environment,
        profile: &ProjectileProfile,
        ignored: &[ActorId],
        params: PredictParams,
    ) -> BallisticsResult<Prediction>
    where
        W: CollisionWorld + ?Sized,
    {
        self.predict_hit_from_location(
            world,
            env,
            profile,
            self.location,
            self.forward(),
            ignored,
            params,
        )
    }

    /// Predict where a shot from `start` along `aim` lands.
    pub fn predict_hit_from_location<W>(
        &self,
        world: &W,
        env: &dyn Environment,
        profile: &ProjectileProfile,
        start: Vec3,
        aim: Vec3,
        ignored: &[ActorId],
        params: PredictParams,
    ) -> BallisticsResult<Prediction>
    where
        W: CollisionWorld + ?Sized,
    {
        let launch = self.launch_state(profile, start, aim);
        debug!(
            "barrel: predicting {} from {:?} at {:?}",
            profile.name, start, launch.velocity
        );
        predict(world, env, profile, &launch, ignored, params)
    }

    /// Aim request for a shot from `start`.
    #[must_use]
    pub fn aim_request(
        &self,
        profile: &ProjectileProfile,
        start: Vec3,
        target: Vec3,
        target_velocity: Vec3,
        iterations: u32,
    ) -> AimRequest {
        let mut request = AimRequest::new(
            start,
            target,
            target_velocity,
            self.nominal_muzzle_speed(profile),
        )
        .with_iterations(iterations)
        .with_added_velocity(self.extra_velocity(start));
        request.owner = self.owner;
        request
    }

    /// Solve the aim direction from the barrel location.
    pub fn calculate_aim_direction<W>(
        &self,
        world: &W,
        env: &dyn Environment,
        profile: &ProjectileProfile,
        target: Vec3,
        target_velocity: Vec3,
        params: PredictParams,
        iterations: u32,
    ) -> BallisticsResult<AimSolution>
    where
        W: CollisionWorld + ?Sized,
    {
        self.calculate_aim_direction_from_location(
            world,
            env,
            profile,
            self.location,
            target,
            target_velocity,
            params,
            iterations,
        )
    }

    /// Solve the aim direction for a shot from `start`.
    pub fn calculate_aim_direction_from_location<W>(
        &self,
        world: &W,
        env: &dyn Environment,
        profile: &ProjectileProfile,
        start: Vec3,
        target: Vec3,
        target_velocity: Vec3,
        params: PredictParams,
        iterations: u32,
    ) -> BallisticsResult<AimSolution>
    where
        W: CollisionWorld + ?Sized,
    {
        let request = self.aim_request(profile, start, target, target_velocity, iterations);
        solve_aim(world, env, profile, &request, &[], params)
    }
}
