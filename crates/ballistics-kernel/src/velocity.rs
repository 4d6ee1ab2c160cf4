//! Per-step velocity update rules.
//!
//! A rule is the black box that turns the velocity at the start of a step
//! into the velocity at its end. Gravity, drag and any custom forces live
//! here; the integrator only averages the two velocities.

use ballistics_common::{is_finite_vec, Vec3};
use serde::{Deserialize, Serialize};

use crate::atmosphere::Environment;

/// Upper bound on the fraction of relative speed drag may remove in one step.
pub const MAX_DRAG_FACTOR: f32 = 0.99;

/// Computes the velocity at the end of a step.
pub trait VelocityRule: Send + Sync {
    /// Advance `velocity` at `position` by `step` seconds.
    fn next_velocity(&self, env: &dyn Environment, position: Vec3, velocity: Vec3, step: f32)
        -> Vec3;
}

impl<F> VelocityRule for F
where
    F: Fn(&dyn Environment, Vec3, Vec3, f32) -> Vec3 + Send + Sync,
{
    fn next_velocity(
        &self,
        env: &dyn Environment,
        position: Vec3,
        velocity: Vec3,
        step: f32,
    ) -> Vec3 {
        self(env, position, velocity, step)
    }
}

/// Keeps velocity unchanged. No gravity, no drag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Inertial;

impl VelocityRule for Inertial {
    fn next_velocity(
        &self,
        _env: &dyn Environment,
        _position: Vec3,
        velocity: Vec3,
        _step: f32,
    ) -> Vec3 {
        velocity
    }
}

/// Point-mass flight under gravity and quadratic air drag.
///
/// Drag acceleration is `0.5 * rho * v^2 * Cd * A / m` against the velocity
/// relative to the wind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragModel {
    /// Multiplier on the environment's gravity.
    pub gravity_scale: f32,
    /// Mass in kg. Zero disables drag.
    pub mass: f32,
    /// Dimensionless drag coefficient.
    pub drag_coefficient: f32,
    /// Frontal area in m^2.
    pub cross_section: f32,
}

impl Default for DragModel {
    /// A 7.62 mm rifle round.
    fn default() -> Self {
        Self {
            gravity_scale: 1.0,
            mass: 0.0097,
            drag_coefficient: 0.295,
            cross_section: 4.56e-5,
        }
    }
}

impl DragModel {
    /// Gravity only.
    #[must_use]
    pub const fn vacuum() -> Self {
        Self {
            gravity_scale: 1.0,
            mass: 0.0,
            drag_coefficient: 0.0,
            cross_section: 0.0,
        }
    }

    /// Set gravity scale.
    #[must_use]
    pub const fn with_gravity_scale(mut self, scale: f32) -> Self {
        self.gravity_scale = scale;
        self
    }

    /// Set mass, drag coefficient and frontal area.
    #[must_use]
    pub const fn with_drag(mut self, mass: f32, drag_coefficient: f32, cross_section: f32) -> Self {
        self.mass = mass;
        self.drag_coefficient = drag_coefficient;
        self.cross_section = cross_section;
        self
    }

    /// Check the parameters, returning a description of the first problem.
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("gravity_scale", self.gravity_scale),
            ("mass", self.mass),
            ("drag_coefficient", self.drag_coefficient),
            ("cross_section", self.cross_section),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(format!("{name} is not finite"));
            }
        }
        for (name, value) in &fields[1..] {
            if *value < 0.0 {
                return Err(format!("{name} is negative: {value}"));
            }
        }
        Ok(())
    }

    /// Drag acceleration divided by speed, i.e. `k` in `a = -k * v_rel`.
    #[must_use]
    pub fn drag_per_speed(&self, density: f32, relative_speed: f32) -> f32 {
        if self.mass <= 0.0 || relative_speed <= f32::EPSILON {
            return 0.0;
        }
        0.5 * density * relative_speed * self.drag_coefficient * self.cross_section / self.mass
    }
}

impl VelocityRule for DragModel {
    fn next_velocity(
        &self,
        env: &dyn Environment,
        position: Vec3,
        velocity: Vec3,
        step: f32,
    ) -> Vec3 {
        let mut next = velocity + env.gravity() * self.gravity_scale * step;

        let wind = env.wind_at(position);
        let relative = next - wind;
        let speed = relative.length();
        let k = self.drag_per_speed(env.air_density_at(position), speed);
        if k > 0.0 {
            let factor = (k * step).min(MAX_DRAG_FACTOR);
            next -= relative * factor;
        }

        if is_finite_vec(next) {
            next
        } else {
            velocity
        }
    }
}
