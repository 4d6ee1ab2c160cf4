//! The environment a projectile flies through.
//!
//! Velocity rules receive an [`Environment`] so that gravity, wind and air
//! density can vary with position without the rule knowing where the data
//! comes from.

use ballistics_common::Vec3;
use serde::{Deserialize, Serialize};

/// Standard gravity, world units are meters.
pub const STANDARD_GRAVITY: f32 = 9.806_65;

/// Air density at sea level in kg/m^3.
pub const SEA_LEVEL_AIR_DENSITY: f32 = 1.225;

/// Scale height of the exponential atmosphere, in meters.
pub const ATMOSPHERE_SCALE_HEIGHT: f32 = 8_500.0;

/// World-side state consulted by velocity rules.
pub trait Environment {
    /// Gravitational acceleration.
    fn gravity(&self) -> Vec3;

    /// Wind velocity at a point.
    fn wind_at(&self, _position: Vec3) -> Vec3 {
        Vec3::ZERO
    }

    /// Air density at a point.
    fn air_density_at(&self, _position: Vec3) -> f32 {
        SEA_LEVEL_AIR_DENSITY
    }
}

/// No gravity, no air.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vacuum;

impl Environment for Vacuum {
    fn gravity(&self) -> Vec3 {
        Vec3::ZERO
    }

    fn air_density_at(&self, _position: Vec3) -> f32 {
        0.0
    }
}

/// Exponential atmosphere with uniform gravity and constant wind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Atmosphere {
    /// Gravitational acceleration.
    pub gravity: Vec3,
    /// Constant wind velocity.
    pub wind: Vec3,
    /// Density at `ground_height`.
    pub sea_level_density: f32,
    /// Height over which density falls by a factor of e.
    pub scale_height: f32,
    /// Height (along -gravity) treated as sea level.
    pub ground_height: f32,
}

impl Default for Atmosphere {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, 0.0, -STANDARD_GRAVITY),
            wind: Vec3::ZERO,
            sea_level_density: SEA_LEVEL_AIR_DENSITY,
            scale_height: ATMOSPHERE_SCALE_HEIGHT,
            ground_height: 0.0,
        }
    }
}

impl Atmosphere {
    /// Atmosphere without wind or gravity, only drag.
    #[must_use]
    pub fn still_air() -> Self {
        Self {
            gravity: Vec3::ZERO,
            ..Self::default()
        }
    }

    /// Set the wind.
    #[must_use]
    pub const fn with_wind(mut self, wind: Vec3) -> Self {
        self.wind = wind;
        self
    }

    /// Set gravity.
    #[must_use]
    pub const fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    /// Altitude of a point above `ground_height`, measured against gravity.
    ///
    /// Without gravity there is no "up", so altitude is zero everywhere.
    #[must_use]
    pub fn altitude(&self, position: Vec3) -> f32 {
        match self.gravity.try_normalize() {
            Some(down) => -position.dot(down) - self.ground_height,
            None => 0.0,
        }
    }
}

impl Environment for Atmosphere {
    fn gravity(&self) -> Vec3 {
        self.gravity
    }

    fn wind_at(&self, _position: Vec3) -> Vec3 {
        self.wind
    }

    fn air_density_at(&self, position: Vec3) -> f32 {
        if self.scale_height <= 0.0 {
            return self.sea_level_density;
        }
        let h = self.altitude(position).max(0.0);
        self.sea_level_density * (-h / self.scale_height).exp()
    }
}
