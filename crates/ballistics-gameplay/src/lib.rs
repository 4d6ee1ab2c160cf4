//! # Ballistics Gameplay
//!
//! The weapon-facing layer over the ballistics kernel.
//!
//! This crate provides:
//! - Barrels with muzzle velocity multipliers
//! - Carrier bodies whose velocity the projectile inherits
//! - Hit prediction from the barrel transform or an explicit location
//! - Aim direction solving from the barrel

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod barrel;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::barrel::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use ballistics_common::{Quat, Vec3};
    use ballistics_kernel::prelude::*;

    #[test]
    fn test_rotated_barrel_under_gravity() {
        let barrel = Barrel::new(
            Vec3::new(0.0, 0.0, 100.0),
            Quat::from_rotation_z(std::f32::consts::PI),
        );
        let ground = CollisionScene::from_colliders(vec![Collider::new(Shape::plane(
            Vec3::ZERO,
            Vec3::Z,
        ))]);
        let profile = ProjectileProfile::new("ball")
            .with_muzzle_velocity(20.0, 20.0)
            .with_rule(DragModel::vacuum());

        let prediction = barrel
            .predict_hit(
                &ground,
                &Atmosphere::default(),
                &profile,
                &[],
                PredictParams::new(10.0, 0.01),
            )
            .expect("valid profile");

        // Fired along -X from 100 m; lands after sqrt(2h/g) seconds.
        let fall_time = (2.0 * 100.0 / STANDARD_GRAVITY).sqrt();
        assert!(prediction.is_hit());
        assert!((prediction.time() - fall_time).abs() < 1e-2);
        assert!(prediction.impact_position().x < 0.0);
        assert!(prediction.impact_position().z.abs() < 1e-3);
    }
}
