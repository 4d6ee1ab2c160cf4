//! Vector helpers on top of `glam`.

pub use glam::{Quat, Vec3};

/// Normalizes `v`, falling back to +X for zero-length or non-finite input.
#[must_use]
pub fn safe_normalize(v: Vec3) -> Vec3 {
    v.try_normalize().unwrap_or(Vec3::X)
}

/// Linear interpolation between two scalars.
#[must_use]
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Returns true if every component of `v` is finite.
#[must_use]
pub fn is_finite_vec(v: Vec3) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}
