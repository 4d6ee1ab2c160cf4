//! Collision queries for projectile traces.
//!
//! The integrator asks one question of the world: "walking the segment from
//! `start` to `end`, what is the first thing that blocks?". Hosts answer it
//! by implementing [`CollisionWorld`]. [`CollisionScene`] is a small
//! reference world made of planes, spheres and boxes.
//!
//! # Example
//!
//! ```
//! use ballistics_common::{ActorId, Vec3};
//! use ballistics_kernel::collision::{
//!     Collider, CollisionScene, CollisionWorld, Shape, TraceChannel, TraceParams,
//! };
//!
//! let wall = ActorId::from_raw(9);
//! let mut scene = CollisionScene::new();
//! scene.add(Collider::new(Shape::plane(Vec3::new(55.0, 0.0, 0.0), Vec3::X)).with_actor(wall));
//!
//! let params = TraceParams::new(TraceChannel::PROJECTILE);
//! let hit = scene.line_trace(Vec3::ZERO, Vec3::new(100.0, 0.0, 0.0), &params);
//! assert_eq!(hit.map(|h| h.actor), Some(Some(wall)));
//! ```

use ballistics_common::{safe_normalize, ActorId, Vec3};
use serde::{Deserialize, Serialize};

/// Channel flags selecting which colliders block a trace.
#[allow(non_snake_case)]
pub mod TraceChannel {
    /// Channel flag type.
    pub type Flags = u32;

    /// Static level geometry.
    pub const WORLD_STATIC: Flags = 1 << 0;
    /// Moving level geometry.
    pub const WORLD_DYNAMIC: Flags = 1 << 1;
    /// Characters and vehicles.
    pub const PAWN: Flags = 1 << 2;
    /// Projectile traces.
    pub const PROJECTILE: Flags = 1 << 3;
    /// Line-of-sight traces.
    pub const VISIBILITY: Flags = 1 << 4;
    /// All channels.
    pub const ALL: Flags = 0xFFFF_FFFF;
    /// No channels.
    pub const NONE: Flags = 0;
}

const PARALLEL_EPSILON: f32 = 1e-8;

/// Query options for a single trace.
#[derive(Debug, Clone, Copy)]
pub struct TraceParams<'a> {
    /// Channel being traced.
    pub channel: TraceChannel::Flags,
    /// Use complex collision where available.
    pub trace_complex: bool,
    /// Actors whose colliders are transparent to this trace.
    pub ignored: &'a [ActorId],
}

impl<'a> TraceParams<'a> {
    /// Simple-collision trace on `channel` ignoring nothing.
    #[must_use]
    pub const fn new(channel: TraceChannel::Flags) -> Self {
        Self {
            channel,
            trace_complex: false,
            ignored: &[],
        }
    }

    /// Set complex tracing.
    #[must_use]
    pub const fn with_complex(mut self, trace_complex: bool) -> Self {
        self.trace_complex = trace_complex;
        self
    }

    /// Set the ignore list.
    #[must_use]
    pub const fn with_ignored(mut self, ignored: &'a [ActorId]) -> Self {
        self.ignored = ignored;
        self
    }

    /// Whether `actor` should be passed through.
    #[must_use]
    pub fn ignores(&self, actor: Option<ActorId>) -> bool {
        actor.is_some_and(|a| self.ignored.contains(&a))
    }
}

/// First blocking hit along a traced segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraceHit {
    /// Impact point.
    pub position: Vec3,
    /// Position along the segment, 0 at start and 1 at end.
    pub fraction: f32,
    /// Owner of the struck surface, if any.
    pub actor: Option<ActorId>,
    /// Surface normal facing the incoming trace.
    pub normal: Vec3,
}

/// A world that can answer segment traces.
///
/// Implementations must be deterministic for unchanged geometry; the
/// integrator may issue hundreds of traces per prediction.
pub trait CollisionWorld {
    /// First blocking hit between `start` and `end`.
    fn line_trace(&self, start: Vec3, end: Vec3, params: &TraceParams<'_>) -> Option<TraceHit>;
}

/// Empty world.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCollision;

impl CollisionWorld for NoCollision {
    fn line_trace(&self, _start: Vec3, _end: Vec3, _params: &TraceParams<'_>) -> Option<TraceHit> {
        None
    }
}

/// Collision geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Shape {
    /// Infinite two-sided plane.
    Plane {
        /// Any point on the plane.
        point: Vec3,
        /// Plane normal (normalized on use).
        normal: Vec3,
    },
    /// Solid sphere.
    Sphere {
        /// Centre.
        center: Vec3,
        /// Radius.
        radius: f32,
    },
    /// Solid axis-aligned box.
    Aabb {
        /// Minimum corner.
        min: Vec3,
        /// Maximum corner.
        max: Vec3,
    },
}

impl Shape {
    /// Create a plane.
    #[must_use]
    pub const fn plane(point: Vec3, normal: Vec3) -> Self {
        Self::Plane { point, normal }
    }

    /// Create a sphere.
    #[must_use]
    pub const fn sphere(center: Vec3, radius: f32) -> Self {
        Self::Sphere { center, radius }
    }

    /// Create a box from two corners in any order.
    #[must_use]
    pub fn aabb(a: Vec3, b: Vec3) -> Self {
        Self::Aabb {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Intersect the segment `start + t * delta`, `t ∈ [0, 1]`.
    ///
    /// Returns the entry fraction and the surface normal facing the ray.
    /// A segment starting inside a solid shape hits at fraction 0.
    #[must_use]
    pub fn intersect_segment(&self, start: Vec3, delta: Vec3) -> Option<(f32, Vec3)> {
        match *self {
            Self::Plane { point, normal } => intersect_plane(start, delta, point, normal),
            Self::Sphere { center, radius } => intersect_sphere(start, delta, center, radius),
            Self::Aabb { min, max } => intersect_aabb(start, delta, min, max),
        }
    }
}

fn intersect_plane(start: Vec3, delta: Vec3, point: Vec3, normal: Vec3) -> Option<(f32, Vec3)> {
    let n = normal.try_normalize()?;
    let denom = n.dot(delta);
    if denom.abs() < PARALLEL_EPSILON {
        return None;
    }
    let t = n.dot(point - start) / denom;
    if !(0.0..=1.0).contains(&t) {
        return None;
    }
    let facing = if denom > 0.0 { -n } else { n };
    Some((t, facing))
}

fn intersect_sphere(start: Vec3, delta: Vec3, center: Vec3, radius: f32) -> Option<(f32, Vec3)> {
    if radius <= 0.0 {
        return None;
    }
    let m = start - center;
    let c = m.dot(m) - radius * radius;
    if c <= 0.0 {
        return Some((0.0, -safe_normalize(delta)));
    }

    let a = delta.dot(delta);
    if a < PARALLEL_EPSILON {
        return None;
    }
    let b = m.dot(delta);
    let discriminant = b * b - a * c;
    if discriminant < 0.0 {
        return None;
    }

    let t = (-b - discriminant.sqrt()) / a;
    if !(0.0..=1.0).contains(&t) {
        return None;
    }
    let normal = safe_normalize(start + delta * t - center);
    Some((t, normal))
}

fn intersect_aabb(start: Vec3, delta: Vec3, min: Vec3, max: Vec3) -> Option<(f32, Vec3)> {
    let mut t_enter = 0.0_f32;
    let mut t_exit = 1.0_f32;
    let mut normal = None;

    for axis in 0..3 {
        let s = start[axis];
        let d = delta[axis];
        if d.abs() < PARALLEL_EPSILON {
            if s < min[axis] || s > max[axis] {
                return None;
            }
            continue;
        }

        let inv = 1.0 / d;
        let mut t1 = (min[axis] - s) * inv;
        let mut t2 = (max[axis] - s) * inv;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }

        if t1 > t_enter {
            t_enter = t1;
            let mut n = Vec3::ZERO;
            n[axis] = -d.signum();
            normal = Some(n);
        }
        t_exit = t_exit.min(t2);
        if t_enter > t_exit {
            return None;
        }
    }

    // No entering face means the segment started inside the box.
    Some((t_enter, normal.unwrap_or_else(|| -safe_normalize(delta))))
}

const fn default_blocks() -> TraceChannel::Flags {
    TraceChannel::ALL
}

/// A shape in a [`CollisionScene`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    /// Actor that owns this collider.
    #[serde(default)]
    pub actor: Option<ActorId>,
    /// Shape used for simple traces.
    pub simple: Shape,
    /// Shape used for complex traces, falls back to `simple`.
    #[serde(default)]
    pub complex: Option<Shape>,
    /// Channels this collider blocks.
    #[serde(default = "default_blocks")]
    pub blocks: TraceChannel::Flags,
}

impl Collider {
    /// Collider blocking every channel.
    #[must_use]
    pub const fn new(simple: Shape) -> Self {
        Self {
            actor: None,
            simple,
            complex: None,
            blocks: TraceChannel::ALL,
        }
    }

    /// Set the owning actor.
    #[must_use]
    pub const fn with_actor(mut self, actor: ActorId) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Set the complex shape.
    #[must_use]
    pub const fn with_complex(mut self, complex: Shape) -> Self {
        self.complex = Some(complex);
        self
    }

    /// Set the blocked channels.
    #[must_use]
    pub const fn with_blocks(mut self, blocks: TraceChannel::Flags) -> Self {
        self.blocks = blocks;
        self
    }

    /// Shape to test for the given trace complexity.
    #[must_use]
    pub fn shape(&self, trace_complex: bool) -> &Shape {
        match (&self.complex, trace_complex) {
            (Some(complex), true) => complex,
            _ => &self.simple,
        }
    }

    /// Whether this collider takes part in a trace.
    #[must_use]
    pub fn blocks_trace(&self, params: &TraceParams<'_>) -> bool {
        self.blocks & params.channel != 0 && !params.ignores(self.actor)
    }
}

/// Brute-force scene of colliders.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollisionScene {
    colliders: Vec<Collider>,
}

impl CollisionScene {
    /// Create an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scene from colliders.
    #[must_use]
    pub fn from_colliders(colliders: Vec<Collider>) -> Self {
        Self { colliders }
    }

    /// Add a collider.
    pub fn add(&mut self, collider: Collider) {
        self.colliders.push(collider);
    }

    /// All colliders.
    #[must_use]
    pub fn colliders(&self) -> &[Collider] {
        &self.colliders
    }

    /// Number of colliders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    /// Whether the scene is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }
}

impl CollisionWorld for CollisionScene {
    fn line_trace(&self, start: Vec3, end: Vec3, params: &TraceParams<'_>) -> Option<TraceHit> {
        let delta = end - start;
        let mut best: Option<TraceHit> = None;

        for collider in self.colliders.iter().filter(|c| c.blocks_trace(params)) {
            let Some((fraction, normal)) = collider
                .shape(params.trace_complex)
                .intersect_segment(start, delta)
            else {
                continue;
            };

            // Earlier colliders win ties.
            if best.map_or(true, |b| fraction < b.fraction) {
                best = Some(TraceHit {
                    position: start + delta * fraction,
                    fraction,
                    actor: collider.actor,
                    normal,
                });
            }
        }

        best
    }
}
