//! Trajectory integration.
//!
//! [`predict`] steps a projectile from its launch state through fixed time
//! steps. Each step asks the profile's velocity rule for the end-of-step
//! velocity, moves by the average of the start and end velocities
//! (trapezoidal rule), and traces the swept segment against the world.
//!
//! # Example
//!
//! ```
//! use ballistics_common::Vec3;
//! use ballistics_kernel::atmosphere::Vacuum;
//! use ballistics_kernel::collision::NoCollision;
//! use ballistics_kernel::projectile::ProjectileProfile;
//! use ballistics_kernel::trajectory::{predict, LaunchState, PredictParams};
//! use ballistics_kernel::velocity::Inertial;
//!
//! let profile = ProjectileProfile::new("slug")
//!     .with_muzzle_velocity(100.0, 100.0)
//!     .with_custom_rule(Inertial);
//! let launch = LaunchState::new(Vec3::ZERO, Vec3::X, 100.0);
//! let params = PredictParams::new(1.0, 0.1);
//!
//! let prediction = predict(&NoCollision, &Vacuum, &profile, &launch, &[], params)?;
//! assert!(!prediction.is_hit());
//! assert_eq!(prediction.trajectory.len(), 10);
//! # Ok::<(), ballistics_common::BallisticsError>(())
//! ```

use ballistics_common::{is_finite_vec, safe_normalize, ActorId, BallisticsResult, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::atmosphere::Environment;
use crate::collision::{CollisionWorld, TraceParams};
use crate::projectile::ProjectileProfile;

/// Default prediction horizon, seconds.
pub const DEFAULT_MAX_TIME: f32 = 10.0;

/// Default integration step, seconds.
pub const DEFAULT_STEP: f32 = 0.1;

/// Relative slack when turning `max_time / step` into a step count, so that
/// `1.0 / 0.1` is ten steps and not eleven. Covers the rounding of both
/// `f32` inputs, whatever the number of steps.
const STEP_COUNT_TOLERANCE: f64 = 4.0 * f32::EPSILON as f64;

/// Initial conditions of a single prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaunchState {
    /// Muzzle position.
    pub start: Vec3,
    /// Unit aim direction.
    pub direction: Vec3,
    /// Velocity at the muzzle, including inherited velocity.
    pub velocity: Vec3,
    /// Firing actor, ignored when the profile asks for a safe launch.
    #[serde(default)]
    pub owner: Option<ActorId>,
}

impl LaunchState {
    /// Launch along `direction` at `speed`.
    #[must_use]
    pub fn new(start: Vec3, direction: Vec3, speed: f32) -> Self {
        let direction = safe_normalize(direction);
        Self {
            start,
            direction,
            velocity: direction * speed,
            owner: None,
        }
    }

    /// Add velocity on top of the muzzle velocity.
    #[must_use]
    pub fn with_added_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity += velocity;
        self
    }

    /// Set the firing actor.
    #[must_use]
    pub const fn with_owner(mut self, owner: ActorId) -> Self {
        self.owner = Some(owner);
        self
    }
}

/// Horizon and resolution of a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictParams {
    /// Seconds of flight to simulate.
    pub max_time: f32,
    /// Seconds per integration step.
    pub step: f32,
}

impl Default for PredictParams {
    fn default() -> Self {
        Self {
            max_time: DEFAULT_MAX_TIME,
            step: DEFAULT_STEP,
        }
    }
}

impl PredictParams {
    /// Create parameters.
    #[must_use]
    pub const fn new(max_time: f32, step: f32) -> Self {
        Self { max_time, step }
    }

    /// Whether any integration step is possible.
    #[must_use]
    pub fn is_runnable(&self) -> bool {
        self.max_time.is_finite() && self.step.is_finite() && self.max_time > 0.0 && self.step > 0.0
    }

    /// Number of steps needed to cover `max_time`, zero when not runnable.
    ///
    /// A ratio within rounding error of a whole number counts as that
    /// number, so the horizon never gains a sliver step.
    #[must_use]
    pub fn step_count(&self) -> u32 {
        if !self.is_runnable() {
            return 0;
        }
        let ratio = f64::from(self.max_time) / f64::from(self.step);
        let nearest = ratio.round();
        let count = if nearest >= 1.0 && (ratio - nearest).abs() <= STEP_COUNT_TOLERANCE * ratio {
            nearest
        } else {
            ratio.ceil()
        };
        count.min(f64::from(u32::MAX)) as u32
    }
}

/// How a prediction ended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PredictionOutcome {
    /// Something blocked the projectile.
    Hit {
        /// Impact point.
        position: Vec3,
        /// Seconds from launch to impact.
        time: f32,
        /// Struck actor, if the surface has an owner.
        actor: Option<ActorId>,
        /// Surface normal at impact.
        normal: Vec3,
    },
    /// The projectile flew for the whole horizon.
    Miss {
        /// Position after the last step.
        final_position: Vec3,
        /// Simulated time.
        elapsed: f32,
    },
}

impl PredictionOutcome {
    /// Miss at `position` after `elapsed` seconds.
    #[must_use]
    pub const fn miss(position: Vec3, elapsed: f32) -> Self {
        Self::Miss {
            final_position: position,
            elapsed,
        }
    }

    /// Whether this is a hit.
    #[must_use]
    pub const fn is_hit(&self) -> bool {
        matches!(self, Self::Hit { .. })
    }

    /// Impact time for a hit, simulated time for a miss.
    #[must_use]
    pub const fn time(&self) -> f32 {
        match self {
            Self::Hit { time, .. } => *time,
            Self::Miss { elapsed, .. } => *elapsed,
        }
    }

    /// Impact point for a hit, final position for a miss.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        match self {
            Self::Hit { position, .. } => *position,
            Self::Miss { final_position, .. } => *final_position,
        }
    }

    /// Struck actor.
    #[must_use]
    pub const fn actor(&self) -> Option<ActorId> {
        match self {
            Self::Hit { actor, .. } => *actor,
            Self::Miss { .. } => None,
        }
    }
}

/// Sampled flight path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trajectory {
    points: Vec<Vec3>,
}

impl Trajectory {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, point: Vec3) {
        self.points.push(point);
    }

    /// Sampled positions in flight order.
    #[must_use]
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether nothing was sampled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Last sample.
    #[must_use]
    pub fn last(&self) -> Option<Vec3> {
        self.points.last().copied()
    }

    /// Iterate over the samples.
    pub fn iter(&self) -> impl Iterator<Item = &Vec3> {
        self.points.iter()
    }

    /// Sum of distances between consecutive samples.
    #[must_use]
    pub fn path_length(&self) -> f32 {
        self.points.windows(2).map(|w| w[0].distance(w[1])).sum()
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a Vec3;
    type IntoIter = std::slice::Iter<'a, Vec3>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Result of [`predict`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// How the flight ended.
    pub outcome: PredictionOutcome,
    /// Positions sampled along the way.
    pub trajectory: Trajectory,
}

impl Prediction {
    fn empty_miss(start: Vec3) -> Self {
        Self {
            outcome: PredictionOutcome::miss(start, 0.0),
            trajectory: Trajectory::default(),
        }
    }

    /// Whether the projectile struck something.
    #[must_use]
    pub const fn is_hit(&self) -> bool {
        self.outcome.is_hit()
    }

    /// Impact time or simulated time.
    #[must_use]
    pub const fn time(&self) -> f32 {
        self.outcome.time()
    }

    /// Impact point or final position.
    #[must_use]
    pub const fn impact_position(&self) -> Vec3 {
        self.outcome.position()
    }
}

/// Simulate a launch and report the first thing it strikes.
///
/// An invalid profile is rejected before any step runs. Parameters that
/// allow no steps (non-positive or non-finite `step` or `max_time`) yield a
/// miss at the start position with an empty trajectory.
pub fn predict<W>(
    world: &W,
    env: &dyn Environment,
    profile: &ProjectileProfile,
    launch: &LaunchState,
    ignored: &[ActorId],
    params: PredictParams,
) -> BallisticsResult<Prediction>
where
    W: CollisionWorld + ?Sized,
{
    if let Err(err) = profile.validate() {
        warn!("predict: invalid projectile profile: {err}");
        return Err(err.into());
    }

    if !is_finite_vec(launch.start) || !is_finite_vec(launch.velocity) {
        warn!("predict: non-finite launch state {:?}", launch);
        return Ok(Prediction::empty_miss(launch.start));
    }

    let steps = params.step_count();
    if steps == 0 {
        debug!(
            "predict: no steps for max_time={} step={}, reporting miss at start",
            params.max_time, params.step
        );
        return Ok(Prediction::empty_miss(launch.start));
    }

    let mut ignore_list = ignored.to_vec();
    if profile.safe_launch {
        if let Some(owner) = launch.owner.filter(|o| o.is_valid()) {
            if !ignore_list.contains(&owner) {
                ignore_list.push(owner);
            }
        }
    }
    let trace_params = TraceParams::new(profile.trace_channel)
        .with_complex(profile.trace_complex)
        .with_ignored(&ignore_list);

    let max_time = f64::from(params.max_time);
    let step = f64::from(params.step);
    let mut elapsed = 0.0_f64;
    let mut position = launch.start;
    let mut velocity = launch.velocity;
    let mut trajectory = Trajectory::with_capacity(steps.min(4096) as usize + 1);

    for index in 0..steps {
        let remaining = (max_time - elapsed).max(0.0);
        // The final step ends exactly at max_time.
        let span = if index + 1 == steps { remaining } else { step.min(remaining) };
        let time = elapsed as f32;
        let dt = span as f32;
        let next_velocity = profile.next_velocity(env, position, velocity, dt);
        let displacement = (velocity + next_velocity) * 0.5 * dt;
        let end = position + displacement;

        if let Some(hit) = world.line_trace(position, end, &trace_params) {
            let fraction = hit.fraction.clamp(0.0, 1.0);
            let hit_time = (elapsed + f64::from(fraction) * span).min(max_time) as f32;
            trajectory.push(hit.position);
            debug!(
                "predict: {} hit {:?} at {:?} after {:.3}s ({} samples)",
                profile.name,
                hit.actor,
                hit.position,
                hit_time,
                trajectory.len()
            );
            return Ok(Prediction {
                outcome: PredictionOutcome::Hit {
                    position: hit.position,
                    time: hit_time,
                    actor: hit.actor,
                    normal: hit.normal,
                },
                trajectory,
            });
        }

        trace!("predict: step {index} t={time:.3} pos={position:?} vel={next_velocity:?}");
        trajectory.push(position);
        position = end;
        velocity = next_velocity;
        elapsed += span;
    }

    debug!(
        "predict: {} missed, final position {:?} after {:.3}s",
        profile.name, position, params.max_time
    );
    Ok(Prediction {
        outcome: PredictionOutcome::miss(position, params.max_time),
        trajectory,
    })
}
