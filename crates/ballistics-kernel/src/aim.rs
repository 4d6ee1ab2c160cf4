//! Iterative aim solving against moving targets.
//!
//! Flight time depends on where the projectile is aimed and where to aim
//! depends on flight time, so the solver alternates: fly the current aim,
//! read the flight time, move the predicted target along its velocity by
//! that time, and re-aim at it. The iteration budget is fixed; there is no
//! convergence test.
//!
//! Flight time comes from an ordinary [`predict`] against the world, so an
//! obstacle in the line of fire truncates it to the obstacle's distance.

use ballistics_common::{safe_normalize, ActorId, BallisticsResult, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::atmosphere::Environment;
use crate::collision::CollisionWorld;
use crate::projectile::ProjectileProfile;
use crate::trajectory::{predict, LaunchState, PredictParams, Prediction};

/// Default number of refinement rounds.
pub const DEFAULT_ITERATIONS: u32 = 4;

/// What to aim at and how.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AimRequest {
    /// Muzzle position.
    pub start: Vec3,
    /// Target position now.
    pub target: Vec3,
    /// Target velocity, assumed constant.
    pub target_velocity: Vec3,
    /// Muzzle speed along the aim direction.
    pub muzzle_speed: f32,
    /// Velocity added to every launch (inherited carrier velocity etc).
    pub added_velocity: Vec3,
    /// Firing actor, for safe launches.
    pub owner: Option<ActorId>,
    /// Refinement rounds.
    pub iterations: u32,
    /// Also correct for the miss distance of each round (gravity drop, drag).
    pub compensate_drop: bool,
}

impl AimRequest {
    /// Aim from `start` at a target moving with `target_velocity`.
    #[must_use]
    pub fn new(start: Vec3, target: Vec3, target_velocity: Vec3, muzzle_speed: f32) -> Self {
        Self {
            start,
            target,
            target_velocity,
            muzzle_speed,
            added_velocity: Vec3::ZERO,
            owner: None,
            iterations: DEFAULT_ITERATIONS,
            compensate_drop: false,
        }
    }

    /// Set the number of refinement rounds.
    #[must_use]
    pub const fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the velocity added to each launch.
    #[must_use]
    pub fn with_added_velocity(mut self, velocity: Vec3) -> Self {
        self.added_velocity = velocity;
        self
    }

    /// Set the firing actor.
    #[must_use]
    pub const fn with_owner(mut self, owner: ActorId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Enable miss-distance correction.
    #[must_use]
    pub const fn with_drop_compensation(mut self, enabled: bool) -> Self {
        self.compensate_drop = enabled;
        self
    }

    /// Where the target will be after `time` seconds.
    #[must_use]
    pub fn target_at(&self, time: f32) -> Vec3 {
        self.target + self.target_velocity * time
    }

    /// Launch state for an aim direction.
    #[must_use]
    pub fn launch(&self, direction: Vec3) -> LaunchState {
        let mut launch = LaunchState::new(self.start, direction, self.muzzle_speed)
            .with_added_velocity(self.added_velocity);
        launch.owner = self.owner;
        launch
    }

    /// Straight-line flight time estimate used to seed the solver.
    #[must_use]
    pub fn seed_time(&self) -> f32 {
        if self.muzzle_speed > f32::EPSILON {
            self.start.distance(self.target) / self.muzzle_speed
        } else {
            0.0
        }
    }
}

/// Result of [`solve_aim`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AimSolution {
    /// Unit launch direction.
    pub aim_direction: Vec3,
    /// Target position at the predicted impact time.
    pub predicted_target_position: Vec3,
    /// Where the final trajectory ends.
    pub predicted_intersection_position: Vec3,
    /// Flight time used to place the target.
    pub predicted_flight_time: f32,
    /// Distance between intersection and predicted target.
    pub error: f32,
    /// Actor the final trajectory strikes, if any.
    pub hit_actor: Option<ActorId>,
    /// Error after each refinement round.
    pub residuals: Vec<f32>,
}

impl AimSolution {
    /// Number of refinement rounds executed.
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.residuals.len()
    }
}

/// Trajectory point closest to `point`, or the impact position when empty.
fn closest_approach(prediction: &Prediction, point: Vec3) -> Vec3 {
    prediction
        .trajectory
        .iter()
        .copied()
        .chain(std::iter::once(prediction.impact_position()))
        .min_by(|a, b| a.distance_squared(point).total_cmp(&b.distance_squared(point)))
        .unwrap_or_else(|| prediction.impact_position())
}

/// Find a launch direction whose impact meets a moving target.
pub fn solve_aim<W>(
    world: &W,
    env: &dyn Environment,
    profile: &ProjectileProfile,
    request: &AimRequest,
    ignored: &[ActorId],
    params: PredictParams,
) -> BallisticsResult<AimSolution>
where
    W: CollisionWorld + ?Sized,
{
    if let Err(err) = profile.validate() {
        warn!("solve_aim: invalid projectile profile: {err}");
        return Err(err.into());
    }

    let mut flight_time = request.seed_time();
    let mut predicted_target = request.target_at(flight_time);
    let mut aim_offset = Vec3::ZERO;
    let mut aim = safe_normalize(predicted_target - request.start);
    let mut residuals = Vec::with_capacity(request.iterations as usize);

    for round in 0..request.iterations {
        let prediction = predict(world, env, profile, &request.launch(aim), ignored, params)?;
        flight_time = prediction.time();
        predicted_target = request.target_at(flight_time);

        let residual = prediction.impact_position().distance(predicted_target);
        residuals.push(residual);

        if request.compensate_drop {
            aim_offset += predicted_target - closest_approach(&prediction, predicted_target);
        }
        aim = safe_normalize(predicted_target + aim_offset - request.start);

        debug!(
            "solve_aim: round {round} flight_time={flight_time:.3} target={predicted_target:?} residual={residual:.3}"
        );
    }

    let final_prediction = predict(world, env, profile, &request.launch(aim), ignored, params)?;
    let intersection = final_prediction.impact_position();
    let error = intersection.distance(predicted_target);

    debug!(
        "solve_aim: {} aim={aim:?} flight_time={flight_time:.3} error={error:.3}",
        profile.name
    );

    Ok(AimSolution {
        aim_direction: aim,
        predicted_target_position: predicted_target,
        predicted_intersection_position: intersection,
        predicted_flight_time: flight_time,
        error,
        hit_actor: final_prediction.outcome.actor(),
        residuals,
    })
}
