//! Scenario files.
//!
//! A scenario places a barrel and some colliders, names a projectile, and
//! optionally a target. Running it predicts the barrel's shot, solves the
//! aim at the target, and samples muzzle dispersion.

use std::fs;
use std::path::Path;

use ballistics_common::{ActorId, BallisticsError, Vec3};
use ballistics_gameplay::barrel::Barrel;
use ballistics_kernel::aim::{solve_aim, AimSolution};
use ballistics_kernel::collision::{Collider, CollisionScene};
use ballistics_kernel::trajectory::{predict, PredictParams, Prediction, PredictionOutcome};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::projectile_loader::ProfileRegistry;

/// Errors from loading or running a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("Failed to parse scenario TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Prediction or aiming failed.
    #[error(transparent)]
    Ballistics(#[from] BallisticsError),
}

/// Something to aim at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Position now.
    pub position: Vec3,
    /// Constant velocity.
    #[serde(default)]
    pub velocity: Vec3,
}

/// Per-scenario overrides of the engine config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioOverrides {
    /// Prediction horizon.
    pub max_time: Option<f32>,
    /// Integration step.
    pub step: Option<f32>,
    /// Aim refinement rounds.
    pub iterations: Option<u32>,
    /// Drop compensation.
    pub compensate_drop: Option<bool>,
}

/// Random muzzle-speed sampling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DispersionSpec {
    /// Number of sampled shots.
    pub shots: u32,
    /// RNG seed.
    #[serde(default)]
    pub seed: u64,
}

/// A scenario loaded from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Projectile name in the registry.
    pub projectile: String,
    /// The firing barrel.
    #[serde(default)]
    pub barrel: Barrel,
    /// Optional target for aim solving.
    #[serde(default)]
    pub target: Option<TargetSpec>,
    /// Actors the traces skip.
    #[serde(default)]
    pub ignored: Vec<ActorId>,
    /// World geometry.
    #[serde(default)]
    pub colliders: Vec<Collider>,
    /// Config overrides.
    #[serde(default)]
    pub overrides: ScenarioOverrides,
    /// Optional dispersion sampling.
    #[serde(default)]
    pub dispersion: Option<DispersionSpec>,
}

impl Scenario {
    /// Load a scenario file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let scenario = toml::from_str(&content)?;
        info!("Loaded scenario {}", path.display());
        Ok(scenario)
    }

    /// Prediction parameters after overrides.
    #[must_use]
    pub fn predict_params(&self, config: &EngineConfig) -> PredictParams {
        let defaults = config.predict_params();
        PredictParams::new(
            self.overrides.max_time.unwrap_or(defaults.max_time),
            self.overrides.step.unwrap_or(defaults.step),
        )
    }
}

/// Sampled shot summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DispersionShot {
    /// Sampled muzzle speed.
    pub muzzle_speed: f32,
    /// How the shot ended.
    pub outcome: PredictionOutcome,
}

/// Result of [`run_scenario`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Projectile used.
    pub projectile: String,
    /// Parameters the predictions ran with.
    pub params: PredictParams,
    /// The barrel's own shot.
    pub prediction: Prediction,
    /// Aim solution, when a target was given.
    pub aim: Option<AimSolution>,
    /// Sampled shots, when dispersion was requested.
    pub dispersion: Vec<DispersionShot>,
}

/// Run a scenario against the config and registry.
pub fn run_scenario(
    scenario: &Scenario,
    config: &EngineConfig,
    registry: &ProfileRegistry,
) -> Result<ScenarioReport, ScenarioError> {
    let profile = registry
        .profile(&scenario.projectile)
        .map_err(BallisticsError::from)?;
    let world = CollisionScene::from_colliders(scenario.colliders.clone());
    let env = &config.atmosphere;
    let params = scenario.predict_params(config);
    let barrel = &scenario.barrel;

    debug!(
        "Running scenario: {} with {} colliders",
        profile.name,
        world.len()
    );

    let prediction = barrel.predict_hit(&world, env, profile, &scenario.ignored, params)?;

    let aim = match scenario.target {
        Some(target) => {
            let iterations = scenario.overrides.iterations.unwrap_or(config.iterations);
            let request = barrel
                .aim_request(
                    profile,
                    barrel.location,
                    target.position,
                    target.velocity,
                    iterations,
                )
                .with_drop_compensation(
                    scenario
                        .overrides
                        .compensate_drop
                        .unwrap_or(config.compensate_drop),
                );
            Some(solve_aim(
                &world,
                env,
                profile,
                &request,
                &scenario.ignored,
                params,
            )?)
        },
        None => None,
    };

    let mut dispersion = Vec::new();
    if let Some(spec) = scenario.dispersion {
        let mut rng = fastrand::Rng::with_seed(spec.seed);
        for _ in 0..spec.shots {
            let launch =
                barrel.sampled_launch_state(profile, barrel.location, barrel.forward(), &mut rng);
            let shot = predict(&world, env, profile, &launch, &scenario.ignored, params)?;
            dispersion.push(DispersionShot {
                muzzle_speed: (launch.velocity - barrel.extra_velocity(barrel.location)).length(),
                outcome: shot.outcome,
            });
        }
    }

    info!(
        "Scenario {}: {}",
        profile.name,
        if prediction.is_hit() { "hit" } else { "miss" }
    );

    Ok(ScenarioReport {
        projectile: profile.name.clone(),
        params,
        prediction,
        aim,
        dispersion,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projectile_loader::{ChannelName, ProjectileDefinition, ProjectileFile};
    use ballistics_common::ProfileError;
    use ballistics_kernel::velocity::DragModel;
    use tempfile::TempDir;

    const WALL_SCENARIO: &str = r#"
projectile = "slug"

[barrel]
location = [0.0, 0.0, 0.0]

[target]
position = [55.0, 0.0, 0.0]

[[colliders]]
actor = 55
blocks = 15

[colliders.simple]
shape = "plane"
point = [55.0, 0.0, 0.0]
normal = [1.0, 0.0, 0.0]

[overrides]
max_time = 1.0
step = 0.1

[dispersion]
shots = 3
seed = 7
"#;

    fn registry() -> ProfileRegistry {
        let mut registry = ProfileRegistry::new();
        registry
            .register(ProjectileDefinition {
                id: 1,
                name: "Slug".to_string(),
                description: String::new(),
                muzzle_velocity_min: 90.0,
                muzzle_velocity_max: 110.0,
                flight: DragModel::vacuum().with_gravity_scale(0.0),
                channel: ChannelName::Projectile,
                safe_launch: true,
                trace_complex: false,
            })
            .expect("register");
        registry
    }

    #[test]
    fn test_scenario_parse() {
        let scenario: Scenario = toml::from_str(WALL_SCENARIO).expect("parse");
        assert_eq!(scenario.projectile, "slug");
        assert_eq!(scenario.colliders.len(), 1);
        assert_eq!(scenario.colliders[0].actor, Some(ActorId::from_raw(55)));
        assert_eq!(scenario.overrides.step, Some(0.1));
        assert_eq!(scenario.barrel.forward(), Vec3::X);
    }

    #[test]
    fn test_run_wall_scenario() {
        let scenario: Scenario = toml::from_str(WALL_SCENARIO).expect("parse");
        let report =
            run_scenario(&scenario, &EngineConfig::default(), &registry()).expect("run");

        assert_eq!(report.projectile, "Slug");
        assert!(report.prediction.is_hit());
        assert!((report.prediction.time() - 0.55).abs() < 1e-4);
        assert_eq!(
            report.prediction.outcome.actor(),
            Some(ActorId::from_raw(55))
        );

        let aim = report.aim.expect("target given");
        assert!((aim.aim_direction - Vec3::X).length() < 1e-6);
        assert!(aim.error < 1e-3);

        assert_eq!(report.dispersion.len(), 3);
        for shot in &report.dispersion {
            assert!((90.0..=110.0).contains(&shot.muzzle_speed));
            assert!(shot.outcome.is_hit());
        }
    }

    #[test]
    fn test_unknown_projectile() {
        let scenario = Scenario {
            projectile: "cannonball".to_string(),
            barrel: Barrel::default(),
            target: None,
            ignored: Vec::new(),
            colliders: Vec::new(),
            overrides: ScenarioOverrides::default(),
            dispersion: None,
        };
        let result = run_scenario(&scenario, &EngineConfig::default(), &registry());
        assert!(matches!(
            result,
            Err(ScenarioError::Ballistics(BallisticsError::InvalidProfile(
                ProfileError::Unknown(_)
            )))
        ));
    }

    #[test]
    fn test_overrides_fall_back_to_config() {
        let scenario: Scenario = toml::from_str("projectile = \"slug\"").expect("parse");
        let config = EngineConfig {
            max_time: 3.0,
            step: 0.25,
            ..EngineConfig::default()
        };
        assert_eq!(scenario.predict_params(&config), PredictParams::new(3.0, 0.25));

        let report = run_scenario(&scenario, &config, &registry()).expect("run");
        assert!(!report.prediction.is_hit());
        assert_eq!(report.prediction.trajectory.len(), 12);
        assert!(report.aim.is_none());
        assert!(report.dispersion.is_empty());
    }

    #[test]
    fn test_report_serializes_to_json() {
        let scenario: Scenario = toml::from_str(WALL_SCENARIO).expect("parse");
        let report =
            run_scenario(&scenario, &EngineConfig::default(), &registry()).expect("run");
        let json = serde_json::to_value(&report).expect("json");

        assert_eq!(json["projectile"], "Slug");
        assert_eq!(json["prediction"]["outcome"]["outcome"], "hit");
        assert_eq!(json["prediction"]["trajectory"].as_array().map(Vec::len), Some(6));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("wall.toml");
        fs::write(&path, WALL_SCENARIO).expect("write");
        let scenario = Scenario::load(&path).expect("load");
        assert_eq!(scenario.dispersion.map(|d| d.shots), Some(3));

        assert!(matches!(
            Scenario::load(temp_dir.path().join("missing.toml")),
            Err(ScenarioError::ReadError(_))
        ));
    }

    #[test]
    fn test_bundled_demo_runs() {
        let file: ProjectileFile =
            toml::from_str(include_str!("../../../assets/projectiles/standard.toml"))
                .expect("bundled projectiles");
        let mut registry = ProfileRegistry::new();
        for definition in file.projectiles {
            registry.register(definition).expect("register");
        }
        assert_eq!(registry.len(), 3);

        let scenario: Scenario =
            toml::from_str(include_str!("../../../demos/moving_target.toml")).expect("demo");
        assert_eq!(scenario.barrel.owner, Some(ActorId::from_raw(1)));

        let report = run_scenario(&scenario, &EngineConfig::default(), &registry).expect("run");
        let aim = report.aim.expect("demo has a target");
        assert!(aim.aim_direction.x > 0.9);
        assert_eq!(report.dispersion.len(), 5);
        // Safe launch skips the vehicle hull the barrel sits in.
        assert_ne!(report.prediction.outcome.actor(), Some(ActorId::from_raw(1)));
    }
}
