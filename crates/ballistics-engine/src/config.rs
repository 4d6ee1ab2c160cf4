//! Engine configuration.
//!
//! Default prediction parameters, the atmosphere, and where projectile
//! definitions live. Configuration can be loaded from and saved to a file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ballistics_kernel::aim::DEFAULT_ITERATIONS;
use ballistics_kernel::atmosphere::Atmosphere;
use ballistics_kernel::trajectory::{PredictParams, DEFAULT_MAX_TIME, DEFAULT_STEP};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_subscriber::filter::{Directive, LevelFilter};

use crate::projectile_loader::DEFAULT_PROJECTILE_PATH;

/// Tracing directive used when the config gives none or an unusable one.
pub const DEFAULT_LOG_FILTER: &str = "ballistics=info";

/// Configuration file name.
const CONFIG_FILE: &str = "ballistics.toml";

/// Longest prediction horizon accepted, seconds.
const MAX_HORIZON: f32 = 600.0;

/// Smallest integration step accepted, seconds.
const MIN_STEP: f32 = 1.0e-4;

/// Most aim refinement rounds accepted.
const MAX_ITERATIONS: u32 = 64;

/// Engine configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Prediction ===
    /// Prediction horizon in seconds
    pub max_time: f32,
    /// Integration step in seconds
    pub step: f32,

    // === Aiming ===
    /// Aim refinement rounds
    pub iterations: u32,
    /// Correct aim for gravity drop and drag
    pub compensate_drop: bool,

    // === Assets ===
    /// Directory scanned for projectile definition files
    pub projectile_path: PathBuf,

    // === Logging ===
    /// Default tracing filter directive
    pub log_filter: String,

    // === World ===
    /// Gravity, wind and air density
    pub atmosphere: Atmosphere,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_time: DEFAULT_MAX_TIME,
            step: DEFAULT_STEP,
            iterations: DEFAULT_ITERATIONS,
            compensate_drop: false,
            projectile_path: PathBuf::from(DEFAULT_PROJECTILE_PATH),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            atmosphere: Atmosphere::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the default file location.
    /// Returns default config if file doesn't exist.
    pub fn load() -> Self {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match toml::from_str::<Self>(&contents) {
            Ok(mut config) => {
                config.validate();
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to the default file location.
    pub fn save(&self) -> io::Result<()> {
        self.save_to(Self::config_path())
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn config_path() -> PathBuf {
        dirs::config_dir().map_or_else(
            || PathBuf::from(CONFIG_FILE),
            |dir| dir.join("ballistics").join(CONFIG_FILE),
        )
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        let defaults = Self::default();

        if !self.max_time.is_finite() {
            warn!("Config max_time {} is not finite, using default", self.max_time);
            self.max_time = defaults.max_time;
        }
        self.max_time = self.max_time.clamp(0.0, MAX_HORIZON);

        if !self.step.is_finite() || self.step <= 0.0 {
            warn!("Config step {} is not positive, using default", self.step);
            self.step = defaults.step;
        }
        self.step = self.step.clamp(MIN_STEP, 1.0);

        self.iterations = self.iterations.min(MAX_ITERATIONS);

        if self.log_filter.trim().is_empty() {
            self.log_filter = defaults.log_filter;
        } else if let Err(e) = self.log_filter.parse::<Directive>() {
            warn!(
                "Config log_filter {:?} is not a valid directive ({e}), using {DEFAULT_LOG_FILTER}",
                self.log_filter
            );
            self.log_filter = defaults.log_filter;
        }
    }

    /// The validated log filter as a tracing directive.
    #[must_use]
    pub fn log_directive(&self) -> Directive {
        self.log_filter
            .parse()
            .or_else(|_| DEFAULT_LOG_FILTER.parse())
            .unwrap_or_else(|_| LevelFilter::INFO.into())
    }

    /// Prediction parameters from this config.
    #[must_use]
    pub fn predict_params(&self) -> PredictParams {
        PredictParams::new(self.max_time, self.step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballistics_common::Vec3;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.max_time, 10.0);
        assert_eq!(config.step, 0.1);
        assert_eq!(config.iterations, 4);
        assert!(!config.compensate_drop);
        assert_eq!(config.projectile_path, PathBuf::from("assets/projectiles"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig {
            max_time: 10_000.0,
            step: -1.0,
            iterations: 1_000,
            log_filter: "  ".to_string(),
            ..EngineConfig::default()
        };

        config.validate();

        assert_eq!(config.max_time, MAX_HORIZON);
        assert_eq!(config.step, DEFAULT_STEP);
        assert_eq!(config.iterations, MAX_ITERATIONS);
        assert_eq!(config.log_filter, "ballistics=info");
    }

    #[test]
    fn test_config_validation_bad_log_filter() {
        let mut config = EngineConfig {
            log_filter: "ballistics=loud".to_string(),
            ..EngineConfig::default()
        };
        config.validate();
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
        assert!(config.log_directive().to_string().starts_with("ballistics"));

        config.log_filter = "ballistics_kernel=trace".to_string();
        config.validate();
        assert_eq!(config.log_filter, "ballistics_kernel=trace");
    }

    #[test]
    fn test_config_load_bad_log_filter() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("ballistics.toml");
        fs::write(&config_path, "step = 0.05\nlog_filter = \"ballistics=loud\"\n").expect("write");

        let config = EngineConfig::load_from(&config_path);
        assert_eq!(config.step, 0.05);
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
        assert!(config.log_filter.parse::<Directive>().is_ok());
    }

    #[test]
    fn test_config_validation_non_finite() {
        let mut config = EngineConfig {
            max_time: f32::NAN,
            step: f32::INFINITY,
            ..EngineConfig::default()
        };
        config.validate();
        assert_eq!(config.max_time, DEFAULT_MAX_TIME);
        assert_eq!(config.step, DEFAULT_STEP);

        config.step = 1.0e-9;
        config.validate();
        assert_eq!(config.step, MIN_STEP);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("ballistics.toml");

        let mut config = EngineConfig::default();
        config.max_time = 4.0;
        config.step = 0.02;
        config.compensate_drop = true;
        config.atmosphere = config.atmosphere.with_wind(Vec3::new(3.0, 0.0, 0.0));

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = EngineConfig::load_from(&config_path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = EngineConfig::load_from("/nonexistent/path/ballistics.toml");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_config_load_invalid_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("broken.toml");
        fs::write(&config_path, "max_time = \"soon\"").expect("write");

        assert_eq!(EngineConfig::load_from(&config_path), EngineConfig::default());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: EngineConfig = toml::from_str(
            "step = 0.05\n\n[atmosphere]\nwind = [0.0, 2.0, 0.0]\n",
        )
        .expect("parse");
        assert_eq!(config.step, 0.05);
        assert_eq!(config.max_time, DEFAULT_MAX_TIME);
        assert_eq!(config.atmosphere.wind, Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(config.atmosphere.gravity, Atmosphere::default().gravity);
    }

    #[test]
    fn test_predict_params() {
        let config = EngineConfig {
            max_time: 2.0,
            step: 0.5,
            ..EngineConfig::default()
        };
        assert_eq!(config.predict_params().step_count(), 4);
    }
}
