//! # Ballistics
//!
//! Runs a scenario file and prints the report as JSON.
//!
//! ```text
//! ballistics <scenario.toml> [config.toml]
//! ballistics --init-config [config.toml]
//! ```
//!
//! Without a config path the platform config directory is used, falling
//! back to defaults. `--init-config` writes the default configuration there.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use ballistics_engine::config::{EngineConfig, DEFAULT_LOG_FILTER};
use ballistics_engine::projectile_loader::ProjectileLoader;
use ballistics_engine::scenario::{run_scenario, Scenario};
use tracing::{debug, info};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter};

const USAGE: &str = "usage: ballistics <scenario.toml> [config.toml] | ballistics --init-config [config.toml]";

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing before the config is read so its diagnostics show.
    let default_directive: Directive = DEFAULT_LOG_FILTER.parse()?;
    let (filter, filter_handle) =
        reload::Layer::new(EnvFilter::from_default_env().add_directive(default_directive));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(first) = args.next() else {
        bail!(USAGE);
    };
    let config_path = args.next().map(PathBuf::from);

    if first == "--init-config" {
        return init_config(config_path);
    }

    let config = match &config_path {
        Some(path) => EngineConfig::load_from(path),
        None => EngineConfig::load(),
    };
    filter_handle
        .reload(EnvFilter::from_default_env().add_directive(config.log_directive()))
        .context("applying log filter")?;

    info!("Ballistics {}", env!("CARGO_PKG_VERSION"));

    let mut loader = ProjectileLoader::new(&config.projectile_path);
    loader
        .load_all()
        .with_context(|| format!("loading projectiles from {}", config.projectile_path.display()))?;
    debug!("Projectiles available: {:?}", loader.registry().names());

    let scenario_path = PathBuf::from(first);
    let scenario = Scenario::load(&scenario_path)
        .with_context(|| format!("loading scenario {}", scenario_path.display()))?;
    let report = run_scenario(&scenario, &config, loader.registry())?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Write the default configuration.
fn init_config(path: Option<PathBuf>) -> Result<()> {
    let config = EngineConfig::default();
    match path {
        Some(path) => config
            .save_to(&path)
            .with_context(|| format!("writing config {}", path.display())),
        None => config.save().context("writing config"),
    }
}
