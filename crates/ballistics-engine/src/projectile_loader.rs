//! Projectile data loading and management.
//!
//! This module provides:
//! - Loading projectile definitions from assets/projectiles/*.toml
//! - Validation on load
//! - Profile registry with lookup by ID and name

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use ballistics_common::ProfileError;
use ballistics_kernel::collision::TraceChannel;
use ballistics_kernel::projectile::{ProjectileProfile, DEFAULT_MUZZLE_VELOCITY};
use ballistics_kernel::velocity::DragModel;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default asset path for projectile definitions.
pub const DEFAULT_PROJECTILE_PATH: &str = "assets/projectiles";

/// Errors that can occur during projectile loading.
#[derive(Debug, Error)]
pub enum ProjectileLoadError {
    /// Failed to read file.
    #[error("Failed to read projectile file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("Failed to parse projectile TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Definition does not make a usable profile.
    #[error("Projectile {id} is invalid: {source}")]
    Invalid {
        /// Definition ID.
        id: u32,
        /// Why the profile was rejected.
        source: ProfileError,
    },

    /// Duplicate projectile ID.
    #[error("Duplicate projectile ID: {0}")]
    DuplicateId(u32),

    /// Name already taken by another ID (names compare case-insensitively).
    #[error("Projectile name {name:?} already used by ID {existing}")]
    DuplicateName {
        /// Conflicting name.
        name: String,
        /// ID that registered the name first.
        existing: u32,
    },
}

/// Result type for projectile loading operations.
pub type ProjectileLoadResult<T> = Result<T, ProjectileLoadError>;

/// Named collision channel in definition files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelName {
    /// Static world geometry.
    WorldStatic,
    /// Moving world geometry.
    WorldDynamic,
    /// Characters.
    Pawn,
    /// Projectile traces.
    #[default]
    Projectile,
    /// Line-of-sight traces.
    Visibility,
}

impl ChannelName {
    /// Channel bit for this name.
    #[must_use]
    pub const fn flags(self) -> TraceChannel::Flags {
        match self {
            Self::WorldStatic => TraceChannel::WORLD_STATIC,
            Self::WorldDynamic => TraceChannel::WORLD_DYNAMIC,
            Self::Pawn => TraceChannel::PAWN,
            Self::Projectile => TraceChannel::PROJECTILE,
            Self::Visibility => TraceChannel::VISIBILITY,
        }
    }
}

const fn default_muzzle_min() -> f32 {
    DEFAULT_MUZZLE_VELOCITY.0
}

const fn default_muzzle_max() -> f32 {
    DEFAULT_MUZZLE_VELOCITY.1
}

const fn default_true() -> bool {
    true
}

/// A projectile definition loaded from file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileDefinition {
    /// Unique projectile identifier.
    pub id: u32,
    /// Display name, also the lookup key.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Slowest muzzle velocity, m/s.
    #[serde(default = "default_muzzle_min")]
    pub muzzle_velocity_min: f32,
    /// Fastest muzzle velocity, m/s.
    #[serde(default = "default_muzzle_max")]
    pub muzzle_velocity_max: f32,
    /// Gravity scale and drag parameters.
    #[serde(default)]
    pub flight: DragModel,
    /// Collision channel traced against.
    #[serde(default)]
    pub channel: ChannelName,
    /// Ignore the firing actor.
    #[serde(default = "default_true")]
    pub safe_launch: bool,
    /// Trace against complex collision.
    #[serde(default)]
    pub trace_complex: bool,
}

impl ProjectileDefinition {
    /// Build the runtime profile.
    #[must_use]
    pub fn to_profile(&self) -> ProjectileProfile {
        ProjectileProfile::new(self.name.clone())
            .with_muzzle_velocity(self.muzzle_velocity_min, self.muzzle_velocity_max)
            .with_rule(self.flight)
            .with_channel(self.channel.flags())
            .with_safe_launch(self.safe_launch)
            .with_trace_complex(self.trace_complex)
    }

    /// Validates the definition.
    pub fn validate(&self) -> ProjectileLoadResult<()> {
        self.to_profile()
            .validate()
            .map_err(|source| ProjectileLoadError::Invalid { id: self.id, source })
    }
}

/// A collection of projectiles from a single file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectileFile {
    /// File format version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Projectiles in this file.
    pub projectiles: Vec<ProjectileDefinition>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

/// A registered definition and the profile built from it.
#[derive(Debug, Clone)]
struct Entry {
    definition: ProjectileDefinition,
    profile: ProjectileProfile,
}

/// Profile registry with lookup by ID and name.
#[derive(Debug, Default)]
pub struct ProfileRegistry {
    /// Entries by ID.
    by_id: HashMap<u32, Entry>,
    /// IDs by name (lowercase).
    by_name: HashMap<String, u32>,
}

impl ProfileRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of registered projectiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns true if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Validates and registers a definition.
    pub fn register(&mut self, definition: ProjectileDefinition) -> ProjectileLoadResult<()> {
        if self.by_id.contains_key(&definition.id) {
            return Err(ProjectileLoadError::DuplicateId(definition.id));
        }
        let key = definition.name.to_lowercase();
        if let Some(&existing) = self.by_name.get(&key) {
            return Err(ProjectileLoadError::DuplicateName {
                name: definition.name,
                existing,
            });
        }
        definition.validate()?;

        let id = definition.id;
        let profile = definition.to_profile();
        self.by_name.insert(key, id);
        self.by_id.insert(id, Entry { definition, profile });
        Ok(())
    }

    /// Gets a profile by ID.
    #[must_use]
    pub fn get(&self, id: u32) -> Option<&ProjectileProfile> {
        self.by_id.get(&id).map(|entry| &entry.profile)
    }

    /// Gets a definition by ID.
    #[must_use]
    pub fn definition(&self, id: u32) -> Option<&ProjectileDefinition> {
        self.by_id.get(&id).map(|entry| &entry.definition)
    }

    /// Gets a profile by name (case-insensitive).
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&ProjectileProfile> {
        self.by_name
            .get(&name.to_lowercase())
            .and_then(|id| self.get(*id))
    }

    /// Gets a profile by name, failing with [`ProfileError::Unknown`].
    pub fn profile(&self, name: &str) -> Result<&ProjectileProfile, ProfileError> {
        self.get_by_name(name)
            .ok_or_else(|| ProfileError::Unknown(name.to_string()))
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .by_id
            .values()
            .map(|entry| entry.definition.name.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

/// Loads projectile definition files into a registry.
pub struct ProjectileLoader {
    /// Base path for definition files.
    base_path: PathBuf,
    /// Profile registry.
    registry: ProfileRegistry,
}

impl ProjectileLoader {
    /// Creates a new loader.
    #[must_use]
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            registry: ProfileRegistry::new(),
        }
    }

    /// Returns a reference to the registry.
    #[must_use]
    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    /// Loads all definitions from the base path.
    ///
    /// A missing directory loads nothing. Files that fail to load are
    /// skipped with a warning.
    pub fn load_all(&mut self) -> ProjectileLoadResult<usize> {
        let path = &self.base_path;
        if !path.exists() {
            info!("Projectile path {:?} does not exist, nothing loaded", path);
            return Ok(0);
        }

        let mut files: Vec<PathBuf> = fs::read_dir(path)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|file| file.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        files.sort();

        let mut count = 0;
        for file_path in files {
            match self.load_file(&file_path) {
                Ok(n) => {
                    count += n;
                    debug!("Loaded {} projectiles from {:?}", n, file_path);
                },
                Err(e) => {
                    warn!("Failed to load projectile file {:?}: {}", file_path, e);
                },
            }
        }

        info!("Loaded {} projectiles total", count);
        Ok(count)
    }

    /// Loads definitions from a single file.
    ///
    /// Definitions before the first bad one stay registered.
    pub fn load_file(&mut self, path: &Path) -> ProjectileLoadResult<usize> {
        let content = fs::read_to_string(path)?;
        let file: ProjectileFile = toml::from_str(&content)?;

        let mut count = 0;
        for definition in file.projectiles {
            self.registry.register(definition)?;
            count += 1;
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RIFLE_FILE: &str = r#"
version = "1.0.0"

[[projectiles]]
id = 1
name = "Rifle Round"
muzzle_velocity_min = 820.0
muzzle_velocity_max = 860.0

[projectiles.flight]
mass = 0.0097
drag_coefficient = 0.295
cross_section = 4.56e-5

[[projectiles]]
id = 2
name = "Grenade"
muzzle_velocity_min = 70.0
muzzle_velocity_max = 80.0
channel = "world_static"
safe_launch = false
"#;

    fn definition(id: u32, name: &str) -> ProjectileDefinition {
        ProjectileDefinition {
            id,
            name: name.to_string(),
            description: String::new(),
            muzzle_velocity_min: 300.0,
            muzzle_velocity_max: 320.0,
            flight: DragModel::vacuum(),
            channel: ChannelName::Projectile,
            safe_launch: true,
            trace_complex: false,
        }
    }

    #[test]
    fn test_definition_to_profile() {
        let mut def = definition(7, "Slug");
        def.channel = ChannelName::Pawn;
        def.trace_complex = true;
        let profile = def.to_profile();

        assert_eq!(profile.name, "Slug");
        assert_eq!(profile.nominal_muzzle_speed(), 310.0);
        assert_eq!(profile.trace_channel, TraceChannel::PAWN);
        assert!(profile.trace_complex);
        assert_eq!(profile.drag_model(), Some(&DragModel::vacuum()));
    }

    #[test]
    fn test_definition_validate_inverted_range() {
        let mut def = definition(3, "Backwards");
        def.muzzle_velocity_min = 500.0;
        def.muzzle_velocity_max = 100.0;
        assert!(matches!(
            def.validate(),
            Err(ProjectileLoadError::Invalid {
                id: 3,
                source: ProfileError::InvertedRange { .. }
            })
        ));
    }

    #[test]
    fn test_definition_validate_empty_name() {
        let def = definition(4, "");
        assert!(matches!(
            def.validate(),
            Err(ProjectileLoadError::Invalid {
                source: ProfileError::EmptyName,
                ..
            })
        ));
    }

    #[test]
    fn test_registry_register_and_lookup() {
        let mut registry = ProfileRegistry::new();
        registry.register(definition(1, "Buckshot")).expect("register");
        registry.register(definition(2, "Slug")).expect("register");

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(1).map(|p| p.name.as_str()), Some("Buckshot"));
        assert_eq!(registry.get_by_name("SLUG").map(|p| p.name.as_str()), Some("Slug"));
        assert_eq!(registry.definition(2).map(|d| d.id), Some(2));
        assert_eq!(registry.names(), vec!["Buckshot", "Slug"]);
    }

    #[test]
    fn test_registry_duplicate_id() {
        let mut registry = ProfileRegistry::new();
        registry.register(definition(1, "One")).expect("register");
        assert!(matches!(
            registry.register(definition(1, "Other")),
            Err(ProjectileLoadError::DuplicateId(1))
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_duplicate_name() {
        let mut registry = ProfileRegistry::new();
        registry.register(definition(1, "Slug")).expect("register");

        let result = registry.register(definition(2, "SLUG"));
        assert!(matches!(
            result,
            Err(ProjectileLoadError::DuplicateName { existing: 1, .. })
        ));
        assert_eq!(registry.len(), 1);
        assert!(registry.get(2).is_none());
        assert_eq!(registry.get_by_name("slug").map(|p| p.name.as_str()), Some("Slug"));
    }

    #[test]
    fn test_registry_unknown_name() {
        let registry = ProfileRegistry::new();
        assert_eq!(
            registry.profile("missing").map(|p| p.name.clone()),
            Err(ProfileError::Unknown("missing".to_string()))
        );
    }

    #[test]
    fn test_loader_load_all() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(temp_dir.path().join("standard.toml"), RIFLE_FILE).expect("write");
        fs::write(temp_dir.path().join("notes.txt"), "not a definition").expect("write");
        fs::write(temp_dir.path().join("broken.toml"), "projectiles = 5").expect("write");

        let mut loader = ProjectileLoader::new(temp_dir.path());
        let count = loader.load_all().expect("load");

        assert_eq!(count, 2);
        let grenade = loader.registry().profile("grenade").expect("grenade");
        assert_eq!(grenade.trace_channel, TraceChannel::WORLD_STATIC);
        assert!(!grenade.safe_launch);
        let rifle = loader.registry().get(1).expect("rifle");
        assert_eq!(rifle.drag_model().map(|m| m.mass), Some(0.0097));
        assert_eq!(rifle.drag_model().map(|m| m.gravity_scale), Some(1.0));
    }

    #[test]
    fn test_loader_missing_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut loader = ProjectileLoader::new(temp_dir.path().join("absent"));
        assert_eq!(loader.load_all().expect("load"), 0);
        assert!(loader.registry().is_empty());
    }
}
