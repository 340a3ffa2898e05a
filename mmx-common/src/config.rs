//! Configuration loading
//!
//! Bootstrap configuration comes from a single TOML file. Every field has a
//! built-in default, so a missing file is not an error.
//!
//! Config file resolution priority order:
//! 1. Command-line argument (highest priority)
//! 2. `MMX_CONFIG` environment variable
//! 3. User config file (`~/.config/moodmix/config.toml`)
//! 4. Compiled defaults (fallback)

use crate::profile::EmotionProfile;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "MMX_CONFIG";

/// Longest accepted stabilizer hold time (one hour)
pub const MAX_HOLD_SECS: f64 = 3600.0;

/// Longest accepted cache lifetime (one week)
pub const MAX_TTL_SECS: u64 = 7 * 24 * 3600;

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// HTTP server port
    pub port: u16,

    /// HTTP bind address
    pub bind_address: String,

    /// Local catalog fixture (JSON); an empty catalog is used when absent
    pub catalog_path: Option<PathBuf>,

    /// Recorded observations (JSON lines) replayed as the classification source
    pub observations_path: Option<PathBuf>,

    pub logging: LoggingConfig,
    pub stabilizer: StabilizerConfig,
    pub recommender: RecommenderConfig,

    /// Overrides for the built-in emotion profiles, keyed by emotion label
    pub profiles: HashMap<String, EmotionProfile>,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: 5790,
            bind_address: "127.0.0.1".to_string(),
            catalog_path: None,
            observations_path: None,
            logging: LoggingConfig::default(),
            stabilizer: StabilizerConfig::default(),
            recommender: RecommenderConfig::default(),
            profiles: HashMap::new(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Signal stabilization tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerConfig {
    /// Qualifying observations kept for weighted voting
    pub history_capacity: usize,
    /// Observations below this confidence are discarded
    pub min_confidence: f32,
    /// Consecutive agreeing cycles required before a commit
    pub required_consecutive: u32,
    /// Minimum seconds between committed transitions
    pub min_hold_secs: f64,
    /// Only every Nth frame from the source is fed to the stabilizer
    pub frame_stride: u32,
    /// Pause between frames pulled from the source (0 = source paces itself)
    pub frame_interval_ms: u64,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            history_capacity: 10,
            min_confidence: 0.5,
            required_consecutive: 4,
            min_hold_secs: 1.0,
            frame_stride: 2,
            frame_interval_ms: 33,
        }
    }
}

/// Recommendation fetch and cache tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
    /// Tracks written to the playlist per recommendation
    pub track_limit: usize,
    /// Candidates requested from the catalog per fetch
    pub candidate_pool: usize,
    /// Seed genres passed to a targeted fetch
    pub max_seed_genres: usize,
    /// Playlist id cache lifetime
    pub container_ttl_secs: u64,
    /// Per-emotion track list cache lifetime
    pub content_ttl_secs: u64,
    /// Genre searched when every profile-driven fetch comes back empty
    pub default_genre: String,
    /// Seed tuples whose recently recommended tracks are remembered
    pub recent_key_capacity: usize,
    /// Most recent track ids remembered per seed tuple
    pub recent_ids_per_key: usize,
    /// Name of the playlist the recommendations are written into
    pub container_name: String,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            track_limit: 15,
            candidate_pool: 50,
            max_seed_genres: 3,
            container_ttl_secs: 3600,
            content_ttl_secs: 30,
            default_genre: "pop".to_string(),
            recent_key_capacity: 7,
            recent_ids_per_key: 30,
            container_name: "Emotion-Based Playlist".to_string(),
        }
    }
}

impl TomlConfig {
    /// Reject values the stabilizer or recommender cannot work with
    pub fn validate(&self) -> Result<()> {
        let s = &self.stabilizer;
        if s.history_capacity == 0 {
            return Err(Error::Config(
                "stabilizer.history_capacity must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&s.min_confidence) {
            return Err(Error::Config(format!(
                "stabilizer.min_confidence must be within 0.0-1.0 (got {})",
                s.min_confidence
            )));
        }
        if s.required_consecutive == 0 {
            return Err(Error::Config(
                "stabilizer.required_consecutive must be at least 1".into(),
            ));
        }
        if !(0.0..=MAX_HOLD_SECS).contains(&s.min_hold_secs) {
            return Err(Error::Config(format!(
                "stabilizer.min_hold_secs must be within 0-{} (got {})",
                MAX_HOLD_SECS, s.min_hold_secs
            )));
        }
        if s.frame_stride == 0 {
            return Err(Error::Config("stabilizer.frame_stride must be at least 1".into()));
        }

        let r = &self.recommender;
        if r.track_limit == 0 {
            return Err(Error::Config("recommender.track_limit must be at least 1".into()));
        }
        if r.candidate_pool < r.track_limit {
            return Err(Error::Config(format!(
                "recommender.candidate_pool ({}) must not be smaller than track_limit ({})",
                r.candidate_pool, r.track_limit
            )));
        }
        if r.max_seed_genres == 0 {
            return Err(Error::Config(
                "recommender.max_seed_genres must be at least 1".into(),
            ));
        }
        for (name, secs) in [
            ("container_ttl_secs", r.container_ttl_secs),
            ("content_ttl_secs", r.content_ttl_secs),
        ] {
            if secs > MAX_TTL_SECS {
                return Err(Error::Config(format!(
                    "recommender.{} must not exceed {} (got {})",
                    name, MAX_TTL_SECS, secs
                )));
            }
        }
        if r.recent_ids_per_key == 0 {
            return Err(Error::Config(
                "recommender.recent_ids_per_key must be at least 1".into(),
            ));
        }
        if r.default_genre.trim().is_empty() {
            return Err(Error::Config("recommender.default_genre must not be empty".into()));
        }

        Ok(())
    }
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine(PathBuf),
    Environment(PathBuf),
    UserFile(PathBuf),
    /// No config file found; compiled defaults in use
    Defaults,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::CommandLine(p)
            | ConfigSource::Environment(p)
            | ConfigSource::UserFile(p) => Some(p),
            ConfigSource::Defaults => None,
        }
    }
}

/// Resolve which config file (if any) to load
///
/// Explicit paths (CLI, environment) are returned even if they do not exist so
/// the loader can report them; the implicit user file is only returned when
/// present.
pub fn resolve_config_source(cli_arg: Option<&Path>) -> ConfigSource {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return ConfigSource::CommandLine(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return ConfigSource::Environment(PathBuf::from(path));
        }
    }

    // Priority 3: User config file
    if let Some(path) = user_config_path() {
        if path.exists() {
            return ConfigSource::UserFile(path);
        }
    }

    // Priority 4: Compiled defaults
    ConfigSource::Defaults
}

/// Platform user config path (`<config dir>/moodmix/config.toml`)
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("moodmix").join("config.toml"))
}

/// Resolve, load, and validate configuration
pub fn load_config(cli_arg: Option<&Path>) -> Result<(TomlConfig, ConfigSource)> {
    let source = resolve_config_source(cli_arg);
    let config = match source.path() {
        Some(path) => load_toml_config(path)?,
        None => TomlConfig::default(),
    };
    config.validate()?;
    Ok((config, source))
}

/// Read and parse one TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Read config {} failed: {}", path.display(), e))
    })?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse config {} failed: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = TomlConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.stabilizer.history_capacity, 10);
        assert_eq!(config.stabilizer.required_consecutive, 4);
        assert_eq!(config.recommender.container_ttl_secs, 3600);
        assert_eq!(config.recommender.content_ttl_secs, 30);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            port = 6000

            [stabilizer]
            min_hold_secs = 2.5
            "#,
        )
        .unwrap();
        assert_eq!(config.port, 6000);
        assert_eq!(config.stabilizer.min_hold_secs, 2.5);
        assert_eq!(config.stabilizer.min_confidence, 0.5);
        assert_eq!(config.recommender.default_genre, "pop");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validate_rejects_out_of_range_confidence() {
        let mut config = TomlConfig::default();
        config.stabilizer.min_confidence = 1.5;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_huge_durations() {
        let mut config = TomlConfig::default();
        config.stabilizer.min_hold_secs = 1e30;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.stabilizer.min_hold_secs = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = TomlConfig::default();
        config.recommender.container_ttl_secs = u64::MAX;
        assert!(config.validate().is_err());

        let mut config = TomlConfig::default();
        config.recommender.content_ttl_secs = MAX_TTL_SECS + 1;
        assert!(config.validate().is_err());

        config.recommender.content_ttl_secs = MAX_TTL_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_small_candidate_pool() {
        let mut config = TomlConfig::default();
        config.recommender.candidate_pool = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_profile_overrides_parse() {
        let config: TomlConfig = toml::from_str(
            r#"
            [profiles.happy]
            genres = ["k-pop"]
            seed_genres = ["k-pop", "dance"]
            target_valence = 0.9
            "#,
        )
        .unwrap();
        let happy = &config.profiles["happy"];
        assert_eq!(happy.seed_genres, vec!["k-pop", "dance"]);
        assert_eq!(happy.mood.target_valence, 0.9);
    }
}
