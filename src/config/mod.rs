//! Configuration management for jira-walker.
//!
//! Loads and saves the TOML configuration file holding profiles and
//! settings. API tokens are not stored here; they live in the OS keyring.

mod profile;
mod settings;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub use profile::Profile;
pub use settings::Settings;

/// Environment variable overriding the configuration file path.
pub const CONFIG_PATH_ENV: &str = "JIRA_WALKER_CONFIG";

/// Errors that can occur while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform configuration directory could not be determined.
    #[error("could not determine configuration directory")]
    NoConfigDir,

    /// The configuration directory could not be created.
    #[error("failed to create configuration directory: {0}")]
    CreateDirError(#[source] std::io::Error),

    /// The configuration file could not be read.
    #[error("failed to read configuration file: {0}")]
    ReadError(#[source] std::io::Error),

    /// The configuration file could not be written.
    #[error("failed to write configuration file: {0}")]
    WriteError(#[source] std::io::Error),

    /// The configuration file is not valid TOML for this schema.
    #[error("failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// The configuration could not be serialized.
    #[error("failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// The configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    ValidationError(String),

    /// No profile with the requested name exists.
    #[error("profile '{0}' not found")]
    ProfileNotFound(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// The full configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Application-wide settings.
    #[serde(default)]
    pub settings: Settings,
    /// Configured JIRA connections.
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

impl Config {
    /// Path of the configuration file.
    ///
    /// `$JIRA_WALKER_CONFIG` if set, otherwise
    /// `<config_dir>/jira-walker/config.toml`.
    pub fn path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        dirs::config_dir()
            .map(|dir| dir.join("jira-walker").join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load the configuration from [`Config::path`].
    ///
    /// A missing file yields the default configuration.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load and validate the configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No configuration file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;

        debug!(path = %path.display(), profiles = config.profiles.len(), "Loaded configuration");
        Ok(config)
    }

    /// Save the configuration to [`Config::path`].
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    /// Validate and save the configuration to a specific file.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::CreateDirError)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents).map_err(ConfigError::WriteError)?;

        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Check every profile and that profile names are unique.
    pub fn validate(&self) -> Result<()> {
        self.settings.validate()?;

        for (i, profile) in self.profiles.iter().enumerate() {
            profile.validate()?;
            if self.profiles[..i].iter().any(|p| p.name == profile.name) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate profile name '{}'",
                    profile.name
                )));
            }
        }

        Ok(())
    }

    /// Look up a profile by name.
    pub fn get_profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// The default profile, or the only profile when no default is set.
    pub fn get_default_profile(&self) -> Option<&Profile> {
        match &self.settings.default_profile {
            Some(name) => self.get_profile(name),
            None if self.profiles.len() == 1 => self.profiles.first(),
            None => None,
        }
    }

    /// Resolve an explicitly requested profile, falling back to the default.
    pub fn resolve_profile(&self, name: Option<&str>) -> Result<&Profile> {
        match name {
            Some(name) => self
                .get_profile(name)
                .ok_or_else(|| ConfigError::ProfileNotFound(name.to_string())),
            None => self.get_default_profile().ok_or_else(|| {
                ConfigError::ValidationError(
                    "no profile selected and no default profile configured".to_string(),
                )
            }),
        }
    }

    /// Add a profile, replacing any profile with the same name.
    pub fn upsert_profile(&mut self, profile: Profile) {
        match self.profiles.iter_mut().find(|p| p.name == profile.name) {
            Some(existing) => *existing = profile,
            None => self.profiles.push(profile),
        }
    }

    /// Remove a profile by name, clearing the default if it pointed there.
    pub fn remove_profile(&mut self, name: &str) -> Result<Profile> {
        let index = self
            .profiles
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| ConfigError::ProfileNotFound(name.to_string()))?;

        if self.settings.default_profile.as_deref() == Some(name) {
            self.settings.default_profile = None;
        }
        Ok(self.profiles.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    fn profile(name: &str) -> Profile {
        Profile::new(
            name.to_string(),
            format!("https://{}.atlassian.net", name),
            format!("{}@example.com", name),
        )
    }

    fn config_with_profiles() -> Config {
        Config {
            settings: Settings {
                default_profile: Some("work".to_string()),
                ..Default::default()
            },
            profiles: vec![profile("work"), profile("personal")],
        }
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = config_with_profiles();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, Config::default());
        assert_eq!(loaded.settings.page_size, 50);
    }

    #[test]
    fn test_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "profiles = 3").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_duplicate_profiles_rejected() {
        let config = Config {
            settings: Settings::default(),
            profiles: vec![profile("work"), profile("work")],
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate profile name 'work'"));
    }

    #[test]
    fn test_default_profile_resolution() {
        let config = config_with_profiles();
        assert_eq!(config.get_default_profile().unwrap().name, "work");
        assert_eq!(config.resolve_profile(Some("personal")).unwrap().name, "personal");
        assert!(matches!(
            config.resolve_profile(Some("client")),
            Err(ConfigError::ProfileNotFound(_))
        ));

        let single = Config {
            settings: Settings::default(),
            profiles: vec![profile("solo")],
        };
        assert_eq!(single.resolve_profile(None).unwrap().name, "solo");
        assert!(Config::default().resolve_profile(None).is_err());
    }

    #[test]
    fn test_upsert_and_remove_profile() {
        let mut config = config_with_profiles();
        config.upsert_profile(Profile::new(
            "work".to_string(),
            "https://new.atlassian.net".to_string(),
            "work@example.com".to_string(),
        ));
        assert_eq!(config.profiles.len(), 2);
        assert_eq!(config.get_profile("work").unwrap().url, "https://new.atlassian.net");

        config.remove_profile("work").unwrap();
        assert!(config.settings.default_profile.is_none());
        assert!(config.remove_profile("work").is_err());
    }

    #[test]
    #[serial]
    fn test_path_env_override() {
        std::env::set_var(CONFIG_PATH_ENV, "/tmp/jira-walker-test.toml");
        let path = Config::path().unwrap();
        std::env::remove_var(CONFIG_PATH_ENV);

        assert_eq!(path, PathBuf::from("/tmp/jira-walker-test.toml"));
    }

    #[test]
    #[serial]
    fn test_load_uses_env_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        config_with_profiles().save_to(&path).unwrap();

        std::env::set_var(CONFIG_PATH_ENV, &path);
        let loaded = Config::load();
        std::env::remove_var(CONFIG_PATH_ENV);

        assert_eq!(loaded.unwrap().profiles.len(), 2);
    }
}
