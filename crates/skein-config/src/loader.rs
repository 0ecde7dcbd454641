//! Layered configuration loading.
//!
//! `default.toml` in the config directory is always read. A profile, named
//! explicitly or through `SKEIN_ENV`, overlays `<profile>.toml` on top of it.
//! References are resolved after the overlay.

use crate::components::SkeinConfig;
use crate::error::ConfigError;
use crate::references::{overlay, read_toml, resolve_references};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable selecting the profile overlay.
pub const PROFILE_ENV: &str = "SKEIN_ENV";

const DEFAULT_FILE: &str = "default.toml";

#[derive(Debug, Clone)]
pub struct ConfigLoader {
    dir: PathBuf,
    profile: Option<String>,
}

impl ConfigLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            profile: None,
        }
    }

    /// Loader whose profile comes from `SKEIN_ENV`, when set.
    pub fn from_env(dir: impl Into<PathBuf>) -> Self {
        let profile = std::env::var(PROFILE_ENV).ok().filter(|p| !p.is_empty());
        Self {
            dir: dir.into(),
            profile,
        }
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    /// Merged and resolved document before typing.
    pub fn load_value(&self) -> Result<toml::Value, ConfigError> {
        let default_path = self.dir.join(DEFAULT_FILE);
        let mut value = read_toml(&default_path)?;
        debug!("Loaded {}", default_path.display());

        if let Some(profile) = &self.profile {
            let profile_path = self.dir.join(format!("{}.toml", profile));
            if profile_path.exists() {
                overlay(&mut value, read_toml(&profile_path)?);
                info!(profile = %profile, "Applied config profile");
            } else {
                warn!(
                    profile = %profile,
                    "Profile config {} not found, using defaults",
                    profile_path.display()
                );
            }
        }

        resolve_references(&mut value, &self.dir)?;
        Ok(value)
    }

    pub fn load(&self) -> Result<SkeinConfig, ConfigError> {
        self.load_value()?
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Invalid(e.to_string()))
    }
}

impl SkeinConfig {
    /// Loads from `dir`, honouring `SKEIN_ENV`.
    pub fn load(dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        ConfigLoader::from_env(dir).load()
    }

    /// Parses a single document without overlays or references.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::RelayMode;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn config_dir(files: &[(&str, &str)]) -> TempDir {
        let temp = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(temp.path().join(name), content).unwrap();
        }
        temp
    }

    #[test]
    fn test_default_file_required() {
        let temp = TempDir::new().unwrap();
        let err = ConfigLoader::new(temp.path()).load().unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_profile_overlays_defaults() {
        let temp = config_dir(&[
            (
                "default.toml",
                "[server]\nport = 3030\n\n[realtime]\ndefault_rooms = [\"lobby\"]\n",
            ),
            (
                "production.toml",
                "[server]\nhost = \"127.0.0.1\"\n\n[relay]\nenabled = true\nmode = \"context\"\n",
            ),
        ]);

        let config = ConfigLoader::new(temp.path())
            .with_profile("production")
            .load()
            .unwrap();

        assert_eq!(config.server.addr(), "127.0.0.1:3030");
        assert_eq!(config.realtime.default_rooms, vec!["lobby"]);
        assert!(config.relay.enabled);
        assert_eq!(config.relay.mode, RelayMode::Context);
    }

    #[test]
    fn test_missing_profile_falls_back() {
        let temp = config_dir(&[("default.toml", "[server]\nport = 9000\n")]);
        let config = ConfigLoader::new(temp.path())
            .with_profile("staging")
            .load()
            .unwrap();
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    #[serial]
    fn test_profile_from_env() {
        let temp = config_dir(&[
            ("default.toml", "[calls]\ntimeout_ms = 5000\n"),
            ("test.toml", "[calls]\ntimeout_ms = 50\n"),
        ]);
        std::env::set_var(PROFILE_ENV, "test");

        let loader = ConfigLoader::from_env(temp.path());
        assert_eq!(loader.profile(), Some("test"));
        assert_eq!(loader.load().unwrap().calls.timeout_ms, 50);

        std::env::remove_var(PROFILE_ENV);
    }

    #[test]
    #[serial]
    fn test_references_resolved_after_overlay() {
        let temp = config_dir(&[
            (
                "default.toml",
                "[relay]\nurl = \"ws://localhost:4040\"\n\n[settings]\npaginate = \"{file:extra.toml}\"\n",
            ),
            ("docker.toml", "[relay]\nurl = \"{env:SKEIN_TEST_HUB}\"\n"),
            ("extra.toml", "page_size = 10\n"),
        ]);
        std::env::set_var("SKEIN_TEST_HUB", "ws://hub:4040");

        let config = ConfigLoader::new(temp.path())
            .with_profile("docker")
            .load()
            .unwrap();

        assert_eq!(config.relay.url, "ws://hub:4040");
        assert_eq!(config.settings["paginate"]["page_size"].as_integer(), Some(10));
        std::env::remove_var("SKEIN_TEST_HUB");
    }

    #[test]
    fn test_invalid_types_reported() {
        let temp = config_dir(&[("default.toml", "[server]\nport = \"eighty\"\n")]);
        let err = ConfigLoader::new(temp.path()).load().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_from_toml_str() {
        let config = SkeinConfig::from_toml_str("[logging]\nlevel = \"debug\"\n").unwrap();
        assert_eq!(config.logging.level, "debug");
    }
}
