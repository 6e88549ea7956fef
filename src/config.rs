//! Demo application configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Config file picked up from the working directory when no `--config` is given.
pub const LOCAL_CONFIG_FILE: &str = "hellolua.yaml";

/// Application settings, usually read from YAML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// The script resource driven by the app.
    pub script: ScriptConfig,
    /// Number of frames to run; `None` runs until interrupted.
    pub frames: Option<u64>,
    /// Target frames per second.
    pub framerate: f64,
    /// Sleep between frames to hold the target framerate.
    pub cap_framerate: bool,
}

/// A script resource declaration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScriptConfig {
    /// Resource identifier, used in log output.
    pub id: String,
    /// Script path. Relative paths are resolved against the config file's directory.
    pub path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            script: ScriptConfig::default(),
            frames: None,
            framerate: 60.0,
            cap_framerate: true,
        }
    }
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            id: "Script".to_string(),
            path: PathBuf::from("hellolua.lua"),
        }
    }
}

impl AppConfig {
    /// Load a config file, resolving the script path relative to it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let mut config = Self::from_yaml(&text)
            .with_context(|| format!("Invalid config: {}", path.display()))?;

        if let Some(dir) = path.parent() {
            if config.script.path.is_relative() {
                config.script.path = dir.join(&config.script.path);
            }
        }
        Ok(config)
    }

    /// Parse a config from YAML text. Missing fields take their defaults.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text).context("Failed to parse config YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// Find and load the config.
    ///
    /// Order: `explicit`, `./hellolua.yaml`, the user config directory, defaults.
    pub fn locate(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let candidates = [Some(PathBuf::from(LOCAL_CONFIG_FILE)), user_config_file()];
        for candidate in candidates.into_iter().flatten() {
            if candidate.is_file() {
                tracing::debug!(path = %candidate.display(), "Using config file");
                return Self::from_file(&candidate);
            }
        }

        Ok(Self::default())
    }

    fn validate(&self) -> Result<()> {
        if !(self.framerate.is_finite() && self.framerate > 0.0) {
            anyhow::bail!("framerate must be a positive number, got {}", self.framerate);
        }
        // Tiny rates pass the check above but have no representable frame time.
        if Duration::try_from_secs_f64(1.0 / self.framerate).is_err() {
            anyhow::bail!("framerate {} is too small", self.framerate);
        }
        Ok(())
    }
}

/// `config.yaml` in the platform config directory, e.g. `~/.config/hellolua/`.
fn user_config_file() -> Option<PathBuf> {
    ProjectDirs::from("", "", "hellolua").map(|dirs| dirs.config_dir().join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_yaml("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.script.id, "Script");
        assert_eq!(config.frames, None);
    }

    #[test]
    fn test_parse_full_config() {
        let config = AppConfig::from_yaml(
            r#"
script:
  id: Mover
  path: scripts/mover.lua
frames: 10
framerate: 30.0
cap_framerate: false
"#,
        )
        .unwrap();

        assert_eq!(config.script.id, "Mover");
        assert_eq!(config.script.path, PathBuf::from("scripts/mover.lua"));
        assert_eq!(config.frames, Some(10));
        assert_eq!(config.framerate, 30.0);
        assert!(!config.cap_framerate);
    }

    #[test]
    fn test_rejects_bad_framerate() {
        let result = AppConfig::from_yaml("framerate: 0");
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_subnormal_framerate() {
        let err = AppConfig::from_yaml("framerate: 1e-320\nframes: 1").unwrap_err();
        assert!(format!("{err:#}").contains("too small"));

        // Normal but small enough that the frame time overflows a Duration.
        assert!(AppConfig::from_yaml("framerate: 1e-300").is_err());

        assert!(AppConfig::from_yaml("framerate: 0.001").is_ok());
    }

    #[test]
    fn test_script_path_relative_to_config() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("app.yaml");
        std::fs::write(&config_path, "script:\n  path: main.lua\n").unwrap();

        let config = AppConfig::from_file(&config_path).unwrap();
        assert_eq!(config.script.path, temp.path().join("main.lua"));
    }

    #[test]
    fn test_explicit_missing_config_is_an_error() {
        let temp = TempDir::new().unwrap();
        let result = AppConfig::locate(Some(&temp.path().join("nope.yaml")));
        assert!(result.is_err());
    }
}
