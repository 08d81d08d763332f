//! Configuration file management
//!
//! Handles finding, loading, and validating configuration files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{AppConfig, ContainerStrategy, ExecutionMode};

/// Configuration file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &[
    "./risk-orchestrator.yaml",
    "./risk-orchestrator.yml",
    "./.risk-orchestrator.yaml",
    "~/.config/risk-orchestrator/config.yaml",
];

/// Full configuration file structure
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Version of config file format
    #[serde(default = "default_version")]
    pub version: String,

    /// Application settings
    #[serde(default)]
    pub app: AppConfig,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            version: default_version(),
            app: AppConfig::default(),
        }
    }
}

impl ConfigFile {
    /// Find configuration file in standard locations
    pub fn find() -> Option<PathBuf> {
        CONFIG_LOCATIONS
            .iter()
            .map(|location| expand_path(location))
            .find(|path| path.exists())
    }

    /// Location written by `config init` and `config set` when no file exists
    pub fn default_path() -> PathBuf {
        expand_path(CONFIG_LOCATIONS[CONFIG_LOCATIONS.len() - 1])
    }

    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml_file(path) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !["1.0"].contains(&self.version.as_str()) {
            anyhow::bail!("Unsupported config version: {}", self.version);
        }
        self.app.validate()
    }

    /// Validated update of one key, persisted to `path`
    ///
    /// A rejected value leaves the file as it was.
    pub fn set_and_save(&mut self, key: &str, value: &str, path: impl AsRef<Path>) -> Result<()> {
        let mut updated = self.app.clone();
        updated.set(key, value)?;
        updated.validate()?;
        self.app = updated;
        self.save(path)
    }

    /// Generate example configuration
    pub fn example() -> Self {
        let mut app = AppConfig {
            execution_mode: ExecutionMode::Docker,
            ..AppConfig::default()
        };
        app.risk_service.url = Some("http://localhost:8000".to_string());
        app.container.strategy = ContainerStrategy::Simulated;
        app.container.max_concurrent = 2;

        Self {
            version: default_version(),
            app,
        }
    }
}

/// Expand ~ to home directory
pub(crate) fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Check if file is YAML based on extension
fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_file_default() {
        let config = ConfigFile::default();
        assert_eq!(config.version, "1.0");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_file_save_load_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let config = ConfigFile::example();
        config.save(&path).unwrap();

        let loaded = ConfigFile::load(&path).unwrap();
        assert_eq!(loaded.version, config.version);
        assert_eq!(loaded.app, config.app);
    }

    #[test]
    fn test_config_file_save_load_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        ConfigFile::example().save(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.trim_start().starts_with('{'));

        let loaded = ConfigFile::load(&path).unwrap();
        assert_eq!(loaded.app.execution_mode, ExecutionMode::Docker);
    }

    #[test]
    fn test_set_rejects_invalid_mode_without_writing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = ConfigFile::default();
        config.set_and_save("execution_mode", "docker", &path).unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        assert!(config.set_and_save("execution_mode", "vm", &path).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
        assert_eq!(config.app.execution_mode, ExecutionMode::Docker);
    }

    #[test]
    fn test_set_does_not_create_file_on_rejection() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fresh.yaml");

        let mut config = ConfigFile::default();
        assert!(config.set_and_save("execution_mode", "cluster", &path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_validate_rejects_version() {
        let config = ConfigFile {
            version: "9.9".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_mode_in_file_fails_to_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "version: \"1.0\"\napp:\n  execution_mode: kubernetes\n").unwrap();
        assert!(ConfigFile::load(&path).is_err());
    }

    #[test]
    fn test_expand_path() {
        let path = expand_path("./test.yaml");
        assert_eq!(path, PathBuf::from("./test.yaml"));
        assert!(ConfigFile::default_path().ends_with("risk-orchestrator/config.yaml"));
    }
}
