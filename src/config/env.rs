//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

/// Environment variable prefix
const ENV_PREFIX: &str = "RISK_ORCH";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Runner from RISK_ORCH_EXECUTION_MODE
    pub execution_mode: Option<String>,
    /// Demo mode from RISK_ORCH_DEMO_MODE
    pub demo_mode: Option<bool>,
    /// Registry directory from RISK_ORCH_DATA_DIR
    pub data_dir: Option<String>,
    /// Risk service base URL from RISK_ORCH_RISK_SERVICE_URL
    pub risk_service_url: Option<String>,
    /// Config file from RISK_ORCH_CONFIG
    pub config_file: Option<String>,
    /// CI mode from RISK_ORCH_CI
    pub ci: Option<bool>,
    /// Commit under test from RISK_ORCH_COMMIT, else GITHUB_SHA
    pub commit_id: Option<String>,
    /// Branch under test from RISK_ORCH_BRANCH, else GITHUB_REF_NAME
    pub branch: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            execution_mode: get_env("EXECUTION_MODE"),
            demo_mode: get_env_bool("DEMO_MODE"),
            data_dir: get_env("DATA_DIR"),
            risk_service_url: get_env("RISK_SERVICE_URL"),
            config_file: get_env("CONFIG"),
            ci: get_env_bool("CI"),
            commit_id: get_env("COMMIT").or_else(|| get_raw_env("GITHUB_SHA")),
            branch: get_env("BRANCH").or_else(|| get_raw_env("GITHUB_REF_NAME")),
        }
    }

    /// Check if any configuration overrides are set
    pub fn has_any(&self) -> bool {
        self.execution_mode.is_some()
            || self.demo_mode.is_some()
            || self.data_dir.is_some()
            || self.risk_service_url.is_some()
            || self.config_file.is_some()
            || self.ci.is_some()
    }

    pub fn ci_or(&self, default: bool) -> bool {
        self.ci.unwrap_or(default)
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {}_EXECUTION_MODE:   {:?}", ENV_PREFIX, self.execution_mode);
        println!("  {}_DEMO_MODE:        {:?}", ENV_PREFIX, self.demo_mode);
        println!("  {}_DATA_DIR:         {:?}", ENV_PREFIX, self.data_dir);
        println!("  {}_RISK_SERVICE_URL: {:?}", ENV_PREFIX, self.risk_service_url);
        println!("  {}_CONFIG:           {:?}", ENV_PREFIX, self.config_file);
        println!("  {}_CI:               {:?}", ENV_PREFIX, self.ci);
        println!("  {}_COMMIT:           {:?}", ENV_PREFIX, self.commit_id);
        println!("  {}_BRANCH:           {:?}", ENV_PREFIX, self.branch);
    }
}

fn get_env(name: &str) -> Option<String> {
    get_raw_env(&format!("{ENV_PREFIX}_{name}"))
}

fn get_raw_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| {
        matches!(
            v.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on" | "enabled"
        )
    })
}

/// Builder for setting environment variables in tests
#[cfg(test)]
pub struct EnvBuilder {
    vars: Vec<(String, String)>,
}

#[cfg(test)]
impl EnvBuilder {
    pub fn new() -> Self {
        Self { vars: Vec::new() }
    }

    pub fn var(mut self, name: &str, value: impl Into<String>) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_{name}"), value.into()));
        self
    }

    /// Set a variable without the prefix
    pub fn raw_var(mut self, name: &str, value: impl Into<String>) -> Self {
        self.vars.push((name.to_string(), value.into()));
        self
    }

    /// Apply and return guard that restores on drop
    pub fn apply_scoped(self) -> EnvGuard {
        let previous: Vec<_> = self
            .vars
            .iter()
            .map(|(k, _)| (k.clone(), env::var(k).ok()))
            .collect();

        for (key, value) in self.vars {
            env::set_var(key, value);
        }

        EnvGuard { previous }
    }
}

/// Guard that restores environment variables on drop
#[cfg(test)]
pub struct EnvGuard {
    previous: Vec<(String, Option<String>)>,
}

#[cfg(test)]
impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}

/// Print all RISK_ORCH environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_EXECUTION_MODE    Runner for registry runs (local, docker)");
    println!("  {ENV_PREFIX}_DEMO_MODE         Use synthetic tests and skip learning (true/false)");
    println!("  {ENV_PREFIX}_DATA_DIR          Directory holding registry.json");
    println!("  {ENV_PREFIX}_RISK_SERVICE_URL  Base URL of the remote prioritization service");
    println!("  {ENV_PREFIX}_CONFIG            Path to configuration file");
    println!("  {ENV_PREFIX}_CI                Exit non-zero when any test fails (true/false)");
    println!("  {ENV_PREFIX}_COMMIT            Commit recorded on project runs (default: GITHUB_SHA)");
    println!("  {ENV_PREFIX}_BRANCH            Branch recorded on project runs (default: GITHUB_REF_NAME)");
    println!("  RUST_LOG                      Log filter, e.g. risk_orchestrator=debug");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_EXECUTION_MODE=docker");
    println!("  export {ENV_PREFIX}_RISK_SERVICE_URL=http://localhost:8000");
    println!("  risk-orchestrator run");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_config_default() {
        let config = EnvConfig::default();
        assert!(config.execution_mode.is_none());
        assert!(!config.has_any());
        assert!(!config.ci_or(false));
    }

    #[test]
    fn test_env_builder() {
        let _guard = EnvBuilder::new()
            .var("EXECUTION_MODE", "docker")
            .var("RISK_SERVICE_URL", "http://risk:8000")
            .var("DEMO_MODE", "yes")
            .apply_scoped();

        let config = EnvConfig::load();
        assert_eq!(config.execution_mode.as_deref(), Some("docker"));
        assert_eq!(config.risk_service_url.as_deref(), Some("http://risk:8000"));
        assert_eq!(config.demo_mode, Some(true));
        assert!(config.has_any());
    }

    #[test]
    fn test_commit_and_branch() {
        let _guard = EnvBuilder::new()
            .var("COMMIT", "abc123")
            .raw_var("GITHUB_SHA", "def456")
            .raw_var("GITHUB_REF_NAME", "release/1.2")
            .apply_scoped();

        let config = EnvConfig::load();
        assert_eq!(config.commit_id.as_deref(), Some("abc123"));
        assert_eq!(config.branch.as_deref(), Some("release/1.2"));
    }

    #[test]
    fn test_empty_value_is_unset() {
        let _guard = EnvBuilder::new().var("DATA_DIR", "").apply_scoped();
        assert!(EnvConfig::load().data_dir.is_none());
    }
}
