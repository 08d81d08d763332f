//! Configuration module
//!
//! Handles loading and managing configuration. The orchestrator receives an
//! [`AppConfig`] snapshot per run; nothing here is global.

pub mod env;
mod file;

pub use env::EnvConfig;
pub use file::ConfigFile;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Image used by the container runner by default
pub const DEFAULT_IMAGE: &str = "risk-orchestrator-runner:latest";

/// Runner selected for registry runs
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Local,
    Docker,
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(ExecutionMode::Local),
            "docker" => Ok(ExecutionMode::Docker),
            _ => Err(format!(
                "Invalid execution mode '{s}'. Must be \"local\" or \"docker\"."
            )),
        }
    }
}

impl ExecutionMode {
    /// Parse, rejecting anything outside the enumerated modes
    pub fn parse(s: &str) -> Result<Self> {
        s.parse().map_err(anyhow::Error::msg)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Local => "local",
            ExecutionMode::Docker => "docker",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the docker runner produces outcomes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStrategy {
    /// Synthesized container lifecycle with random outcomes
    #[default]
    Simulated,
    /// One external process per test; exit status decides the outcome
    Process,
}

impl FromStr for ContainerStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simulated" | "sim" => Ok(ContainerStrategy::Simulated),
            "process" | "real" => Ok(ContainerStrategy::Process),
            _ => Err(format!(
                "Invalid container strategy '{s}'. Must be \"simulated\" or \"process\"."
            )),
        }
    }
}

impl ContainerStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerStrategy::Simulated => "simulated",
            ContainerStrategy::Process => "process",
        }
    }
}

/// Application configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Runner for registry runs
    pub execution_mode: ExecutionMode,

    /// Substitute synthetic tests and skip learning updates
    pub demo_mode: bool,

    /// Directory holding the registry file
    pub data_dir: Option<String>,

    /// External prioritization service
    pub risk_service: RiskServiceConfig,

    /// Docker runner settings
    pub container: ContainerConfig,

    /// Project integrator pacing
    pub integrator: IntegratorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            execution_mode: ExecutionMode::Local,
            demo_mode: false,
            data_dir: None,
            risk_service: RiskServiceConfig::default(),
            container: ContainerConfig::default(),
            integrator: IntegratorConfig::default(),
        }
    }
}

/// Remote risk service configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskServiceConfig {
    /// Base URL; ranking is local when unset
    pub url: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RiskServiceConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: 5,
        }
    }
}

/// Docker runner configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    pub strategy: ContainerStrategy,

    /// Image named in simulated lifecycle logs
    pub image: String,

    /// Program spawned per test by the process strategy
    pub command: String,

    /// Arguments passed verbatim to `command`
    pub args: Vec<String>,

    /// Processes allowed to run at once
    pub max_concurrent: usize,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            strategy: ContainerStrategy::Simulated,
            image: DEFAULT_IMAGE.to_string(),
            command: "docker".to_string(),
            args: [
                "run",
                "--rm",
                "-e",
                "TEST_NAME",
                "-e",
                "FILE_PATH",
                "-e",
                "FAILURE_RATE",
                DEFAULT_IMAGE,
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            max_concurrent: 1,
        }
    }
}

/// Project integrator configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegratorConfig {
    /// Placeholder latency of the source sync phase
    pub sync_delay_ms: u64,

    /// Pause between sequential test executions
    pub step_delay_ms: u64,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            sync_delay_ms: 400,
            step_delay_ms: 100,
        }
    }
}

impl AppConfig {
    /// Overlay environment overrides
    pub fn with_env(mut self, env: &EnvConfig) -> Result<Self> {
        if let Some(mode) = &env.execution_mode {
            self.execution_mode = ExecutionMode::parse(mode)?;
        }
        if let Some(demo) = env.demo_mode {
            self.demo_mode = demo;
        }
        if let Some(dir) = &env.data_dir {
            self.data_dir = Some(dir.clone());
        }
        if let Some(url) = &env.risk_service_url {
            self.risk_service.url = Some(url.clone());
        }
        Ok(self)
    }

    /// Validated update of a single key
    ///
    /// The configuration is left untouched when the value is rejected.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "execution_mode" => self.execution_mode = ExecutionMode::parse(value)?,
            "demo_mode" => self.demo_mode = parse_bool(value)?,
            "data_dir" => self.data_dir = Some(value.to_string()),
            "risk_service.url" => {
                self.risk_service.url = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                }
            }
            "risk_service.timeout_secs" => self.risk_service.timeout_secs = value.parse()?,
            "container.strategy" => {
                self.container.strategy = value.parse().map_err(anyhow::Error::msg)?
            }
            "container.image" => self.container.image = value.to_string(),
            "container.command" => self.container.command = value.to_string(),
            "container.max_concurrent" => {
                let n: usize = value.parse()?;
                if n == 0 {
                    anyhow::bail!("container.max_concurrent must be at least 1");
                }
                self.container.max_concurrent = n;
            }
            "integrator.sync_delay_ms" => self.integrator.sync_delay_ms = value.parse()?,
            "integrator.step_delay_ms" => self.integrator.step_delay_ms = value.parse()?,
            _ => anyhow::bail!("Unknown configuration key: {key}"),
        }
        Ok(())
    }

    /// Read a single key as text
    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "execution_mode" => self.execution_mode.to_string(),
            "demo_mode" => self.demo_mode.to_string(),
            "data_dir" => self.data_dir.clone().unwrap_or_default(),
            "risk_service.url" => self.risk_service.url.clone().unwrap_or_default(),
            "risk_service.timeout_secs" => self.risk_service.timeout_secs.to_string(),
            "container.strategy" => self.container.strategy.as_str().to_string(),
            "container.image" => self.container.image.clone(),
            "container.command" => self.container.command.clone(),
            "container.max_concurrent" => self.container.max_concurrent.to_string(),
            "integrator.sync_delay_ms" => self.integrator.sync_delay_ms.to_string(),
            "integrator.step_delay_ms" => self.integrator.step_delay_ms.to_string(),
            _ => anyhow::bail!("Unknown configuration key: {key}"),
        };
        Ok(value)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.container.max_concurrent == 0 {
            anyhow::bail!("container.max_concurrent must be at least 1");
        }
        if self.risk_service.timeout_secs == 0 {
            anyhow::bail!("risk_service.timeout_secs must be at least 1");
        }
        if self.container.strategy == ContainerStrategy::Process && self.container.command.is_empty() {
            anyhow::bail!("container.command is required for the process strategy");
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Ok(true),
        "0" | "false" | "no" | "off" | "disabled" => Ok(false),
        _ => anyhow::bail!("Invalid boolean value: {value}"),
    }
}
