use crate::error::{DeployError, Result};
use crate::executor::{DeployCapability, HttpCapability, SimulatedCapability};
use crate::observability::LogFormat;
use crate::registry::{self, Registry};
use crate::resilience::ExponentialBackoffRetry;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

pub const DEFAULT_CONFIG_FILE: &str = "deploy.toml";
pub const DEFAULT_STORE_PATH: &str = ".deploy/state.db";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityKind {
    #[default]
    Simulated,
    Http,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityConfig {
    pub kind: CapabilityKind,
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            kind: CapabilityKind::Simulated,
            endpoint: None,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
        }
    }
}

/// Orchestrator settings: defaults, then file, then environment, then command-line flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Empty means every registered artifact.
    pub targets: Vec<String>,
    pub store: PathBuf,
    pub dry_run: bool,
    /// Registry manifest; the built-in suite when unset.
    pub registry: Option<PathBuf>,
    pub capability: CapabilityConfig,
    pub retry: RetryConfig,
    pub log_format: LogFormat,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            store: PathBuf::from(DEFAULT_STORE_PATH),
            dry_run: false,
            registry: None,
            capability: CapabilityConfig::default(),
            retry: RetryConfig::default(),
            log_format: LogFormat::default(),
        }
    }
}

impl DeployConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| DeployError::InvalidConfig(e.to_string()))
    }

    /// Load from `path`, or from `deploy.toml` in the working directory if it exists.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = fs::read_to_string(&path).await.map_err(|e| {
            DeployError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Self::from_toml(&content)
    }

    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply `DEPLOY_STORE`, `DEPLOY_ENDPOINT` and `DEPLOY_TARGETS` (comma separated).
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(store) = lookup("DEPLOY_STORE") {
            self.store = PathBuf::from(store);
        }
        if let Some(endpoint) = lookup("DEPLOY_ENDPOINT") {
            self.capability.kind = CapabilityKind::Http;
            self.capability.endpoint = Some(endpoint);
        }
        if let Some(targets) = lookup("DEPLOY_TARGETS") {
            self.targets = targets
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(DeployError::InvalidConfig(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.retry.initial_delay_ms > self.retry.max_delay_ms {
            return Err(DeployError::InvalidConfig(
                "retry.initial_delay_ms exceeds retry.max_delay_ms".into(),
            ));
        }
        if self.capability.kind == CapabilityKind::Http
            && self.capability.endpoint.as_deref().map_or(true, str::is_empty)
        {
            return Err(DeployError::InvalidConfig(
                "capability.kind = \"http\" requires capability.endpoint".into(),
            ));
        }
        if self.store.as_os_str().is_empty() {
            return Err(DeployError::InvalidConfig("store path is empty".into()));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> ExponentialBackoffRetry {
        ExponentialBackoffRetry::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.initial_delay_ms),
            Duration::from_millis(self.retry.max_delay_ms),
        )
    }

    pub fn build_capability(&self) -> Result<Box<dyn DeployCapability>> {
        match (self.capability.kind, self.capability.endpoint.as_deref()) {
            (CapabilityKind::Simulated, _) => Ok(Box::new(SimulatedCapability::new())),
            (CapabilityKind::Http, Some(endpoint)) => Ok(Box::new(HttpCapability::new(
                endpoint,
                Duration::from_secs(self.capability.timeout_secs),
            )?)),
            (CapabilityKind::Http, None) => Err(DeployError::InvalidConfig(
                "capability.kind = \"http\" requires capability.endpoint".into(),
            )),
        }
    }

    pub async fn load_registry(&self) -> Result<Registry> {
        match &self.registry {
            Some(path) => registry::load_manifest(path).await,
            None => registry::hotdog_suite(),
        }
    }

    /// Configured targets, or every registered artifact when none are set.
    pub fn effective_targets(&self, registry: &Registry) -> Vec<String> {
        if self.targets.is_empty() {
            registry.names().map(String::from).collect()
        } else {
            self.targets.clone()
        }
    }
}
