// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Agent Host Configuration
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) for processes that
// host Agent aggregates:
// - history retention applied to newly created agents
// - storage backend selection (in-memory or PostgreSQL)
// - optimistic concurrency retry budget
// - event bus sizing and logging

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::domain::repository::{PostgresConfig, StorageBackend};
use crate::domain::state::DEFAULT_MAX_HISTORY_SIZE;

pub const API_VERSION: &str = "agent-host/v1";
pub const KIND: &str = "AgentHostConfig";

/// Top-level agent host configuration manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentHostConfig {
    /// API version (must be "agent-host/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "AgentHostConfig")
    pub kind: String,

    pub metadata: ConfigMetadata,

    #[serde(default)]
    pub spec: AgentHostSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentHostSpec {
    #[serde(default)]
    pub agents: AgentsConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub concurrency: ConcurrencyConfig,

    #[serde(default)]
    pub event_bus: EventBusConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentsConfig {
    /// Finished sessions kept per agent
    #[serde(default = "default_max_history_size")]
    pub max_history_size: usize,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            max_history_size: DEFAULT_MAX_HISTORY_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackendKind {
    #[default]
    InMemory,
    Postgres,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackendKind,

    /// Required when `backend` is `postgres`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Attempts made by the service when a save hits a version conflict
    #[serde(default = "default_max_save_retries")]
    pub max_save_retries: u32,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_save_retries: default_max_save_retries(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventBusConfig {
    #[serde(default = "default_event_bus_capacity")]
    pub capacity: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_bus_capacity(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub level: String,

    /// compact or json
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_max_history_size() -> usize {
    DEFAULT_MAX_HISTORY_SIZE
}

fn default_max_save_retries() -> u32 {
    3
}

fn default_event_bus_capacity() -> usize {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

impl Default for AgentHostConfig {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ConfigMetadata {
                name: "agent-host".to_string(),
                labels: None,
            },
            spec: AgentHostSpec::default(),
        }
    }
}

impl AgentHostConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. AGENT_HOST_CONFIG_PATH environment variable
    /// 2. ./agent-host-config.yaml (working directory)
    /// 3. ~/.agent-host/config.yaml (user home)
    /// 4. /etc/agent-host/config.yaml (system, Unix) or C:\ProgramData\AgentHost\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("AGENT_HOST_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./agent-host-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".agent-host").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/agent-host/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\AgentHost\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let mut config = if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            Self::from_yaml_file(config_path)?
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Same as [`apply_env_overrides`](Self::apply_env_overrides) with an
    /// injected variable lookup.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("AGENT_HOST_MAX_HISTORY_SIZE") {
            match val.trim().parse::<usize>() {
                Ok(size) if size > 0 => {
                    tracing::info!("Environment override: AGENT_HOST_MAX_HISTORY_SIZE={}", size);
                    self.spec.agents.max_history_size = size;
                }
                _ => {
                    tracing::warn!(
                        "Invalid value for AGENT_HOST_MAX_HISTORY_SIZE: '{}'. Expected a positive integer. Ignoring.",
                        val
                    );
                }
            }
        }

        if let Some(url) = lookup("AGENT_HOST_DATABASE_URL") {
            tracing::info!("Environment override: AGENT_HOST_DATABASE_URL (storage backend set to postgres)");
            self.spec.storage.backend = StorageBackendKind::Postgres;
            self.spec.storage.connection_string = Some(url);
        }

        if let Some(level) = lookup("AGENT_HOST_LOG_LEVEL") {
            tracing::info!("Environment override: AGENT_HOST_LOG_LEVEL={}", level);
            self.spec.observability.logging.level = level;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.agents.max_history_size == 0 {
            anyhow::bail!("spec.agents.max_history_size must be at least 1");
        }

        if self.spec.concurrency.max_save_retries == 0 {
            anyhow::bail!("spec.concurrency.max_save_retries must be at least 1");
        }

        if self.spec.event_bus.capacity == 0 {
            anyhow::bail!("spec.event_bus.capacity must be at least 1");
        }

        if self.spec.storage.backend == StorageBackendKind::Postgres
            && self
                .spec
                .storage
                .connection_string
                .as_deref()
                .map(str::is_empty)
                .unwrap_or(true)
        {
            anyhow::bail!("spec.storage.connection_string is required for the postgres backend");
        }

        let format = self.spec.observability.logging.format.as_str();
        if format != "compact" && format != "json" {
            anyhow::bail!(
                "Invalid spec.observability.logging.format: '{}'. Must be 'compact' or 'json'",
                format
            );
        }

        Ok(())
    }

    /// Backend selection for the repository factory.
    pub fn storage_backend(&self) -> StorageBackend {
        match self.spec.storage.backend {
            StorageBackendKind::InMemory => StorageBackend::InMemory,
            StorageBackendKind::Postgres => StorageBackend::PostgreSQL(PostgresConfig {
                connection_string: self.spec.storage.connection_string.clone().unwrap_or_default(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AgentHostConfig::default();
        assert_eq!(config.api_version, API_VERSION);
        assert_eq!(config.kind, KIND);
        assert_eq!(config.spec.agents.max_history_size, DEFAULT_MAX_HISTORY_SIZE);
        assert_eq!(config.spec.concurrency.max_save_retries, 3);
        assert_eq!(config.storage_backend(), StorageBackend::InMemory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let yaml = r#"
apiVersion: agent-host/v1
kind: AgentHostConfig
metadata:
  name: edge-1
"#;
        let config = AgentHostConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.metadata.name, "edge-1");
        assert_eq!(config.spec.event_bus.capacity, 1000);
        assert_eq!(config.spec.observability.logging.format, "compact");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_postgres_backend() {
        let yaml = r#"
apiVersion: agent-host/v1
kind: AgentHostConfig
metadata:
  name: prod
spec:
  agents:
    max_history_size: 50
  storage:
    backend: postgres
    connection_string: postgres://agents@localhost/agents
"#;
        let config = AgentHostConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.spec.agents.max_history_size, 50);
        assert_eq!(
            config.storage_backend(),
            StorageBackend::PostgreSQL(PostgresConfig {
                connection_string: "postgres://agents@localhost/agents".to_string()
            })
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut config = AgentHostConfig::default();

        config.api_version = "wrong/v1".to_string();
        assert!(config.validate().is_err());
        config.api_version = API_VERSION.to_string();

        config.kind = "NodeConfig".to_string();
        assert!(config.validate().is_err());
        config.kind = KIND.to_string();

        config.spec.agents.max_history_size = 0;
        assert!(config.validate().is_err());
        config.spec.agents.max_history_size = 1;

        config.spec.concurrency.max_save_retries = 0;
        assert!(config.validate().is_err());
        config.spec.concurrency.max_save_retries = 1;

        config.spec.event_bus.capacity = 0;
        assert!(config.validate().is_err());
        config.spec.event_bus.capacity = 16;

        config.spec.storage.backend = StorageBackendKind::Postgres;
        assert!(config.validate().is_err());
        config.spec.storage.connection_string = Some("postgres://localhost/agents".to_string());
        assert!(config.validate().is_ok());

        config.spec.observability.logging.format = "pretty".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let vars = HashMap::from([
            ("AGENT_HOST_MAX_HISTORY_SIZE", "7"),
            ("AGENT_HOST_DATABASE_URL", "postgres://db/agents"),
            ("AGENT_HOST_LOG_LEVEL", "debug"),
        ]);
        let mut config = AgentHostConfig::default();
        config.apply_overrides_from(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.spec.agents.max_history_size, 7);
        assert_eq!(config.spec.storage.backend, StorageBackendKind::Postgres);
        assert_eq!(config.spec.storage.connection_string.as_deref(), Some("postgres://db/agents"));
        assert_eq!(config.spec.observability.logging.level, "debug");
    }

    #[test]
    fn test_invalid_override_is_ignored() {
        let mut config = AgentHostConfig::default();
        config.apply_overrides_from(|k| (k == "AGENT_HOST_MAX_HISTORY_SIZE").then(|| "lots".to_string()));
        assert_eq!(config.spec.agents.max_history_size, DEFAULT_MAX_HISTORY_SIZE);

        config.apply_overrides_from(|k| (k == "AGENT_HOST_MAX_HISTORY_SIZE").then(|| "0".to_string()));
        assert_eq!(config.spec.agents.max_history_size, DEFAULT_MAX_HISTORY_SIZE);
        assert!(config.validate().is_ok());
    }
}
