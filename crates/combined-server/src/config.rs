//! # Configuration
//!
//! Layered configuration, lowest precedence first:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. TOML file (`--config <path>` or `COMBINED_CONFIG`)
//! 3. Environment overrides (`COMBINED_*`, see [`Config::apply_overrides`])
//! 4. CLI flags, applied by the binary
//!
//! ```toml
//! [master]
//! listen_addr = "0.0.0.0:5678"
//!
//! [log_service]
//! log_dir = "/var/log/workflow"
//!
//! [startup]
//! on_failure = "stop_started"
//! ```

use role_framework::FailurePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub persistence: PersistenceConfig,
    pub master: MasterConfig,
    pub worker: WorkerConfig,
    pub log_service: LogServiceConfig,
    pub alert: AlertConfig,
    pub startup: StartupConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Process-state backend. Only `memory` ships with this build.
    pub backend: String,
    /// Alert-state backend.
    pub alert_backend: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            alert_backend: "memory".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterConfig {
    pub listen_addr: String,
    pub heartbeat_interval_ms: u64,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:5678".to_string(),
            heartbeat_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub listen_addr: String,
    /// Name recorded on every task this worker claims.
    pub host: String,
    pub heartbeat_interval_ms: u64,
    pub fetch_interval_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:1234".to_string(),
            host: "localhost".to_string(),
            heartbeat_interval_ms: 1000,
            fetch_interval_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogServiceConfig {
    pub listen_addr: String,
    pub log_dir: PathBuf,
}

impl Default for LogServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:50051".to_string(),
            log_dir: PathBuf::from("logs"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub poll_interval_ms: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
        }
    }
}

/// What happens to started roles when a later role fails to start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnFailure {
    /// Exit without touching started roles.
    #[default]
    Exit,
    /// Stop started roles in reverse order, then exit.
    StopStarted,
}

impl From<OnFailure> for FailurePolicy {
    fn from(value: OnFailure) -> Self {
        match value {
            OnFailure::Exit => FailurePolicy::Exit,
            OnFailure::StopStarted => FailurePolicy::StopStarted,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartupConfig {
    pub on_failure: OnFailure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load defaults, then the optional file, then process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply `COMBINED_*` overrides from `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("COMBINED_MASTER_ADDR") {
            self.master.listen_addr = v;
        }
        if let Some(v) = lookup("COMBINED_WORKER_ADDR") {
            self.worker.listen_addr = v;
        }
        if let Some(v) = lookup("COMBINED_LOG_ADDR") {
            self.log_service.listen_addr = v;
        }
        if let Some(v) = lookup("COMBINED_LOG_DIR") {
            self.log_service.log_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("COMBINED_LOG_LEVEL") {
            self.logging.level = v;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let addrs = [
            ("master.listen_addr", &self.master.listen_addr),
            ("worker.listen_addr", &self.worker.listen_addr),
            ("log_service.listen_addr", &self.log_service.listen_addr),
        ];
        for (key, value) in addrs {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{key} must not be empty")));
            }
        }

        let intervals = [
            ("master.heartbeat_interval_ms", self.master.heartbeat_interval_ms),
            ("worker.heartbeat_interval_ms", self.worker.heartbeat_interval_ms),
            ("worker.fetch_interval_ms", self.worker.fetch_interval_ms),
            ("alert.poll_interval_ms", self.alert.poll_interval_ms),
        ];
        for (key, value) in intervals {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{key} must be greater than 0")));
            }
        }

        if self.worker.host.trim().is_empty() {
            return Err(ConfigError::Invalid("worker.host must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let config = Config::from_toml(
            r#"
            [master]
            listen_addr = "0.0.0.0:9000"

            [startup]
            on_failure = "stop_started"
            "#,
        )
        .unwrap();

        assert_eq!(config.master.listen_addr, "0.0.0.0:9000");
        assert_eq!(config.master.heartbeat_interval_ms, 1000);
        assert_eq!(config.worker, WorkerConfig::default());
        assert_eq!(config.startup.on_failure, OnFailure::StopStarted);
    }

    #[test]
    fn unknown_failure_policy_is_a_parse_error() {
        let err = Config::from_toml("[startup]\non_failure = \"retry\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn env_overrides_take_precedence_over_file() {
        let mut config = Config::from_toml("[log_service]\nlog_dir = \"/from/file\"").unwrap();
        let env: HashMap<&str, &str> = [
            ("COMBINED_LOG_DIR", "/from/env"),
            ("COMBINED_WORKER_ADDR", "127.0.0.1:0"),
        ]
        .into_iter()
        .collect();

        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.log_service.log_dir, PathBuf::from("/from/env"));
        assert_eq!(config.worker.listen_addr, "127.0.0.1:0");
        assert_eq!(config.master, MasterConfig::default());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut config = Config::default();
        config.alert.poll_interval_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("alert.poll_interval_ms"));
    }

    #[test]
    fn empty_address_is_rejected() {
        let mut config = Config::default();
        config.worker.listen_addr = "  ".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rendered_config_parses_back() {
        let config = Config::default();
        let rendered = config.to_toml().unwrap();
        assert_eq!(Config::from_toml(&rendered).unwrap(), config);
    }

    #[test]
    fn reads_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[alert]\npoll_interval_ms = 250").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.alert.poll_interval_ms, 250);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Config::from_file(Path::new("/nonexistent/combined.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/combined.toml"));
    }
}
