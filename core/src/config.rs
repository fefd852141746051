//! Desk configuration: where the rule engine lives and how long it may run.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default bound on a single engine invocation.
pub const DEFAULT_ENGINE_TIMEOUT_MS: u64 = 5_000;

/// Upper bound on any configured engine timeout (one day).
pub const MAX_ENGINE_TIMEOUT_MS: u64 = 24 * 60 * 60 * 1_000;

pub const DEFAULT_ENGINE_BINARY: &str = "swipl";
pub const DEFAULT_POLICY_FILE: &str = "goal_based_atm.pl";

/// Name of the config file inside the data directory.
pub const CONFIG_FILE_NAME: &str = "desk.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Executable of the rule engine, resolved through PATH.
    #[serde(default = "default_binary")]
    pub binary: String,
    /// Arguments placed before `-s <policy>`, for wrapper launchers.
    #[serde(default)]
    pub prefix_args: Vec<String>,
    /// Policy definition loaded by the engine with `-s`.
    #[serde(default = "default_policy_file")]
    pub policy_file: PathBuf,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_binary() -> String {
    DEFAULT_ENGINE_BINARY.to_string()
}

fn default_policy_file() -> PathBuf {
    PathBuf::from(DEFAULT_POLICY_FILE)
}

fn default_timeout_ms() -> u64 {
    DEFAULT_ENGINE_TIMEOUT_MS
}

impl EngineConfig {
    /// Configured timeout, capped at `MAX_ENGINE_TIMEOUT_MS`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.min(MAX_ENGINE_TIMEOUT_MS))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary:      default_binary(),
            prefix_args: Vec::new(),
            policy_file: default_policy_file(),
            timeout_ms:  default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DeskConfig {
    #[serde(default)]
    pub engine: EngineConfig,
}

impl DeskConfig {
    /// Load `desk.json` from the data directory.
    /// A relative policy path is resolved against `data_dir`.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = Path::new(data_dir).join(CONFIG_FILE_NAME);
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        let mut config: DeskConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {}: {e}", path.display()))?;
        config.resolve_policy(data_dir);
        Ok(config)
    }

    /// Like `load`, but falls back to `default_local` when the data
    /// directory has no `desk.json`.
    pub fn load_or_default(data_dir: &str) -> anyhow::Result<Self> {
        if Path::new(data_dir).join(CONFIG_FILE_NAME).exists() {
            Self::load(data_dir)
        } else {
            log::info!("no {CONFIG_FILE_NAME} in {data_dir}, using defaults");
            Ok(Self::default_local(data_dir))
        }
    }

    /// Defaults: `swipl` on PATH, the policy beside the data directory,
    /// five-second timeout.
    pub fn default_local(data_dir: &str) -> Self {
        let mut config = Self::default();
        config.resolve_policy(data_dir);
        config
    }

    fn resolve_policy(&mut self, data_dir: &str) {
        if self.engine.policy_file.is_relative() {
            self.engine.policy_file = Path::new(data_dir).join(&self.engine.policy_file);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_fills_defaults() {
        let config: DeskConfig =
            serde_json::from_str(r#"{ "engine": { "timeout_ms": 250 } }"#).unwrap();
        assert_eq!(config.engine.binary, "swipl");
        assert_eq!(config.engine.timeout(), Duration::from_millis(250));
        assert!(config.engine.prefix_args.is_empty());
    }

    #[test]
    fn huge_timeout_is_capped() {
        let config: DeskConfig = serde_json::from_str(
            r#"{ "engine": { "timeout_ms": 18446744073709551615 } }"#,
        )
        .unwrap();
        assert_eq!(config.engine.timeout(), Duration::from_millis(MAX_ENGINE_TIMEOUT_MS));
    }

    #[test]
    fn relative_policy_is_resolved_against_data_dir() {
        let config = DeskConfig::default_local("/srv/desk");
        assert_eq!(
            config.engine.policy_file,
            PathBuf::from("/srv/desk/goal_based_atm.pl")
        );
        assert_eq!(config.engine.timeout_ms, DEFAULT_ENGINE_TIMEOUT_MS);
    }

    #[test]
    fn absolute_policy_is_kept() {
        let mut config: DeskConfig = serde_json::from_str(
            r#"{ "engine": { "policy_file": "/opt/rules/atm.pl" } }"#,
        )
        .unwrap();
        config.resolve_policy("./data");
        assert_eq!(config.engine.policy_file, PathBuf::from("/opt/rules/atm.pl"));
    }

    #[test]
    fn load_reports_missing_file_path() {
        let err = DeskConfig::load("/nonexistent/desk-dir").unwrap_err();
        assert!(
            err.to_string().contains("desk.json"),
            "error should name the file: {err}"
        );
    }
}
