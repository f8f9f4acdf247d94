//! Explorer configuration with TOML file support.

use std::path::Path;

use serde::{Deserialize, Serialize};

use fedelect_types::ProcessListLocation;

use crate::ExplorerError;

/// Configuration for an exploration run.
///
/// Can be loaded from a TOML file via [`ExplorerConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorerConfig {
    /// Number of federated servers.
    #[serde(default = "default_federated")]
    pub federated: u32,

    /// Number of audit servers, each of which volunteers.
    #[serde(default = "default_audits")]
    pub audits: u32,

    /// Maximum search depth.
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Whether emitted messages join the pending set.
    #[serde(default = "default_true")]
    pub fan_out: bool,

    /// Prune states already searched from the same or a shallower depth.
    #[serde(default = "default_true")]
    pub mirrors: bool,

    /// Split the root of the search across rayon workers.
    #[serde(default)]
    pub parallel: bool,

    /// Give every participant an Ed25519 key and sign everything it sends.
    #[serde(default)]
    pub signed: bool,

    /// Log progress every this many dives; 0 disables.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    // The stalled slot.
    #[serde(default)]
    pub vm: u32,

    #[serde(default)]
    pub minute: u32,

    #[serde(default = "default_height")]
    pub height: u64,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_federated() -> u32 {
    3
}

fn default_audits() -> u32 {
    2
}

fn default_limit() -> usize {
    6
}

fn default_true() -> bool {
    true
}

fn default_progress_interval() -> u64 {
    100_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_height() -> u64 {
    10
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ExplorerConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ExplorerError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ExplorerError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ExplorerError> {
        toml::from_str(s).map_err(|e| ExplorerError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ExplorerError> {
        toml::to_string_pretty(self).map_err(|e| ExplorerError::Config(e.to_string()))
    }

    pub fn location(&self) -> ProcessListLocation {
        ProcessListLocation::new(self.vm, self.minute, self.height)
    }

    /// Reject settings that leave nothing to elect.
    pub fn validate(&self) -> Result<(), ExplorerError> {
        if self.federated == 0 {
            return Err(ExplorerError::NoParticipants);
        }
        if self.audits == 0 {
            return Err(ExplorerError::Config(
                "at least one audit server is required".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            federated: default_federated(),
            audits: default_audits(),
            limit: default_limit(),
            fan_out: default_true(),
            mirrors: default_true(),
            parallel: false,
            signed: false,
            progress_interval: default_progress_interval(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            vm: 0,
            minute: 0,
            height: default_height(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = ExplorerConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = ExplorerConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = ExplorerConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.federated, 3);
        assert_eq!(config.audits, 2);
        assert_eq!(config.limit, 6);
        assert!(config.fan_out);
        assert!(config.mirrors);
        assert!(!config.parallel);
        assert_eq!(config.log_format, "human");
        assert_eq!(config.location(), ProcessListLocation::new(0, 0, 10));
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            federated = 5
            limit = 9
            fan_out = false
            mirrors = false
        "#;
        let config = ExplorerConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.federated, 5);
        assert_eq!(config.limit, 9);
        assert!(!config.fan_out);
        assert!(!config.mirrors);
        assert_eq!(config.audits, 2); // default
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "audits = 1\nheight = 42").unwrap();
        let config = ExplorerConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.audits, 1);
        assert_eq!(config.location().height, 42);
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = ExplorerConfig::from_toml_file(Path::new("/nonexistent/explore.toml"));
        assert!(matches!(result, Err(ExplorerError::Config(_))));
    }

    #[test]
    fn validation_requires_participants() {
        let mut config = ExplorerConfig::default();
        assert!(config.validate().is_ok());
        config.audits = 0;
        assert!(matches!(config.validate(), Err(ExplorerError::Config(_))));
        config.federated = 0;
        assert!(matches!(config.validate(), Err(ExplorerError::NoParticipants)));
    }
}
