//! Engine configuration, loaded from an optional YAML file.
//!
//! Every field has a default, so an empty file (or no file at all) yields
//! the reference behavior: 10 s timeout, sequential probes, built-in
//! markers, vendor hosts.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::classifier::{self, Classifier};
use crate::error::ConfigError;
use crate::registry::ServiceRegistry;

pub const TIMEOUT_ENV: &str = "MAPKEY_TIMEOUT_SECS";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// How a batch of probes is scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMode {
    /// One probe after another, in request order.
    #[default]
    Sequential,
    /// One task per probe; results still joined in request order.
    Concurrent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Per-request timeout for outbound probes.
    pub timeout_secs: u64,
    pub mode: ProbeMode,
    /// Replaces the built-in marker list when set.
    pub error_markers: Vec<String>,
    /// Send every probe to this origin instead of the vendor host.
    pub origin_override: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            mode: ProbeMode::Sequential,
            error_markers: classifier::default_markers(),
            origin_override: None,
        }
    }
}

impl EngineConfig {
    /// `~/.config/mapkey/config.yaml` (platform equivalent).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("mapkey").join("config.yaml"))
    }

    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, the default path is used
    /// if present, otherwise defaults apply. The timeout env var wins over
    /// both.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(p) => Self::from_file(&p)?,
                None => {
                    debug!("No config file found — using defaults");
                    Self::default()
                }
            },
        };
        config.apply_env(std::env::var(TIMEOUT_ENV).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&raw).map_err(|e| match e {
            ConfigError::Yaml(source) => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        info!(path = %path.display(), "Loaded engine config");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make every request fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "timeout_secs",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }

    fn apply_env(&mut self, timeout: Option<String>) -> Result<(), ConfigError> {
        if let Some(value) = timeout {
            self.timeout_secs = value
                .trim()
                .parse()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::Env { name: TIMEOUT_ENV, value })?;
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::new(self.error_markers.clone())
    }

    pub fn registry(&self) -> ServiceRegistry {
        let registry = ServiceRegistry::builtin();
        match &self.origin_override {
            Some(origin) => registry.rebased(origin),
            None => registry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_reference_behavior() {
        let config = EngineConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.mode, ProbeMode::Sequential);
        assert_eq!(config.error_markers.len(), classifier::DEFAULT_ERROR_MARKERS.len());
        assert!(config.origin_override.is_none());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(EngineConfig::from_yaml("").unwrap(), EngineConfig::default());
        assert_eq!(EngineConfig::from_yaml("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let config = EngineConfig::from_yaml("mode: concurrent\ntimeout_secs: 3\n").unwrap();
        assert_eq!(config.mode, ProbeMode::Concurrent);
        assert_eq!(config.timeout_secs, 3);
        assert_eq!(config.error_markers, classifier::default_markers());
    }

    #[test]
    fn test_markers_and_origin_override() {
        let config = EngineConfig::from_yaml(
            "error_markers:\n  - DENIED\norigin_override: http://localhost:8080\n",
        )
        .unwrap();
        assert_eq!(config.classifier().markers(), ["DENIED".to_string()]);
        let url = config.registry().resolve("amap-webapi").unwrap().probe_url("K");
        assert!(url.starts_with("http://localhost:8080/v3/direction/walking?"));
    }

    #[test]
    fn test_from_file_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "timeout_secs: 4").unwrap();

        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.timeout_secs, 4);

        let missing = dir.path().join("nope.yaml");
        assert!(matches!(
            EngineConfig::from_file(&missing),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "mode: sideways\n").unwrap();
        assert!(matches!(
            EngineConfig::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        assert!(matches!(
            EngineConfig::from_yaml("timeout_secs: 0\n"),
            Err(ConfigError::Invalid { field: "timeout_secs", .. })
        ));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "mode: concurrent\ntimeout_secs: 0\n").unwrap();
        assert!(matches!(
            EngineConfig::from_file(&path),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(EngineConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn test_env_timeout_override() {
        let mut config = EngineConfig::default();
        config.apply_env(Some("25".into())).unwrap();
        assert_eq!(config.timeout_secs, 25);

        assert!(config.apply_env(Some("0".into())).is_err());
        assert!(config.apply_env(Some("soon".into())).is_err());
        config.apply_env(None).unwrap();
        assert_eq!(config.timeout_secs, 25);
    }
}
