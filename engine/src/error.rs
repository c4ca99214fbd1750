use std::path::PathBuf;
use thiserror::Error;

/// Caller input rejected before any probe is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("api key is missing or empty")]
    MissingKey,
    #[error("no services requested")]
    NoServices,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("a probe is already in flight")]
    Busy,
    #[error("api key is missing or empty")]
    MissingKey,
    #[error("unknown service '{0}'")]
    UnknownService(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {field} {reason}")]
    Invalid { field: &'static str, reason: &'static str },
    #[error("invalid value for {name}: {value}")]
    Env { name: &'static str, value: String },
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
