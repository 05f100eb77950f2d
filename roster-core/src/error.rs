//! Error types for roster-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while resolving the run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `ENVIRONMENT` (or `--env`) named something other than
    /// production / development / test.
    #[error("unknown environment '{0}'; expected: production, development, test")]
    UnknownEnvironment(String),

    /// A required key had no value after every source was merged.
    #[error("missing required config key '{key}'")]
    MissingKey { key: &'static str },

    /// Underlying I/O failure reading a config file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on a config file, with path context.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The secret payload was not a JSON object of config values.
    #[error("secret payload is not valid config JSON: {0}")]
    SecretJson(#[from] serde_json::Error),
}
