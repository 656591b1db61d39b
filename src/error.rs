use std::path::PathBuf;
use thiserror::Error;

/// Failures loading the configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Failures talking to the host process
#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to spawn host '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("host process has no {0} pipe")]
    MissingPipe(&'static str),

    #[error("failed to encode panel event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("host I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures dispatching a tool invocation
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid input for tool '{tool}': {source}")]
    InvalidInput {
        tool: String,
        #[source]
        source: serde_json::Error,
    },
}
