//! Configuration file and command-line settings.
//!
//! Precedence: command-line flags, then `config.toml`, then defaults.

use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const APP_DIR: &str = "agent-panels";
const CONFIG_FILE: &str = "config.toml";
const LOG_FILE: &str = "agent-panels.log";
const DEFAULT_TICK_MS: u64 = 100;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Command-line arguments
#[derive(Debug, Default, Parser)]
#[command(name = "agent-panels", version, about = "Session and event panels for AI coding agents")]
pub struct Cli {
    /// Path to config.toml
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Host command to spawn (JSON lines on stdin/stdout)
    #[arg(long)]
    pub host: Option<String>,

    /// Repository the panels are scoped to
    #[arg(long)]
    pub repo: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Print the tool descriptors as JSON and exit
    #[arg(long)]
    pub list_tools: bool,

    /// Arguments passed to the host command
    #[arg(last = true)]
    pub host_args: Vec<String>,
}

/// Raw shape of config.toml. Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub host: HostSection,
    pub ui: UiSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HostSection {
    pub command: Option<String>,
    pub args: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UiSection {
    pub repository: Option<String>,
    pub tick_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: Option<String>,
    pub file: Option<PathBuf>,
}

impl FileConfig {
    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Resolved settings the application runs with
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub host_command: Option<String>,
    pub host_args: Vec<String>,
    pub repository: Option<String>,
    pub tick_ms: u64,
    pub log_level: String,
    pub log_file: PathBuf,
}

impl Settings {
    /// Merge CLI flags over the file config
    pub fn resolve(cli: &Cli, file: FileConfig) -> Self {
        let host_command = cli.host.clone().or(file.host.command);
        let host_args = if cli.host.is_some() || !cli.host_args.is_empty() {
            cli.host_args.clone()
        } else {
            file.host.args
        };

        let repository = cli
            .repo
            .clone()
            .or(file.ui.repository)
            .or_else(current_dir);

        let log_level = if cli.debug {
            "debug".to_string()
        } else {
            file.logging
                .level
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
        };

        Self {
            host_command,
            host_args,
            repository,
            tick_ms: file.ui.tick_ms.unwrap_or(DEFAULT_TICK_MS).max(10),
            log_level,
            log_file: file.logging.file.unwrap_or_else(default_log_file),
        }
    }
}

fn current_dir() -> Option<String> {
    std::env::current_dir()
        .ok()
        .map(|p| p.to_string_lossy().to_string())
}

/// `<config_dir>/agent-panels/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CONFIG_FILE)
}

fn default_log_file() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
        .join(LOG_FILE)
}
