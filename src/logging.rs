use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Initialize logging to `file`.
///
/// The terminal belongs to the TUI, so nothing is written to stderr.
/// `RUST_LOG` takes priority over `level`.
pub fn init(level: &str, file: &Path) -> Result<()> {
    if let Some(parent) = file.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(file)
        .with_context(|| format!("Failed to open log file {}", file.display()))?;

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .with_target(true)
        .init();

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        log_file = %file.display(),
        "Logging initialized"
    );
    Ok(())
}
