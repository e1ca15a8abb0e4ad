use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Where log output goes.
pub enum LogTarget {
    Stderr,
    /// The TUI owns the terminal, so it logs to a file instead.
    File(PathBuf),
}

/// Default log file for TUI sessions.
pub fn default_log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join("clinical-assistant").join("clinical-assistant.log"))
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))
}

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the `info` default.
pub fn init(target: LogTarget) -> Result<()> {
    match target {
        LogTarget::Stderr => tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow::anyhow!("install log subscriber: {e}")),
        LogTarget::File(path) => {
            let file = open_log_file(&path)?;
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|e| anyhow::anyhow!("install log subscriber: {e}"))
        }
    }
}
