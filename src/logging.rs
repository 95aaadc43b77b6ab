//! File logging.
//!
//! The UI owns the terminal, so log output goes to
//! `$XDG_STATE_HOME/sshconnect/sshconnect.log` (or the cache directory on
//! platforms without a state directory). Filtering follows `RUST_LOG` and
//! defaults to `info`.

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "sshconnect.log";

/// Where logs go when no path is given on the command line.
pub fn default_log_path() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::cache_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join(crate::app::CRATE_NAME)
        .join(LOG_FILE)
}

/// Installs the global subscriber, appending to `path`.
pub fn init(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_path() {
        let path = default_log_path();
        assert!(path.ends_with(Path::new("sshconnect").join(LOG_FILE)));
    }
}
