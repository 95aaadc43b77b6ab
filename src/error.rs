use std::path::PathBuf;

use thiserror::Error;

/// Every recoverable failure of the core operations.
///
/// None of these are fatal: the caller shows the message and the user
/// repeats the action if they want to.
#[derive(Debug, Error)]
pub enum LauncherError {
    /// The config file is not valid JSON.
    #[error("Failed to parse configuration file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The config file could not be read, or has an unexpected shape.
    #[error("Failed to load configuration {path}: {reason}")]
    ConfigRead { path: PathBuf, reason: String },

    #[error("Failed to save configuration to {path}: {source}")]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a git repository (no .git directory found in {0})")]
    NotAGitRepository(PathBuf),

    #[error("Git configuration failed: {0}")]
    GitConfig(String),

    #[error("{0} is not installed. Please install it or configure an alternative terminal.")]
    TerminalNotFound(String),

    #[error("Failed to launch terminal: {0}")]
    Launch(#[source] std::io::Error),

    #[error("Failed to open {url}: {source}")]
    OpenLink {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

/// Rejections raised while the user fills in a form.
///
/// The display text is shown to the user as is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Name is required.")]
    HostNameRequired,
    #[error("IP/Hostname is required.")]
    HostIpRequired,
    #[error("Port must be a valid number.")]
    PortNotANumber,
    #[error("Port must be between 1 and 65535.")]
    PortOutOfRange,
    #[error("Profile name is required.")]
    ProfileNameRequired,
    #[error("Git username is required.")]
    GitUsernameRequired,
    #[error("Git email is required.")]
    GitEmailRequired,
    #[error("Git email must be a valid email address.")]
    GitEmailInvalid,
}
