use std::{
    fs,
    io::ErrorKind,
    path::Path,
    process::{Command, Output},
};
use tracing::{debug, info};

use crate::error::LauncherError;
use crate::profile::TerminalProfile;

pub const GIT_PROGRAM: &str = "git";
pub const LOCAL_CONFIG_FILE: &str = ".gitconfig.local";
/// Include paths resolve against `.git/`, so the file sits one level up.
pub const INCLUDE_PATH: &str = "../.gitconfig.local";

/// Runs `git config` against a repository to make a profile's identity stick.
#[derive(Clone, Debug)]
pub struct Git {
    program: String,
}

impl Default for Git {
    fn default() -> Self {
        Self::new(GIT_PROGRAM)
    }
}

impl Git {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Writes `.gitconfig.local` into `project_dir` and includes it from the
    /// repository's local config.
    ///
    /// The file is overwritten on every call and the include is only added
    /// when missing, so repeated calls leave a single include entry.
    pub fn apply_persistent_identity(
        &self,
        profile: &TerminalProfile,
        project_dir: &Path,
    ) -> Result<String, LauncherError> {
        if !project_dir.join(".git").exists() {
            return Err(LauncherError::NotAGitRepository(project_dir.to_path_buf()));
        }

        let config_file = project_dir.join(LOCAL_CONFIG_FILE);
        let content = format!(
            "[user]\n    name = {}\n    email = {}\n",
            profile.git_username, profile.git_email
        );
        fs::write(&config_file, content).map_err(|e| {
            LauncherError::GitConfig(format!("Failed to create {}: {}", LOCAL_CONFIG_FILE, e))
        })?;

        let current = self.config_get(project_dir, "include.path").unwrap_or_default();
        if current.contains(LOCAL_CONFIG_FILE) {
            debug!("include.path already set in {}", project_dir.display());
        } else {
            self.config_set(project_dir, "include.path", INCLUDE_PATH)?;
        }

        let project_name = project_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| project_dir.display().to_string());
        info!("applied identity of {} to {}", profile.name, project_dir.display());
        Ok(format!(
            "Identity set for {}: {} <{}>",
            project_name, profile.git_username, profile.git_email
        ))
    }

    // Any failure reads as "not set".
    fn config_get(&self, dir: &Path, key: &str) -> Option<String> {
        let output = self
            .run(dir, &["config", "--local", "--get", key])
            .ok()?;
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn config_set(&self, dir: &Path, key: &str, value: &str) -> Result<(), LauncherError> {
        let output = self.run(dir, &["config", "--local", key, value])?;
        if output.status.success() {
            return Ok(());
        }
        Err(LauncherError::GitConfig(format!(
            "Failed to configure git include path ({}): {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }

    fn run(&self, dir: &Path, args: &[&str]) -> Result<Output, LauncherError> {
        Command::new(&self.program)
            .arg("-C")
            .arg(dir)
            .args(args)
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => {
                    LauncherError::GitConfig(format!("{} command not found", self.program))
                }
                _ => LauncherError::GitConfig(e.to_string()),
            })
    }
}
