use std::{
    io::ErrorKind,
    path::Path,
    process::Command,
};
use tracing::{debug, info, warn};

use crate::command::{build_environment, build_ssh_args};
use crate::error::LauncherError;
use crate::git_identity::Git;
use crate::host::HostRecord;
use crate::profile::TerminalProfile;

pub const DEFAULT_TERMINAL: &str = "gnome-terminal";

/// How to start a terminal emulator window.
pub trait TerminalEmulator {
    /// Executable name, used in error messages.
    fn program(&self) -> &str;

    /// A window running `ssh_args` (which start with `ssh`).
    fn ssh_command(&self, ssh_args: &[String]) -> Command;

    /// A window with an interactive shell, optionally started in `working_dir`.
    fn shell_command(&self, working_dir: Option<&Path>) -> Command;
}

/// GNOME Terminal and anything that takes the same flags.
#[derive(Clone, Debug)]
pub struct GnomeTerminal {
    program: String,
}

impl GnomeTerminal {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for GnomeTerminal {
    fn default() -> Self {
        Self::new(DEFAULT_TERMINAL)
    }
}

impl TerminalEmulator for GnomeTerminal {
    fn program(&self) -> &str {
        &self.program
    }

    fn ssh_command(&self, ssh_args: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--").args(ssh_args);
        cmd
    }

    fn shell_command(&self, working_dir: Option<&Path>) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(dir) = working_dir {
            cmd.arg("--working-directory").arg(dir);
        }
        cmd
    }
}

/// Starts terminal windows for hosts and profiles without waiting on them.
#[derive(Clone, Debug, Default)]
pub struct Launcher<T = GnomeTerminal> {
    terminal: T,
    git: Git,
}

impl<T: TerminalEmulator> Launcher<T> {
    pub fn new(terminal: T, git: Git) -> Self {
        Self { terminal, git }
    }

    /// Opens a terminal running ssh to `host`.
    pub fn connect(&self, host: &HostRecord) -> Result<(), LauncherError> {
        let args = build_ssh_args(host);
        debug!(?args, "connecting to {}", host.name);
        self.spawn(self.terminal.ssh_command(&args))?;
        info!("opened ssh session to {}", host.name);
        Ok(())
    }

    /// Opens a shell with the profile's git identity exported.
    ///
    /// When the working directory is a git repository the identity is also
    /// written into it first. That step never blocks the launch; its result
    /// message (or failure text) is returned for display.
    pub fn launch_profile(&self, profile: &TerminalProfile) -> Result<Option<String>, LauncherError> {
        let working_dir = (!profile.working_dir.is_empty()).then(|| Path::new(&profile.working_dir));

        let note = match working_dir {
            Some(dir) if dir.join(".git").exists() => {
                match self.git.apply_persistent_identity(profile, dir) {
                    Ok(message) => Some(message),
                    Err(e) => {
                        warn!("{}", e);
                        Some(e.to_string())
                    }
                }
            }
            _ => None,
        };

        self.spawn(self.profile_command(profile))?;
        info!("launched profile {}", profile.name);
        Ok(note)
    }

    /// The terminal command for `profile`, with its git identity in the environment.
    fn profile_command(&self, profile: &TerminalProfile) -> Command {
        let working_dir = (!profile.working_dir.is_empty()).then(|| Path::new(&profile.working_dir));
        let mut cmd = self.terminal.shell_command(working_dir);
        cmd.envs(build_environment(profile));
        cmd
    }

    fn spawn(&self, mut cmd: Command) -> Result<(), LauncherError> {
        match cmd.spawn() {
            // fire and forget
            Ok(_child) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(LauncherError::TerminalNotFound(
                self.terminal.program().to_string(),
            )),
            Err(e) => Err(LauncherError::Launch(e)),
        }
    }
}
