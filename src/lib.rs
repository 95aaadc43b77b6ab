mod app;
pub mod command;
pub mod db;
pub mod error;
mod form;
pub mod git_identity;
pub mod host;
mod input;
pub mod launcher;
pub mod logging;
pub mod profile;
mod select_box;
pub mod state;
mod terminal;

pub use app::{App, CRATE_NAME, CRATE_VERSION};
pub use db::Db;
pub use error::{LauncherError, ValidationError};
pub use launcher::{GnomeTerminal, Launcher, TerminalEmulator};
pub use state::{Action, AppState, Outcome};
pub use terminal::Terminal;
