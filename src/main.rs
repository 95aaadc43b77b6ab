use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use sshconnect::{
    db, git_identity::Git, launcher::DEFAULT_TERMINAL, logging, App, AppState, Db, GnomeTerminal,
    Launcher, Terminal,
};

/// Keeps SSH hosts and git identity profiles, and opens terminals for them.
#[derive(Parser, Debug)]
#[command(name = "sshconnect", version, about)]
struct Cli {
    /// Config file to use instead of ~/.sshconnect
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Terminal emulator to launch
    #[arg(long, env = "SSHCONNECT_TERMINAL", default_value = DEFAULT_TERMINAL)]
    terminal: String,

    /// Log file to append to
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_path = cli.log_file.unwrap_or_else(logging::default_log_path);
    if let Err(e) = logging::init(&log_path) {
        eprintln!("logging disabled: {:#}", e);
    }

    let config_path = match cli.config {
        Some(path) => path,
        None => db::default_path().context("could not determine the home directory")?,
    };
    let (db, load_error) = Db::open(&config_path);

    let launcher = Launcher::new(GnomeTerminal::new(cli.terminal), Git::default());
    let mut app = App::new(AppState::new(db), launcher);
    if let Some(e) = load_error {
        app.report(&e);
    }

    // the terminal is dropped at the end of the block, restoring the screen before printing
    let message = {
        let mut terminal = Terminal::new()?;
        app.run(&mut terminal)?
    };

    if let Some(message) = message {
        println!("{}", message);
    }

    Ok(())
}
