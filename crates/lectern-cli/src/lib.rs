//! # lectern-cli
//!
//! The `lectern` binary: runs the API server and handles content, user,
//! and configuration administration from the command line.

#![forbid(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod config_handlers;
pub mod logging;

pub use cli::{Cli, Command};

use lectern_core::{ConfigManager, LecternConfig};

fn load_config(path: Option<&str>, verbose: u8) -> anyhow::Result<LecternConfig> {
    let config = LecternConfig::load(path)?;
    logging::init(&config.logging.level, verbose);
    Ok(config)
}

/// Execute a parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        config,
        verbose,
        command,
    } = cli;
    let config_path = config.as_deref();

    match command {
        Command::Serve(args) => {
            let config = load_config(config_path, verbose)?;
            commands::serve(config, args).await
        }
        Command::Content { action } => {
            let config = load_config(config_path, verbose)?;
            commands::handle_content_command(&config, action).await
        }
        Command::User { action } => {
            let config = load_config(config_path, verbose)?;
            commands::handle_user_command(&config, action).await
        }
        Command::Config { action } => {
            logging::init("warn", verbose);
            config_handlers::handle_config_command(config_path, action)?;
            Ok(())
        }
    }
}
