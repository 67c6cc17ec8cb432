//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// Lectern course delivery server
#[derive(Parser, Debug)]
#[command(name = "lectern", author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API server
    Serve(ServeArgs),

    /// Inspect course content
    Content {
        #[command(subcommand)]
        action: ContentAction,
    },

    /// Manage local user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Read and write the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Overrides for `serve`. Each one wins over the config file.
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Interface to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind
    #[arg(long)]
    pub port: Option<u16>,

    /// Content root directory
    #[arg(long)]
    pub content_dir: Option<PathBuf>,

    /// Database URL
    #[arg(long)]
    pub database_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ContentAction {
    /// Load every course and report problems
    Validate {
        /// Content root directory (defaults to content.root)
        #[arg(long)]
        content_dir: Option<PathBuf>,
    },

    /// List courses with their lesson counts
    List {
        /// Content root directory (defaults to content.root)
        #[arg(long)]
        content_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum UserAction {
    /// Create a local account
    Create {
        #[arg(long)]
        email: String,

        #[arg(long, env = "LECTERN_USER_PASSWORD", hide_env_values = true)]
        password: String,

        /// learner, reviewer, or admin
        #[arg(long, default_value = "learner")]
        role: String,

        #[arg(long)]
        name: Option<String>,
    },

    /// Change an existing user's role
    SetRole {
        #[arg(long)]
        email: String,

        /// learner, reviewer, or admin
        #[arg(long)]
        role: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the resolved config file path
    Path,

    /// Print a value by dotted key (e.g. `server.port`)
    Get { key: String },

    /// Set a value by dotted key in the config file
    Set { key: String, value: String },

    /// Write a default config file
    Init {
        /// Where to write it (defaults to the platform config directory)
        #[arg(long)]
        file: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the configuration as LECTERN_* environment variables
    Export {
        /// Format as `--env KEY=VALUE` for `docker run`
        #[arg(long)]
        docker_env: bool,
    },
}
