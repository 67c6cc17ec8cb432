//! Lectern Core: shared configuration, errors, and utilities.
//!
//! This crate provides the foundational types used across all Lectern crates.
//! It has no internal Lectern dependencies (dependency level 0).
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`config`]: [`LecternConfig`] and its sections
//! - [`traits`]: The [`ConfigManager`] trait driving the `config` subcommands
//! - [`util`]: ID, path, and time utilities

pub mod config;
pub mod error;
pub mod traits;
pub mod util;

// Re-export key types at crate root for convenience
pub use config::{
    AuthMode, AuthSettings, ContentConfig, DatabaseConfig, LecternConfig, LoggingConfig,
    MAX_SESSION_TTL_HOURS, ServerConfig,
};
pub use error::{Error, Result};
pub use traits::ConfigManager;

// Convenience re-exports from util
pub use util::ids::{id_from_path, normalize_id, strip_order_prefix};
pub use util::time::now_millis;
