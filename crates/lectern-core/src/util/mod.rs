//! Utility modules for ID handling, path expansion, and timestamps.
//!
//! # Modules
//!
//! - [`ids`]: Slug normalization and computation
//! - [`paths`]: Tilde expansion
//! - [`time`]: Millisecond timestamps

pub mod ids;
pub mod paths;
pub mod time;
