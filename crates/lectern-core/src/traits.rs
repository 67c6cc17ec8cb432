//! Traits shared across Lectern crates.

use std::path::PathBuf;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{Error, Result};

/// A configuration type that can be located, loaded, and exported.
///
/// The generic `config` CLI subcommands (`path`, `get`, `set`, `init`,
/// `export`) are written against this trait.
pub trait ConfigManager: Default + Serialize + DeserializeOwned {
    /// Project name used for directory and environment variable names.
    fn project_name() -> &'static str;

    /// Default location of the config file in the platform config directory.
    fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(Self::project_name()).join("config.toml"))
    }

    /// Environment variable that may point at a config file.
    fn config_env_var() -> String {
        format!(
            "{}_CONFIG",
            Self::project_name().to_uppercase().replace(['-', ' '], "_")
        )
    }

    /// Resolve the config file path.
    ///
    /// Checks in order:
    /// 1. The explicit path, if given
    /// 2. The `{PROJECT}_CONFIG` environment variable
    /// 3. [`default_config_path`](Self::default_config_path)
    fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(crate::util::paths::expand_tilde(path));
        }
        if let Ok(path) = std::env::var(Self::config_env_var()) {
            if !path.trim().is_empty() {
                return Some(crate::util::paths::expand_tilde(&path));
            }
        }
        Self::default_config_path()
    }

    /// Load the configuration, falling back to defaults when no file exists.
    fn load(explicit: Option<&str>) -> Result<Self>;

    /// Serialize to a pretty TOML document.
    fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    /// Flatten into `(NAME, value)` environment variable pairs.
    fn to_env_vars(&self) -> Result<Vec<(String, String)>>;
}
