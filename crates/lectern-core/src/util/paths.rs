//! Path helpers.

use std::path::PathBuf;

/// Expand a leading `~` to the user's home directory.
///
/// Paths without a leading tilde, or platforms without a home directory,
/// are returned unchanged.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
