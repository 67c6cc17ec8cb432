//! Slug normalization utilities.
//!
//! Course, module, and lesson identifiers are derived from directory and
//! file names. These helpers turn names like `01-Getting_Started.mdx` into
//! stable kebab-case slugs such as `getting-started`.

use std::path::Path;

/// Normalize an identifier to lowercase kebab-case.
///
/// Performs the following transformations:
/// 1. Trims leading/trailing whitespace
/// 2. Converts to lowercase
/// 3. Replaces underscores with hyphens
/// 4. Collapses multiple whitespace into single hyphens
///
/// # Examples
///
/// ```
/// use lectern_core::util::ids::normalize_id;
///
/// assert_eq!(normalize_id("Borrow Checker"), "borrow-checker");
/// assert_eq!(normalize_id("smart_pointers"), "smart-pointers");
/// assert_eq!(normalize_id("  Mixed   Case  "), "mixed-case");
/// ```
pub fn normalize_id(id: &str) -> String {
    id.trim()
        .to_lowercase()
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join("-")
}

/// Remove a leading numeric ordering prefix such as `01-` or `2_`.
///
/// The prefix must be one or more ASCII digits followed by `-`, `_`, `.`
/// or a space, and something must remain after it. Otherwise the input is
/// returned unchanged.
///
/// # Examples
///
/// ```
/// use lectern_core::util::ids::strip_order_prefix;
///
/// assert_eq!(strip_order_prefix("01-intro"), "intro");
/// assert_eq!(strip_order_prefix("2_basics"), "basics");
/// assert_eq!(strip_order_prefix("2024"), "2024");
/// assert_eq!(strip_order_prefix("3d-graphics"), "3d-graphics");
/// ```
pub fn strip_order_prefix(name: &str) -> &str {
    let digits = name.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return name;
    }
    match name[digits..].chars().next() {
        Some('-' | '_' | '.' | ' ') => {
            let rest = &name[digits + 1..];
            if rest.trim().is_empty() { name } else { rest }
        }
        _ => name,
    }
}

/// Compute a slug from a file path's stem.
///
/// Extracts the file stem, strips any ordering prefix, and normalizes it.
/// Returns `None` if the path has no file stem.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use lectern_core::util::ids::id_from_path;
///
/// assert_eq!(
///     id_from_path(Path::new("/content/rust-101/01-ownership/02-Moves_And_Copies.mdx")),
///     Some("moves-and-copies".to_string())
/// );
/// assert_eq!(id_from_path(Path::new("/")), None);
/// ```
pub fn id_from_path(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|stem| normalize_id(strip_order_prefix(stem)))
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // normalize_id tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_normalize_id_simple() {
        assert_eq!(normalize_id("ownership"), "ownership");
    }

    #[test]
    fn test_normalize_id_with_spaces() {
        assert_eq!(normalize_id("Error Handling"), "error-handling");
    }

    #[test]
    fn test_normalize_id_with_underscores() {
        assert_eq!(normalize_id("trait_objects"), "trait-objects");
    }

    #[test]
    fn test_normalize_id_empty() {
        assert_eq!(normalize_id(""), "");
        assert_eq!(normalize_id("   "), "");
    }

    #[test]
    fn test_normalize_id_mixed_separators() {
        assert_eq!(normalize_id("async_await basics"), "async-await-basics");
    }

    // -------------------------------------------------------------------------
    // strip_order_prefix tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_strip_order_prefix_variants() {
        assert_eq!(strip_order_prefix("01-intro"), "intro");
        assert_eq!(strip_order_prefix("10_advanced"), "advanced");
        assert_eq!(strip_order_prefix("3.closures"), "closures");
        assert_eq!(strip_order_prefix("7 lifetimes"), "lifetimes");
    }

    #[test]
    fn test_strip_order_prefix_keeps_non_prefix() {
        assert_eq!(strip_order_prefix("intro"), "intro");
        assert_eq!(strip_order_prefix("42"), "42");
        assert_eq!(strip_order_prefix("01-"), "01-");
        assert_eq!(strip_order_prefix("2d-arrays"), "2d-arrays");
    }

    // -------------------------------------------------------------------------
    // id_from_path tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_id_from_path_simple() {
        let path = Path::new("/content/course/module/closures.mdx");
        assert_eq!(id_from_path(path), Some("closures".to_string()));
    }

    #[test]
    fn test_id_from_path_with_prefix() {
        let path = Path::new("/content/course/module/03-Pattern_Matching.mdx");
        assert_eq!(id_from_path(path), Some("pattern-matching".to_string()));
    }

    #[test]
    fn test_id_from_path_directory() {
        let path = Path::new("/content/rust-101/02-borrowing");
        assert_eq!(id_from_path(path), Some("borrowing".to_string()));
    }

    #[test]
    fn test_id_from_path_no_stem() {
        assert_eq!(id_from_path(Path::new("/")), None);
    }
}
