//! YAML frontmatter extraction from lesson files.
//!
//! Lessons may begin with a YAML block delimited by `---`:
//!
//! ```markdown
//! ---
//! title: Moves and Copies
//! duration_minutes: 12
//! order: 2
//! ---
//!
//! # Moves and Copies
//! ```
//!
//! A missing block is not an error. A block that fails to parse is logged
//! and treated as absent, so one bad lesson header never takes a course
//! offline.

use serde::de::DeserializeOwned;
use serde_yaml::Value;

use crate::{Error, Result};

/// Result of frontmatter extraction.
#[derive(Debug, Clone)]
pub struct FrontmatterResult<'a> {
    value: Option<Value>,
    body: &'a str,
    had_delimiters: bool,
    parse_error: Option<String>,
}

impl<'a> FrontmatterResult<'a> {
    fn parsed(value: Value, body: &'a str) -> Self {
        Self {
            value: Some(value),
            body,
            had_delimiters: true,
            parse_error: None,
        }
    }

    fn absent(body: &'a str) -> Self {
        Self {
            value: None,
            body,
            had_delimiters: false,
            parse_error: None,
        }
    }

    fn unparseable(body: &'a str, message: String) -> Self {
        Self {
            value: None,
            body,
            had_delimiters: true,
            parse_error: Some(message),
        }
    }

    /// Check if valid frontmatter was found and parsed.
    pub fn has_frontmatter(&self) -> bool {
        self.value.is_some()
    }

    /// Check if frontmatter delimiters were present (even if parsing failed).
    pub fn had_delimiters(&self) -> bool {
        self.had_delimiters
    }

    /// YAML parser message when the block was present but invalid.
    pub fn parse_error(&self) -> Option<&str> {
        self.parse_error.as_deref()
    }

    /// Get the raw YAML value, if present.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Get the body content (everything after frontmatter).
    pub fn body(&self) -> &'a str {
        self.body
    }

    /// Deserialize the frontmatter into a specific type.
    ///
    /// Returns `None` if no frontmatter was found.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match &self.value {
            // An empty block parses as Null; treat it like no block at all.
            Some(Value::Null) | None => Ok(None),
            Some(value) => serde_yaml::from_value(value.clone())
                .map(Some)
                .map_err(|e| {
                    Error::Core(lectern_core::Error::parse(format!(
                        "Failed to deserialize frontmatter: {e}"
                    )))
                }),
        }
    }

    /// Deserialize into `T`, falling back to `T::default()` when the block
    /// is absent or does not fit the type.
    pub fn deserialize_or_default<T: DeserializeOwned + Default>(&self) -> T {
        match self.deserialize() {
            Ok(Some(value)) => value,
            Ok(None) => T::default(),
            Err(e) => {
                log::warn!("{e}");
                T::default()
            }
        }
    }

    /// Get a string field from the frontmatter.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.value.as_ref()?.get(key)?.as_str()
    }
}

/// Extract YAML frontmatter from lesson source.
///
/// # Behavior
///
/// - No opening `---` on the first line: whole input is body
/// - Opening but no closing delimiter: whole input is body (logged)
/// - Delimiters with invalid YAML: body after the block, no value (logged)
/// - Windows line endings are accepted
///
/// # Example
///
/// ```rust
/// use lectern_content::markdown::extract_frontmatter;
///
/// let result = extract_frontmatter("---\ntitle: Traits\n---\n\nBody").unwrap();
/// assert_eq!(result.get_str("title"), Some("Traits"));
/// assert_eq!(result.body().trim(), "Body");
///
/// let result = extract_frontmatter("# No header").unwrap();
/// assert!(!result.has_frontmatter());
/// ```
pub fn extract_frontmatter(content: &str) -> Result<FrontmatterResult<'_>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let Some(after_open) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return Ok(FrontmatterResult::absent(content));
    };

    // Empty block: "---\n---"
    let (yaml, rest) = if let Some(rest) = after_open.strip_prefix("---") {
        ("", rest)
    } else if let Some(pos) = after_open.find("\n---") {
        (&after_open[..pos], &after_open[pos + 4..])
    } else {
        log::warn!("Frontmatter opening delimiter found but no closing delimiter");
        return Ok(FrontmatterResult::absent(content));
    };

    let body = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    match serde_yaml::from_str::<Value>(yaml.trim_end_matches('\r')) {
        Ok(value) => Ok(FrontmatterResult::parsed(value, body)),
        Err(e) => {
            log::warn!("Failed to parse frontmatter YAML: {e}");
            Ok(FrontmatterResult::unparseable(body, e.to_string()))
        }
    }
}

/// Strip frontmatter from content, returning only the body.
pub fn strip_frontmatter(content: &str) -> &str {
    extract_frontmatter(content)
        .map(|r| r.body())
        .unwrap_or(content)
}
