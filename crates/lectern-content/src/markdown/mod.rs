//! Lesson source handling.
//!
//! - [`frontmatter`]: YAML frontmatter extraction
//! - [`mdx`]: MDX → HTML compilation with outline and component discovery
//!
//! # Example
//!
//! ```rust
//! use lectern_content::markdown::{compile_mdx, extract_frontmatter};
//!
//! let source = "---\ntitle: Moves\n---\n\n# Moves\n\n<Diagram kind=\"stack\" />\n";
//! let fm = extract_frontmatter(source).unwrap();
//! assert_eq!(fm.get_str("title"), Some("Moves"));
//!
//! let compiled = compile_mdx(fm.body());
//! assert_eq!(compiled.headings[0].anchor, "moves");
//! assert_eq!(compiled.components, vec!["Diagram".to_string()]);
//! ```

pub mod frontmatter;
pub mod mdx;

pub use frontmatter::{FrontmatterResult, extract_frontmatter, strip_frontmatter};
pub use mdx::{CompiledLesson, Heading, compile_mdx, extract_first_heading};
