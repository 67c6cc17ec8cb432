//! MDX compilation.
//!
//! Lessons are Markdown with embedded components (`<Diagram kind="heap" />`)
//! and optional ESM `import`/`export` statements. Compilation:
//!
//! 1. Removes top-level `import`/`export` statements (reported in
//!    [`CompiledLesson::imports`]).
//! 2. Records capitalized component tags outside code.
//! 3. Renders Markdown to HTML with `pulldown-cmark`; component tags pass
//!    through as raw HTML for the frontend to hydrate.
//! 4. Assigns every heading a unique anchor id and collects the outline.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use pulldown_cmark::{CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd, html};
use regex::Regex;
use serde::Serialize;

use super::frontmatter::strip_frontmatter;

/// Average reading speed used for the reading-time estimate.
const WORDS_PER_MINUTE: usize = 200;

static COMPONENT_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</?([A-Z][A-Za-z0-9]*(?:\.[A-Z][A-Za-z0-9]*)*)[\s/>]")
        .expect("component tag pattern is valid")
});

static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`]*`").expect("inline code pattern is valid"));

/// A heading in the lesson outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    /// 1 through 6.
    pub level: u8,
    /// Plain heading text.
    pub text: String,
    /// Anchor id assigned to the rendered heading.
    pub anchor: String,
}

/// The renderable form of a lesson body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledLesson {
    /// Rendered HTML with component tags passed through.
    pub html: String,
    /// Heading outline in document order.
    pub headings: Vec<Heading>,
    /// Component names used, sorted and de-duplicated.
    pub components: Vec<String>,
    /// Removed ESM statements, in source order.
    pub imports: Vec<String>,
    /// Words of prose (code blocks excluded).
    pub word_count: usize,
    /// Estimated reading time, at least one minute.
    pub reading_minutes: u32,
}

/// Compile MDX lesson source. A leading frontmatter block is skipped.
pub fn compile_mdx(source: &str) -> CompiledLesson {
    let esm = split_esm(strip_frontmatter(source));
    let events: Vec<Event<'_>> = Parser::new_ext(&esm.markdown, options()).collect();

    let mut headings = Vec::new();
    let mut anchors: HashMap<String, usize> = HashMap::new();
    let mut output = Vec::with_capacity(events.len());
    let mut word_count = 0;
    let mut in_code_block = false;

    for (index, event) in events.iter().enumerate() {
        match event {
            Event::Start(Tag::Heading {
                level,
                id,
                classes,
                attrs,
            }) => {
                let text = heading_text(&events[index + 1..]);
                let base = id
                    .as_deref()
                    .map(String::from)
                    .unwrap_or_else(|| anchor_for(&text));
                let anchor = unique_anchor(base, &mut anchors);
                headings.push(Heading {
                    level: level_number(*level),
                    text,
                    anchor: anchor.clone(),
                });
                output.push(Event::Start(Tag::Heading {
                    level: *level,
                    id: Some(CowStr::from(anchor)),
                    classes: classes.clone(),
                    attrs: attrs.clone(),
                }));
            }
            Event::Start(Tag::CodeBlock(_)) => {
                in_code_block = true;
                output.push(event.clone());
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                output.push(event.clone());
            }
            Event::Text(text) => {
                if !in_code_block {
                    word_count += text.split_whitespace().count();
                }
                output.push(event.clone());
            }
            other => output.push(other.clone()),
        }
    }

    let mut rendered = String::with_capacity(esm.markdown.len() * 3 / 2);
    html::push_html(&mut rendered, output.into_iter());

    CompiledLesson {
        html: rendered,
        headings,
        components: esm.components,
        imports: esm.imports,
        word_count,
        reading_minutes: reading_minutes(word_count),
    }
}

/// Extract the text of the first heading, if any.
///
/// Used as a lesson title fallback without compiling the whole body.
pub fn extract_first_heading(content: &str) -> Option<String> {
    let events: Vec<Event<'_>> = Parser::new_ext(content, options()).collect();
    events.iter().enumerate().find_map(|(index, event)| match event {
        Event::Start(Tag::Heading { .. }) => {
            let text = heading_text(&events[index + 1..]);
            (!text.is_empty()).then_some(text)
        }
        _ => None,
    })
}

fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
}

fn reading_minutes(words: usize) -> u32 {
    let minutes = words.div_ceil(WORDS_PER_MINUTE).max(1);
    u32::try_from(minutes).unwrap_or(u32::MAX)
}

fn level_number(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Collect heading text up to the matching end event.
fn heading_text(events: &[Event<'_>]) -> String {
    let mut text = String::new();
    for event in events {
        match event {
            Event::End(TagEnd::Heading(_)) => break,
            Event::Text(t) | Event::Code(t) => text.push_str(t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            _ => {}
        }
    }
    text.trim().to_string()
}

/// Lowercase alphanumerics joined by single dashes.
fn anchor_for(text: &str) -> String {
    let mut anchor = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !anchor.is_empty() {
                anchor.push('-');
            }
            pending_dash = false;
            anchor.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_dash = true;
        }
    }
    if anchor.is_empty() {
        "section".to_string()
    } else {
        anchor
    }
}

fn unique_anchor(base: String, seen: &mut HashMap<String, usize>) -> String {
    match seen.get_mut(&base) {
        Some(count) => {
            *count += 1;
            let anchor = format!("{base}-{count}");
            seen.insert(anchor.clone(), 0);
            anchor
        }
        None => {
            seen.insert(base.clone(), 0);
            base
        }
    }
}

struct EsmSplit {
    markdown: String,
    imports: Vec<String>,
    components: Vec<String>,
}

/// Separate ESM statements from Markdown and collect component names.
fn split_esm(source: &str) -> EsmSplit {
    let mut markdown = String::with_capacity(source.len());
    let mut imports = Vec::new();
    let mut components = BTreeSet::new();
    let mut fence: Option<&'static str> = None;
    let mut statement: Option<(String, i32)> = None;

    for line in source.lines() {
        // Continuation of a multi-line import/export
        if let Some((mut text, depth)) = statement.take() {
            text.push('\n');
            text.push_str(line);
            let depth = depth + brace_delta(line);
            if depth > 0 {
                statement = Some((text, depth));
            } else {
                imports.push(text);
            }
            continue;
        }

        let trimmed = line.trim_start();
        if let Some(marker) = fence {
            if trimmed.starts_with(marker) {
                fence = None;
            }
            markdown.push_str(line);
            markdown.push('\n');
            continue;
        }
        if trimmed.starts_with("```") {
            fence = Some("```");
        } else if trimmed.starts_with("~~~") {
            fence = Some("~~~");
        } else if line.starts_with("import ") || line.starts_with("export ") {
            let depth = brace_delta(line);
            if depth > 0 {
                statement = Some((line.to_string(), depth));
            } else {
                imports.push(line.trim_end().to_string());
            }
            continue;
        } else {
            let without_code = INLINE_CODE.replace_all(line, "");
            for cap in COMPONENT_TAG.captures_iter(&without_code) {
                components.insert(cap[1].to_string());
            }
        }

        markdown.push_str(line);
        markdown.push('\n');
    }

    if let Some((text, _)) = statement {
        log::warn!("Unterminated MDX statement: {}", text.lines().next().unwrap_or(""));
        imports.push(text);
    }

    EsmSplit {
        markdown,
        imports,
        components: components.into_iter().collect(),
    }
}

fn brace_delta(line: &str) -> i32 {
    line.chars().fold(0, |depth, c| match c {
        '{' => depth + 1,
        '}' => depth - 1,
        _ => depth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings_get_anchors() {
        let compiled = compile_mdx("# Ownership\n\n## What's a Move?\n\nText.");
        assert_eq!(compiled.headings.len(), 2);
        assert_eq!(compiled.headings[0].anchor, "ownership");
        assert_eq!(compiled.headings[1].level, 2);
        assert_eq!(compiled.headings[1].anchor, "whats-a-move");
        assert!(compiled.html.contains(r#"<h2 id="whats-a-move">"#));
    }

    #[test]
    fn test_duplicate_headings_are_disambiguated() {
        let compiled = compile_mdx("## Example\n\n## Example\n\n## Example\n");
        let anchors: Vec<&str> = compiled.headings.iter().map(|h| h.anchor.as_str()).collect();
        assert_eq!(anchors, vec!["example", "example-1", "example-2"]);
    }

    #[test]
    fn test_explicit_heading_id_is_kept() {
        let compiled = compile_mdx("## Borrowing {#borrow-rules}\n");
        assert_eq!(compiled.headings[0].anchor, "borrow-rules");
        assert_eq!(compiled.headings[0].text, "Borrowing");
    }

    #[test]
    fn test_components_collected_outside_code() {
        let source = "\
Intro with `<NotAComponent />` inline.

<Diagram kind=\"stack\" />

<Callout.Note>
Remember this.
</Callout.Note>

```jsx
<CodeOnly />
```
";
        let compiled = compile_mdx(source);
        assert_eq!(compiled.components, vec!["Callout.Note", "Diagram"]);
        assert!(compiled.html.contains("<Diagram kind=\"stack\" />"));
    }

    #[test]
    fn test_imports_removed_from_output() {
        let source = "\
import { Diagram } from '../components'
export const meta = {
  difficulty: 'easy',
}

# Title
";
        let compiled = compile_mdx(source);
        assert_eq!(compiled.imports.len(), 2);
        assert!(compiled.imports[1].contains("difficulty"));
        assert!(!compiled.html.contains("import"));
        assert!(!compiled.html.contains("difficulty"));
        assert_eq!(compiled.headings[0].text, "Title");
    }

    #[test]
    fn test_import_inside_code_block_is_kept() {
        let compiled = compile_mdx("```js\nimport x from 'y'\n```\n");
        assert!(compiled.imports.is_empty());
        assert!(compiled.html.contains("import x from"));
    }

    #[test]
    fn test_tables_render() {
        let compiled = compile_mdx("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(compiled.html.contains("<table>"));
    }

    #[test]
    fn test_word_count_excludes_code() {
        let compiled = compile_mdx("One two three.\n\n```rust\nlet x = 1;\n```\n");
        assert_eq!(compiled.word_count, 3);
        assert_eq!(compiled.reading_minutes, 1);
    }

    #[test]
    fn test_reading_minutes_rounds_up() {
        let words = vec!["word"; 401].join(" ");
        let compiled = compile_mdx(&words);
        assert_eq!(compiled.word_count, 401);
        assert_eq!(compiled.reading_minutes, 3);
    }

    #[test]
    fn test_extract_first_heading() {
        assert_eq!(
            extract_first_heading("Intro\n\n## The `Drop` Trait\n"),
            Some("The Drop Trait".to_string())
        );
        assert_eq!(extract_first_heading("No headings here."), None);
    }

    #[test]
    fn test_anchor_for_symbols_only() {
        assert_eq!(anchor_for("???"), "section");
        assert_eq!(anchor_for("  Rc<T> and Arc<T>  "), "rct-and-arct");
    }
}
