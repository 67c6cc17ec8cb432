//! Reading course directories from disk.
//!
//! Module order comes from `course.yaml`'s `modules` list when present,
//! otherwise from the sorted names of subdirectories containing a
//! `module.yaml`. Lesson order comes from `module.yaml`'s `lessons` list
//! when present, otherwise from frontmatter `order` and then file name.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use lectern_core::{id_from_path, normalize_id, strip_order_prefix};
use serde::de::DeserializeOwned;

use crate::markdown::{compile_mdx, extract_first_heading, extract_frontmatter};
use crate::model::{
    Course, CourseConfig, Lesson, LessonFrontmatter, LessonSummary, Module, ModuleConfig,
};
use crate::{Error, Result};

/// Course configuration file name.
pub const COURSE_FILE: &str = "course.yaml";

/// Module configuration file name.
pub const MODULE_FILE: &str = "module.yaml";

/// Lesson file extension.
pub const LESSON_EXTENSION: &str = "mdx";

/// Slug for a course or module directory.
pub fn dir_slug(dir: &Path) -> Option<String> {
    dir.file_name()
        .and_then(|n| n.to_str())
        .map(|name| normalize_id(strip_order_prefix(name)))
}

/// Find course directories under `root`, sorted by slug.
pub async fn discover_courses(root: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut courses = Vec::new();
    for dir in subdirectories(root).await? {
        if !is_file(&dir.join(COURSE_FILE)).await {
            continue;
        }
        if let Some(slug) = dir_slug(&dir) {
            courses.push((slug, dir));
        }
    }
    courses.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(courses)
}

/// Load a course and all lesson metadata (bodies are not compiled).
pub async fn load_course(dir: &Path, include_drafts: bool) -> Result<Course> {
    let slug = dir_slug(dir).ok_or_else(|| Error::invalid(dir, "course directory has no name"))?;
    let config: CourseConfig = read_yaml(&dir.join(COURSE_FILE)).await?;

    let module_dirs = match &config.modules {
        Some(names) => {
            let available = module_directories(dir).await?;
            let mut resolved = Vec::with_capacity(names.len());
            for name in names {
                resolved.push(resolve_entry(dir, name, &available, "module")?);
            }
            resolved
        }
        None => module_directories(dir).await?,
    };

    let mut modules = Vec::with_capacity(module_dirs.len());
    let mut seen = HashSet::new();
    for module_dir in module_dirs {
        let module = load_module(&module_dir, include_drafts).await?;
        if !seen.insert(module.slug.clone()) {
            return Err(Error::invalid(
                dir,
                format!("duplicate module slug '{}'", module.slug),
            ));
        }
        modules.push(module);
    }

    log::debug!("Loaded course '{slug}' with {} modules", modules.len());

    Ok(Course {
        slug,
        title: config.title,
        description: config.description,
        published: config.published,
        tags: config.tags,
        modules,
        dir: dir.to_path_buf(),
    })
}

/// Load one module directory.
pub async fn load_module(dir: &Path, include_drafts: bool) -> Result<Module> {
    let slug = dir_slug(dir).ok_or_else(|| Error::invalid(dir, "module directory has no name"))?;
    let config: ModuleConfig = read_yaml(&dir.join(MODULE_FILE)).await?;

    let files = lesson_files(dir).await?;
    let mut lessons = Vec::with_capacity(files.len());

    match &config.lessons {
        Some(names) => {
            for name in names {
                let path = resolve_entry(dir, name, &files, "lesson")?;
                let (summary, _) = read_lesson_summary(&path).await?;
                lessons.push(summary);
            }
        }
        None => {
            let mut ordered = Vec::with_capacity(files.len());
            for path in files {
                let (summary, order) = read_lesson_summary(&path).await?;
                ordered.push((order, path, summary));
            }
            // Lessons without an explicit order sort after those with one.
            ordered.sort_by(|a, b| {
                (a.0.is_none(), a.0, &a.1).cmp(&(b.0.is_none(), b.0, &b.1))
            });
            lessons.extend(ordered.into_iter().map(|(_, _, summary)| summary));
        }
    }

    let mut seen = HashSet::new();
    for lesson in &lessons {
        if !seen.insert(lesson.slug.as_str()) {
            return Err(Error::invalid(
                dir,
                format!("duplicate lesson slug '{}'", lesson.slug),
            ));
        }
    }

    if !include_drafts {
        lessons.retain(|l| !l.draft);
    }

    Ok(Module {
        slug,
        title: config.title,
        description: config.description,
        lessons,
        knowledge_check: config.knowledge_check,
        dir: dir.to_path_buf(),
    })
}

/// Read and compile a lesson body.
pub async fn load_lesson(course: &Course, module: &Module, summary: &LessonSummary) -> Result<Lesson> {
    let source = tokio::fs::read_to_string(&summary.path)
        .await
        .map_err(|e| Error::io(e, &summary.path))?;
    let compiled = compile_mdx(&source);

    Ok(Lesson {
        course: course.slug.clone(),
        module: module.slug.clone(),
        slug: summary.slug.clone(),
        title: summary.title.clone(),
        description: summary.description.clone(),
        duration_minutes: summary.duration_minutes.unwrap_or(compiled.reading_minutes),
        html: compiled.html,
        headings: compiled.headings,
        components: compiled.components,
        word_count: compiled.word_count,
    })
}

/// Read lesson metadata. Returns the summary and its frontmatter `order`.
async fn read_lesson_summary(path: &Path) -> Result<(LessonSummary, Option<i64>)> {
    let slug = id_from_path(path).ok_or_else(|| Error::invalid(path, "lesson file has no name"))?;
    let source = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::io(e, path))?;
    let fm = extract_frontmatter(&source)?;
    let meta: LessonFrontmatter = fm.deserialize_or_default();

    let title = meta
        .title
        .filter(|t| !t.trim().is_empty())
        .or_else(|| extract_first_heading(fm.body()))
        .unwrap_or_else(|| slug.clone());

    Ok((
        LessonSummary {
            slug,
            title,
            description: meta.description,
            duration_minutes: meta.duration_minutes,
            draft: meta.draft,
            path: path.to_path_buf(),
        },
        meta.order,
    ))
}

/// Match a configured entry by exact file name, by name plus extension,
/// or by slug.
fn resolve_entry(parent: &Path, name: &str, candidates: &[PathBuf], kind: &str) -> Result<PathBuf> {
    let with_extension = format!("{name}.{LESSON_EXTENSION}");
    let wanted_slug = normalize_id(strip_order_prefix(
        name.strip_suffix(&format!(".{LESSON_EXTENSION}")).unwrap_or(name),
    ));

    candidates
        .iter()
        .find(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n == name || n == with_extension)
        })
        .or_else(|| {
            candidates.iter().find(|path| {
                let slug = if kind == "module" {
                    dir_slug(path)
                } else {
                    id_from_path(path)
                };
                slug.as_deref() == Some(wanted_slug.as_str())
            })
        })
        .cloned()
        .ok_or_else(|| Error::invalid(parent, format!("{kind} '{name}' is listed but does not exist")))
}

async fn module_directories(course_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for dir in subdirectories(course_dir).await? {
        if is_file(&dir.join(MODULE_FILE)).await {
            dirs.push(dir);
        }
    }
    Ok(dirs)
}

async fn lesson_files(module_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(module_dir)
        .await
        .map_err(|e| Error::io(e, module_dir))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::io(e, module_dir))?
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some(LESSON_EXTENSION)
            && is_file(&path).await
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

async fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| Error::io(e, dir))?;
    while let Some(entry) = entries.next_entry().await.map_err(|e| Error::io(e, dir))? {
        let path = entry.path();
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'));
        if !hidden && tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_dir()) {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok_and(|m| m.is_file())
}

async fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::io(e, path))?;
    serde_yaml::from_str(&text).map_err(|e| Error::Yaml {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_discover_and_load_course() {
        let root = TempDir::new().unwrap();
        fixtures::write_course(root.path());
        std::fs::create_dir(root.path().join("not-a-course")).unwrap();

        let courses = discover_courses(root.path()).await.unwrap();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].0, "rust-101");

        let course = load_course(&courses[0].1, false).await.unwrap();
        assert_eq!(course.title, "Rust 101");
        let slugs: Vec<_> = course.modules.iter().map(|m| m.slug.as_str()).collect();
        assert_eq!(slugs, ["ownership", "borrowing"]);

        let ownership = &course.modules[0];
        let lessons: Vec<_> = ownership.lessons.iter().map(|l| l.slug.as_str()).collect();
        assert_eq!(lessons, ["what-is-ownership", "moves"]);
        assert_eq!(ownership.lessons[1].title, "Moves");
        assert!(ownership.knowledge_check.is_some());
        assert_eq!(course.total_lessons(), 3);
    }

    #[tokio::test]
    async fn test_drafts_included_on_request() {
        let root = TempDir::new().unwrap();
        fixtures::write_course(root.path());
        let course = load_course(&root.path().join("rust-101"), true).await.unwrap();
        assert_eq!(course.modules[0].lessons.len(), 3);
        assert!(course.modules[0].lessons[2].draft);
    }

    #[tokio::test]
    async fn test_frontmatter_order_sorts_lessons() {
        let root = TempDir::new().unwrap();
        let module = root.path().join("m");
        std::fs::create_dir(&module).unwrap();
        std::fs::write(module.join("module.yaml"), "title: M\n").unwrap();
        std::fs::write(module.join("a.mdx"), "---\norder: 2\n---\n# A\n").unwrap();
        std::fs::write(module.join("b.mdx"), "---\norder: 1\n---\n# B\n").unwrap();
        std::fs::write(module.join("c.mdx"), "# C\n").unwrap();

        let loaded = load_module(&module, false).await.unwrap();
        let slugs: Vec<_> = loaded.lessons.iter().map(|l| l.slug.as_str()).collect();
        assert_eq!(slugs, ["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_missing_listed_lesson_is_invalid() {
        let root = TempDir::new().unwrap();
        let module = root.path().join("m");
        std::fs::create_dir(&module).unwrap();
        std::fs::write(module.join("module.yaml"), "title: M\nlessons: [ghost]\n").unwrap();

        let err = load_module(&module, false).await.unwrap_err();
        assert!(matches!(err, Error::Invalid { .. }));
        assert!(err.to_string().contains("ghost"));
    }

    #[tokio::test]
    async fn test_duplicate_lesson_slug_is_invalid() {
        let root = TempDir::new().unwrap();
        let module = root.path().join("m");
        std::fs::create_dir(&module).unwrap();
        std::fs::write(module.join("module.yaml"), "title: M\n").unwrap();
        std::fs::write(module.join("01-intro.mdx"), "# One\n").unwrap();
        std::fs::write(module.join("02-intro.mdx"), "# Two\n").unwrap();

        let err = load_module(&module, false).await.unwrap_err();
        assert!(err.to_string().contains("duplicate lesson slug 'intro'"));
    }

    #[tokio::test]
    async fn test_bad_yaml_reports_path() {
        let root = TempDir::new().unwrap();
        let course = root.path().join("broken");
        std::fs::create_dir(&course).unwrap();
        std::fs::write(course.join("course.yaml"), "title: [unclosed\n").unwrap();

        let err = load_course(&course, false).await.unwrap_err();
        assert!(matches!(err, Error::Yaml { .. }));
    }

    #[tokio::test]
    async fn test_load_lesson_compiles_body() {
        let root = TempDir::new().unwrap();
        fixtures::write_course(root.path());
        let course = load_course(&root.path().join("rust-101"), false).await.unwrap();
        let module = &course.modules[0];
        let lesson = load_lesson(&course, module, &module.lessons[1]).await.unwrap();

        assert_eq!(lesson.components, vec!["Diagram".to_string()]);
        assert!(lesson.html.contains("<h1 id=\"moves\">Moves</h1>"));
        assert_eq!(lesson.duration_minutes, 1);

        let first = load_lesson(&course, module, &module.lessons[0]).await.unwrap();
        assert_eq!(first.duration_minutes, 10);
    }
}
