//! Handlers for `serve`, `content`, and `user`.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use lectern_api::Server;
use lectern_auth::Role;
use lectern_auth::password::{check_strength, hash_password};
use lectern_content::{ContentIssue, ContentResolver, Severity};
use lectern_core::LecternConfig;
use lectern_storage::{Database, UserRecord};
use tracing::{info, warn};

use crate::cli::{ContentAction, ServeArgs, UserAction};

// ============================================================================
// serve
// ============================================================================

/// Apply `serve` flags on top of the loaded configuration.
pub fn apply_serve_args(config: &mut LecternConfig, args: ServeArgs) {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(dir) = args.content_dir {
        config.content.root = dir;
    }
    if let Some(url) = args.database_url {
        config.database.url = url;
    }
}

/// Run the API server until Ctrl-C or SIGTERM.
pub async fn serve(mut config: LecternConfig, args: ServeArgs) -> anyhow::Result<()> {
    apply_serve_args(&mut config, args);
    info!(
        address = %config.server.address(),
        content_root = %config.content.root.display(),
        "Starting lectern"
    );
    let server = Server::bind(config).await.context("failed to start server")?;
    server.serve().await?;
    Ok(())
}

// ============================================================================
// content
// ============================================================================

/// One row of `content list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseListing {
    pub slug: String,
    pub title: String,
    pub lessons: usize,
    pub published: bool,
}

/// Every course under `resolver`'s root, published or not. Courses that
/// fail to load are skipped with a warning.
pub async fn list_courses(resolver: &ContentResolver) -> anyhow::Result<Vec<CourseListing>> {
    let mut listings = Vec::new();
    for slug in resolver.course_slugs().await? {
        match resolver.course(&slug).await {
            Ok(course) => listings.push(CourseListing {
                lessons: course.total_lessons(),
                title: course.title.clone(),
                published: course.published,
                slug,
            }),
            Err(e) => warn!(course = %slug, error = %e, "Skipping course"),
        }
    }
    Ok(listings)
}

/// Validate every course (drafts included) under `root`.
pub async fn validate_content(root: &Path) -> anyhow::Result<Vec<ContentIssue>> {
    let resolver = ContentResolver::new(root)
        .with_cache(false)
        .include_drafts(true);
    Ok(resolver.validate_all().await?)
}

fn content_root(config: &LecternConfig, override_dir: Option<PathBuf>) -> PathBuf {
    override_dir.unwrap_or_else(|| config.content.root.clone())
}

/// Dispatch a `content` subcommand.
pub async fn handle_content_command(
    config: &LecternConfig,
    action: ContentAction,
) -> anyhow::Result<()> {
    match action {
        ContentAction::Validate { content_dir } => {
            let root = content_root(config, content_dir);
            let issues = validate_content(&root).await?;
            for issue in &issues {
                println!("{issue}");
            }
            let errors = issues
                .iter()
                .filter(|i| i.severity == Severity::Error)
                .count();
            println!(
                "{} error(s), {} warning(s) in {}",
                errors,
                issues.len() - errors,
                root.display()
            );
            if errors > 0 {
                bail!("content validation failed with {errors} error(s)");
            }
            Ok(())
        }
        ContentAction::List { content_dir } => {
            let root = content_root(config, content_dir);
            let resolver = ContentResolver::new(&root)
                .with_cache(false)
                .include_drafts(config.content.include_drafts);
            for course in list_courses(&resolver).await? {
                let marker = if course.published { "" } else { " (unpublished)" };
                println!(
                    "{:<28} {:>4} lessons  {}{marker}",
                    course.slug, course.lessons, course.title
                );
            }
            Ok(())
        }
    }
}

// ============================================================================
// user
// ============================================================================

fn parse_role(role: &str) -> anyhow::Result<Role> {
    role.parse::<Role>().map_err(anyhow::Error::msg)
}

/// Create a local account with a hashed password.
pub async fn create_user(
    db: &Database,
    email: &str,
    password: &str,
    role: &str,
    name: Option<&str>,
) -> anyhow::Result<UserRecord> {
    let role = parse_role(role)?;
    check_strength(password)?;
    let hash = hash_password(password)?;
    Ok(db
        .create_local_user(email, name, &hash, role.as_str())
        .await?)
}

/// Change the role of the user with `email`.
pub async fn set_user_role(db: &Database, email: &str, role: &str) -> anyhow::Result<UserRecord> {
    let role = parse_role(role)?;
    let user = db
        .user_by_email(email)
        .await?
        .with_context(|| format!("no user with email {email}"))?;
    Ok(db.set_role(&user.id, role.as_str()).await?)
}

/// Dispatch a `user` subcommand against the configured database.
pub async fn handle_user_command(config: &LecternConfig, action: UserAction) -> anyhow::Result<()> {
    let db = Database::open(&config.database.url, config.database.max_connections)
        .await
        .with_context(|| format!("failed to open database {}", config.database.url))?;

    let result = match action {
        UserAction::Create {
            email,
            password,
            role,
            name,
        } => create_user(&db, &email, &password, &role, name.as_deref())
            .await
            .map(|user| println!("Created {} {} ({})", user.role, user.email, user.id)),
        UserAction::SetRole { email, role } => set_user_role(&db, &email, &role)
            .await
            .map(|user| println!("{} is now {}", user.email, user.role)),
    };
    db.close().await;
    result
}
