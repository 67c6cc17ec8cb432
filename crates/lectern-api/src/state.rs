//! Shared application state.

use std::sync::Arc;

use lectern_auth::{AuthMode, DEV_USER_EMAIL, DEV_USER_ID, OidcValidator, Role, SessionTokens};
use lectern_content::ContentResolver;
use lectern_core::LecternConfig;
use lectern_progress::{KnowledgeEngine, ProgressTracker};
use lectern_storage::Database;
use tracing::{info, warn};

use crate::error::Result;

/// Everything a handler needs. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<LecternConfig>,
    pub content: Arc<ContentResolver>,
    pub db: Database,
    pub progress: ProgressTracker,
    pub knowledge: KnowledgeEngine,
    pub sessions: Arc<SessionTokens>,
    pub oidc: Option<Arc<OidcValidator>>,
}

impl AppState {
    /// Open the database and content root named in `config`.
    pub async fn from_config(config: LecternConfig) -> Result<Self> {
        config.validate()?;
        let db = Database::open(&config.database.url, config.database.max_connections).await?;
        let content = ContentResolver::new(config.content.root.clone())
            .with_cache(config.content.cache)
            .include_drafts(config.content.include_drafts);
        Self::new(config, content, db).await
    }

    /// Assemble state from already-open parts.
    ///
    /// In dev mode the dev user row is created so progress rows have an
    /// owner.
    pub async fn new(config: LecternConfig, content: ContentResolver, db: Database) -> Result<Self> {
        if config.auth.mode == AuthMode::Dev {
            warn!("Authentication is disabled (auth.mode = \"dev\")");
            db.ensure_user(
                DEV_USER_ID,
                DEV_USER_EMAIL,
                Some("Developer"),
                Role::Admin.as_str(),
            )
            .await?;
        }

        let content = Arc::new(content);
        let progress = ProgressTracker::new(Arc::clone(&content), db.clone());
        let knowledge = KnowledgeEngine::new(progress.clone());
        let sessions = Arc::new(SessionTokens::from_settings(&config.auth));
        let oidc = OidcValidator::from_settings(&config.auth).map(Arc::new);
        if config.auth.mode == AuthMode::Oidc && oidc.is_none() {
            warn!("auth.mode = \"oidc\" but the provider is not fully configured");
        }

        info!(
            mode = %config.auth.mode,
            content_root = %content.root().display(),
            "Application state ready"
        );
        Ok(Self {
            config: Arc::new(config),
            content,
            db,
            progress,
            knowledge,
            sessions,
            oidc,
        })
    }

    /// Role for a newly seen account.
    pub fn initial_role(&self, email: &str) -> Role {
        if self.config.auth.is_admin_email(email) {
            Role::Admin
        } else {
            Role::Learner
        }
    }
}
