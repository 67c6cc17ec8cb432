//! Authenticated user identity and extraction helpers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// User id injected in dev mode.
pub const DEV_USER_ID: &str = "dev-user";

/// Email of the user injected in dev mode.
pub const DEV_USER_EMAIL: &str = "dev@localhost";

/// What a user may do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Takes courses.
    #[default]
    Learner,
    /// Can also annotate lessons.
    Reviewer,
    /// Can do everything.
    Admin,
}

impl Role {
    /// Stable string form, as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Learner => "learner",
            Self::Reviewer => "reviewer",
            Self::Admin => "admin",
        }
    }

    /// Reviewers and admins.
    pub fn can_review(&self) -> bool {
        matches!(self, Self::Reviewer | Self::Admin)
    }

    /// Admins only.
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "learner" => Ok(Self::Learner),
            "reviewer" => Ok(Self::Reviewer),
            "admin" => Ok(Self::Admin),
            other => Err(format!(
                "unknown role '{other}' (expected learner, reviewer, or admin)"
            )),
        }
    }
}

/// An authenticated user identity, extracted from a validated token.
///
/// Stored in HTTP request extensions by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// Stable user id (the `users.id` primary key).
    pub id: String,
    /// The user's email address.
    pub email: String,
    /// Name to show in the UI.
    pub display_name: Option<String>,
    /// Permissions.
    pub role: Role,
}

impl AuthenticatedUser {
    /// The fixed user injected in dev mode.
    pub fn dev(display_name: Option<String>) -> Self {
        Self {
            id: DEV_USER_ID.to_string(),
            email: DEV_USER_EMAIL.to_string(),
            display_name,
            role: Role::Admin,
        }
    }
}

/// Extract the `AuthenticatedUser` from HTTP request `Parts`, if present.
pub fn user_from_parts(parts: &http::request::Parts) -> Option<&AuthenticatedUser> {
    parts.extensions.get::<AuthenticatedUser>()
}

/// Extract the user's email from HTTP request `Parts`.
///
/// Returns `"anonymous"` if no authenticated user is present.
pub fn email_from_parts(parts: &http::request::Parts) -> &str {
    parts
        .extensions
        .get::<AuthenticatedUser>()
        .map(|u| u.email.as_str())
        .unwrap_or("anonymous")
}
