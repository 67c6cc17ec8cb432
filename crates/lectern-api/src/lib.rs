//! Lectern HTTP API.
//!
//! JSON over HTTP with axum. Routes are grouped by concern under
//! `routes/`; authentication is the `lectern-auth` tower middleware and
//! role checks are extractors.
//!
//! # Example
//!
//! ```rust,no_run
//! use lectern_api::Server;
//! use lectern_core::LecternConfig;
//!
//! # async fn run() -> lectern_api::Result<()> {
//! Server::bind(LecternConfig::default()).await?.serve().await
//! # }
//! ```

pub mod error;
pub mod extract;
mod routes;
pub mod server;
pub mod state;

pub use error::{ApiError, Error, Result};
pub use extract::{CurrentUser, RequireAdmin, RequireReviewer};
pub use routes::router;
pub use server::Server;
pub use state::AppState;
