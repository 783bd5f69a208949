//! camgate library -- authenticated gateway to a date-partitioned camera bucket.
//!
//! Objects are keyed `YYYY/MM/DD/filename`. The gateway renders an HTML
//! index per date and streams individual `.jpg`/`.avi` objects, all behind
//! HTTP Basic authentication.

use std::sync::Arc;

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod html;
pub mod metrics;
pub mod routing;
pub mod server;
pub mod storage;

use crate::auth::CredentialStore;
use crate::config::Config;
use crate::storage::backend::ObjectStore;

/// Shared application state passed to all handlers via `axum::extract::State`.
///
/// Built once before any listener starts; never mutated afterwards.
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// Username -> bcrypt hash map.
    pub credentials: CredentialStore,
    /// Object store holding the camera files.
    pub storage: Arc<dyn ObjectStore>,
}
