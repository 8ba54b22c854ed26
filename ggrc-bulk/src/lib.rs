//! ggrc-bulk library - GGRC bulk operations service
//!
//! Bulk complete / verify / save of assessments and the `/cavs/search`
//! attribute matrix used by the bulk edit grid.

use std::sync::Arc;

use axum::Router;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod bulk;
pub mod error;
pub mod notifications;
pub mod statusaffected;

pub use crate::error::{ApiError, ApiResult};

use crate::bulk::normalizer::Normalizer;
use crate::notifications::{LogNotifier, Notifier};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Per-type value normalizer, built once at startup
    pub normalizer: Arc<Normalizer>,
    /// Receiver of bulk operation result notifications
    pub notifier: Arc<dyn Notifier>,
    /// Base URL of the GGRC web application (no trailing slash)
    pub app_url: String,
}

impl AppState {
    /// Create new application state with the logging notifier
    pub fn new(db: SqlitePool, app_url: impl Into<String>) -> Self {
        Self {
            db,
            normalizer: Arc::new(Normalizer::new()),
            notifier: Arc::new(LogNotifier),
            app_url: app_url.into(),
        }
    }

    /// Replace the notifier (e.g. with an email sender)
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::bulk_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
