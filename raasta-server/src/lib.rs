//! raasta-server library
//!
//! HTTP surface for traffic reports: submission with an optional photo, listing,
//! engagement (likes, votes, comments, views), moderation and soft delete.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use raasta_common::PhotoStore;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

pub mod api;
pub mod config;
pub mod error;

pub use api::{ActingUser, SessionVerifier, TokenTable};
pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};

/// Room for the text fields and multipart framing around a maximum-size photo
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub photos: Arc<dyn PhotoStore>,
    pub sessions: Arc<dyn SessionVerifier>,
    pub max_photo_bytes: usize,
    /// Served under `/photos` when set
    pub photo_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        photos: Arc<dyn PhotoStore>,
        sessions: Arc<dyn SessionVerifier>,
        max_photo_bytes: usize,
    ) -> Self {
        Self {
            db,
            photos,
            sessions,
            max_photo_bytes,
            photo_dir: None,
        }
    }

    pub fn with_photo_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.photo_dir = Some(dir.into());
        self
    }
}

/// Build application router
///
/// Authentication is enforced per handler by the [`ActingUser`] extractor; listing,
/// single-report reads and `/health` are public.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_photo_bytes + FORM_OVERHEAD_BYTES;

    let reports = Router::new()
        .route(
            "/",
            get(api::reports::list_reports).post(api::reports::create_report),
        )
        .route("/my-reports", get(api::reports::my_reports))
        .route(
            "/:id",
            get(api::reports::get_report).delete(api::reports::delete_report),
        )
        .route(
            "/:id/like",
            post(api::engagement::like_report).delete(api::engagement::unlike_report),
        )
        .route("/:id/vote", post(api::engagement::vote_report))
        .route("/:id/comments", post(api::engagement::comment_report))
        .route("/:id/view", post(api::engagement::view_report))
        .route("/:id/verify", post(api::moderation::verify_report))
        .route("/:id/reject", post(api::moderation::reject_report))
        .route("/:id/resolve", post(api::moderation::resolve_report))
        .layer(DefaultBodyLimit::max(body_limit));

    let mut app = Router::new()
        .nest("/api/reports", reports)
        .merge(api::health_routes());

    if let Some(dir) = state.photo_dir.clone() {
        app = app.nest_service("/photos", ServeDir::new(dir));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}
