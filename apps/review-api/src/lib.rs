//! Review API - comment threads and annotated archives for PDF reviews
//!
//! Provides REST endpoints for:
//! - Comment listing, creation, edits and soft deletion
//! - Per-user read markers
//! - Uploading, following, closing, reopening and deleting reviews
//! - Export of comment threads as JSON and as annotated PDF/PNG archives
//! - Activity: an RSS feed per review and an administrator view
//!
//! Identity comes from the authenticating proxy (see [`auth`]).

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

pub mod auth;
pub mod config;
pub mod error;
pub mod feed;
pub mod handlers;
pub mod models;
pub mod runner;
pub mod state;

pub use config::Config;
pub use state::AppState;

/// Largest PDF accepted for a new review
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Build the API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Reviews
        .route(
            "/api/reviews",
            get(handlers::list_my_reviews)
                .post(handlers::upload_review)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/reviews/:review", delete(handlers::delete_review))
        .route(
            "/api/reviews/:review/follow",
            post(handlers::follow_review).delete(handlers::unfollow_review),
        )
        // Comments
        .route(
            "/api/reviews/:review/comments",
            get(handlers::list_comments).post(handlers::add_comment),
        )
        .route(
            "/api/reviews/:review/comments/:id",
            delete(handlers::delete_comment),
        )
        .route(
            "/api/reviews/:review/comments/:id/status",
            put(handlers::update_status),
        )
        .route(
            "/api/reviews/:review/comments/:id/message",
            put(handlers::update_message),
        )
        .route(
            "/api/reviews/:review/comments/:id/read",
            put(handlers::mark_read),
        )
        // Review state
        .route("/api/reviews/:review/close", post(handlers::close_review))
        .route("/api/reviews/:review/reopen", post(handlers::reopen_review))
        // Export
        .route("/api/reviews/:review/export", get(handlers::export_comments))
        .route(
            "/api/reviews/:review/archive",
            get(handlers::archive_get).post(handlers::archive_post),
        )
        // Activity
        .route("/rss/:review", get(handlers::review_feed))
        // Administration
        .route("/api/admin/reviews", get(handlers::all_reviews))
        .route("/api/admin/activity", get(handlers::all_activity))
        .with_state(state)
}
