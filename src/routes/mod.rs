pub mod analysis;
pub mod application;
pub mod archive;
pub mod booking;
pub mod health;
pub mod schedule;

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::middleware::{
    auth::require_reviewer,
    rate_limit::{rps_middleware, RateLimiter},
};
use crate::AppState;

/// Public endpoints (candidate submission, scorer callback) and the
/// reviewer API, each group behind its own request budget.
pub fn router(state: AppState, api_rps: u32, public_rps: u32) -> Router {
    let reviewer_api = Router::new()
        .route("/api/applications", get(application::list_applications))
        .route(
            "/api/applications/archived",
            get(application::list_archived_applications),
        )
        .route("/api/applications/archive", put(archive::archive_applications))
        .route(
            "/api/applications/unarchive",
            put(archive::unarchive_applications),
        )
        .route(
            "/api/applications/bulk-delete",
            post(archive::bulk_delete_applications),
        )
        .route("/api/applications/:id", get(application::get_application))
        .route(
            "/api/applications/:id/history",
            get(application::get_application_history),
        )
        .route(
            "/api/applications/:id/status",
            patch(application::update_application_status),
        )
        .route(
            "/api/applications/:id/schedule",
            post(schedule::schedule_interview),
        )
        .route(
            "/api/bookings",
            get(booking::list_bookings).post(booking::create_booking),
        )
        .route(
            "/api/bookings/:id",
            axum::routing::delete(booking::delete_booking),
        )
        .layer(axum::middleware::from_fn(require_reviewer))
        .layer(axum::middleware::from_fn_with_state(
            RateLimiter::new(api_rps),
            rps_middleware,
        ));

    let public_api = Router::new()
        .route("/api/applications", post(application::submit_application))
        .route(
            "/api/applications/:id/analysis-result",
            post(analysis::receive_analysis_result),
        )
        .layer(axum::middleware::from_fn_with_state(
            RateLimiter::new(public_rps),
            rps_middleware,
        ));

    Router::new()
        .route("/health", get(health::health))
        .merge(reviewer_api)
        .merge(public_api)
        .with_state(state)
}
