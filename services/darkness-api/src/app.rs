//! Router assembly.

use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::rate_limit::{self, GuardedOperation};
use crate::state::AppState;

/// Build the service router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let guarded = Router::new()
        .route("/darkness", get(handlers::darkness::darkness_handler))
        .route_layer(middleware::from_fn_with_state(
            GuardedOperation::darkness(),
            rate_limit::enforce,
        ));

    Router::new()
        .merge(guarded)
        .route("/status", get(handlers::status::status_handler))
        // Health and metrics
        .route("/health", get(handlers::health::health_handler))
        .route("/ready", get(handlers::health::ready_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        // Middleware
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
