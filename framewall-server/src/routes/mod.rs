//! Router assembly.

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::{
    handlers::{pages, stream},
    middleware::security::SecurityHeadersLayer,
    state::AppState,
};

/// Build the full application router.
///
/// Every listener shard serves this same router; port sharding only spreads
/// connection load, it never partitions the topic set. The catch-all topic
/// route is registered last so the discovery endpoints win on exact match.
pub fn create_router(state: AppState, serving_tls: bool) -> Router {
    let security = SecurityHeadersLayer::new(&state.config.security.hsts, serving_tls);

    Router::new()
        .route("/", get(pages::index))
        .route("/health", get(pages::health))
        .route("/topics", get(pages::topics))
        .route("/{topic}", get(stream::stream_topic))
        .layer(security)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
