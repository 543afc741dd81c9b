use axum::{
    routing::{get, post},
    Router,
};
use sigrelay_core::RelayConfig;
use sigrelay_hub::Broadcaster;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Central shared state, passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: RelayConfig,
    /// Sole owner of the signal history and the subscriber registry.
    pub broadcaster: Broadcaster,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Self {
        let broadcaster = Broadcaster::new(&config.hub);
        Self {
            config,
            broadcaster,
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = state.config.gateway.cors;

    let router = Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/events", get(crate::sse::events::events_handler))
        .route("/webhook", post(crate::http::ingest::webhook_handler))
        .route("/test", post(crate::http::ingest::test_handler))
        .route(
            "/signals",
            get(crate::http::signals::list_handler).delete(crate::http::signals::clear_handler),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}
