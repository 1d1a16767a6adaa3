use axum::{
    http::{header, HeaderValue},
    middleware,
    routing::get,
    Router,
};
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Instant;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use super::handlers::*;
use super::metrics::{count_requests, metrics_handler};
use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::store::RowStore;

pub fn create_router(store: RowStore, config: &ServerConfig) -> Router {
    let state = AppState {
        dispatcher: Dispatcher::new(store, config),
        startup_time: Instant::now(),
        request_counter: Arc::new(AtomicU64::new(0)),
    };

    Router::new()
        // Serialization
        .route("/json", get(json_handler))
        .route("/plaintext", get(plaintext_handler))
        .route("/json1k", get(json1k_handler))
        .route("/json10k", get(json10k_handler))
        // Database
        .route("/db", get(db_handler))
        .route("/queries", get(queries_handler))
        .route("/update", get(update_handler))
        .route("/fortune", get(fortune_handler))
        // Monitoring
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn_with_state(state.clone(), count_requests))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::SERVER,
            HeaderValue::from_static("worldbench"),
        ))
}
