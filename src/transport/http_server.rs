use std::sync::Arc;

use axum::{Router, middleware, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    server::AppState,
    transport::{
        bridge::gateway_handler,
        middleware::add_response_headers,
        routes::{live, scores},
    },
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(scores::index))
        .route("/scores", get(scores::list_scores))
        .route("/readable", get(scores::readable_duration))
        .route("/ws/score", get(live::score_socket))
        .route("/gateway", get(gateway_handler))
        .layer(middleware::from_fn(add_response_headers))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
