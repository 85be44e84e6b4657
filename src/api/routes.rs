use axum::http::{header, Method};
use axum::{
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::api::handlers::{self, AppState};

/// Create the router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/recipes/search", get(handlers::filter_search))
        .route("/recipes/:id", get(handlers::get_recipe))
        .route("/tags", get(handlers::list_tags))
        .route("/categories", get(handlers::list_categories))
        .route("/search", post(handlers::hybrid_search))
        .route("/admin/reindex", post(handlers::start_reindex))
        .route("/admin/reindex/status", get(handlers::reindex_status))
        .route("/admin/reindex/reload", post(handlers::reload_index))
        .route("/stats", get(handlers::get_stats))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .with_state(state);

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .layer(
            // Read-only public API, open CORS
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
                .allow_origin(tower_http::cors::Any)
                .max_age(Duration::from_secs(3600)),
        )
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}
