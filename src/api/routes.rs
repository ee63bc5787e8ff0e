use crate::AppState;
use crate::api::handlers::research;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(research::health))
        .route("/research", post(research::deep_research))
        .route("/research/stream", post(research::research_stream))
}

/// The full application: API routes under `/api` with tracing and CORS.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", create_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
