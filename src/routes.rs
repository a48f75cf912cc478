use crate::middleware::internal_auth_middleware;
use crate::state::AppState;
use crate::handlers;
use axum::{middleware, routing::get, routing::post, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn create_router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new().route("/version", get(version));

    let protected_routes = Router::new()
        .route("/{platform}/run", post(handlers::run_platform_pipeline))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            internal_auth_middleware,
        ));

    public_routes
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn version() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "service": "replyflow",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
