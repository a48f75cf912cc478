use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

pub const INTERNAL_SECRET_HEADER: &str = "x-internal-secret";

/// Gates scheduler-originated run triggers behind the shared internal
/// secret. User-facing "test pipeline" calls arrive through the dashboard
/// backend, which holds the same secret.
pub async fn internal_auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let presented = request
        .headers()
        .get(INTERNAL_SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("missing internal secret".to_string()))?;

    if presented != state.internal_secret {
        return Err(ApiError::Unauthorized("invalid internal secret".to_string()));
    }

    Ok(next.run(request).await)
}
