use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use pipeline::{
    run_pipeline, InstagramAdapter, RedditAdapter, TwitterAdapter, YouTubeAdapter,
};
use replyflow_core::{
    InstagramConfig, Platform, RedditConfig, RunOutcome, TwitterConfig, YouTubeConfig,
};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub account_id: String,
}

/// `POST /{platform}/run` — runs one reply pipeline invocation for the
/// account and reports the structured outcome.
pub async fn run_platform_pipeline(
    State(state): State<std::sync::Arc<AppState>>,
    Path(platform): Path<String>,
    Json(request): Json<RunRequest>,
) -> ApiResult<Json<RunOutcome>> {
    let platform: Platform = platform
        .parse()
        .map_err(|_| ApiError::NotFound(format!("unknown platform: {platform}")))?;

    let account = state
        .db
        .get_account(&request.account_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("unknown account: {}", request.account_id)))?;

    if account.platform != platform {
        return Err(ApiError::BadRequest(format!(
            "account {} is not a {platform} account",
            account.id
        )));
    }

    let config = state
        .db
        .get_platform_config(&account.id)
        .await?
        .ok_or_else(|| {
            ApiError::BadRequest("automation is not configured for this account".to_string())
        })?;

    if !account.automation_enabled || !config.enabled {
        // A scheduler tick racing a settings change is a no-op, not an
        // error.
        return Ok(Json(RunOutcome::skipped("Automation is disabled")));
    }

    let creds = state
        .db
        .get_credentials(&account.id)
        .await?
        .ok_or_else(|| {
            ApiError::Unauthorized(format!("{platform} account is not connected"))
        })?;
    let identity = creds.platform_username.clone().unwrap_or_default();

    info!("Run trigger for {} account {}", platform, account.id);

    let outcome = match platform {
        Platform::Twitter => {
            let params: TwitterConfig = serde_json::from_value(config.params)
                .map_err(|e| ApiError::BadRequest(format!("invalid twitter config: {e}")))?;
            let adapter = TwitterAdapter::new(params, identity)?;
            run_pipeline(&state.db, &state.llm, &adapter, &account).await?
        }
        Platform::Reddit => {
            let params: RedditConfig = serde_json::from_value(config.params)
                .map_err(|e| ApiError::BadRequest(format!("invalid reddit config: {e}")))?;
            let adapter = RedditAdapter::new(params, identity)?;
            run_pipeline(&state.db, &state.llm, &adapter, &account).await?
        }
        Platform::YouTube => {
            let params: YouTubeConfig = serde_json::from_value(config.params)
                .map_err(|e| ApiError::BadRequest(format!("invalid youtube config: {e}")))?;
            let adapter = YouTubeAdapter::new(params, identity);
            run_pipeline(&state.db, &state.llm, &adapter, &account).await?
        }
        Platform::Instagram => {
            let params: InstagramConfig = serde_json::from_value(config.params)
                .map_err(|e| ApiError::BadRequest(format!("invalid instagram config: {e}")))?;
            let adapter = InstagramAdapter::new(params, identity);
            run_pipeline(&state.db, &state.llm, &adapter, &account).await?
        }
    };

    Ok(Json(outcome))
}
