use crate::adapter::PlatformAdapter;
use crate::{filter, select, token};
use chrono::Utc;
use database::Database;
use llm_interface::ReplyGenerator;
use replyflow_core::{
    Account, Candidate, InteractionRecord, LogLevel, PipelineError, PlatformCredentials,
    RunOutcome, StorageError,
};
use serde_json::json;
use tracing::{info, warn};

/// Upper bound on one run; a run killed mid-flight frees its lease this
/// long after acquiring it.
pub const RUN_LEASE_TTL_SECS: i64 = 10 * 60;

const SNIPPET_CHARS: usize = 200;

/// Runs the full reply pipeline for one account: token, fetch, filter,
/// select, generate, publish, record.
///
/// The account lease makes overlapping invocations (a manual test trigger
/// racing a scheduled run) fail fast instead of double-publishing. Any
/// stage failure is terminal for the run and logged; only the final
/// recording step is allowed to fail without changing the outcome.
pub async fn run_pipeline<A, G>(
    db: &Database,
    generator: &G,
    adapter: &A,
    account: &Account,
) -> Result<RunOutcome, PipelineError>
where
    A: PlatformAdapter,
    G: ReplyGenerator,
{
    if !db
        .try_acquire_run_lease(&account.id, RUN_LEASE_TTL_SECS)
        .await?
    {
        warn!("Run already in progress for account {}", account.id);
        return Err(PipelineError::RunInProgress {
            account_id: account.id.clone(),
        });
    }

    let result = run_stages(db, generator, adapter, account).await;

    if let Err(e) = db.release_run_lease(&account.id).await {
        warn!("Failed to release run lease for {}: {}", account.id, e);
    }

    if let Err(e) = &result {
        log(
            db,
            &account.id,
            LogLevel::Error,
            &format!("Pipeline failed at {} stage: {e}", e.stage()),
            None,
        )
        .await;
    }

    result
}

async fn run_stages<A, G>(
    db: &Database,
    generator: &G,
    adapter: &A,
    account: &Account,
) -> Result<RunOutcome, PipelineError>
where
    A: PlatformAdapter,
    G: ReplyGenerator,
{
    let platform = adapter.platform();
    log(
        db,
        &account.id,
        LogLevel::Info,
        &format!("Starting {platform} reply pipeline"),
        None,
    )
    .await;

    let creds = db
        .get_credentials(&account.id)
        .await?
        .filter(PlatformCredentials::is_connected)
        .ok_or_else(|| PipelineError::Disconnected {
            platform: platform.to_string(),
        })?;

    let access_token = ensure_valid_token(db, adapter, account, &creds).await?;

    let candidates = adapter.fetch_candidates(&access_token).await?;
    log(
        db,
        &account.id,
        LogLevel::Info,
        &format!("Fetched {} candidates from {platform}", candidates.len()),
        None,
    )
    .await;

    let content_ids: Vec<String> = candidates.iter().map(|c| c.id.clone()).collect();
    let already_replied = db.find_replied_ids(&account.id, &content_ids).await?;

    let eligible = filter::eligible_candidates(
        candidates,
        &already_replied,
        adapter.minimum_engagement(),
        adapter.own_identity(),
        |author| adapter.is_deleted_author(author),
    );

    let Some(candidate) = select::select_candidate(eligible) else {
        log(
            db,
            &account.id,
            LogLevel::Info,
            "No eligible posts found",
            None,
        )
        .await;
        return Ok(RunOutcome::no_eligible_content());
    };
    info!(
        "Selected candidate {} by {} ({} engagement)",
        candidate.id, candidate.author, candidate.engagement
    );

    let settings =
        db.get_llm_settings(&account.id)
            .await?
            .ok_or_else(|| PipelineError::ConfigMissing {
                field: "llm settings".to_string(),
            })?;

    let reply = generator
        .generate(&settings, &candidate, &adapter.reply_context())
        .await?;
    log(
        db,
        &account.id,
        LogLevel::Info,
        &format!("Generated reply ({} characters)", reply.chars().count()),
        None,
    )
    .await;

    let reply_id = adapter
        .publish_reply(&access_token, &candidate, &reply)
        .await?;
    log(
        db,
        &account.id,
        LogLevel::Success,
        &format!("Replied to {} by {}", candidate.id, candidate.author),
        Some(&json!({
            "contentId": candidate.id,
            "replyId": reply_id,
            "engagement": candidate.engagement,
        })),
    )
    .await;

    // The reply is live from here on; losing the record only risks a
    // future duplicate, which is the lesser failure.
    if let Err(e) = record_interaction(db, adapter, account, &candidate, &reply, &reply_id).await {
        warn!(
            "Failed to record interaction for account {}: {}",
            account.id, e
        );
        log(
            db,
            &account.id,
            LogLevel::Warning,
            &format!("Reply posted but interaction record failed: {e}"),
            None,
        )
        .await;
    }

    Ok(RunOutcome::replied(&candidate, &reply))
}

/// Returns a platform-accepted access token, refreshing (and persisting)
/// it first when it is within the reuse margin of expiry.
async fn ensure_valid_token<A>(
    db: &Database,
    adapter: &A,
    account: &Account,
    creds: &PlatformCredentials,
) -> Result<String, PipelineError>
where
    A: PlatformAdapter,
{
    let current = creds
        .access_token
        .clone()
        .ok_or_else(|| PipelineError::Disconnected {
            platform: adapter.platform().to_string(),
        })?;

    if !token::needs_refresh(creds.expires_at, Utc::now()) {
        return Ok(current);
    }

    let grant = adapter.refresh_token(creds).await?;

    // Persist before any platform call: the platform may have rotated the
    // refresh token, and losing the new one strands the account.
    db.update_tokens(&account.id, &grant).await?;
    log(
        db,
        &account.id,
        LogLevel::Info,
        "Access token refreshed",
        None,
    )
    .await;

    Ok(grant.access_token)
}

async fn record_interaction<A>(
    db: &Database,
    adapter: &A,
    account: &Account,
    candidate: &Candidate,
    reply: &str,
    reply_id: &str,
) -> Result<(), StorageError>
where
    A: PlatformAdapter,
{
    let record = InteractionRecord {
        account_id: account.id.clone(),
        content_id: candidate.id.clone(),
        author: candidate.author.clone(),
        snippet: snippet_of(candidate),
        engagement: candidate.engagement,
        reply_text: reply.to_string(),
        reply_id: reply_id.to_string(),
        replied_at: Utc::now(),
    };
    db.upsert_interaction(&record).await?;
    db.prune_interactions(&account.id, adapter.retention())
        .await?;
    Ok(())
}

fn snippet_of(candidate: &Candidate) -> String {
    let source = candidate.title.as_deref().unwrap_or(&candidate.body);
    if source.chars().count() <= SNIPPET_CHARS {
        source.to_string()
    } else {
        source.chars().take(SNIPPET_CHARS).collect()
    }
}

/// The activity log is best-effort: a logging outage must never turn into
/// a pipeline failure.
async fn log(
    db: &Database,
    account_id: &str,
    level: LogLevel,
    message: &str,
    metadata: Option<&serde_json::Value>,
) {
    if let Err(e) = db.append_log(account_id, level, message, metadata).await {
        warn!("Failed to append activity log for {}: {}", account_id, e);
    }
}
