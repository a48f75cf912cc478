use chrono::{Duration, Utc};
use database::Database;
use llm_interface::ReplyGenerator;
use pipeline::adapter::PlatformAdapter;
use pipeline::run_pipeline;
use replyflow_core::{
    Account, AuthError, Candidate, FetchError, InteractionRecord, LlmError, LlmSettings, LogLevel,
    PipelineError, Platform, PlatformCredentials, PublishError, ReplyContext, RetentionPolicy,
    TokenGrant,
};
use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

struct MockAdapter {
    candidates: Vec<Candidate>,
    minimum_engagement: u32,
    identity: String,
    retention: RetentionPolicy,
    fail_publish: bool,
    fetch_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    published: Mutex<Vec<String>>,
}

impl MockAdapter {
    fn new(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates,
            minimum_engagement: 10,
            identity: "me".to_string(),
            retention: RetentionPolicy::KeepNewest(100),
            fail_publish: false,
            fetch_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            published: Mutex::new(Vec::new()),
        }
    }

    fn published_ids(&self) -> Vec<String> {
        self.published.lock().unwrap().clone()
    }
}

impl PlatformAdapter for MockAdapter {
    fn platform(&self) -> Platform {
        Platform::Reddit
    }

    fn own_identity(&self) -> &str {
        &self.identity
    }

    fn reply_context(&self) -> ReplyContext {
        ReplyContext {
            platform_label: "Reddit",
            content_noun: "Reddit post",
            default_persona: "You are a helpful community member.",
        }
    }

    fn minimum_engagement(&self) -> u32 {
        self.minimum_engagement
    }

    fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    fn is_deleted_author(&self, author: &str) -> bool {
        author == "[deleted]"
    }

    async fn refresh_token(&self, _creds: &PlatformCredentials) -> Result<TokenGrant, AuthError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        Ok(TokenGrant {
            access_token: "refreshed-access".to_string(),
            refresh_token: Some("refreshed-refresh".to_string()),
            expires_at: Utc::now() + Duration::hours(2),
        })
    }

    async fn fetch_candidates(&self, _access_token: &str) -> Result<Vec<Candidate>, FetchError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.candidates.clone())
    }

    async fn publish_reply(
        &self,
        _access_token: &str,
        candidate: &Candidate,
        _text: &str,
    ) -> Result<String, PublishError> {
        if self.fail_publish {
            return Err(PublishError::Api {
                status: 403,
                body: "spam heuristics tripped".to_string(),
            });
        }
        self.published.lock().unwrap().push(candidate.id.clone());
        Ok(format!("reply-to-{}", candidate.id))
    }
}

struct MockGenerator {
    reply: String,
    fail: bool,
    calls: AtomicUsize,
}

impl MockGenerator {
    fn returning(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            reply: String::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }
}

impl ReplyGenerator for MockGenerator {
    async fn generate(
        &self,
        _settings: &LlmSettings,
        _candidate: &Candidate,
        _context: &ReplyContext,
    ) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(LlmError::Api {
                status: 500,
                body: "upstream exploded".to_string(),
            });
        }
        Ok(self.reply.clone())
    }
}

fn candidate(id: &str, author: &str, engagement: u32) -> Candidate {
    Candidate {
        id: id.to_string(),
        author: author.to_string(),
        title: Some(format!("Post {id}")),
        body: "body text".to_string(),
        engagement,
        reply_count: 1,
        created_at: Utc::now(),
    }
}

fn account() -> Account {
    Account {
        id: "acct-1".to_string(),
        platform: Platform::Reddit,
        user_id: "user-1".to_string(),
        automation_enabled: true,
    }
}

async fn setup_db() -> (Database, String) {
    let db_path = env::temp_dir().join(format!("test_pipeline_{}.db", uuid::Uuid::new_v4()));
    let db_url = format!("sqlite://{}", db_path.display());

    let db = Database::connect(&db_url)
        .await
        .expect("Failed to connect to test database");
    db.run_migrations().await.expect("Failed to run migrations");
    (db, db_url)
}

/// Connected account with a token valid for another hour.
async fn seed_connected_account(db: &Database) {
    db.save_account(&account()).await.unwrap();
    db.save_credentials(&PlatformCredentials {
        account_id: "acct-1".to_string(),
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        access_token: Some("valid-access".to_string()),
        refresh_token: Some("valid-refresh".to_string()),
        expires_at: Some(Utc::now() + Duration::hours(1)),
        platform_username: Some("me".to_string()),
    })
    .await
    .unwrap();
    db.save_llm_settings(
        "acct-1",
        &LlmSettings {
            api_key: "sk-test".to_string(),
            model: "gpt-4o-mini".to_string(),
            persona: None,
            no_hashtags: false,
            no_emojis: false,
            lowercase_only: false,
            casual_grammar: false,
        },
    )
    .await
    .unwrap();
}

async fn has_log(db: &Database, level: LogLevel, fragment: &str) -> bool {
    db.recent_logs("acct-1", 50)
        .await
        .unwrap()
        .iter()
        .any(|entry| entry.level == level && entry.message.contains(fragment))
}

// Scenario A: only the candidate over the threshold is eligible, and it
// gets the reply.
#[tokio::test]
async fn replies_to_the_candidate_over_the_threshold() {
    let (db, _) = setup_db().await;
    seed_connected_account(&db).await;

    let adapter = MockAdapter::new(vec![
        candidate("a", "alice", 3),
        candidate("b", "bob", 20),
    ]);
    let generator = MockGenerator::returning("nice post!");

    let outcome = run_pipeline(&db, &generator, &adapter, &account())
        .await
        .unwrap();

    assert!(outcome.replied);
    assert_eq!(outcome.replied_to.as_deref(), Some("bob"));
    assert_eq!(outcome.comment.as_deref(), Some("nice post!"));
    assert_eq!(adapter.published_ids(), vec!["b".to_string()]);

    // The interaction landed and the success milestone was logged.
    assert_eq!(db.count_interactions("acct-1").await.unwrap(), 1);
    assert!(has_log(&db, LogLevel::Success, "Replied to b").await);
}

// Scenario B: equal top scores resolve to the first-fetched candidate.
#[tokio::test]
async fn tied_candidates_resolve_to_fetch_order() {
    let (db, _) = setup_db().await;
    seed_connected_account(&db).await;

    let adapter = MockAdapter::new(vec![candidate("x", "xavier", 20), candidate("y", "yara", 20)]);
    let generator = MockGenerator::returning("hello");

    let outcome = run_pipeline(&db, &generator, &adapter, &account())
        .await
        .unwrap();

    assert!(outcome.replied);
    assert_eq!(adapter.published_ids(), vec!["x".to_string()]);
}

// Scenario C: an already-replied candidate leaves the eligible set empty;
// the run completes successfully without a reply.
#[tokio::test]
async fn already_replied_content_ends_the_run_without_replying() {
    let (db, _) = setup_db().await;
    seed_connected_account(&db).await;

    db.upsert_interaction(&InteractionRecord {
        account_id: "acct-1".to_string(),
        content_id: "b".to_string(),
        author: "bob".to_string(),
        snippet: "Post b".to_string(),
        engagement: 20,
        reply_text: "earlier reply".to_string(),
        reply_id: "reply-1".to_string(),
        replied_at: Utc::now() - Duration::hours(3),
    })
    .await
    .unwrap();

    let adapter = MockAdapter::new(vec![candidate("b", "bob", 20)]);
    let generator = MockGenerator::returning("unused");

    let outcome = run_pipeline(&db, &generator, &adapter, &account())
        .await
        .unwrap();

    assert!(!outcome.replied);
    assert_eq!(outcome.message.as_deref(), Some("No eligible posts found"));
    assert!(adapter.published_ids().is_empty());
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    assert!(has_log(&db, LogLevel::Info, "No eligible posts found").await);
}

// Scenario D: no refresh token means no connection; nothing is fetched.
#[tokio::test]
async fn disconnected_account_fails_before_any_fetch() {
    let (db, _) = setup_db().await;
    db.save_account(&account()).await.unwrap();
    db.save_credentials(&PlatformCredentials {
        account_id: "acct-1".to_string(),
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        access_token: Some("dangling-access".to_string()),
        refresh_token: None,
        expires_at: None,
        platform_username: Some("me".to_string()),
    })
    .await
    .unwrap();

    let adapter = MockAdapter::new(vec![candidate("b", "bob", 20)]);
    let generator = MockGenerator::returning("unused");

    let err = run_pipeline(&db, &generator, &adapter, &account())
        .await
        .err()
        .unwrap();

    assert!(matches!(err, PipelineError::Disconnected { .. }));
    assert_eq!(adapter.fetch_calls.load(Ordering::SeqCst), 0);
}

// Scenario E: a failed generation aborts the run and the upstream error
// text lands in an error-level log entry.
#[tokio::test]
async fn llm_failure_aborts_and_is_logged() {
    let (db, _) = setup_db().await;
    seed_connected_account(&db).await;

    let adapter = MockAdapter::new(vec![candidate("b", "bob", 20)]);
    let generator = MockGenerator::failing();

    let err = run_pipeline(&db, &generator, &adapter, &account())
        .await
        .err()
        .unwrap();

    assert!(matches!(err, PipelineError::Llm(_)));
    assert!(adapter.published_ids().is_empty());
    assert!(has_log(&db, LogLevel::Error, "upstream exploded").await);
}

// Scenario F: the reply went out, so a failed record write downgrades to a
// warning instead of failing the run.
#[tokio::test]
async fn record_failure_does_not_fail_a_published_run() {
    let (db, db_url) = setup_db().await;
    seed_connected_account(&db).await;

    // Make interaction writes fail while leaving reads intact.
    let saboteur = sqlx::SqlitePool::connect(&db_url).await.unwrap();
    sqlx::query(
        "CREATE TRIGGER block_interaction_writes
         BEFORE INSERT ON interactions
         BEGIN SELECT RAISE(ABORT, 'interactions unavailable'); END",
    )
    .execute(&saboteur)
    .await
    .unwrap();

    let adapter = MockAdapter::new(vec![candidate("b", "bob", 20)]);
    let generator = MockGenerator::returning("posted anyway");

    let outcome = run_pipeline(&db, &generator, &adapter, &account())
        .await
        .unwrap();

    assert!(outcome.replied);
    assert_eq!(adapter.published_ids(), vec!["b".to_string()]);
    assert!(has_log(&db, LogLevel::Warning, "interaction record failed").await);
}

#[tokio::test]
async fn publish_failure_is_terminal_and_keeps_upstream_body() {
    let (db, _) = setup_db().await;
    seed_connected_account(&db).await;

    let mut adapter = MockAdapter::new(vec![candidate("b", "bob", 20)]);
    adapter.fail_publish = true;
    let generator = MockGenerator::returning("never posted");

    let err = run_pipeline(&db, &generator, &adapter, &account())
        .await
        .err()
        .unwrap();

    assert!(matches!(err, PipelineError::Publish(_)));
    assert!(err.to_string().contains("spam heuristics tripped"));
    assert_eq!(db.count_interactions("acct-1").await.unwrap(), 0);
}

// Token reuse window: a token valid for another hour makes zero refresh
// calls.
#[tokio::test]
async fn fresh_token_is_reused_without_refreshing() {
    let (db, _) = setup_db().await;
    seed_connected_account(&db).await;

    let adapter = MockAdapter::new(vec![candidate("b", "bob", 20)]);
    let generator = MockGenerator::returning("hi");

    run_pipeline(&db, &generator, &adapter, &account())
        .await
        .unwrap();

    assert_eq!(adapter.refresh_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn near_expiry_token_is_refreshed_and_persisted() {
    let (db, _) = setup_db().await;
    seed_connected_account(&db).await;
    db.save_credentials(&PlatformCredentials {
        account_id: "acct-1".to_string(),
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        access_token: Some("stale-access".to_string()),
        refresh_token: Some("valid-refresh".to_string()),
        expires_at: Some(Utc::now() + Duration::minutes(1)),
        platform_username: Some("me".to_string()),
    })
    .await
    .unwrap();

    let adapter = MockAdapter::new(vec![candidate("b", "bob", 20)]);
    let generator = MockGenerator::returning("hi");

    run_pipeline(&db, &generator, &adapter, &account())
        .await
        .unwrap();

    assert_eq!(adapter.refresh_calls.load(Ordering::SeqCst), 1);

    // Persisted before the publish call, not after the run.
    let creds = db.get_credentials("acct-1").await.unwrap().unwrap();
    assert_eq!(creds.access_token.as_deref(), Some("refreshed-access"));
    assert_eq!(creds.refresh_token.as_deref(), Some("refreshed-refresh"));
}

#[tokio::test]
async fn concurrent_run_is_rejected_by_the_lease() {
    let (db, _) = setup_db().await;
    seed_connected_account(&db).await;

    assert!(db.try_acquire_run_lease("acct-1", 600).await.unwrap());

    let adapter = MockAdapter::new(vec![candidate("b", "bob", 20)]);
    let generator = MockGenerator::returning("unused");

    let err = run_pipeline(&db, &generator, &adapter, &account())
        .await
        .err()
        .unwrap();

    assert!(matches!(err, PipelineError::RunInProgress { .. }));
    assert_eq!(adapter.fetch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn lease_is_released_after_a_completed_run() {
    let (db, _) = setup_db().await;
    seed_connected_account(&db).await;

    let adapter = MockAdapter::new(vec![candidate("b", "bob", 20)]);
    let generator = MockGenerator::returning("hi");

    run_pipeline(&db, &generator, &adapter, &account())
        .await
        .unwrap();

    // A following run can take the lease again.
    assert!(db.try_acquire_run_lease("acct-1", 600).await.unwrap());
}

// Running twice over the same candidates replies once: the second run sees
// the interaction record and ends with no eligible content.
#[tokio::test]
async fn second_run_deduplicates_against_recorded_interactions() {
    let (db, _) = setup_db().await;
    seed_connected_account(&db).await;

    let adapter = MockAdapter::new(vec![candidate("b", "bob", 20)]);
    let generator = MockGenerator::returning("hi");

    let first = run_pipeline(&db, &generator, &adapter, &account())
        .await
        .unwrap();
    assert!(first.replied);

    let second = run_pipeline(&db, &generator, &adapter, &account())
        .await
        .unwrap();
    assert!(!second.replied);
    assert_eq!(adapter.published_ids(), vec!["b".to_string()]);
}

#[tokio::test]
async fn retention_is_applied_after_recording() {
    let (db, _) = setup_db().await;
    seed_connected_account(&db).await;

    for i in 0..3 {
        db.upsert_interaction(&InteractionRecord {
            account_id: "acct-1".to_string(),
            content_id: format!("old-{i}"),
            author: "past".to_string(),
            snippet: "old post".to_string(),
            engagement: 5,
            reply_text: "old reply".to_string(),
            reply_id: format!("old-reply-{i}"),
            replied_at: Utc::now() - Duration::days(i + 1),
        })
        .await
        .unwrap();
    }

    let mut adapter = MockAdapter::new(vec![candidate("b", "bob", 20)]);
    adapter.retention = RetentionPolicy::KeepNewest(2);
    let generator = MockGenerator::returning("hi");

    run_pipeline(&db, &generator, &adapter, &account())
        .await
        .unwrap();

    // The new record plus the newest old one survive.
    assert_eq!(db.count_interactions("acct-1").await.unwrap(), 2);
    let replied = db
        .find_replied_ids(
            "acct-1",
            &[
                "b".to_string(),
                "old-0".to_string(),
                "old-2".to_string(),
            ],
        )
        .await
        .unwrap();
    assert!(replied.contains("b"));
    assert!(replied.contains("old-0"));
    assert!(!replied.contains("old-2"));
}

#[tokio::test]
async fn missing_llm_settings_is_a_config_error() {
    let (db, _) = setup_db().await;
    db.save_account(&account()).await.unwrap();
    db.save_credentials(&PlatformCredentials {
        account_id: "acct-1".to_string(),
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        access_token: Some("valid-access".to_string()),
        refresh_token: Some("valid-refresh".to_string()),
        expires_at: Some(Utc::now() + Duration::hours(1)),
        platform_username: Some("me".to_string()),
    })
    .await
    .unwrap();

    let adapter = MockAdapter::new(vec![candidate("b", "bob", 20)]);
    let generator = MockGenerator::returning("unused");

    let err = run_pipeline(&db, &generator, &adapter, &account())
        .await
        .err()
        .unwrap();

    assert!(matches!(err, PipelineError::ConfigMissing { .. }));
    assert!(adapter.published_ids().is_empty());
}
