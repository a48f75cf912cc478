use chrono::{DateTime, Duration, Utc};
use replyflow_core::{
    Account, ActivityLogEntry, InteractionRecord, LlmSettings, LogLevel, Platform,
    PlatformCredentials, RetentionPolicy, ScheduleInterval, StorageError, TokenGrant,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use std::str::FromStr;


/// Per-platform automation settings as stored: the platform-specific filter
/// parameters stay an opaque JSON document until an adapter decodes them.
#[derive(Debug, Clone)]
pub struct StoredPlatformConfig {
    pub enabled: bool,
    pub schedule: ScheduleInterval,
    pub params: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(StorageError::Sql)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    // ── Accounts ────────────────────────────────────────────────────────

    pub async fn save_account(&self, account: &Account) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO accounts (id, platform, user_id, automation_enabled)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
               automation_enabled = excluded.automation_enabled",
        )
        .bind(&account.id)
        .bind(account.platform.as_str())
        .bind(&account.user_id)
        .bind(account.automation_enabled)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_account(&self, account_id: &str) -> Result<Option<Account>, StorageError> {
        let row = sqlx::query(
            "SELECT id, platform, user_id, automation_enabled FROM accounts WHERE id = ?",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let platform: String = row.get("platform");
            Ok(Account {
                id: row.get("id"),
                platform: Platform::from_str(&platform)
                    .map_err(|details| StorageError::Corrupt { details })?,
                user_id: row.get("user_id"),
                automation_enabled: row.get("automation_enabled"),
            })
        })
        .transpose()
    }

    // ── Credentials ─────────────────────────────────────────────────────

    pub async fn save_credentials(
        &self,
        creds: &PlatformCredentials,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO credentials
               (account_id, client_id, client_secret, access_token, refresh_token, expires_at, platform_username)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(account_id) DO UPDATE SET
               client_id = excluded.client_id,
               client_secret = excluded.client_secret,
               access_token = excluded.access_token,
               refresh_token = excluded.refresh_token,
               expires_at = excluded.expires_at,
               platform_username = excluded.platform_username",
        )
        .bind(&creds.account_id)
        .bind(&creds.client_id)
        .bind(&creds.client_secret)
        .bind(&creds.access_token)
        .bind(&creds.refresh_token)
        .bind(creds.expires_at)
        .bind(&creds.platform_username)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_credentials(
        &self,
        account_id: &str,
    ) -> Result<Option<PlatformCredentials>, StorageError> {
        let row = sqlx::query(
            "SELECT account_id, client_id, client_secret, access_token, refresh_token,
                    expires_at, platform_username
             FROM credentials WHERE account_id = ?",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| PlatformCredentials {
            account_id: row.get("account_id"),
            client_id: row.get("client_id"),
            client_secret: row.get("client_secret"),
            access_token: row.get("access_token"),
            refresh_token: row.get("refresh_token"),
            expires_at: row.get("expires_at"),
            platform_username: row.get("platform_username"),
        }))
    }

    /// Writes a fresh token grant in place. A grant without a refresh token
    /// (Google-family responses) keeps the one already on file.
    pub async fn update_tokens(
        &self,
        account_id: &str,
        grant: &TokenGrant,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "UPDATE credentials
             SET access_token = ?,
                 refresh_token = COALESCE(?, refresh_token),
                 expires_at = ?
             WHERE account_id = ?",
        )
        .bind(&grant.access_token)
        .bind(&grant.refresh_token)
        .bind(grant.expires_at)
        .bind(account_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ── Platform configuration ──────────────────────────────────────────

    pub async fn save_platform_config(
        &self,
        account_id: &str,
        enabled: bool,
        schedule: ScheduleInterval,
        params: &serde_json::Value,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO platform_configs (account_id, enabled, schedule, params)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(account_id) DO UPDATE SET
               enabled = excluded.enabled,
               schedule = excluded.schedule,
               params = excluded.params",
        )
        .bind(account_id)
        .bind(enabled)
        .bind(schedule.as_str())
        .bind(params.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_platform_config(
        &self,
        account_id: &str,
    ) -> Result<Option<StoredPlatformConfig>, StorageError> {
        let row = sqlx::query(
            "SELECT enabled, schedule, params FROM platform_configs WHERE account_id = ?",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let schedule: String = row.get("schedule");
            let params: String = row.get("params");
            Ok(StoredPlatformConfig {
                enabled: row.get("enabled"),
                schedule: ScheduleInterval::from_str(&schedule)
                    .map_err(|details| StorageError::Corrupt { details })?,
                params: serde_json::from_str(&params)?,
            })
        })
        .transpose()
    }

    // ── LLM settings ────────────────────────────────────────────────────

    pub async fn save_llm_settings(
        &self,
        account_id: &str,
        settings: &LlmSettings,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO llm_settings
               (account_id, api_key, model, persona, no_hashtags, no_emojis, lowercase_only, casual_grammar)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(account_id) DO UPDATE SET
               api_key = excluded.api_key,
               model = excluded.model,
               persona = excluded.persona,
               no_hashtags = excluded.no_hashtags,
               no_emojis = excluded.no_emojis,
               lowercase_only = excluded.lowercase_only,
               casual_grammar = excluded.casual_grammar",
        )
        .bind(account_id)
        .bind(&settings.api_key)
        .bind(&settings.model)
        .bind(&settings.persona)
        .bind(settings.no_hashtags)
        .bind(settings.no_emojis)
        .bind(settings.lowercase_only)
        .bind(settings.casual_grammar)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_llm_settings(
        &self,
        account_id: &str,
    ) -> Result<Option<LlmSettings>, StorageError> {
        let row = sqlx::query(
            "SELECT api_key, model, persona, no_hashtags, no_emojis, lowercase_only, casual_grammar
             FROM llm_settings WHERE account_id = ?",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| LlmSettings {
            api_key: row.get("api_key"),
            model: row.get("model"),
            persona: row.get("persona"),
            no_hashtags: row.get("no_hashtags"),
            no_emojis: row.get("no_emojis"),
            lowercase_only: row.get("lowercase_only"),
            casual_grammar: row.get("casual_grammar"),
        }))
    }

    // ── Interaction records ─────────────────────────────────────────────

    /// Which of the given content ids this account has already replied to.
    pub async fn find_replied_ids(
        &self,
        account_id: &str,
        content_ids: &[String],
    ) -> Result<HashSet<String>, StorageError> {
        if content_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let placeholders = vec!["?"; content_ids.len()].join(", ");
        let sql = format!(
            "SELECT content_id FROM interactions WHERE account_id = ? AND content_id IN ({placeholders})"
        );

        let mut query = sqlx::query(&sql).bind(account_id);
        for content_id in content_ids {
            query = query.bind(content_id);
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|row| row.get("content_id")).collect())
    }

    /// Create-or-update keyed by (account, content); reprocessing the same
    /// content overwrites the reply fields instead of duplicating the row.
    pub async fn upsert_interaction(
        &self,
        record: &InteractionRecord,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO interactions
               (account_id, content_id, author, snippet, engagement, reply_text, reply_id, replied_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(account_id, content_id) DO UPDATE SET
               author = excluded.author,
               snippet = excluded.snippet,
               engagement = excluded.engagement,
               reply_text = excluded.reply_text,
               reply_id = excluded.reply_id,
               replied_at = excluded.replied_at",
        )
        .bind(&record.account_id)
        .bind(&record.content_id)
        .bind(&record.author)
        .bind(&record.snippet)
        .bind(record.engagement as i64)
        .bind(&record.reply_text)
        .bind(&record.reply_id)
        .bind(record.replied_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Applies the platform retention policy, oldest records first.
    pub async fn prune_interactions(
        &self,
        account_id: &str,
        policy: RetentionPolicy,
    ) -> Result<u64, StorageError> {
        let result = match policy {
            RetentionPolicy::KeepNewest(keep) => {
                sqlx::query(
                    "DELETE FROM interactions
                     WHERE account_id = ?
                       AND content_id NOT IN (
                         SELECT content_id FROM interactions
                         WHERE account_id = ?
                         ORDER BY replied_at DESC, rowid DESC
                         LIMIT ?
                       )",
                )
                .bind(account_id)
                .bind(account_id)
                .bind(keep as i64)
                .execute(&self.pool)
                .await?
            }
            RetentionPolicy::MaxAgeDays(days) => {
                let cutoff = Utc::now() - Duration::days(days);
                sqlx::query("DELETE FROM interactions WHERE account_id = ? AND replied_at < ?")
                    .bind(account_id)
                    .bind(cutoff)
                    .execute(&self.pool)
                    .await?
            }
        };
        Ok(result.rows_affected())
    }

    pub async fn count_interactions(&self, account_id: &str) -> Result<i64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM interactions WHERE account_id = ?")
            .bind(account_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    // ── Activity log ────────────────────────────────────────────────────

    pub async fn append_log(
        &self,
        account_id: &str,
        level: LogLevel,
        message: &str,
        metadata: Option<&serde_json::Value>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO activity_log (account_id, level, message, metadata, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(account_id)
        .bind(level.as_str())
        .bind(message)
        .bind(metadata.map(|m| m.to_string()))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn recent_logs(
        &self,
        account_id: &str,
        limit: u32,
    ) -> Result<Vec<ActivityLogEntry>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, account_id, level, message, metadata, created_at
             FROM activity_log
             WHERE account_id = ?
             ORDER BY id DESC
             LIMIT ?",
        )
        .bind(account_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let level: String = row.get("level");
                let metadata: Option<String> = row.get("metadata");
                Ok(ActivityLogEntry {
                    id: row.get("id"),
                    account_id: row.get("account_id"),
                    level: LogLevel::from_str(&level)
                        .map_err(|details| StorageError::Corrupt { details })?,
                    message: row.get("message"),
                    metadata: metadata.as_deref().map(serde_json::from_str).transpose()?,
                    created_at: row.get::<DateTime<Utc>, _>("created_at"),
                })
            })
            .collect()
    }

    // ── Run leases ──────────────────────────────────────────────────────

    /// Takes the per-account run lease, or reports that another run holds
    /// it. Expired leases (a run killed mid-flight) may be taken over.
    pub async fn try_acquire_run_lease(
        &self,
        account_id: &str,
        ttl_secs: i64,
    ) -> Result<bool, StorageError> {
        let now = Utc::now();

        sqlx::query("DELETE FROM run_leases WHERE account_id = ? AND expires_at <= ?")
            .bind(account_id)
            .bind(now)
            .execute(&self.pool)
            .await?;

        let result = sqlx::query(
            "INSERT INTO run_leases (account_id, acquired_at, expires_at)
             VALUES (?, ?, ?)
             ON CONFLICT(account_id) DO NOTHING",
        )
        .bind(account_id)
        .bind(now)
        .bind(now + Duration::seconds(ttl_secs))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn release_run_lease(&self, account_id: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM run_leases WHERE account_id = ?")
            .bind(account_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
