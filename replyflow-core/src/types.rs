use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Connected social platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    YouTube,
    Reddit,
    Instagram,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::YouTube => "youtube",
            Platform::Reddit => "reddit",
            Platform::Instagram => "instagram",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "twitter" => Ok(Platform::Twitter),
            "youtube" => Ok(Platform::YouTube),
            "reddit" => Ok(Platform::Reddit),
            "instagram" => Ok(Platform::Instagram),
            other => Err(format!("unknown platform: {other}")),
        }
    }
}

/// One connected platform identity owned by a dashboard user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub platform: Platform,
    pub user_id: String,
    pub automation_enabled: bool,
}

/// OAuth credential set for one account.
///
/// The access and refresh tokens are either both present ("connected") or
/// both absent; the OAuth callback flow (external to this service) writes
/// them as a pair.
#[derive(Debug, Clone)]
pub struct PlatformCredentials {
    pub account_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Platform-side identity: Twitter/Reddit username, YouTube channel id,
    /// Instagram user id. Used for the no-self-reply check.
    pub platform_username: Option<String>,
}

impl PlatformCredentials {
    pub fn is_connected(&self) -> bool {
        self.access_token.is_some() && self.refresh_token.is_some()
    }
}

/// Result of a refresh-token grant.
///
/// `refresh_token` is `None` when the platform reuses the existing one
/// (Google-family token endpoints omit it until the user revokes access);
/// the caller keeps the previous value in that case.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// One fetched unit of content, alive for a single pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: String,
    pub author: String,
    pub title: Option<String>,
    pub body: String,
    /// Primary engagement metric: likes on Twitter/YouTube/Instagram,
    /// upvotes on Reddit.
    pub engagement: u32,
    pub reply_count: u32,
    pub created_at: DateTime<Utc>,
}

/// Fixed cadences the external scheduler runs pipelines at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleInterval {
    Hourly,
    #[serde(rename = "every6h")]
    Every6Hours,
    #[serde(rename = "every12h")]
    Every12Hours,
    Daily,
}

impl ScheduleInterval {
    pub fn as_duration(&self) -> Duration {
        match self {
            ScheduleInterval::Hourly => Duration::from_secs(60 * 60),
            ScheduleInterval::Every6Hours => Duration::from_secs(6 * 60 * 60),
            ScheduleInterval::Every12Hours => Duration::from_secs(12 * 60 * 60),
            ScheduleInterval::Daily => Duration::from_secs(24 * 60 * 60),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleInterval::Hourly => "hourly",
            ScheduleInterval::Every6Hours => "every6h",
            ScheduleInterval::Every12Hours => "every12h",
            ScheduleInterval::Daily => "daily",
        }
    }
}

impl FromStr for ScheduleInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hourly" => Ok(ScheduleInterval::Hourly),
            "every6h" => Ok(ScheduleInterval::Every6Hours),
            "every12h" => Ok(ScheduleInterval::Every12Hours),
            "daily" => Ok(ScheduleInterval::Daily),
            other => Err(format!("unknown schedule interval: {other}")),
        }
    }
}

impl Default for ScheduleInterval {
    fn default() -> Self {
        ScheduleInterval::Daily
    }
}

/// Reddit search lookback window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedditTimeRange {
    Hour,
    Day,
    Week,
    Month,
}

impl RedditTimeRange {
    /// Value of the `t` query parameter on Reddit's search endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            RedditTimeRange::Hour => "hour",
            RedditTimeRange::Day => "day",
            RedditTimeRange::Week => "week",
            RedditTimeRange::Month => "month",
        }
    }
}

impl Default for RedditTimeRange {
    fn default() -> Self {
        RedditTimeRange::Week
    }
}

fn default_twitter_minimum_likes() -> u32 {
    20
}

fn default_reddit_minimum_upvotes() -> u32 {
    10
}

fn default_minimum_likes() -> u32 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwitterConfig {
    #[serde(default)]
    pub search_term: String,
    #[serde(default = "default_twitter_minimum_likes")]
    pub minimum_likes: u32,
    #[serde(default)]
    pub schedule: ScheduleInterval,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            minimum_likes: default_twitter_minimum_likes(),
            schedule: ScheduleInterval::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedditConfig {
    /// Comma-separated search keywords, OR-joined at query time.
    #[serde(default)]
    pub keywords: String,
    #[serde(default = "default_reddit_minimum_upvotes")]
    pub minimum_upvotes: u32,
    #[serde(default)]
    pub time_range: RedditTimeRange,
    #[serde(default)]
    pub schedule: ScheduleInterval,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            keywords: String::new(),
            minimum_upvotes: default_reddit_minimum_upvotes(),
            time_range: RedditTimeRange::default(),
            schedule: ScheduleInterval::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YouTubeConfig {
    #[serde(default = "default_minimum_likes")]
    pub minimum_likes: u32,
    #[serde(default)]
    pub schedule: ScheduleInterval,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            minimum_likes: default_minimum_likes(),
            schedule: ScheduleInterval::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstagramConfig {
    #[serde(default = "default_minimum_likes")]
    pub minimum_likes: u32,
    #[serde(default)]
    pub schedule: ScheduleInterval,
}

impl Default for InstagramConfig {
    fn default() -> Self {
        Self {
            minimum_likes: default_minimum_likes(),
            schedule: ScheduleInterval::default(),
        }
    }
}

/// Per-account LLM credentials and voice settings, shared by all of the
/// account owner's platforms.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmSettings {
    pub api_key: String,
    pub model: String,
    pub persona: Option<String>,
    #[serde(default)]
    pub no_hashtags: bool,
    #[serde(default)]
    pub no_emojis: bool,
    #[serde(default)]
    pub lowercase_only: bool,
    #[serde(default)]
    pub casual_grammar: bool,
}

/// Static platform flavor handed to the reply generator.
#[derive(Debug, Clone, Copy)]
pub struct ReplyContext {
    /// Human label used in prompts ("tweet", "Reddit post", ...).
    pub platform_label: &'static str,
    pub content_noun: &'static str,
    pub default_persona: &'static str,
}

/// Severity of a durable activity-log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Success,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Success => "success",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(LogLevel::Info),
            "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "success" => Ok(LogLevel::Success),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

/// One durable activity-log row; append-only, never mutated.
#[derive(Debug, Clone)]
pub struct ActivityLogEntry {
    pub id: i64,
    pub account_id: String,
    pub level: LogLevel,
    pub message: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// How many interaction records an account keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// Keep the newest N records, delete the rest oldest-first.
    KeepNewest(u32),
    /// Delete records older than N days.
    MaxAgeDays(i64),
}

/// Durable record of one reply, unique per (account, content).
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionRecord {
    pub account_id: String,
    pub content_id: String,
    pub author: String,
    pub snippet: String,
    pub engagement: u32,
    pub reply_text: String,
    pub reply_id: String,
    pub replied_at: DateTime<Utc>,
}

/// Outcome of one completed pipeline run, returned to the trigger caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub replied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replied_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RunOutcome {
    pub fn replied(candidate: &Candidate, reply: &str) -> Self {
        Self {
            replied: true,
            replied_to: Some(candidate.author.clone()),
            post_title: candidate.title.clone(),
            comment: Some(reply.to_string()),
            message: None,
        }
    }

    pub fn no_eligible_content() -> Self {
        Self::skipped("No eligible posts found")
    }

    pub fn skipped(message: &str) -> Self {
        Self {
            replied: false,
            replied_to: None,
            post_title: None,
            comment: None,
            message: Some(message.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_round_trips_through_str() {
        for platform in [
            Platform::Twitter,
            Platform::YouTube,
            Platform::Reddit,
            Platform::Instagram,
        ] {
            assert_eq!(platform.as_str().parse::<Platform>(), Ok(platform));
        }
        assert!("myspace".parse::<Platform>().is_err());
    }

    #[test]
    fn credentials_connected_requires_both_tokens() {
        let mut creds = PlatformCredentials {
            account_id: "acct-1".to_string(),
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            access_token: Some("access".to_string()),
            refresh_token: Some("refresh".to_string()),
            expires_at: None,
            platform_username: None,
        };
        assert!(creds.is_connected());

        creds.refresh_token = None;
        assert!(!creds.is_connected());
    }

    #[test]
    fn config_defaults_match_documented_thresholds() {
        assert_eq!(TwitterConfig::default().minimum_likes, 20);
        assert_eq!(RedditConfig::default().minimum_upvotes, 10);
        assert_eq!(YouTubeConfig::default().minimum_likes, 5);
        assert_eq!(RedditConfig::default().time_range, RedditTimeRange::Week);
    }

    #[test]
    fn config_defaults_apply_to_sparse_json() {
        let config: RedditConfig = serde_json::from_str(r#"{"keywords":"rust"}"#).unwrap();
        assert_eq!(config.keywords, "rust");
        assert_eq!(config.minimum_upvotes, 10);
        assert_eq!(config.time_range, RedditTimeRange::Week);
    }

    #[test]
    fn run_outcome_serializes_camel_case() {
        let candidate = Candidate {
            id: "t3_abc".to_string(),
            author: "someone".to_string(),
            title: Some("A post".to_string()),
            body: "body".to_string(),
            engagement: 12,
            reply_count: 3,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(RunOutcome::replied(&candidate, "hello")).unwrap();
        assert_eq!(json["replied"], true);
        assert_eq!(json["repliedTo"], "someone");
        assert_eq!(json["postTitle"], "A post");
        assert_eq!(json["comment"], "hello");
        assert!(json.get("message").is_none());
    }

    #[test]
    fn schedule_intervals_are_ordered() {
        assert!(
            ScheduleInterval::Hourly.as_duration() < ScheduleInterval::Every6Hours.as_duration()
        );
        assert!(
            ScheduleInterval::Every12Hours.as_duration() < ScheduleInterval::Daily.as_duration()
        );
    }
}
