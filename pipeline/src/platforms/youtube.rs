use crate::adapter::PlatformAdapter;
use platform_client::{oauth, YouTubeClient};
use replyflow_core::{
    AuthError, Candidate, FetchError, Platform, PlatformCredentials, PublishError, ReplyContext,
    RetentionPolicy, TokenGrant, YouTubeConfig,
};

/// Interaction retention for YouTube is age-based: comments are only
/// fetched from the last 7 days, so 14 days of records covers the fetch
/// window with margin.
const RETENTION_DAYS: i64 = 14;

pub struct YouTubeAdapter {
    client: YouTubeClient,
    config: YouTubeConfig,
    identity: String,
}

impl YouTubeAdapter {
    pub fn new(config: YouTubeConfig, identity: String) -> Self {
        Self {
            client: YouTubeClient::new(),
            config,
            identity,
        }
    }
}

impl PlatformAdapter for YouTubeAdapter {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    fn own_identity(&self) -> &str {
        &self.identity
    }

    fn reply_context(&self) -> ReplyContext {
        ReplyContext {
            platform_label: "YouTube",
            content_noun: "comment on your video",
            default_persona:
                "You are the creator of this channel, warmly engaging with your viewers.",
        }
    }

    fn minimum_engagement(&self) -> u32 {
        self.config.minimum_likes
    }

    fn retention(&self) -> RetentionPolicy {
        RetentionPolicy::MaxAgeDays(RETENTION_DAYS)
    }

    async fn refresh_token(&self, creds: &PlatformCredentials) -> Result<TokenGrant, AuthError> {
        oauth::refresh_access_token(self.client.http(), Platform::YouTube, creds).await
    }

    async fn fetch_candidates(&self, access_token: &str) -> Result<Vec<Candidate>, FetchError> {
        self.client.fetch_recent_comments(access_token).await
    }

    async fn publish_reply(
        &self,
        access_token: &str,
        candidate: &Candidate,
        text: &str,
    ) -> Result<String, PublishError> {
        self.client
            .insert_reply(access_token, &candidate.id, text)
            .await
    }
}
