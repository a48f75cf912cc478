use crate::adapter::PlatformAdapter;
use platform_client::{oauth, InstagramClient};
use replyflow_core::{
    AuthError, Candidate, FetchError, InstagramConfig, Platform, PlatformCredentials,
    PublishError, ReplyContext, RetentionPolicy, TokenGrant,
};

pub struct InstagramAdapter {
    client: InstagramClient,
    config: InstagramConfig,
    identity: String,
}

impl InstagramAdapter {
    pub fn new(config: InstagramConfig, identity: String) -> Self {
        Self {
            client: InstagramClient::new(),
            config,
            identity,
        }
    }
}

impl PlatformAdapter for InstagramAdapter {
    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    fn own_identity(&self) -> &str {
        &self.identity
    }

    fn reply_context(&self) -> ReplyContext {
        ReplyContext {
            platform_label: "Instagram",
            content_noun: "comment on your post",
            default_persona: "You are the owner of this account, replying warmly to commenters.",
        }
    }

    fn minimum_engagement(&self) -> u32 {
        self.config.minimum_likes
    }

    fn retention(&self) -> RetentionPolicy {
        RetentionPolicy::KeepNewest(100)
    }

    async fn refresh_token(&self, creds: &PlatformCredentials) -> Result<TokenGrant, AuthError> {
        oauth::refresh_access_token(self.client.http(), Platform::Instagram, creds).await
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
            .reply_to_comment(access_token, &candidate.id, text)
            .await
    }
}
