use crate::adapter::PlatformAdapter;
use platform_client::reddit::DELETED_AUTHOR;
use platform_client::{oauth, RedditClient};
use replyflow_core::{
    AuthError, Candidate, FetchError, PipelineError, Platform, PlatformCredentials, PublishError,
    RedditConfig, ReplyContext, RetentionPolicy, TokenGrant,
};

pub struct RedditAdapter {
    client: RedditClient,
    config: RedditConfig,
    identity: String,
}

impl RedditAdapter {
    pub fn new(config: RedditConfig, identity: String) -> Result<Self, PipelineError> {
        if config.keywords.split(',').all(|k| k.trim().is_empty()) {
            return Err(PipelineError::ConfigMissing {
                field: "keywords".to_string(),
            });
        }
        Ok(Self {
            client: RedditClient::new(),
            config,
            identity,
        })
    }
}

impl PlatformAdapter for RedditAdapter {
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
            default_persona:
                "You are a helpful community member who gives grounded, practical answers.",
        }
    }

    fn minimum_engagement(&self) -> u32 {
        self.config.minimum_upvotes
    }

    fn retention(&self) -> RetentionPolicy {
        RetentionPolicy::KeepNewest(100)
    }

    fn is_deleted_author(&self, author: &str) -> bool {
        author == DELETED_AUTHOR
    }

    async fn refresh_token(&self, creds: &PlatformCredentials) -> Result<TokenGrant, AuthError> {
        oauth::refresh_access_token(self.client.http(), Platform::Reddit, creds).await
    }

    async fn fetch_candidates(&self, access_token: &str) -> Result<Vec<Candidate>, FetchError> {
        self.client
            .search_links(access_token, &self.config.keywords, self.config.time_range)
            .await
    }

    async fn publish_reply(
        &self,
        access_token: &str,
        candidate: &Candidate,
        text: &str,
    ) -> Result<String, PublishError> {
        self.client
            .submit_comment(access_token, &candidate.id, text)
            .await
    }
}
