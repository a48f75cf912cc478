use crate::adapter::PlatformAdapter;
use platform_client::{oauth, TwitterClient};
use replyflow_core::{
    AuthError, Candidate, FetchError, PipelineError, Platform, PlatformCredentials, PublishError,
    ReplyContext, RetentionPolicy, TokenGrant, TwitterConfig,
};

pub struct TwitterAdapter {
    client: TwitterClient,
    config: TwitterConfig,
    identity: String,
}

impl TwitterAdapter {
    pub fn new(config: TwitterConfig, identity: String) -> Result<Self, PipelineError> {
        if config.search_term.trim().is_empty() {
            return Err(PipelineError::ConfigMissing {
                field: "searchTerm".to_string(),
            });
        }
        Ok(Self {
            client: TwitterClient::new(),
            config,
            identity,
        })
    }
}

impl PlatformAdapter for TwitterAdapter {
    fn platform(&self) -> Platform {
        Platform::Twitter
    }

    fn own_identity(&self) -> &str {
        &self.identity
    }

    fn reply_context(&self) -> ReplyContext {
        ReplyContext {
            platform_label: "Twitter",
            content_noun: "tweet",
            default_persona:
                "You are a friendly, knowledgeable voice who adds something useful to conversations.",
        }
    }

    fn minimum_engagement(&self) -> u32 {
        self.config.minimum_likes
    }

    fn retention(&self) -> RetentionPolicy {
        RetentionPolicy::KeepNewest(100)
    }

    async fn refresh_token(&self, creds: &PlatformCredentials) -> Result<TokenGrant, AuthError> {
        oauth::refresh_access_token(self.client.http(), Platform::Twitter, creds).await
    }

    async fn fetch_candidates(&self, access_token: &str) -> Result<Vec<Candidate>, FetchError> {
        self.client
            .search_recent(access_token, &self.config.search_term)
            .await
    }

    async fn publish_reply(
        &self,
        access_token: &str,
        candidate: &Candidate,
        text: &str,
    ) -> Result<String, PublishError> {
        self.client
            .post_reply(access_token, &candidate.id, text)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_search_term_is_a_config_error() {
        let config = TwitterConfig {
            search_term: "  ".to_string(),
            ..TwitterConfig::default()
        };
        let err = TwitterAdapter::new(config, "me".to_string()).err().unwrap();
        assert!(matches!(err, PipelineError::ConfigMissing { .. }));
    }

    #[test]
    fn retention_keeps_newest_hundred() {
        let config = TwitterConfig {
            search_term: "rust".to_string(),
            ..TwitterConfig::default()
        };
        let adapter = TwitterAdapter::new(config, "me".to_string()).unwrap();
        assert_eq!(adapter.retention(), RetentionPolicy::KeepNewest(100));
        assert_eq!(adapter.minimum_engagement(), 20);
    }
}
