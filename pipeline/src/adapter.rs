use replyflow_core::{
    AuthError, Candidate, FetchError, Platform, PlatformCredentials, PublishError, ReplyContext,
    RetentionPolicy, TokenGrant,
};

/// Platform-specific half of the reply pipeline.
///
/// The driver owns the stage sequence (token, fetch, filter, select,
/// generate, publish, record); adapters supply the per-platform quirks:
/// which API to search, what counts as engagement, how a reply is posted,
/// and how long interaction records live.
pub trait PlatformAdapter {
    fn platform(&self) -> Platform;

    /// The account's own handle on the platform, for the no-self-reply
    /// check.
    fn own_identity(&self) -> &str;

    fn reply_context(&self) -> ReplyContext;

    /// Engagement floor below which candidates are ignored.
    fn minimum_engagement(&self) -> u32;

    fn retention(&self) -> RetentionPolicy;

    /// Sentinel author marking a deleted account (Reddit's `[deleted]`).
    fn is_deleted_author(&self, _author: &str) -> bool {
        false
    }

    async fn refresh_token(&self, creds: &PlatformCredentials) -> Result<TokenGrant, AuthError>;

    async fn fetch_candidates(&self, access_token: &str) -> Result<Vec<Candidate>, FetchError>;

    async fn publish_reply(
        &self,
        access_token: &str,
        candidate: &Candidate,
        text: &str,
    ) -> Result<String, PublishError>;
}
