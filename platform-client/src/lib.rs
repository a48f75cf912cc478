use std::time::Duration;

pub mod instagram;
pub mod oauth;
pub mod rate_limiter;
pub mod reddit;
pub mod twitter;
pub mod youtube;

pub use instagram::InstagramClient;
pub use reddit::RedditClient;
pub use twitter::TwitterClient;
pub use youtube::YouTubeClient;

/// User-Agent sent on every platform API call. Reddit in particular
/// throttles generic agents hard.
pub const USER_AGENT: &str = "replyflow/0.1 (social reply automation)";

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn build_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(HTTP_TIMEOUT)
        .build()
        .expect("Failed to create HTTP client")
}
