use crate::rate_limiter::{RateLimitConfig, RateLimiter};
use chrono::{DateTime, Utc};
use replyflow_core::{Candidate, FetchError, PublishError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

const TWITTER_API_BASE: &str = "https://api.twitter.com";
pub const SEARCH_PAGE_SIZE: u32 = 25;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Tweet>,
    #[serde(default)]
    includes: SearchIncludes,
}

#[derive(Debug, Default, Deserialize)]
struct SearchIncludes {
    #[serde(default)]
    users: Vec<TwitterUser>,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    text: String,
    author_id: String,
    created_at: Option<String>,
    public_metrics: TweetMetrics,
}

#[derive(Debug, Deserialize)]
struct TweetMetrics {
    like_count: u32,
    reply_count: u32,
}

#[derive(Debug, Deserialize)]
struct TwitterUser {
    id: String,
    username: String,
}

#[derive(Debug, Serialize)]
struct ReplyRequest<'a> {
    text: &'a str,
    reply: ReplyTarget<'a>,
}

#[derive(Debug, Serialize)]
struct ReplyTarget<'a> {
    in_reply_to_tweet_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatedTweet {
    data: CreatedTweetData,
}

#[derive(Debug, Deserialize)]
struct CreatedTweetData {
    id: String,
}

#[derive(Debug)]
pub struct TwitterClient {
    http: Client,
    rate_limiter: Arc<RateLimiter>,
    base_url: String,
}

impl TwitterClient {
    pub fn new() -> Self {
        Self {
            http: crate::build_http_client(),
            rate_limiter: Arc::new(RateLimiter::new(RateLimitConfig::twitter())),
            base_url: TWITTER_API_BASE.to_string(),
        }
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Recent full-text search for the configured term, relevance-sorted,
    /// one bounded page.
    pub async fn search_recent(
        &self,
        access_token: &str,
        search_term: &str,
    ) -> Result<Vec<Candidate>, FetchError> {
        let _permit = self.rate_limiter.acquire_permit().await;
        let page_size = SEARCH_PAGE_SIZE.to_string();

        debug!("Searching recent tweets for {:?}", search_term);
        let response = self
            .http
            .get(format!("{}/2/tweets/search/recent", self.base_url))
            .bearer_auth(access_token)
            .query(&[
                ("query", search_term),
                ("max_results", page_size.as_str()),
                ("sort_order", "relevancy"),
                ("tweet.fields", "public_metrics,author_id,created_at"),
                ("expansions", "author_id"),
                ("user.fields", "username"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let search: SearchResponse =
            response
                .json()
                .await
                .map_err(|e| FetchError::MalformedResponse {
                    details: e.to_string(),
                })?;

        let usernames: HashMap<String, String> = search
            .includes
            .users
            .into_iter()
            .map(|u| (u.id, u.username))
            .collect();

        let candidates: Vec<Candidate> = search
            .data
            .into_iter()
            .map(|tweet| tweet_to_candidate(tweet, &usernames))
            .collect();

        info!("Retrieved {} tweets for reply search", candidates.len());
        Ok(candidates)
    }

    /// Posts a reply tweet threaded under the candidate tweet.
    pub async fn post_reply(
        &self,
        access_token: &str,
        tweet_id: &str,
        text: &str,
    ) -> Result<String, PublishError> {
        let _permit = self.rate_limiter.acquire_permit().await;

        let response = self
            .http
            .post(format!("{}/2/tweets", self.base_url))
            .bearer_auth(access_token)
            .json(&ReplyRequest {
                text,
                reply: ReplyTarget {
                    in_reply_to_tweet_id: tweet_id,
                },
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let created: CreatedTweet =
            response
                .json()
                .await
                .map_err(|e| PublishError::MalformedResponse {
                    details: e.to_string(),
                })?;

        info!("Posted reply tweet {}", created.data.id);
        Ok(created.data.id)
    }
}

impl Default for TwitterClient {
    fn default() -> Self {
        Self::new()
    }
}

fn tweet_to_candidate(tweet: Tweet, usernames: &HashMap<String, String>) -> Candidate {
    let author = usernames
        .get(&tweet.author_id)
        .cloned()
        .unwrap_or(tweet.author_id);

    let created_at = tweet
        .created_at
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    Candidate {
        id: tweet.id,
        author,
        title: None,
        body: tweet.text,
        engagement: tweet.public_metrics.like_count,
        reply_count: tweet.public_metrics.reply_count,
        created_at,
    }
}
