use crate::rate_limiter::{RateLimitConfig, RateLimiter};
use chrono::{DateTime, Utc};
use replyflow_core::{Candidate, FetchError, PublishError, RedditTimeRange};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

const REDDIT_API_BASE: &str = "https://oauth.reddit.com";
pub const SEARCH_PAGE_SIZE: u32 = 25;

/// Author name Reddit substitutes once an account is deleted.
pub const DELETED_AUTHOR: &str = "[deleted]";

#[derive(Debug, Deserialize)]
pub struct RedditListing<T> {
    pub data: RedditListingData<T>,
}

#[derive(Debug, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RedditListingChild<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct RedditPostData {
    pub id: String,
    /// Fullname ("t3_..."), the thing id the comment API targets.
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    pub author: String,
    pub subreddit: String,
    pub created_utc: f64,
    pub ups: i32,
    pub num_comments: u32,
}

#[derive(Debug, Deserialize)]
struct SubmitCommentResponse {
    json: SubmitCommentJson,
}

#[derive(Debug, Deserialize)]
struct SubmitCommentJson {
    #[serde(default)]
    errors: Vec<Vec<serde_json::Value>>,
    data: Option<SubmitCommentData>,
}

#[derive(Debug, Deserialize)]
struct SubmitCommentData {
    things: Vec<RedditListingChild<SubmittedComment>>,
}

#[derive(Debug, Deserialize)]
struct SubmittedComment {
    name: String,
}

/// Joins the configured comma-separated keywords into one OR query.
pub fn build_search_query(keywords: &str) -> String {
    keywords
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .collect::<Vec<_>>()
        .join(" OR ")
}

#[derive(Debug)]
pub struct RedditClient {
    http: Client,
    rate_limiter: Arc<RateLimiter>,
    base_url: String,
}

impl RedditClient {
    pub fn new() -> Self {
        Self {
            http: crate::build_http_client(),
            rate_limiter: Arc::new(RateLimiter::new(RateLimitConfig::reddit())),
            base_url: REDDIT_API_BASE.to_string(),
        }
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Full-text search across the configured keywords, relevance-sorted
    /// link posts within the configured lookback window.
    pub async fn search_links(
        &self,
        access_token: &str,
        keywords: &str,
        time_range: RedditTimeRange,
    ) -> Result<Vec<Candidate>, FetchError> {
        let _permit = self.rate_limiter.acquire_permit().await;
        let query = build_search_query(keywords);
        let page_size = SEARCH_PAGE_SIZE.to_string();

        debug!("Searching Reddit for {:?}", query);
        let response = self
            .http
            .get(format!("{}/search", self.base_url))
            .bearer_auth(access_token)
            .query(&[
                ("q", query.as_str()),
                ("sort", "relevance"),
                ("t", time_range.as_str()),
                ("limit", page_size.as_str()),
                ("type", "link"),
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

        let listing: RedditListing<RedditPostData> =
            response
                .json()
                .await
                .map_err(|e| FetchError::MalformedResponse {
                    details: e.to_string(),
                })?;

        let candidates: Vec<Candidate> = listing
            .data
            .children
            .into_iter()
            .map(|child| child.data.into())
            .collect();

        info!("Retrieved {} Reddit posts for reply search", candidates.len());
        Ok(candidates)
    }

    /// Submits a top-level comment on the post identified by its fullname.
    pub async fn submit_comment(
        &self,
        access_token: &str,
        thing_id: &str,
        text: &str,
    ) -> Result<String, PublishError> {
        let _permit = self.rate_limiter.acquire_permit().await;

        let response = self
            .http
            .post(format!("{}/api/comment", self.base_url))
            .bearer_auth(access_token)
            .form(&[("api_type", "json"), ("thing_id", thing_id), ("text", text)])
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

        let submitted: SubmitCommentResponse =
            response
                .json()
                .await
                .map_err(|e| PublishError::MalformedResponse {
                    details: e.to_string(),
                })?;

        // Reddit reports application errors inside a 200 envelope.
        if !submitted.json.errors.is_empty() {
            let body = serde_json::to_string(&submitted.json.errors).unwrap_or_default();
            return Err(PublishError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let comment_name = submitted
            .json
            .data
            .and_then(|data| data.things.into_iter().next())
            .map(|thing| thing.data.name)
            .ok_or_else(|| PublishError::MalformedResponse {
                details: "comment response contained no things".to_string(),
            })?;

        info!("Submitted Reddit comment {}", comment_name);
        Ok(comment_name)
    }
}

impl Default for RedditClient {
    fn default() -> Self {
        Self::new()
    }
}

impl From<RedditPostData> for Candidate {
    fn from(post: RedditPostData) -> Self {
        Candidate {
            id: post.name,
            author: post.author,
            title: Some(post.title),
            body: post.selftext,
            engagement: post.ups.max(0) as u32,
            reply_count: post.num_comments,
            created_at: DateTime::from_timestamp(post.created_utc as i64, 0)
                .unwrap_or_else(Utc::now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_query_joins_keywords_with_or() {
        assert_eq!(
            build_search_query("rust, async runtimes ,tokio"),
            "rust OR async runtimes OR tokio"
        );
    }

    #[test]
    fn search_query_drops_empty_segments() {
        assert_eq!(build_search_query("rust,,  ,tokio"), "rust OR tokio");
        assert_eq!(build_search_query(""), "");
    }

    #[test]
    fn post_data_converts_to_candidate() {
        let post = RedditPostData {
            id: "abc123".to_string(),
            name: "t3_abc123".to_string(),
            title: "Which async runtime?".to_string(),
            selftext: "Starting a new project".to_string(),
            author: "rustacean".to_string(),
            subreddit: "rust".to_string(),
            created_utc: 1706780000.0,
            ups: 42,
            num_comments: 7,
        };

        let candidate: Candidate = post.into();
        assert_eq!(candidate.id, "t3_abc123");
        assert_eq!(candidate.author, "rustacean");
        assert_eq!(candidate.title.as_deref(), Some("Which async runtime?"));
        assert_eq!(candidate.engagement, 42);
        assert_eq!(candidate.reply_count, 7);
    }

    #[test]
    fn negative_score_clamps_to_zero() {
        let post = RedditPostData {
            id: "x".to_string(),
            name: "t3_x".to_string(),
            title: "downvoted".to_string(),
            selftext: String::new(),
            author: "someone".to_string(),
            subreddit: "rust".to_string(),
            created_utc: 1706780000.0,
            ups: -5,
            num_comments: 0,
        };

        let candidate: Candidate = post.into();
        assert_eq!(candidate.engagement, 0);
    }

    #[test]
    fn parses_comment_submit_response() {
        let raw = r#"{
            "json": {
                "errors": [],
                "data": {
                    "things": [
                        {"kind": "t1", "data": {"name": "t1_newcomment", "id": "newcomment"}}
                    ]
                }
            }
        }"#;

        let submitted: SubmitCommentResponse = serde_json::from_str(raw).unwrap();
        assert!(submitted.json.errors.is_empty());
        let name = submitted
            .json
            .data
            .unwrap()
            .things
            .into_iter()
            .next()
            .unwrap()
            .data
            .name;
        assert_eq!(name, "t1_newcomment");
    }

    #[test]
    fn parses_comment_submit_errors() {
        let raw = r#"{
            "json": {
                "errors": [["RATELIMIT", "you are doing that too much", "ratelimit"]],
                "data": null
            }
        }"#;

        let submitted: SubmitCommentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(submitted.json.errors.len(), 1);
    }
}
