use crate::rate_limiter::{RateLimitConfig, RateLimiter};
use chrono::{DateTime, Duration, Utc};
use replyflow_core::{Candidate, FetchError, PublishError};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
pub const RECENT_VIDEO_COUNT: u32 = 5;
pub const COMMENT_PAGE_SIZE: u32 = 50;
pub const COMMENT_LOOKBACK_DAYS: i64 = 7;

#[derive(Debug, Deserialize)]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentThreadsResponse {
    #[serde(default)]
    items: Vec<CommentThread>,
}

#[derive(Debug, Deserialize)]
struct CommentThread {
    snippet: CommentThreadSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThreadSnippet {
    #[serde(default)]
    total_reply_count: u32,
    top_level_comment: TopLevelComment,
}

#[derive(Debug, Deserialize)]
struct TopLevelComment {
    id: String,
    snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    author_display_name: String,
    text_display: String,
    #[serde(default)]
    like_count: u32,
    published_at: String,
}

#[derive(Debug, Serialize)]
struct InsertCommentRequest<'a> {
    snippet: InsertCommentSnippet<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertCommentSnippet<'a> {
    parent_id: &'a str,
    text_original: &'a str,
}

#[derive(Debug, Deserialize)]
struct InsertedComment {
    id: String,
}

/// Oldest `publishedAt` a comment may have and still be considered.
pub fn comment_window_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(COMMENT_LOOKBACK_DAYS)
}

#[derive(Debug)]
pub struct YouTubeClient {
    http: Client,
    rate_limiter: Arc<RateLimiter>,
    base_url: String,
}

impl YouTubeClient {
    pub fn new() -> Self {
        Self {
            http: crate::build_http_client(),
            rate_limiter: Arc::new(RateLimiter::new(RateLimitConfig::youtube())),
            base_url: YOUTUBE_API_BASE.to_string(),
        }
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Recent top-level comments across the channel's latest videos,
    /// flattened, bounded to the last week.
    pub async fn fetch_recent_comments(
        &self,
        access_token: &str,
    ) -> Result<Vec<Candidate>, FetchError> {
        let video_ids = self.list_recent_video_ids(access_token).await?;
        let cutoff = comment_window_cutoff(Utc::now());

        let mut candidates = Vec::new();
        for video_id in &video_ids {
            // One video's comments failing must not sink the others.
            match self
                .fetch_video_comments(access_token, video_id, cutoff)
                .await
            {
                Ok(mut comments) => candidates.append(&mut comments),
                Err(e) => warn!("Skipping comments for video {}: {}", video_id, e),
            }
        }

        info!(
            "Retrieved {} comments across {} videos",
            candidates.len(),
            video_ids.len()
        );
        Ok(candidates)
    }

    async fn list_recent_video_ids(&self, access_token: &str) -> Result<Vec<String>, FetchError> {
        let _permit = self.rate_limiter.acquire_permit().await;
        let page_size = RECENT_VIDEO_COUNT.to_string();

        let response = self
            .http
            .get(format!("{}/search", self.base_url))
            .bearer_auth(access_token)
            .query(&[
                ("part", "id"),
                ("forMine", "true"),
                ("type", "video"),
                ("order", "date"),
                ("maxResults", page_size.as_str()),
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

        let listing: SearchListResponse =
            response
                .json()
                .await
                .map_err(|e| FetchError::MalformedResponse {
                    details: e.to_string(),
                })?;

        let ids: Vec<String> = listing
            .items
            .into_iter()
            .filter_map(|item| item.id.video_id)
            .collect();
        debug!("Found {} recent videos", ids.len());
        Ok(ids)
    }

    async fn fetch_video_comments(
        &self,
        access_token: &str,
        video_id: &str,
        published_after: DateTime<Utc>,
    ) -> Result<Vec<Candidate>, FetchError> {
        let _permit = self.rate_limiter.acquire_permit().await;
        let page_size = COMMENT_PAGE_SIZE.to_string();

        let response = self
            .http
            .get(format!("{}/commentThreads", self.base_url))
            .bearer_auth(access_token)
            .query(&[
                ("part", "snippet"),
                ("videoId", video_id),
                ("order", "relevance"),
                ("maxResults", page_size.as_str()),
                ("textFormat", "plainText"),
            ])
            .send()
            .await?;

        let status = response.status();
        // Comments disabled on this video; not an error for the run.
        if status == StatusCode::FORBIDDEN {
            debug!("Comments disabled for video {}", video_id);
            return Ok(Vec::new());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let threads: CommentThreadsResponse =
            response
                .json()
                .await
                .map_err(|e| FetchError::MalformedResponse {
                    details: e.to_string(),
                })?;

        let candidates = threads
            .items
            .into_iter()
            .filter_map(|thread| thread_to_candidate(thread, published_after))
            .collect();
        Ok(candidates)
    }

    /// Replies to a top-level comment via comments.insert with a parent id.
    pub async fn insert_reply(
        &self,
        access_token: &str,
        parent_comment_id: &str,
        text: &str,
    ) -> Result<String, PublishError> {
        let _permit = self.rate_limiter.acquire_permit().await;

        let response = self
            .http
            .post(format!("{}/comments", self.base_url))
            .bearer_auth(access_token)
            .query(&[("part", "snippet")])
            .json(&InsertCommentRequest {
                snippet: InsertCommentSnippet {
                    parent_id: parent_comment_id,
                    text_original: text,
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

        let inserted: InsertedComment =
            response
                .json()
                .await
                .map_err(|e| PublishError::MalformedResponse {
                    details: e.to_string(),
                })?;

        info!("Posted YouTube reply {}", inserted.id);
        Ok(inserted.id)
    }
}

impl Default for YouTubeClient {
    fn default() -> Self {
        Self::new()
    }
}

fn thread_to_candidate(thread: CommentThread, published_after: DateTime<Utc>) -> Option<Candidate> {
    let reply_count = thread.snippet.total_reply_count;
    let comment = thread.snippet.top_level_comment;

    let published_at = DateTime::parse_from_rfc3339(&comment.snippet.published_at)
        .ok()?
        .with_timezone(&Utc);
    if published_at < published_after {
        return None;
    }

    Some(Candidate {
        id: comment.id,
        author: comment.snippet.author_display_name,
        title: None,
        body: comment.snippet.text_display,
        engagement: comment.snippet.like_count,
        reply_count,
        created_at: published_at,
    })
}
