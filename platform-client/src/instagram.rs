use crate::rate_limiter::{RateLimitConfig, RateLimiter};
use chrono::{DateTime, Utc};
use replyflow_core::{Candidate, FetchError, PublishError};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

const INSTAGRAM_API_BASE: &str = "https://graph.instagram.com";
pub const RECENT_MEDIA_COUNT: u32 = 5;

#[derive(Debug, Deserialize)]
struct MediaListResponse {
    #[serde(default)]
    data: Vec<Media>,
}

#[derive(Debug, Deserialize)]
struct Media {
    id: String,
    caption: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentListResponse {
    #[serde(default)]
    data: Vec<MediaComment>,
}

#[derive(Debug, Deserialize)]
struct MediaComment {
    id: String,
    #[serde(default)]
    text: String,
    username: Option<String>,
    #[serde(default)]
    like_count: u32,
    timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedReply {
    id: String,
}

#[derive(Debug)]
pub struct InstagramClient {
    http: Client,
    rate_limiter: Arc<RateLimiter>,
    base_url: String,
}

impl InstagramClient {
    pub fn new() -> Self {
        Self {
            http: crate::build_http_client(),
            rate_limiter: Arc::new(RateLimiter::new(RateLimitConfig::instagram())),
            base_url: INSTAGRAM_API_BASE.to_string(),
        }
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Comments across the account's recent media, flattened.
    pub async fn fetch_recent_comments(
        &self,
        access_token: &str,
    ) -> Result<Vec<Candidate>, FetchError> {
        let media = self.list_recent_media(access_token).await?;

        let mut candidates = Vec::new();
        for item in &media {
            match self.fetch_media_comments(access_token, &item.id).await {
                Ok(comments) => {
                    candidates.extend(
                        comments
                            .into_iter()
                            .map(|c| comment_to_candidate(c, item.caption.as_deref())),
                    );
                }
                Err(e) => warn!("Skipping comments for media {}: {}", item.id, e),
            }
        }

        info!(
            "Retrieved {} comments across {} media items",
            candidates.len(),
            media.len()
        );
        Ok(candidates)
    }

    async fn list_recent_media(&self, access_token: &str) -> Result<Vec<Media>, FetchError> {
        let _permit = self.rate_limiter.acquire_permit().await;
        let page_size = RECENT_MEDIA_COUNT.to_string();

        let response = self
            .http
            .get(format!("{}/me/media", self.base_url))
            .query(&[
                ("fields", "id,caption"),
                ("limit", page_size.as_str()),
                ("access_token", access_token),
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

        let listing: MediaListResponse =
            response
                .json()
                .await
                .map_err(|e| FetchError::MalformedResponse {
                    details: e.to_string(),
                })?;
        Ok(listing.data)
    }

    async fn fetch_media_comments(
        &self,
        access_token: &str,
        media_id: &str,
    ) -> Result<Vec<MediaComment>, FetchError> {
        let _permit = self.rate_limiter.acquire_permit().await;

        let response = self
            .http
            .get(format!("{}/{}/comments", self.base_url, media_id))
            .query(&[
                ("fields", "id,text,username,like_count,timestamp"),
                ("access_token", access_token),
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

        let listing: CommentListResponse =
            response
                .json()
                .await
                .map_err(|e| FetchError::MalformedResponse {
                    details: e.to_string(),
                })?;
        Ok(listing.data)
    }

    /// Replies under an existing comment.
    pub async fn reply_to_comment(
        &self,
        access_token: &str,
        comment_id: &str,
        text: &str,
    ) -> Result<String, PublishError> {
        let _permit = self.rate_limiter.acquire_permit().await;

        let response = self
            .http
            .post(format!("{}/{}/replies", self.base_url, comment_id))
            .form(&[("message", text), ("access_token", access_token)])
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

        let created: CreatedReply =
            response
                .json()
                .await
                .map_err(|e| PublishError::MalformedResponse {
                    details: e.to_string(),
                })?;

        info!("Posted Instagram reply {}", created.id);
        Ok(created.id)
    }
}

impl Default for InstagramClient {
    fn default() -> Self {
        Self::new()
    }
}

fn comment_to_candidate(comment: MediaComment, media_caption: Option<&str>) -> Candidate {
    let created_at = comment
        .timestamp
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    Candidate {
        id: comment.id,
        author: comment.username.unwrap_or_default(),
        title: media_caption.map(str::to_string),
        body: comment.text,
        engagement: comment.like_count,
        reply_count: 0,
        created_at,
    }
}
