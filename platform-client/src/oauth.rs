use chrono::{DateTime, Duration, Utc};
use replyflow_core::{AuthError, Platform, PlatformCredentials, TokenGrant};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

const TWITTER_TOKEN_URL: &str = "https://api.twitter.com/2/oauth2/token";
const REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const INSTAGRAM_REFRESH_URL: &str = "https://graph.instagram.com/refresh_access_token";

/// Wire shape shared by all four token endpoints. `refresh_token` is absent
/// on Google and Instagram responses; Reddit reuses the one on file.
#[derive(Debug, Deserialize)]
struct RefreshTokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
}

/// Performs the platform's refresh-token grant and returns the new tokens.
///
/// The caller owns persistence: the grant must be written back to the
/// credential store before any platform write call, otherwise a later run
/// can reuse a token the platform has already rotated.
pub async fn refresh_access_token(
    http: &Client,
    platform: Platform,
    creds: &PlatformCredentials,
) -> Result<TokenGrant, AuthError> {
    let refresh_token = creds
        .refresh_token
        .as_deref()
        .ok_or(AuthError::MissingRefreshToken)?;

    debug!("Refreshing {} access token", platform);

    let response = match platform {
        Platform::Twitter => {
            http.post(TWITTER_TOKEN_URL)
                .basic_auth(&creds.client_id, Some(&creds.client_secret))
                .form(&[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token),
                    ("client_id", creds.client_id.as_str()),
                ])
                .send()
                .await?
        }
        Platform::Reddit => {
            http.post(REDDIT_TOKEN_URL)
                .basic_auth(&creds.client_id, Some(&creds.client_secret))
                .form(&[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token),
                ])
                .send()
                .await?
        }
        Platform::YouTube => {
            http.post(GOOGLE_TOKEN_URL)
                .form(&[
                    ("client_id", creds.client_id.as_str()),
                    ("client_secret", creds.client_secret.as_str()),
                    ("refresh_token", refresh_token),
                    ("grant_type", "refresh_token"),
                ])
                .send()
                .await?
        }
        Platform::Instagram => {
            // Instagram long-lived tokens refresh themselves; the stored
            // access token doubles as the grant credential.
            let access_token = creds
                .access_token
                .as_deref()
                .ok_or(AuthError::MissingRefreshToken)?;
            http.get(INSTAGRAM_REFRESH_URL)
                .query(&[
                    ("grant_type", "ig_refresh_token"),
                    ("access_token", access_token),
                ])
                .send()
                .await?
        }
    };

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AuthError::GrantRejected {
            status: status.as_u16(),
            body,
        });
    }

    let token: RefreshTokenResponse = response
        .json()
        .await
        .map_err(|e| AuthError::MalformedResponse {
            details: e.to_string(),
        })?;

    info!("Refreshed {} access token", platform);
    Ok(grant_from_response(token, Utc::now()))
}

fn grant_from_response(token: RefreshTokenResponse, now: DateTime<Utc>) -> TokenGrant {
    TokenGrant {
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        expires_at: now + Duration::seconds(token.expires_in),
    }
}
