use chrono::{DateTime, Duration, Utc};

/// Tokens expiring further out than this are reused without a network
/// call, avoiding needless refresh traffic and token churn.
pub const REFRESH_MARGIN_MINUTES: i64 = 5;

pub fn needs_refresh(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match expires_at {
        Some(expires_at) => expires_at <= now + Duration::minutes(REFRESH_MARGIN_MINUTES),
        None => true,
    }
}
