use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One post extracted from a result card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    /// Taken from the permalink's `/status/{id}` segment. Never empty.
    pub id: String,
    /// Best-effort; empty when the card markup had nothing usable.
    pub author_handle: String,
    pub posted_at: Option<DateTime<Utc>>,
    /// Normalized text (entities decoded, whitespace collapsed).
    pub text: String,
    pub hashtags: Vec<String>,
    pub mentions: Vec<String>,
    pub permalink: Option<String>,
    /// When the card was read, not when the post was made.
    pub collected_at: DateTime<Utc>,
}

impl PostRecord {
    /// Whether the post falls inside the recency window ending at `now`.
    ///
    /// Posts without a timestamp cannot be verified and are kept.
    #[must_use]
    pub fn is_recent(&self, now: DateTime<Utc>, min_recent_hours: u32) -> bool {
        self.posted_at
            .map_or(true, |posted| now - posted <= Duration::hours(i64::from(min_recent_hours)))
    }
}
