use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::extract::PostRecord;

/// A stored post row. Timestamps are RFC 3339 text, tag lists are JSON arrays.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredPost {
    pub id: String,
    pub query: String,
    pub author_handle: String,
    pub posted_at: Option<String>,
    pub text: String,
    pub hashtags: String,
    pub mentions: String,
    pub permalink: Option<String>,
    pub collected_at: String,
}

impl StoredPost {
    /// Convert the row back into a [`PostRecord`].
    ///
    /// # Errors
    ///
    /// Returns an error if a timestamp or tag list column is malformed.
    pub fn into_record(self) -> Result<PostRecord> {
        Ok(PostRecord {
            posted_at: self
                .posted_at
                .as_deref()
                .map(parse_stored_time)
                .transpose()?,
            collected_at: parse_stored_time(&self.collected_at)?,
            hashtags: serde_json::from_str(&self.hashtags).context("Malformed hashtags column")?,
            mentions: serde_json::from_str(&self.mentions).context("Malformed mentions column")?,
            id: self.id,
            author_handle: self.author_handle,
            text: self.text,
            permalink: self.permalink,
        })
    }
}

fn parse_stored_time(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Malformed timestamp column: {raw}"))
}
