//! Field-by-field extraction from one result card.
//!
//! Every lookup is independent: a failed read degrades that field to its default and the
//! rest of the card is still used. Only the permalink is mandatory.

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::debug;
use url::Url;

use super::record::PostRecord;
use crate::browser::BrowserDriver;
use crate::constants::SITE_ORIGIN;
use crate::text::{clean_text, parse_hashtags, parse_mentions};

/// Pattern to extract the post id from a permalink path.
static POST_ID_PATTERN: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r"/status/([^/?#]+)").unwrap());

const LINK_SELECTOR: &str = "a";
const AUTHOR_SELECTORS: &[&str] = &[
    "div[data-testid='User-Name'] div[dir='ltr'] span",
    "div[dir='ltr'] span",
];
const TEXT_SELECTOR: &str = "div[data-testid='tweetText']";
const TIME_SELECTOR: &str = "time";

/// A resolved post permalink and the id taken from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permalink {
    pub url: String,
    pub id: String,
}

/// Resolve the card's permalink from its links. `None` means the card cannot be used.
pub async fn read_permalink<D: BrowserDriver>(driver: &D, card: &D::Card) -> Option<Permalink> {
    match driver.read_attributes(card, LINK_SELECTOR, "href").await {
        Ok(hrefs) => permalink_from_hrefs(&hrefs),
        Err(e) => {
            debug!(error = %e, "Failed to read card links");
            None
        }
    }
}

/// Read the remaining fields of a card whose permalink is already known.
pub async fn read_record<D: BrowserDriver>(
    driver: &D,
    card: &D::Card,
    permalink: Permalink,
    collected_at: DateTime<Utc>,
) -> PostRecord {
    let author_handle = match read_author(driver, card).await {
        Some(author) => author,
        None => handle_from_permalink(&permalink.url).unwrap_or_default(),
    };
    let raw_text = read_raw_text(driver, card).await;
    let posted_at = read_posted_at(driver, card).await;

    PostRecord {
        id: permalink.id,
        author_handle,
        posted_at,
        text: clean_text(&raw_text),
        hashtags: parse_hashtags(&raw_text),
        mentions: parse_mentions(&raw_text),
        permalink: Some(permalink.url),
        collected_at,
    }
}

async fn read_author<D: BrowserDriver>(driver: &D, card: &D::Card) -> Option<String> {
    for &selector in AUTHOR_SELECTORS {
        match driver.read_text(card, Some(selector)).await {
            Ok(Some(text)) if !text.trim().is_empty() => return Some(text.trim().to_string()),
            Ok(_) => {}
            Err(e) => debug!(selector, error = %e, "Author lookup failed"),
        }
    }
    None
}

async fn read_raw_text<D: BrowserDriver>(driver: &D, card: &D::Card) -> String {
    match driver.read_text(card, Some(TEXT_SELECTOR)).await {
        Ok(Some(text)) => return text,
        Ok(None) => {}
        Err(e) => debug!(error = %e, "Post text lookup failed, using whole card text"),
    }
    match driver.read_text(card, None).await {
        Ok(text) => text.unwrap_or_default(),
        Err(e) => {
            debug!(error = %e, "Card text lookup failed");
            String::new()
        }
    }
}

async fn read_posted_at<D: BrowserDriver>(driver: &D, card: &D::Card) -> Option<DateTime<Utc>> {
    match driver.read_attribute(card, TIME_SELECTOR, "datetime").await {
        Ok(Some(raw)) => {
            let parsed = parse_timestamp(&raw);
            if parsed.is_none() {
                debug!(raw = %raw, "Unparsable post timestamp");
            }
            parsed
        }
        Ok(None) => None,
        Err(e) => {
            debug!(error = %e, "Timestamp lookup failed");
            None
        }
    }
}

/// First href pointing at a post, resolved to an absolute URL.
#[must_use]
pub fn permalink_from_hrefs(hrefs: &[String]) -> Option<Permalink> {
    hrefs
        .iter()
        .filter(|href| href.contains("/status/"))
        .find_map(|href| {
            let url = absolutize(href)?;
            let id = extract_post_id(&url)?;
            Some(Permalink { url, id })
        })
}

/// Extract the post id from a permalink.
///
/// Permalinks have the form `https://x.com/{user}/status/{id}`.
#[must_use]
pub fn extract_post_id(url: &str) -> Option<String> {
    POST_ID_PATTERN
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|id| !id.is_empty())
}

/// Path prefix of handle-less permalinks such as `/i/web/status/{id}`.
const RESERVED_USER_SEGMENT: &str = "i";

/// The `{user}` segment of a permalink, prefixed with `@`.
///
/// Only `/{user}/status/{id}` paths carry a handle.
#[must_use]
pub fn handle_from_permalink(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let mut segments = parsed.path_segments()?;
    let user = segments
        .next()
        .filter(|s| !s.is_empty() && *s != RESERVED_USER_SEGMENT)?;
    (segments.next() == Some("status")).then(|| format!("@{user}"))
}

/// Parse an ISO-8601 `datetime` attribute into UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn absolutize(href: &str) -> Option<String> {
    let base = Url::parse(SITE_ORIGIN).ok()?;
    base.join(href).ok().map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hrefs(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_extract_post_id() {
        assert_eq!(
            extract_post_id("https://x.com/user/status/1234567890"),
            Some("1234567890".to_string())
        );
        assert_eq!(
            extract_post_id("https://x.com/user/status/123?s=20"),
            Some("123".to_string())
        );
        assert_eq!(
            extract_post_id("https://x.com/user/status/123/photo/1"),
            Some("123".to_string())
        );
        assert_eq!(extract_post_id("https://x.com/user"), None);
        assert_eq!(extract_post_id("https://x.com/user/status/"), None);
    }

    #[test]
    fn test_permalink_first_status_link_wins() {
        let found = permalink_from_hrefs(&hrefs(&[
            "/alice",
            "/alice/status/111",
            "/bob/status/222",
        ]))
        .unwrap();
        assert_eq!(found.url, "https://x.com/alice/status/111");
        assert_eq!(found.id, "111");
    }

    #[test]
    fn test_permalink_keeps_absolute_urls() {
        let found = permalink_from_hrefs(&hrefs(&["https://x.com/carol/status/333"])).unwrap();
        assert_eq!(found.url, "https://x.com/carol/status/333");
    }

    #[test]
    fn test_permalink_missing() {
        assert_eq!(permalink_from_hrefs(&hrefs(&["/alice", "/explore"])), None);
        assert_eq!(permalink_from_hrefs(&[]), None);
    }

    #[test]
    fn test_handle_from_permalink() {
        assert_eq!(
            handle_from_permalink("https://x.com/alice/status/111"),
            Some("@alice".to_string())
        );
        assert_eq!(handle_from_permalink("https://x.com/i/lists/5"), None);
        assert_eq!(handle_from_permalink("https://x.com/i/web/status/123"), None);
        assert_eq!(handle_from_permalink("https://x.com/i/status/123"), None);
        assert_eq!(handle_from_permalink("not a url"), None);
    }

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp("2024-01-15T12:00:00.000Z").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-01-15T12:00:00+00:00");

        let offset = parse_timestamp("2024-01-15T14:00:00+02:00").unwrap();
        assert_eq!(offset, ts);

        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp(""), None);
    }
}
