//! Text normalization for scraped post bodies.

use regex::Regex;

static HASHTAG_PATTERN: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r"#\w+").unwrap());

static MENTION_PATTERN: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r"@\w+").unwrap());

/// Decode HTML entities and collapse runs of whitespace into single spaces.
#[must_use]
pub fn clean_text(raw: &str) -> String {
    let decoded = html_escape::decode_html_entities(raw);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Hashtags in order of appearance, duplicates kept.
#[must_use]
pub fn parse_hashtags(text: &str) -> Vec<String> {
    HASHTAG_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Mentions in order of appearance, duplicates kept.
#[must_use]
pub fn parse_mentions(text: &str) -> Vec<String> {
    MENTION_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}
