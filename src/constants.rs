//! Shared constants used across the application.

/// Placeholder substituted with the encoded query in a search URL template.
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// Live (latest-first) search results view.
pub const DEFAULT_SEARCH_URL_TEMPLATE: &str = "https://x.com/search?q={query}&f=live";

/// Origin used to resolve relative permalinks found inside result cards.
pub const SITE_ORIGIN: &str = "https://x.com/";

/// User agent string presented by the headless browser.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Build the search URL for `query` from `template`.
///
/// The query is percent-encoded so hashtag queries (`#tag`) are not read as a fragment.
#[must_use]
pub fn search_url(template: &str, query: &str) -> String {
    template.replace(QUERY_PLACEHOLDER, &urlencoding::encode(query))
}
