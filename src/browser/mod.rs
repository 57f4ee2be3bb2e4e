//! Narrow browser-automation interface used by the extraction loop.
//!
//! The scroll/extract state machine only talks to a [`BrowserDriver`], so it can be
//! exercised against a scripted page as well as a real headless Chromium.

mod chromium;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use chromium::{ChromiumDriver, DriverConfig};

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("navigation to {url} timed out after {timeout:?}")]
    NavigationTimeout { url: String, timeout: Duration },
    #[error("browser protocol error: {0}")]
    Protocol(String),
    #[error("unexpected value from page: {0}")]
    UnexpectedValue(String),
    #[error("browser session is closed")]
    Closed,
}

/// Operations the extraction loop needs from a live results page.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Handle to one rendered result card.
    type Card: Send + Sync;

    /// Load `url` in the session's page.
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    /// Snapshot of the result cards currently rendered, in document order.
    async fn find_cards(&self) -> Result<Vec<Self::Card>, DriverError>;

    /// `attribute` of the first descendant of `card` matching `selector`.
    async fn read_attribute(
        &self,
        card: &Self::Card,
        selector: &str,
        attribute: &str,
    ) -> Result<Option<String>, DriverError>;

    /// `attribute` of every descendant of `card` matching `selector`, skipping elements
    /// without it.
    async fn read_attributes(
        &self,
        card: &Self::Card,
        selector: &str,
        attribute: &str,
    ) -> Result<Vec<String>, DriverError>;

    /// Rendered text of the first descendant matching `selector`, or of the card itself
    /// when `selector` is `None`.
    async fn read_text(
        &self,
        card: &Self::Card,
        selector: Option<&str>,
    ) -> Result<Option<String>, DriverError>;

    /// Scroll the window to the current bottom of the document.
    async fn scroll_to_bottom(&self) -> Result<(), DriverError>;

    /// Current scroll height of the document body.
    async fn page_height(&self) -> Result<i64, DriverError>;

    /// Shut the browser down. Calling this on a closed driver is a no-op.
    async fn quit(&mut self) -> Result<(), DriverError>;
}
