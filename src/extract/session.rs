//! The scroll/extract loop over one search results page.

use std::collections::HashSet;

use chrono::Utc;
use tracing::{debug, error, info};

use super::card::{read_permalink, read_record};
use super::record::PostRecord;
use crate::browser::{BrowserDriver, DriverError};
use crate::constants::{search_url, DEFAULT_SEARCH_URL_TEMPLATE};
use crate::pacing::{Pacer, AFTER_NAVIGATION, AFTER_SCROLL, IDLE, IDLE_PROBABILITY, STALL_RECHECK};

/// Caps applied to a single collection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectLimits {
    pub max_items: usize,
    pub max_scrolls: usize,
    /// Posts with a timestamp older than this many hours are dropped.
    pub min_recent_hours: u32,
}

impl Default for CollectLimits {
    fn default() -> Self {
        Self {
            max_items: 1000,
            max_scrolls: 200,
            min_recent_hours: 24,
        }
    }
}

/// Why a collection run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `max_items` records were collected.
    ItemCap,
    /// `max_scrolls` scroll iterations were performed.
    ScrollCap,
    /// The page height stopped growing across a scroll and a second look.
    Stalled,
    /// The browser stopped answering mid-run.
    DriverFailure,
}

/// Mutable state of one collection run. Reset at the start of every run.
#[derive(Debug, Default)]
pub struct SessionState {
    scrolls: usize,
    collected: usize,
    last_height: i64,
    seen_ids: HashSet<String>,
    stale_ids: HashSet<String>,
    stop_reason: Option<StopReason>,
    failure: Option<DriverError>,
}

impl SessionState {
    #[must_use]
    pub fn scrolls(&self) -> usize {
        self.scrolls
    }

    #[must_use]
    pub fn collected(&self) -> usize {
        self.collected
    }

    #[must_use]
    pub fn last_height(&self) -> i64 {
        self.last_height
    }

    #[must_use]
    pub fn seen_ids(&self) -> &HashSet<String> {
        &self.seen_ids
    }

    #[must_use]
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    /// The browser error that ended the last collection, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&DriverError> {
        self.failure.as_ref()
    }
}

/// A browser session bound to one search query at a time.
///
/// The session owns its driver exclusively; queries are processed one after another.
pub struct ExtractionSession<D, P> {
    driver: D,
    pacer: P,
    search_url_template: String,
    state: SessionState,
    closed: bool,
}

impl<D: BrowserDriver, P: Pacer> ExtractionSession<D, P> {
    #[must_use]
    pub fn new(driver: D, pacer: P) -> Self {
        Self::with_search_url_template(driver, pacer, DEFAULT_SEARCH_URL_TEMPLATE)
    }

    #[must_use]
    pub fn with_search_url_template(driver: D, pacer: P, template: &str) -> Self {
        Self {
            driver,
            pacer,
            search_url_template: template.to_string(),
            state: SessionState::default(),
            closed: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    #[must_use]
    pub fn pacer(&self) -> &P {
        &self.pacer
    }

    /// Navigate to the search results for `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is closed or navigation fails or times out.
    pub async fn open(&mut self, query: &str) -> Result<(), DriverError> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        let url = search_url(&self.search_url_template, query);
        info!(url = %url, "Opening search");
        self.driver.navigate(&url).await?;
        self.pacer.delay(AFTER_NAVIGATION).await;
        Ok(())
    }

    /// Scroll through the open results page collecting records until a cap is hit or the
    /// page stops growing.
    ///
    /// Card-level problems skip the card. A driver failure ends the run with
    /// [`StopReason::DriverFailure`]; the error is kept in [`SessionState::failure`].
    pub async fn collect(&mut self, limits: CollectLimits) -> Vec<PostRecord> {
        self.state = SessionState::default();
        let mut collected = Vec::new();

        let stop = match self.run_loop(limits, &mut collected).await {
            Ok(stop) => stop,
            Err(e) => {
                debug!("Browser failed during collection: {e:#}");
                self.state.failure = Some(e);
                StopReason::DriverFailure
            }
        };
        self.state.collected = collected.len();
        self.state.stop_reason = Some(stop);

        debug!(
            collected = collected.len(),
            scrolls = self.state.scrolls,
            stop = ?stop,
            "Collection finished"
        );
        collected
    }

    async fn run_loop(
        &mut self,
        limits: CollectLimits,
        collected: &mut Vec<PostRecord>,
    ) -> Result<StopReason, DriverError> {
        if limits.max_items == 0 {
            return Ok(StopReason::ItemCap);
        }

        let mut last_height = self.driver.page_height().await?;
        self.state.last_height = last_height;

        while self.state.scrolls < limits.max_scrolls {
            let cards = self.driver.find_cards().await?;
            debug!(count = cards.len(), "Found result cards");

            for card in &cards {
                if collected.len() >= limits.max_items {
                    break;
                }
                self.visit_card(card, limits, collected).await;
            }
            self.state.collected = collected.len();

            if collected.len() >= limits.max_items {
                info!(max_items = limits.max_items, "Reached item cap");
                return Ok(StopReason::ItemCap);
            }

            self.driver.scroll_to_bottom().await?;
            self.pacer.delay(AFTER_SCROLL).await;

            let mut new_height = self.driver.page_height().await?;
            if new_height == last_height {
                self.pacer.delay(STALL_RECHECK).await;
                new_height = self.driver.page_height().await?;
                if new_height == last_height {
                    info!(height = new_height, "Reached page bottom or no further content");
                    return Ok(StopReason::Stalled);
                }
            }

            last_height = new_height;
            self.state.last_height = new_height;
            self.state.scrolls += 1;

            if self.pacer.chance(IDLE_PROBABILITY) {
                self.pacer.delay(IDLE).await;
            }
        }

        Ok(StopReason::ScrollCap)
    }

    async fn visit_card(&mut self, card: &D::Card, limits: CollectLimits, collected: &mut Vec<PostRecord>) {
        let Some(permalink) = read_permalink(&self.driver, card).await else {
            debug!("Skipping card without a permalink");
            return;
        };
        if self.state.seen_ids.contains(&permalink.id) || self.state.stale_ids.contains(&permalink.id) {
            return;
        }

        let record = read_record(&self.driver, card, permalink, Utc::now()).await;
        if !record.is_recent(record.collected_at, limits.min_recent_hours) {
            debug!(id = %record.id, posted_at = ?record.posted_at, "Skipping post outside recency window");
            self.state.stale_ids.insert(record.id);
            return;
        }

        self.state.seen_ids.insert(record.id.clone());
        collected.push(record);
    }

    /// Open `query` and collect from it.
    ///
    /// A failed navigation or a browser failure during collection yields an empty result.
    pub async fn scrape_hashtag(&mut self, query: &str, limits: CollectLimits) -> Vec<PostRecord> {
        if let Err(e) = self.open(query).await {
            error!(query = %query, "Scrape failed: {e:#}");
            return Vec::new();
        }
        let records = self.collect(limits).await;
        if let Some(e) = &self.state.failure {
            error!(
                query = %query,
                discarded = records.len(),
                "Scrape failed: {e:#}"
            );
            return Vec::new();
        }
        info!(
            query = %query,
            collected = records.len(),
            scrolls = self.state.scrolls,
            stop = ?self.state.stop_reason,
            "Scraped query"
        );
        records
    }

    /// Release the browser. Safe to call repeatedly; failures are swallowed.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.driver.quit().await {
            debug!(error = %e, "Ignoring browser shutdown failure");
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
