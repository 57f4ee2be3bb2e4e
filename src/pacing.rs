//! Randomized pacing between browser actions.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::debug;

/// A delay of `base` plus a uniformly random share of `jitter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pause {
    pub base: Duration,
    pub jitter: Duration,
}

impl Pause {
    #[must_use]
    pub const fn new(base: Duration, jitter: Duration) -> Self {
        Self { base, jitter }
    }

    /// Resolve the pause using `fraction` in `[0, 1)` of the jitter.
    #[must_use]
    pub fn with_fraction(&self, fraction: f64) -> Duration {
        self.base + self.jitter.mul_f64(fraction.clamp(0.0, 1.0))
    }
}

/// After navigating to a search page.
pub const AFTER_NAVIGATION: Pause =
    Pause::new(Duration::from_millis(1500), Duration::from_millis(1000));

/// After each scroll to the page bottom.
pub const AFTER_SCROLL: Pause = Pause::new(Duration::from_millis(800), Duration::from_millis(1000));

/// Second look when the page height did not change after a scroll.
pub const STALL_RECHECK: Pause =
    Pause::new(Duration::from_millis(2000), Duration::from_millis(1000));

/// Occasional extra pause so scrolling is less regular.
pub const IDLE: Pause = Pause::new(Duration::from_millis(3000), Duration::from_millis(2000));

/// Probability of an [`IDLE`] pause in any one scroll iteration.
pub const IDLE_PROBABILITY: f64 = 0.05;

/// Source of delays and random decisions for the scroll loop.
#[async_trait]
pub trait Pacer: Send + Sync {
    /// Block for `pause.base + uniform(0, pause.jitter)`.
    async fn delay(&self, pause: Pause);

    /// Return `true` with the given probability.
    fn chance(&self, probability: f64) -> bool;
}

/// Pacer backed by the thread RNG and the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomPacer;

#[async_trait]
impl Pacer for RandomPacer {
    async fn delay(&self, pause: Pause) {
        let wait = pause.with_fraction(rand::thread_rng().gen::<f64>());
        debug!(wait_ms = wait.as_millis(), "Pacing delay");
        tokio::time::sleep(wait).await;
    }

    fn chance(&self, probability: f64) -> bool {
        rand::thread_rng().gen_bool(probability.clamp(0.0, 1.0))
    }
}
