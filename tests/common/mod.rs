//! Scripted browser and pacer doubles for exercising the extraction loop.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use hashtag_harvester::browser::{BrowserDriver, DriverError};
use hashtag_harvester::pacing::{Pacer, Pause};

/// One result card as the scripted page renders it.
#[derive(Debug, Clone, Default)]
pub struct FakeCard {
    pub hrefs: Vec<String>,
    pub author: Option<String>,
    pub text: Option<String>,
    pub card_text: Option<String>,
    pub datetime: Option<String>,
    pub fail_links: bool,
    pub fail_author: bool,
    pub fail_text: bool,
    pub fail_time: bool,
}

impl FakeCard {
    /// A well-formed post by `user` with the given id, posted a minute ago.
    pub fn post(user: &str, id: &str) -> Self {
        Self {
            hrefs: vec![format!("/{user}"), format!("/{user}/status/{id}")],
            author: Some(format!("{user} display")),
            text: Some(format!("post {id} #rust")),
            card_text: Some(format!("{user} display\npost {id} #rust")),
            datetime: Some((Utc::now() - Duration::minutes(1)).to_rfc3339()),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn posted_hours_ago(mut self, hours: i64) -> Self {
        self.datetime = Some((Utc::now() - Duration::hours(hours)).to_rfc3339());
        self
    }

    pub fn with_datetime(mut self, raw: Option<&str>) -> Self {
        self.datetime = raw.map(str::to_string);
        self
    }

    pub fn without_permalink(mut self) -> Self {
        self.hrefs.retain(|h| !h.contains("/status/"));
        self
    }
}

#[derive(Debug, Default)]
struct Script {
    snapshots: Vec<Vec<FakeCard>>,
    heights: VecDeque<i64>,
    last_height: i64,
    fail_navigation: bool,
    fail_quit: bool,
    fail_find_after: Option<usize>,
    navigations: Vec<String>,
    find_calls: usize,
    scroll_calls: usize,
    height_calls: usize,
    quit_calls: usize,
}

/// A results page that replays a fixed sequence of card snapshots and heights.
///
/// Once the snapshots or heights run out the last one is repeated.
#[derive(Debug, Default)]
pub struct ScriptedDriver {
    script: Mutex<Script>,
}

impl ScriptedDriver {
    pub fn new(snapshots: Vec<Vec<FakeCard>>, heights: &[i64]) -> Self {
        Self {
            script: Mutex::new(Script {
                snapshots,
                heights: heights.iter().copied().collect(),
                ..Script::default()
            }),
        }
    }

    /// Page that grows by 100px on every measurement.
    pub fn growing(snapshots: Vec<Vec<FakeCard>>) -> Self {
        let heights: Vec<i64> = (0..500).map(|i| i * 100).collect();
        Self::new(snapshots, &heights)
    }

    pub fn failing_navigation(self) -> Self {
        self.script.lock().unwrap().fail_navigation = true;
        self
    }

    pub fn failing_quit(self) -> Self {
        self.script.lock().unwrap().fail_quit = true;
        self
    }

    /// Let `calls` card enumerations succeed, then fail every later one.
    pub fn failing_find_after(self, calls: usize) -> Self {
        self.script.lock().unwrap().fail_find_after = Some(calls);
        self
    }

    pub fn navigations(&self) -> Vec<String> {
        self.script.lock().unwrap().navigations.clone()
    }

    pub fn find_calls(&self) -> usize {
        self.script.lock().unwrap().find_calls
    }

    pub fn scroll_calls(&self) -> usize {
        self.script.lock().unwrap().scroll_calls
    }

    pub fn height_calls(&self) -> usize {
        self.script.lock().unwrap().height_calls
    }

    pub fn quit_calls(&self) -> usize {
        self.script.lock().unwrap().quit_calls
    }
}

fn protocol(message: &str) -> DriverError {
    DriverError::Protocol(message.to_string())
}

#[async_trait]
impl BrowserDriver for ScriptedDriver {
    type Card = FakeCard;

    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        let mut script = self.script.lock().unwrap();
        script.navigations.push(url.to_string());
        if script.fail_navigation {
            return Err(DriverError::NavigationTimeout {
                url: url.to_string(),
                timeout: std::time::Duration::from_secs(60),
            });
        }
        Ok(())
    }

    async fn find_cards(&self) -> Result<Vec<FakeCard>, DriverError> {
        let mut script = self.script.lock().unwrap();
        let call = script.find_calls;
        script.find_calls += 1;
        if script.fail_find_after.is_some_and(|limit| call >= limit) {
            return Err(protocol("target crashed"));
        }
        if script.snapshots.is_empty() {
            return Ok(Vec::new());
        }
        let index = call.min(script.snapshots.len() - 1);
        Ok(script.snapshots[index].clone())
    }

    async fn read_attribute(
        &self,
        card: &FakeCard,
        selector: &str,
        attribute: &str,
    ) -> Result<Option<String>, DriverError> {
        match (selector, attribute) {
            ("time", "datetime") if card.fail_time => Err(protocol("no such element")),
            ("time", "datetime") => Ok(card.datetime.clone()),
            _ => Ok(None),
        }
    }

    async fn read_attributes(
        &self,
        card: &FakeCard,
        selector: &str,
        attribute: &str,
    ) -> Result<Vec<String>, DriverError> {
        match (selector, attribute) {
            ("a", "href") if card.fail_links => Err(protocol("node detached")),
            ("a", "href") => Ok(card.hrefs.clone()),
            _ => Ok(Vec::new()),
        }
    }

    async fn read_text(
        &self,
        card: &FakeCard,
        selector: Option<&str>,
    ) -> Result<Option<String>, DriverError> {
        match selector {
            Some(s) if s.contains("tweetText") => {
                if card.fail_text {
                    Err(protocol("no such element"))
                } else {
                    Ok(card.text.clone())
                }
            }
            Some(s) if s.contains("dir='ltr'") => {
                if card.fail_author {
                    Err(protocol("no such element"))
                } else {
                    Ok(card.author.clone())
                }
            }
            Some(_) => Ok(None),
            None => Ok(card.card_text.clone()),
        }
    }

    async fn scroll_to_bottom(&self) -> Result<(), DriverError> {
        self.script.lock().unwrap().scroll_calls += 1;
        Ok(())
    }

    async fn page_height(&self) -> Result<i64, DriverError> {
        let mut script = self.script.lock().unwrap();
        script.height_calls += 1;
        if let Some(height) = script.heights.pop_front() {
            script.last_height = height;
        }
        Ok(script.last_height)
    }

    async fn quit(&mut self) -> Result<(), DriverError> {
        let mut script = self.script.lock().unwrap();
        script.quit_calls += 1;
        if script.fail_quit {
            return Err(protocol("browser already gone"));
        }
        Ok(())
    }
}

/// Pacer that records requested pauses instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingPacer {
    pauses: Mutex<Vec<Pause>>,
    always_idle: bool,
}

impl RecordingPacer {
    /// A pacer whose random roll always succeeds.
    pub fn always_idle() -> Self {
        Self {
            pauses: Mutex::new(Vec::new()),
            always_idle: true,
        }
    }

    pub fn pauses(&self) -> Vec<Pause> {
        self.pauses.lock().unwrap().clone()
    }
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn delay(&self, pause: Pause) {
        self.pauses.lock().unwrap().push(pause);
    }

    fn chance(&self, _probability: f64) -> bool {
        self.always_idle
    }
}
