//! Headless Chromium driver over the DevTools protocol.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig, HeadlessMode};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{BrowserDriver, DriverError};
use crate::constants::BROWSER_USER_AGENT;

/// Default viewport width in pixels.
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1280;

/// Default viewport height in pixels.
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 1600;

/// Selector for one rendered result card.
const CARD_SELECTOR: &str = "article";

const SCROLL_TO_BOTTOM_JS: &str = "window.scrollTo(0, document.body.scrollHeight);";
const PAGE_HEIGHT_JS: &str = "document.body.scrollHeight";

/// Browser launch options.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub headless: bool,
    pub proxy: Option<String>,
    /// Path to Chrome/Chromium executable (None for auto-detection).
    pub chrome_path: Option<String>,
    pub page_timeout: Duration,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            headless: true,
            proxy: None,
            chrome_path: None,
            page_timeout: Duration::from_secs(60),
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
        }
    }
}

impl From<&crate::config::Config> for DriverConfig {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            headless: config.headless,
            proxy: config.proxy.clone(),
            chrome_path: config.chrome_path.clone(),
            page_timeout: config.page_timeout,
            ..Self::default()
        }
    }
}

impl DriverConfig {
    /// Headless flags (`--headless=new`, `--hide-scrollbars`, `--mute-audio`) are emitted
    /// by the builder from this mode, never by [`DriverConfig::launch_args`].
    #[must_use]
    pub const fn headless_mode(&self) -> HeadlessMode {
        if self.headless {
            HeadlessMode::New
        } else {
            HeadlessMode::False
        }
    }

    /// Command-line switches passed to Chromium on top of the builder's own.
    #[must_use]
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        args.extend(
            [
                "--disable-gpu",
                "--disable-dev-shm-usage",
                "--disable-software-rasterizer",
                "--disable-blink-features=AutomationControlled",
                "--no-first-run",
                "--no-default-browser-check",
                "--disable-extensions",
                "--disable-sync",
                "--lang=en-US",
            ]
            .map(str::to_string),
        );
        args.push(format!("--user-agent={BROWSER_USER_AGENT}"));
        if let Some(ref proxy) = self.proxy {
            args.push(format!("--proxy-server={proxy}"));
        }
        args
    }
}

impl From<CdpError> for DriverError {
    fn from(e: CdpError) -> Self {
        Self::Protocol(e.to_string())
    }
}

/// One browser process with a single page, owned exclusively by one scraper.
pub struct ChromiumDriver {
    browser: Option<Browser>,
    page: Option<Page>,
    handler: Option<JoinHandle<()>>,
    page_timeout: Duration,
}

impl ChromiumDriver {
    /// Launch Chromium and open a blank page.
    ///
    /// # Errors
    ///
    /// Returns an error if the browser cannot be started or the page cannot be created.
    pub async fn launch(config: &DriverConfig) -> Result<Self, DriverError> {
        info!(headless = config.headless, proxy = ?config.proxy, "Launching headless browser");

        let mut builder = BrowserConfig::builder()
            .window_size(config.viewport_width, config.viewport_height)
            .request_timeout(config.page_timeout)
            .no_sandbox()
            .disable_default_args()
            .headless_mode(config.headless_mode());

        for arg in config.launch_args() {
            builder = builder.arg(arg);
        }
        if let Some(ref chrome_path) = config.chrome_path {
            builder = builder.chrome_executable(chrome_path);
        }

        let browser_config = builder
            .build()
            .map_err(|e| DriverError::Launch(format!("invalid browser config: {e}")))?;

        let (mut browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| DriverError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {e}");
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                handler_task.abort();
                return Err(DriverError::Launch(format!("failed to open page: {e}")));
            }
        };

        info!("Headless browser started");

        Ok(Self {
            browser: Some(browser),
            page: Some(page),
            handler: Some(handler_task),
            page_timeout: config.page_timeout,
        })
    }

    fn page(&self) -> Result<&Page, DriverError> {
        self.page.as_ref().ok_or(DriverError::Closed)
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    type Card = Element;

    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        let page = self.page()?;
        match tokio::time::timeout(self.page_timeout, page.goto(url)).await {
            Ok(result) => {
                result?;
                Ok(())
            }
            Err(_) => Err(DriverError::NavigationTimeout {
                url: url.to_string(),
                timeout: self.page_timeout,
            }),
        }
    }

    async fn find_cards(&self) -> Result<Vec<Element>, DriverError> {
        Ok(self.page()?.find_elements(CARD_SELECTOR).await?)
    }

    async fn read_attribute(
        &self,
        card: &Element,
        selector: &str,
        attribute: &str,
    ) -> Result<Option<String>, DriverError> {
        let element = card.find_element(selector).await?;
        Ok(element.attribute(attribute).await?)
    }

    async fn read_attributes(
        &self,
        card: &Element,
        selector: &str,
        attribute: &str,
    ) -> Result<Vec<String>, DriverError> {
        let mut values = Vec::new();
        for element in card.find_elements(selector).await? {
            if let Some(value) = element.attribute(attribute).await? {
                values.push(value);
            }
        }
        Ok(values)
    }

    async fn read_text(
        &self,
        card: &Element,
        selector: Option<&str>,
    ) -> Result<Option<String>, DriverError> {
        match selector {
            Some(selector) => Ok(card.find_element(selector).await?.inner_text().await?),
            None => Ok(card.inner_text().await?),
        }
    }

    async fn scroll_to_bottom(&self) -> Result<(), DriverError> {
        self.page()?.evaluate(SCROLL_TO_BOTTOM_JS).await?;
        Ok(())
    }

    async fn page_height(&self) -> Result<i64, DriverError> {
        let result = self.page()?.evaluate(PAGE_HEIGHT_JS).await?;
        result
            .into_value::<i64>()
            .map_err(|e| DriverError::UnexpectedValue(format!("page height: {e}")))
    }

    async fn quit(&mut self) -> Result<(), DriverError> {
        self.page = None;
        let Some(mut browser) = self.browser.take() else {
            return Ok(());
        };

        let closed = browser.close().await;
        if let Err(e) = browser.wait().await {
            warn!("Failed to wait for browser exit: {e}");
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }

        closed?;
        info!("Browser shutdown complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DriverConfig::default();
        assert!(config.headless);
        assert_eq!(config.page_timeout, Duration::from_secs(60));
        assert_eq!(config.viewport_width, DEFAULT_VIEWPORT_WIDTH);
    }

    #[test]
    fn test_launch_args_leave_headless_flags_to_builder() {
        for headless in [true, false] {
            let config = DriverConfig {
                headless,
                ..Default::default()
            };
            let args = config.launch_args();
            assert!(!args.iter().any(|a| a.starts_with("--headless")));
            assert!(!args.iter().any(|a| a == "--mute-audio"));
            assert!(args
                .iter()
                .any(|a| a == "--disable-blink-features=AutomationControlled"));
        }
    }

    #[test]
    fn test_headless_mode() {
        assert_eq!(DriverConfig::default().headless_mode(), HeadlessMode::New);
        let headful = DriverConfig {
            headless: false,
            ..Default::default()
        };
        assert_eq!(headful.headless_mode(), HeadlessMode::False);
    }

    #[test]
    fn test_launch_args_proxy() {
        assert!(!DriverConfig::default()
            .launch_args()
            .iter()
            .any(|a| a.starts_with("--proxy-server")));

        let config = DriverConfig {
            proxy: Some("http://127.0.0.1:8080".to_string()),
            ..Default::default()
        };
        assert!(config
            .launch_args()
            .iter()
            .any(|a| a == "--proxy-server=http://127.0.0.1:8080"));
    }

    #[test]
    fn test_from_config() {
        let mut config = crate::config::Config::for_testing();
        config.headless = false;
        config.page_timeout = Duration::from_secs(5);
        let driver_config = DriverConfig::from(&config);
        assert!(!driver_config.headless);
        assert_eq!(driver_config.page_timeout, Duration::from_secs(5));
    }
}
