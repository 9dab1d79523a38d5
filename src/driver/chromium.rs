//! Chromium-backed driver built on chromiumoxide

use crate::config::BrowserConfig;
use crate::driver::{DriverError, DriverResult, PageDriver};
use async_trait::async_trait;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Delay between two probes while waiting for a selector
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A headless Chromium session with a single tab
pub struct ChromiumDriver {
    browser: Browser,
    page: Page,
    handler: Option<JoinHandle<()>>,
    closed: bool,
}

impl ChromiumDriver {
    /// Launches Chromium and opens a blank tab
    ///
    /// The CDP event handler runs on its own tokio task until the browser
    /// is closed.
    ///
    /// # Arguments
    ///
    /// * `config` - Browser section of the configuration
    ///
    /// # Returns
    ///
    /// * `Ok(ChromiumDriver)` - Browser is running with one blank tab
    /// * `Err(DriverError)` - Chromium could not be found or started
    pub async fn launch(config: &BrowserConfig) -> DriverResult<Self> {
        let mut builder = chromiumoxide::BrowserConfig::builder();
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &config.executable {
            builder = builder.chrome_executable(executable);
        }
        let browser_config = builder.build().map_err(DriverError::Launch)?;

        let (browser, mut handler) = Browser::launch(browser_config).await?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler stopped: {}", e);
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        tracing::debug!("Browser launched (headless: {})", config.headless);

        Ok(Self {
            browser,
            page,
            handler: Some(handler),
            closed: false,
        })
    }

    fn page(&self) -> DriverResult<&Page> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        Ok(&self.page)
    }
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn navigate(&mut self, url: &str) -> DriverResult<()> {
        tracing::debug!("Navigating to {}", url);
        self.page()?.goto(url).await?;
        Ok(())
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> DriverResult<()> {
        let page = self.page()?;

        let probe = async {
            loop {
                match page.find_element(selector).await {
                    Ok(_) => return,
                    Err(e) => {
                        tracing::trace!("Selector '{}' not present yet: {}", selector, e);
                        tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
                    }
                }
            }
        };

        tokio::time::timeout(timeout, probe)
            .await
            .map_err(|_| DriverError::SelectorTimeout {
                selector: selector.to_string(),
                timeout,
            })
    }

    async fn content(&mut self) -> DriverResult<String> {
        Ok(self.page()?.content().await?)
    }

    async fn elements_exist(&mut self, selector: &str) -> DriverResult<bool> {
        let elements = self.page()?.find_elements(selector).await?;
        Ok(!elements.is_empty())
    }

    async fn click(&mut self, selector: &str) -> DriverResult<()> {
        let element = self
            .page()?
            .find_element(selector)
            .await
            .map_err(|_| DriverError::ElementNotFound(selector.to_string()))?;
        element.click().await?;
        Ok(())
    }

    async fn close(&mut self) -> DriverResult<()> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        self.closed = true;

        self.browser.close().await?;
        self.browser.wait().await?;

        if let Some(handler) = self.handler.take() {
            if let Err(e) = handler.await {
                tracing::debug!("Browser handler task ended abnormally: {}", e);
            }
        }

        tracing::debug!("Browser closed");
        Ok(())
    }
}
