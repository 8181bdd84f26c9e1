//! WebDriver browser session

use std::path::Path;

use thirtyfour::prelude::*;
use thirtyfour::{Capabilities, ChromiumLikeCapabilities};
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Browser {
    #[default]
    Firefox,
    Chrome,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Firefox => "firefox",
            Browser::Chrome => "chrome",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "firefox" | "gecko" => Ok(Browser::Firefox),
            "chrome" | "chromium" => Ok(Browser::Chrome),
            other => Err(format!("unsupported browser: {other}")),
        }
    }
}

/// Configuration for the WebDriver session
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// WebDriver endpoint (geckodriver / chromedriver)
    pub webdriver_url: String,
    pub browser: Browser,
    pub headless: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://127.0.0.1:4444".to_string(),
            browser: Browser::Firefox,
            headless: true,
        }
    }
}

/// A live browser session.
///
/// Owns the remote driver handle. Call [`BrowserSession::close`] to quit the
/// browser; the runner does so on every exit path.
pub struct BrowserSession {
    driver: WebDriver,
}

impl BrowserSession {
    /// Start a new browser through the configured WebDriver endpoint
    pub async fn launch(config: &BrowserConfig) -> E2eResult<Self> {
        info!(
            "Launching {} via {} (headless: {})",
            config.browser.as_str(),
            config.webdriver_url,
            config.headless
        );

        let caps: Capabilities = match config.browser {
            Browser::Firefox => {
                let mut caps = DesiredCapabilities::firefox();
                if config.headless {
                    caps.set_headless()?;
                }
                caps.into()
            }
            Browser::Chrome => {
                let mut caps = DesiredCapabilities::chrome();
                if config.headless {
                    caps.set_headless()?;
                }
                caps.into()
            }
        };

        let driver = WebDriver::new(config.webdriver_url.as_str(), caps).await?;
        Ok(Self { driver })
    }

    pub async fn goto(&self, url: &str) -> E2eResult<()> {
        debug!("goto {}", url);
        self.driver.goto(url).await?;
        Ok(())
    }

    pub async fn find(&self, by: By) -> E2eResult<WebElement> {
        Ok(self.driver.find(by).await?)
    }

    pub async fn find_all(&self, by: By) -> E2eResult<Vec<WebElement>> {
        Ok(self.driver.find_all(by).await?)
    }

    /// Whether the first element matching `by` is displayed.
    /// A missing element counts as not displayed.
    pub async fn is_displayed(&self, by: By) -> E2eResult<bool> {
        match self.driver.find_all(by).await?.first() {
            Some(elem) => Ok(elem.is_displayed().await?),
            None => Ok(false),
        }
    }

    pub async fn text(&self, by: By) -> E2eResult<String> {
        Ok(self.find(by).await?.text().await?)
    }

    pub async fn attr(&self, by: By, name: &str) -> E2eResult<Option<String>> {
        Ok(self.find(by).await?.attr(name).await?)
    }

    pub async fn click(&self, by: By) -> E2eResult<()> {
        self.find(by).await?.click().await?;
        Ok(())
    }

    /// Click through script, for elements not currently interactable
    pub async fn script_click(&self, by: By) -> E2eResult<()> {
        let elem = self.find(by).await?;
        self.driver
            .execute("arguments[0].click();", vec![elem.to_json()?])
            .await?;
        Ok(())
    }

    /// Replace the contents of an input
    pub async fn fill(&self, by: By, value: &str) -> E2eResult<()> {
        let elem = self.find(by).await?;
        elem.clear().await?;
        if !value.is_empty() {
            elem.send_keys(value).await?;
        }
        Ok(())
    }

    /// Press Enter inside an input, submitting its form
    pub async fn press_enter(&self, by: By) -> E2eResult<()> {
        self.find(by).await?.send_keys(Key::Enter).await?;
        Ok(())
    }

    /// Drop everything the page persisted in local storage
    pub async fn clear_storage(&self) -> E2eResult<()> {
        self.driver
            .execute("window.localStorage.clear();", Vec::new())
            .await?;
        Ok(())
    }

    pub async fn save_screenshot(&self, path: &Path) -> E2eResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let png = self.driver.screenshot_as_png().await?;
        std::fs::write(path, png)?;
        Ok(())
    }

    /// Quit the browser
    pub async fn close(self) -> E2eResult<()> {
        info!("Closing browser session");
        self.driver.quit().await.map_err(|e| {
            warn!("Browser quit failed: {}", e);
            E2eError::from(e)
        })
    }
}
