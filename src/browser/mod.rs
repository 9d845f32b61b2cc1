//! WebDriver-backed browser session

#[cfg(test)]
pub mod fake;

use std::path::PathBuf;
use std::process::{Child, Command};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use rand::Rng;
use thirtyfour::prelude::*;
use tracing::{info, warn};

use crate::error::SessionLost;
use crate::traits::{BrowserSession, PageKey, Timings};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Driver messages meaning the session cannot be used any more
const SESSION_LOST_MARKERS: [&str; 5] = [
    "invalid session id",
    "no such window",
    "session not created",
    "chrome not reachable",
    "disconnected",
];

/// How to reach a WebDriver server
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Address of an already running WebDriver server
    pub webdriver_url: String,
    /// Spawn this chromedriver binary instead of using `webdriver_url`
    pub chromedriver_path: Option<PathBuf>,
    pub headless: bool,
}

/// A Chrome session driven through WebDriver
pub struct WebDriverSession {
    driver: WebDriver,
    driver_process: Mutex<Option<Child>>,
}

impl WebDriverSession {
    /// Start (or connect to) chromedriver and open a configured Chrome session.
    ///
    /// Any failure here is fatal for the run.
    pub async fn launch(options: &BrowserOptions, timings: &Timings) -> Result<Self> {
        info!("Initializing Chrome WebDriver...");

        let mut driver_process = None;
        let server_url = match &options.chromedriver_path {
            Some(path) => {
                let port: u16 = rand::thread_rng().gen_range(5000..9000);
                let child = Command::new(path)
                    .arg(format!("--port={port}"))
                    .spawn()
                    .map_err(|e| anyhow!("failed to spawn chromedriver {}: {e}", path.display()))?;
                driver_process = Some(child);

                // Give chromedriver a moment to bind its port
                tokio::time::sleep(Duration::from_secs(2)).await;
                format!("http://localhost:{port}")
            }
            None => options.webdriver_url.clone(),
        };

        let driver = match Self::connect(&server_url, options.headless, timings).await {
            Ok(driver) => driver,
            Err(e) => {
                if let Some(mut child) = driver_process {
                    let _ = child.kill();
                }
                return Err(e);
            }
        };

        info!("WebDriver initialized successfully");
        Ok(Self {
            driver,
            driver_process: Mutex::new(driver_process),
        })
    }

    async fn connect(server_url: &str, headless: bool, timings: &Timings) -> Result<WebDriver> {
        let mut caps = DesiredCapabilities::chrome();
        if headless {
            caps.set_headless()?;
        }
        caps.set_no_sandbox()?;
        caps.set_disable_dev_shm_usage()?;
        caps.add_arg("--disable-blink-features=AutomationControlled")?;
        caps.add_arg("--window-size=1920,1080")?;
        caps.add_arg(&format!("--user-agent={USER_AGENT}"))?;
        caps.add_experimental_option("excludeSwitches", ["enable-automation"])?;
        caps.add_experimental_option("useAutomationExtension", false)?;

        let driver = WebDriver::new(server_url, caps)
            .await
            .map_err(|e| anyhow!("failed to connect to WebDriver at {server_url}: {e}"))?;
        driver.set_page_load_timeout(timings.page_load).await?;
        Ok(driver)
    }
}

fn command_error(err: WebDriverError) -> anyhow::Error {
    let message = err.to_string();
    let lower = message.to_lowercase();
    if SESSION_LOST_MARKERS.iter().any(|marker| lower.contains(marker)) {
        SessionLost(message).into()
    } else {
        anyhow::Error::from(err)
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    type Element = WebElement;

    async fn navigate(&self, url: &str) -> Result<()> {
        self.driver.goto(url).await.map_err(command_error)
    }

    async fn find_all(&self, selector: &str, scope: Option<&WebElement>) -> Result<Vec<WebElement>> {
        let found = match scope {
            Some(element) => element.find_all(By::Css(selector)).await,
            None => self.driver.find_all(By::Css(selector)).await,
        };
        found.map_err(command_error)
    }

    async fn text(&self, element: &WebElement) -> Result<String> {
        element.text().await.map_err(command_error)
    }

    async fn href(&self, element: &WebElement) -> Result<Option<String>> {
        // The property is already resolved against the page URL
        element.prop("href").await.map_err(command_error)
    }

    async fn tag_name(&self, element: &WebElement) -> Result<String> {
        let tag = element.tag_name().await.map_err(command_error)?;
        Ok(tag.to_lowercase())
    }

    async fn execute_script(&self, script: &str, args: &[WebElement]) -> Result<serde_json::Value> {
        let args = args
            .iter()
            .map(WebElement::to_json)
            .collect::<WebDriverResult<Vec<_>>>()
            .map_err(command_error)?;
        let ret = self.driver.execute(script, args).await.map_err(command_error)?;
        Ok(ret.json().clone())
    }

    async fn click(&self, element: &WebElement) -> Result<()> {
        element.click().await.map_err(command_error)
    }

    async fn send_key(&self, element: &WebElement, key: PageKey) -> Result<()> {
        let keys = match key {
            PageKey::Escape => Key::Escape + "",
        };
        element.send_keys(keys).await.map_err(command_error)
    }

    async fn close(&self) -> Result<()> {
        let quit = self.driver.clone().quit().await;

        let child = self
            .driver_process
            .lock()
            .map_err(|_| anyhow!("driver process lock poisoned"))?
            .take();
        if let Some(mut child) = child {
            if let Err(e) = child.kill() {
                warn!("Failed to stop chromedriver: {}", e);
            }
            let _ = child.wait();
        }

        quit.map_err(|e| anyhow!("failed to quit browser: {e}"))
    }
}
