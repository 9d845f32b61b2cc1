use std::future::Future;
use std::num::NonZeroUsize;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::error::is_fatal;
use crate::models::ScrapeResult;
use crate::scraper::Navigator;
use crate::traits::{BrowserSession, ScraperConfig};

/// Owns the browser for one run and turns keywords into rows
pub struct ScrapeOrchestrator<B: BrowserSession> {
    browser: B,
    config: ScraperConfig,
    results: ScrapeResult,
}

impl<B: BrowserSession> ScrapeOrchestrator<B> {
    pub fn new(browser: B, config: ScraperConfig) -> Self {
        Self {
            browser,
            config,
            results: ScrapeResult::new(),
        }
    }

    /// Scrape every keyword, stopping early on Ctrl-C.
    ///
    /// The browser is closed on every exit path.
    pub async fn run(self, keywords: &[String], cap: Option<NonZeroUsize>) -> Result<ScrapeResult> {
        let interrupted = async {
            if tokio::signal::ctrl_c().await.is_err() {
                // No signal handler available; never interrupt
                std::future::pending::<()>().await;
            }
        };
        self.run_until(keywords, cap, interrupted).await
    }

    /// Scrape every keyword until done or until `shutdown` resolves.
    ///
    /// An interrupted run returns the rows collected so far. Only a lost
    /// browser session is returned as an error.
    pub async fn run_until(
        mut self,
        keywords: &[String],
        cap: Option<NonZeroUsize>,
        shutdown: impl Future<Output = ()>,
    ) -> Result<ScrapeResult> {
        let outcome = tokio::select! {
            outcome = self.scrape_keywords(keywords, cap) => outcome,
            () = shutdown => {
                warn!("Scraping interrupted, keeping rows collected so far");
                Ok(())
            }
        };

        match self.browser.close().await {
            Ok(()) => info!("Browser closed"),
            Err(e) => error!("Failed to close browser: {:#}", e),
        }

        outcome?;
        info!("Scraping completed, total rows scraped: {}", self.results.len());
        Ok(self.results)
    }

    async fn scrape_keywords(&mut self, keywords: &[String], cap: Option<NonZeroUsize>) -> Result<()> {
        for keyword in keywords {
            info!("Starting scrape for keyword '{}' on {}", keyword, self.config.name);
            let before = self.results.len();

            match self.scrape_keyword(keyword, cap).await {
                Ok(()) => info!(
                    "Scraped {} rows for keyword '{}'",
                    self.results.len() - before,
                    keyword
                ),
                Err(e) if is_fatal(&e) => return Err(e),
                Err(e) => error!("Error scraping keyword '{}': {:#}", keyword, e),
            }
        }
        Ok(())
    }

    async fn scrape_keyword(&mut self, keyword: &str, cap: Option<NonZeroUsize>) -> Result<()> {
        let mut navigator = Navigator::new(&self.browser, &self.config);

        let Some(mut session) = navigator.search(keyword).await? else {
            navigator.finish_keyword();
            return Ok(());
        };
        session.limit(cap);
        info!("Found {} products to scrape", session.len());

        let total = session.len();
        for (idx, url) in session.urls().iter().enumerate() {
            info!("Progress: {}/{}", idx + 1, total);

            match navigator.visit_product(url).await {
                Ok(extraction) => {
                    let rows = extraction.into_rows(session.keyword(), &self.config.default_seller);
                    self.results.extend(rows);
                }
                Err(e) if is_fatal(&e) => return Err(e),
                Err(e) => error!(
                    "Error scraping product {} while {:?}: {:#}",
                    url,
                    navigator.state(),
                    e
                ),
            }

            self.config.timings.between_products.pause().await;
        }

        navigator.finish_keyword();
        info!("Completed scraping {} products", total);
        Ok(())
    }
}
