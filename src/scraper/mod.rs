pub mod fields;
pub mod links;
pub mod sellers;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::models::{ProductExtraction, ProductPage, SearchSession};
use crate::traits::{BrowserSession, Field, ScraperConfig};
use fields::{FieldResolver, degrade};
use sellers::SellerResolver;

const SCROLL_THIRD_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight/3);";
const SCROLL_HALF_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight/2);";

/// Where the navigator is in its traversal of one keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    Idle,
    Searching,
    ResultsConfirmed,
    NoResults,
    Loading,
    Extracting,
    Done,
    KeywordComplete,
}

/// Drives the browser from search results to product pages
pub struct Navigator<'a, B: BrowserSession> {
    browser: &'a B,
    config: &'a ScraperConfig,
    state: NavState,
}

impl<'a, B: BrowserSession> Navigator<'a, B> {
    pub fn new(browser: &'a B, config: &'a ScraperConfig) -> Self {
        Self {
            browser,
            config,
            state: NavState::Idle,
        }
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    fn transition(&mut self, next: NavState) {
        debug!("Navigator {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Search for a keyword and collect its product URLs.
    ///
    /// # Returns
    /// * `Result<Option<SearchSession>>` - `None` when the keyword has no products
    pub async fn search(&mut self, keyword: &str) -> Result<Option<SearchSession>> {
        self.transition(NavState::Searching);
        info!("Searching for keyword: {}", keyword);

        let config = self.config;
        let timings = &config.timings;
        let search_url = config.search_url(keyword);
        self.browser
            .navigate(&search_url)
            .await
            .with_context(|| format!("loading search page {search_url}"))?;
        timings.search_settle.pause().await;

        if !links::has_product_cards(self.browser, config, timings.element_wait).await? {
            warn!("No results found for keyword: {}", keyword);
            self.transition(NavState::NoResults);
            return Ok(None);
        }
        self.transition(NavState::ResultsConfirmed);

        // Lazy-loaded cards only render once scrolled into range
        self.browser.execute_script(SCROLL_THIRD_SCRIPT, &[]).await?;
        timings.results_scroll_pause.pause().await;

        let mut session = SearchSession::new(keyword);
        links::discover(self.browser, config, &mut session, timings.card_wait).await?;

        if session.is_empty() {
            warn!("No product URLs found on search results page");
            self.transition(NavState::NoResults);
            return Ok(None);
        }
        Ok(Some(session))
    }

    /// Open a product page and extract its fields and sellers
    pub async fn visit_product(&mut self, url: &str) -> Result<ProductExtraction> {
        self.transition(NavState::Loading);
        info!("Scraping product: {}", url);

        let config = self.config;
        let timings = &config.timings;
        self.browser
            .navigate(url)
            .await
            .with_context(|| format!("loading product page {url}"))?;
        timings.product_detail.pause().await;
        self.browser.execute_script(SCROLL_HALF_SCRIPT, &[]).await?;
        timings.product_scroll_pause.pause().await;

        self.transition(NavState::Extracting);
        let page = self.product_page(url).await?;
        let sellers = SellerResolver::new(self.browser, config).resolve().await?;
        info!("Scraped product with {} seller(s)", sellers.len());

        self.transition(NavState::Done);
        Ok(ProductExtraction { page, sellers })
    }

    async fn product_page(&self, url: &str) -> Result<ProductPage> {
        let fields = FieldResolver::new(self.browser, self.config);

        Ok(ProductPage {
            url: url.to_string(),
            title: degrade(Field::Title, fields.text_now(Field::Title, None).await)?,
            category: degrade(Field::Breadcrumbs, fields.category().await)?,
            description: degrade(Field::Highlights, fields.description().await)?,
            rating: degrade(Field::Rating, fields.text(Field::Rating, None).await)?,
            reviews: degrade(Field::Reviews, fields.text(Field::Reviews, None).await)?,
        })
    }

    /// Close out the current keyword and return to idle
    pub fn finish_keyword(&mut self) {
        if self.state != NavState::NoResults {
            self.transition(NavState::KeywordComplete);
        }
        self.transition(NavState::Idle);
    }
}
