//! Traits and configuration for browser-driven marketplace scraping

use std::fmt;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use tokio::time::Instant;

/// Configuration for a marketplace scraper
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Display name for the website
    pub name: String,
    /// Scheme and host, used to absolutize relative links
    pub origin: String,
    /// Search URL pattern with {query} placeholder
    pub search_url_pattern: String,
    /// Path fragment every product-detail URL contains
    pub product_path_marker: String,
    /// Locale path segment required by the raw anchor scan
    pub locale_segment: String,
    /// Seller name used when a product page shows no seller block
    pub default_seller: String,
    /// Currency tag prepended to sanitized prices
    pub currency: String,
    /// Lower-case phrase identifying the "other sellers" control
    pub other_sellers_phrase: String,
    /// Number of highlight bullets joined into the description
    pub description_highlights: usize,
    /// CSS selectors for extracting data
    pub selectors: SiteSelectors,
    /// Timeouts and politeness delays
    pub timings: Timings,
}

impl ScraperConfig {
    /// Build the search URL for a keyword
    pub fn search_url(&self, keyword: &str) -> String {
        let encoded = urlencoding::encode(keyword);
        self.search_url_pattern.replace("{query}", &encoded)
    }

    /// Resolve an href against the site origin
    pub fn absolutize(&self, href: &str) -> String {
        if href.starts_with("http") {
            href.to_string()
        } else if href.starts_with("//") {
            format!("https:{href}")
        } else if href.starts_with('/') {
            format!("{}{}", self.origin, href)
        } else {
            format!("{}/{}", self.origin, href)
        }
    }
}

/// Logical fields the engine knows how to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    ProductCard,
    Title,
    Price,
    Rating,
    Reviews,
    Breadcrumbs,
    Highlights,
    SellerName,
    OtherSellersButton,
    ModalSellerCard,
    ModalSellerName,
    ModalSellerPrice,
    ModalSellerRating,
    CloseModal,
    PageBody,
    Anchor,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ProductCard => "product card",
            Self::Title => "title",
            Self::Price => "price",
            Self::Rating => "rating",
            Self::Reviews => "reviews",
            Self::Breadcrumbs => "breadcrumbs",
            Self::Highlights => "highlights",
            Self::SellerName => "seller name",
            Self::OtherSellersButton => "other sellers button",
            Self::ModalSellerCard => "modal seller card",
            Self::ModalSellerName => "modal seller name",
            Self::ModalSellerPrice => "modal seller price",
            Self::ModalSellerRating => "modal seller rating",
            Self::CloseModal => "close modal",
            Self::PageBody => "page body",
            Self::Anchor => "anchor",
        };
        f.write_str(name)
    }
}

/// Ordered CSS selector candidates for every logical field.
///
/// Candidates are listed most specific first; resolution stops at the
/// first candidate that matches.
#[derive(Debug, Clone)]
pub struct SiteSelectors {
    /// Structured product cards on the search results page
    pub product_card: Vec<String>,
    /// Product title on the detail page
    pub title: Vec<String>,
    /// Current price on the detail page
    pub price: Vec<String>,
    /// Rating value on the detail page
    pub rating: Vec<String>,
    /// Review count on the detail page
    pub reviews: Vec<String>,
    /// Breadcrumb links forming the category path
    pub breadcrumbs: Vec<String>,
    /// Highlight bullets forming the description
    pub highlights: Vec<String>,
    /// Primary "sold by" block
    pub seller_name: Vec<String>,
    /// Candidate controls for opening the seller modal, filtered by text
    pub other_sellers_button: Vec<String>,
    /// Seller cards inside the modal
    pub modal_seller_card: Vec<String>,
    /// Seller name within a modal card
    pub modal_seller_name: Vec<String>,
    /// Price within a modal card
    pub modal_seller_price: Vec<String>,
    /// Rating within a modal card
    pub modal_seller_rating: Vec<String>,
    /// Dedicated close control of the modal
    pub close_modal: Vec<String>,
    /// Element receiving the Escape key when no close control exists
    pub page_body: Vec<String>,
    /// Any link
    pub anchor: Vec<String>,
}

impl SiteSelectors {
    /// Candidate chain for a logical field
    pub fn chain(&self, field: Field) -> &[String] {
        match field {
            Field::ProductCard => &self.product_card,
            Field::Title => &self.title,
            Field::Price => &self.price,
            Field::Rating => &self.rating,
            Field::Reviews => &self.reviews,
            Field::Breadcrumbs => &self.breadcrumbs,
            Field::Highlights => &self.highlights,
            Field::SellerName => &self.seller_name,
            Field::OtherSellersButton => &self.other_sellers_button,
            Field::ModalSellerCard => &self.modal_seller_card,
            Field::ModalSellerName => &self.modal_seller_name,
            Field::ModalSellerPrice => &self.modal_seller_price,
            Field::ModalSellerRating => &self.modal_seller_rating,
            Field::CloseModal => &self.close_modal,
            Field::PageBody => &self.page_body,
            Field::Anchor => &self.anchor,
        }
    }
}

/// Uniform delay range in which a politeness pause is sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min: Duration,
    pub max: Duration,
}

impl DelayRange {
    #[cfg(test)]
    pub const ZERO: Self = Self::fixed(Duration::ZERO);

    pub const fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    pub const fn fixed(delay: Duration) -> Self {
        Self {
            min: delay,
            max: delay,
        }
    }

    /// Pick a delay uniformly inside the range
    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let secs = rand::thread_rng().gen_range(self.min.as_secs_f64()..=self.max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    /// Sleep for a sampled delay
    pub async fn pause(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Timeouts and politeness delays used across the engine
#[derive(Debug, Clone)]
pub struct Timings {
    /// Full page load budget handed to the driver
    pub page_load: Duration,
    /// Default bounded wait for an element
    pub element_wait: Duration,
    /// Wait for product cards while collecting links
    pub card_wait: Duration,
    /// Wait for the primary price before reading sellers
    pub seller_price_wait: Duration,
    /// Wait for modal seller cards to appear
    pub modal_wait: Duration,
    /// Interval between presence checks while waiting
    pub poll_interval: Duration,
    /// Pause after submitting a search
    pub search_settle: DelayRange,
    /// Pause after scrolling the results page
    pub results_scroll_pause: DelayRange,
    /// Pause after opening a product page
    pub product_detail: DelayRange,
    /// Pause after scrolling a product page
    pub product_scroll_pause: DelayRange,
    /// Pause between products
    pub between_products: DelayRange,
    /// Pause after scrolling the other-sellers control into view
    pub modal_scroll_pause: DelayRange,
    /// Pause after clicking the other-sellers control
    pub modal_open_pause: DelayRange,
    /// Pause after closing the modal
    pub modal_close_pause: DelayRange,
}

impl Timings {
    /// No waiting at all; every probe runs exactly once
    #[cfg(test)]
    pub fn immediate() -> Self {
        Self {
            page_load: Duration::ZERO,
            element_wait: Duration::ZERO,
            card_wait: Duration::ZERO,
            seller_price_wait: Duration::ZERO,
            modal_wait: Duration::ZERO,
            poll_interval: Duration::ZERO,
            search_settle: DelayRange::ZERO,
            results_scroll_pause: DelayRange::ZERO,
            product_detail: DelayRange::ZERO,
            product_scroll_pause: DelayRange::ZERO,
            between_products: DelayRange::ZERO,
            modal_scroll_pause: DelayRange::ZERO,
            modal_open_pause: DelayRange::ZERO,
            modal_close_pause: DelayRange::ZERO,
        }
    }
}

impl Default for Timings {
    fn default() -> Self {
        let secs = Duration::from_secs;
        let millis = Duration::from_millis;
        Self {
            page_load: secs(30),
            element_wait: secs(10),
            card_wait: secs(5),
            seller_price_wait: secs(5),
            modal_wait: secs(5),
            poll_interval: millis(250),
            search_settle: DelayRange::new(secs(2), secs(3)),
            results_scroll_pause: DelayRange::fixed(secs(1)),
            product_detail: DelayRange::new(millis(1500), millis(2500)),
            product_scroll_pause: DelayRange::fixed(secs(2)),
            between_products: DelayRange::new(secs(2), secs(4)),
            modal_scroll_pause: DelayRange::fixed(millis(500)),
            modal_open_pause: DelayRange::fixed(secs(2)),
            modal_close_pause: DelayRange::fixed(millis(500)),
        }
    }
}

/// Keys the engine sends to the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKey {
    Escape,
}

/// An element found by a candidate chain
#[derive(Debug, Clone)]
pub struct Probe<E> {
    /// Index of the candidate selector that matched
    pub candidate: usize,
    pub element: E,
}

/// Capability interface over a browser automation backend
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Backend handle to a located element
    type Element: Clone + Send + Sync;

    /// Load a URL in the current tab
    async fn navigate(&self, url: &str) -> Result<()>;

    /// All elements matching a selector, in document order
    ///
    /// # Arguments
    /// * `selector` - CSS selector
    /// * `scope` - Restrict the search to descendants of this element
    async fn find_all(
        &self,
        selector: &str,
        scope: Option<&Self::Element>,
    ) -> Result<Vec<Self::Element>>;

    /// Rendered text of an element
    async fn text(&self, element: &Self::Element) -> Result<String>;

    /// Resolved href of a link element
    async fn href(&self, element: &Self::Element) -> Result<Option<String>>;

    /// Lower-case tag name of an element
    async fn tag_name(&self, element: &Self::Element) -> Result<String>;

    /// Run a script in the page with elements bound to `arguments`
    async fn execute_script(
        &self,
        script: &str,
        args: &[Self::Element],
    ) -> Result<serde_json::Value>;

    async fn click(&self, element: &Self::Element) -> Result<()>;

    async fn send_key(&self, element: &Self::Element, key: PageKey) -> Result<()>;

    /// Release the session and any process backing it
    async fn close(&self) -> Result<()>;

    /// Wait until any candidate selector matches.
    ///
    /// Candidates are checked in order on every poll, so an earlier
    /// candidate wins when several are present. A zero timeout checks
    /// exactly once.
    ///
    /// # Returns
    /// * `Result<Option<Probe<Self::Element>>>` - The first match, or `None` on timeout
    async fn wait_for(
        &self,
        selectors: &[String],
        timeout: Duration,
        poll_interval: Duration,
        scope: Option<&Self::Element>,
    ) -> Result<Option<Probe<Self::Element>>> {
        let deadline = Instant::now() + timeout;
        loop {
            for (candidate, selector) in selectors.iter().enumerate() {
                if let Some(element) = self.find_all(selector, scope).await?.into_iter().next() {
                    return Ok(Some(Probe { candidate, element }));
                }
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}
