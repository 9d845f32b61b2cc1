//! In-memory browser rendering static HTML fixtures.
//!
//! Elements under a `data-modal` attribute stay invisible until a control
//! whose text mentions "other seller" is clicked, and disappear again on a
//! close-control click or Escape.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tokio::sync::Notify;

use crate::error::SessionLost;
use crate::traits::{BrowserSession, PageKey};

const MODAL_ATTR: &str = "data-modal";
const EMPTY_PAGE: &str = "<html><body></body></html>";

/// Handle to an element of the page loaded at `generation`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeElement {
    index: usize,
    generation: usize,
}

#[derive(Default)]
struct Inner {
    pages: HashMap<String, String>,
    failing: HashSet<String>,
    crashing: HashSet<String>,
    visit_hooks: HashMap<String, Arc<Notify>>,
    failing_scripts: bool,
    current: Option<String>,
    generation: usize,
    modal_open: bool,
    visited: Vec<String>,
    clicks: Vec<String>,
    escapes: usize,
    closed: bool,
}

impl Inner {
    fn document(&self) -> Result<Html> {
        if self.closed {
            return Err(SessionLost("session already closed".into()).into());
        }
        let url = self
            .current
            .as_ref()
            .ok_or_else(|| anyhow!("no page loaded"))?;
        let html = self.pages.get(url).map_or(EMPTY_PAGE, String::as_str);
        Ok(Html::parse_document(html))
    }

    fn check(&self, element: &FakeElement) -> Result<()> {
        if element.generation == self.generation {
            Ok(())
        } else {
            Err(anyhow!("stale element reference"))
        }
    }
}

/// Scriptable `BrowserSession` for tests; clones share state
#[derive(Clone, Default)]
pub struct FakeBrowser {
    inner: Arc<Mutex<Inner>>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, html: impl Into<String>) -> Self {
        self.lock().pages.insert(url.to_string(), html.into());
        self
    }

    /// Navigating to `url` fails with an ordinary error
    pub fn failing(self, url: &str) -> Self {
        self.lock().failing.insert(url.to_string());
        self
    }

    /// Navigating to `url` loses the session
    pub fn crashing(self, url: &str) -> Self {
        self.lock().crashing.insert(url.to_string());
        self
    }

    /// Notified each time `url` is navigated to
    pub fn visit_signal(&self, url: &str) -> Arc<Notify> {
        self.lock()
            .visit_hooks
            .entry(url.to_string())
            .or_default()
            .clone()
    }

    /// Every script execution fails
    pub fn failing_scripts(self) -> Self {
        self.lock().failing_scripts = true;
        self
    }

    pub fn visited(&self) -> Vec<String> {
        self.lock().visited.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.lock().clicks.clone()
    }

    pub fn escapes(&self) -> usize {
        self.lock().escapes
    }

    pub fn modal_open(&self) -> bool {
        self.lock().modal_open
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("fake browser lock poisoned")
    }
}

fn parse(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow!("invalid selector {selector}: {e:?}"))
}

fn universal() -> Selector {
    Selector::parse("*").expect("universal selector")
}

fn element_at(document: &Html, index: usize) -> Result<ElementRef<'_>> {
    document
        .select(&universal())
        .nth(index)
        .ok_or_else(|| anyhow!("no element at index {index}"))
}

fn index_of(document: &Html, element: ElementRef<'_>) -> usize {
    document
        .select(&universal())
        .position(|candidate| candidate.id() == element.id())
        .unwrap_or(usize::MAX)
}

fn hidden(element: ElementRef<'_>, modal_open: bool) -> bool {
    !modal_open
        && std::iter::once(*element)
            .chain(element.ancestors())
            .any(|node| node.value().as_element().is_some_and(|e| e.attr(MODAL_ATTR).is_some()))
}

fn rendered_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_close_control(element: ElementRef<'_>) -> bool {
    let value = element.value();
    value.attr("aria-label") == Some("Close")
        || value
            .attr("class")
            .is_some_and(|class| class.to_lowercase().contains("close"))
}

#[async_trait]
impl BrowserSession for FakeBrowser {
    type Element = FakeElement;

    async fn navigate(&self, url: &str) -> Result<()> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(SessionLost("session already closed".into()).into());
        }
        inner.visited.push(url.to_string());
        if let Some(signal) = inner.visit_hooks.get(url) {
            signal.notify_one();
        }
        if inner.crashing.contains(url) {
            return Err(SessionLost("chrome not reachable".into()).into());
        }
        if inner.failing.contains(url) {
            return Err(anyhow!("net::ERR_CONNECTION_RESET loading {url}"));
        }
        inner.current = Some(url.to_string());
        inner.generation += 1;
        inner.modal_open = false;
        Ok(())
    }

    async fn find_all(
        &self,
        selector: &str,
        scope: Option<&FakeElement>,
    ) -> Result<Vec<FakeElement>> {
        let inner = self.lock();
        let document = inner.document()?;
        let selector = parse(selector)?;

        let matches: Vec<ElementRef<'_>> = match scope {
            Some(scope) => {
                inner.check(scope)?;
                element_at(&document, scope.index)?.select(&selector).collect()
            }
            None => document.select(&selector).collect(),
        };

        Ok(matches
            .into_iter()
            .filter(|element| !hidden(*element, inner.modal_open))
            .map(|element| FakeElement {
                index: index_of(&document, element),
                generation: inner.generation,
            })
            .collect())
    }

    async fn text(&self, element: &FakeElement) -> Result<String> {
        let inner = self.lock();
        inner.check(element)?;
        let document = inner.document()?;
        Ok(rendered_text(element_at(&document, element.index)?))
    }

    async fn href(&self, element: &FakeElement) -> Result<Option<String>> {
        let inner = self.lock();
        inner.check(element)?;
        let document = inner.document()?;
        let target = element_at(&document, element.index)?;
        Ok(target.value().attr("href").map(str::to_string))
    }

    async fn tag_name(&self, element: &FakeElement) -> Result<String> {
        let inner = self.lock();
        inner.check(element)?;
        let document = inner.document()?;
        Ok(element_at(&document, element.index)?.value().name().to_string())
    }

    async fn execute_script(
        &self,
        script: &str,
        args: &[FakeElement],
    ) -> Result<serde_json::Value> {
        let inner = self.lock();
        if inner.failing_scripts {
            return Err(anyhow!("javascript error: {script}"));
        }
        if !script.contains("textContent") {
            return Ok(serde_json::Value::Null);
        }

        let element = args.first().ok_or_else(|| anyhow!("missing script argument"))?;
        inner.check(element)?;
        let document = inner.document()?;
        let content: String = element_at(&document, element.index)?.text().collect();
        Ok(serde_json::Value::String(content))
    }

    async fn click(&self, element: &FakeElement) -> Result<()> {
        let mut inner = self.lock();
        inner.check(element)?;
        let document = inner.document()?;
        let target = element_at(&document, element.index)?;

        let text = rendered_text(target);
        if is_close_control(target) {
            inner.modal_open = false;
        } else if text.to_lowercase().contains("other seller") {
            inner.modal_open = true;
        }
        inner.clicks.push(text);
        Ok(())
    }

    async fn send_key(&self, element: &FakeElement, key: PageKey) -> Result<()> {
        let mut inner = self.lock();
        inner.check(element)?;
        match key {
            PageKey::Escape => {
                inner.escapes += 1;
                inner.modal_open = false;
            }
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.lock().closed = true;
        Ok(())
    }
}

/// One offer listed in the seller modal
#[derive(Debug, Clone, Default)]
pub struct OfferFixture {
    pub name: &'static str,
    pub price: Option<&'static str>,
    pub rating: Option<&'static str>,
}

impl OfferFixture {
    pub fn new(name: &'static str, price: Option<&'static str>) -> Self {
        Self {
            name,
            price,
            rating: None,
        }
    }
}

/// Markup knobs for a product-detail page
#[derive(Debug, Clone, Default)]
pub struct ProductFixture {
    pub title: Option<&'static str>,
    pub price: Option<&'static str>,
    pub rating: Option<&'static str>,
    pub reviews: Option<&'static str>,
    pub breadcrumbs: Vec<&'static str>,
    pub highlights: Vec<&'static str>,
    pub seller: Option<&'static str>,
    pub offers: Vec<OfferFixture>,
    pub close_button: bool,
}

impl ProductFixture {
    pub fn basic(title: &'static str, price: &'static str) -> Self {
        Self {
            title: Some(title),
            price: Some(price),
            rating: Some("4.5"),
            reviews: Some("120 reviews"),
            breadcrumbs: vec!["Home", "Electronics", "Mobiles"],
            highlights: vec!["6.1-inch display", "A16 chip", "128GB", "Dual SIM"],
            seller: Some("noon"),
            offers: Vec::new(),
            close_button: true,
        }
    }

    pub fn render(&self) -> String {
        let mut html = String::from("<html><body>");

        if !self.breadcrumbs.is_empty() {
            html.push_str(r#"<nav class="breadcrumbWrapper">"#);
            for crumb in &self.breadcrumbs {
                html.push_str(&format!(r#"<a href="/uae-en/">{crumb}</a>"#));
            }
            html.push_str("</nav>");
        }
        if let Some(title) = self.title {
            html.push_str(&format!("<h1>{title}</h1>"));
        }
        if let Some(price) = self.price {
            html.push_str(&format!(r#"<div class="priceNowText">{price}</div>"#));
        }
        if let Some(rating) = self.rating {
            html.push_str(&format!(r#"<div class="ratingBox"><span>{rating}</span></div>"#));
        }
        if let Some(reviews) = self.reviews {
            html.push_str(&format!(r#"<span class="reviewsCount">{reviews}</span>"#));
        }
        if !self.highlights.is_empty() {
            html.push_str(r#"<ul class="highlightsList">"#);
            for highlight in &self.highlights {
                html.push_str(&format!("<li>{highlight}</li>"));
            }
            html.push_str("</ul>");
        }
        if let Some(seller) = self.seller {
            html.push_str(&format!(r#"<div class="soldByName">{seller}</div>"#));
        }

        html.push_str("<button>Add to cart</button>");
        if !self.offers.is_empty() {
            html.push_str(&format!(
                r#"<button class="otherOffersBtn">View {} Other Sellers</button>"#,
                self.offers.len()
            ));
            html.push_str(r#"<div data-modal="sellers">"#);
            for offer in &self.offers {
                html.push_str(r#"<div class="offerCard">"#);
                html.push_str(&format!(r#"<strong class="sellerName">{}</strong>"#, offer.name));
                if let Some(price) = offer.price {
                    html.push_str(&format!(r#"<span class="offer-price">{price}</span>"#));
                }
                if let Some(rating) = offer.rating {
                    html.push_str(&format!(r#"<span class="seller-rating">{rating}</span>"#));
                }
                html.push_str("</div>");
            }
            if self.close_button {
                html.push_str(r#"<button class="closeBtn" aria-label="Close">x</button>"#);
            }
            html.push_str("</div>");
        }

        html.push_str("</body></html>");
        html
    }
}

/// Search results page with one structured card per href
pub fn search_page(hrefs: &[&str]) -> String {
    let mut html = String::from("<html><body><main>");
    for (i, href) in hrefs.iter().enumerate() {
        html.push_str(&format!(
            r#"<div data-qa="product-card"><a href="{href}"><span>Product {i}</span></a></div>"#
        ));
    }
    html.push_str("</main></body></html>");
    html
}

/// Product-detail URL in the shape the site uses
pub fn product_url(slug: &str) -> String {
    format!("https://www.noon.com/uae-en/{slug}/N{}/p/", slug.len())
}
