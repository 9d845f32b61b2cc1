//! Data models for extracted products, sellers and output rows

use std::collections::HashSet;
use std::num::NonZeroUsize;

use serde::Serialize;

/// Rendered value of a field that could not be resolved
pub const UNKNOWN: &str = "N/A";

fn or_unknown(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| UNKNOWN.to_string())
}

/// Product URLs discovered for one keyword, deduplicated in discovery order
#[derive(Debug, Clone)]
pub struct SearchSession {
    keyword: String,
    urls: Vec<String>,
    seen: HashSet<String>,
}

impl SearchSession {
    pub fn new(keyword: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            urls: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Add a URL unless it was already collected
    pub fn insert(&mut self, url: String) -> bool {
        if self.seen.contains(&url) {
            return false;
        }
        self.seen.insert(url.clone());
        self.urls.push(url);
        true
    }

    /// Keep only the first `cap` URLs; `None` keeps everything
    pub fn limit(&mut self, cap: Option<NonZeroUsize>) {
        if let Some(cap) = cap {
            self.urls.truncate(cap.get());
        }
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Product-level fields read from a detail page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductPage {
    pub url: String,
    pub title: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub rating: Option<String>,
    pub reviews: Option<String>,
}

/// One seller offering a product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seller {
    pub name: String,
    pub price: Option<String>,
    pub rating: Option<String>,
}

impl Seller {
    /// Placeholder seller for a product whose offers could not be read
    pub fn platform_default(name: &str) -> Self {
        Self {
            name: name.to_string(),
            price: None,
            rating: None,
        }
    }
}

/// Everything extracted from one product page
#[derive(Debug, Clone)]
pub struct ProductExtraction {
    pub page: ProductPage,
    pub sellers: Vec<Seller>,
}

impl ProductExtraction {
    /// Fan the product out into one row per seller.
    ///
    /// An extraction without sellers still produces one row for
    /// `default_seller`.
    pub fn into_rows(self, keyword: &str, default_seller: &str) -> Vec<ScrapeRow> {
        let Self { page, mut sellers } = self;
        if sellers.is_empty() {
            sellers.push(Seller::platform_default(default_seller));
        }

        sellers
            .into_iter()
            .map(|seller| ScrapeRow {
                keyword: keyword.to_string(),
                category: or_unknown(&page.category),
                title: or_unknown(&page.title),
                description: or_unknown(&page.description),
                price: or_unknown(&seller.price),
                rating: or_unknown(&page.rating),
                reviews: or_unknown(&page.reviews),
                seller: seller.name,
                product_url: page.url.clone(),
            })
            .collect()
    }
}

/// One output record per (product, seller) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapeRow {
    #[serde(rename = "Search Keyword")]
    pub keyword: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Price")]
    pub price: String,
    #[serde(rename = "Rating")]
    pub rating: String,
    #[serde(rename = "Reviews")]
    pub reviews: String,
    #[serde(rename = "Seller")]
    pub seller: String,
    #[serde(rename = "Product URL")]
    pub product_url: String,
}

/// Rows accumulated across a run, in extraction order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeResult {
    rows: Vec<ScrapeRow>,
}

impl ScrapeResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, rows: impl IntoIterator<Item = ScrapeRow>) {
        self.rows.extend(rows);
    }

    pub fn rows(&self) -> &[ScrapeRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
