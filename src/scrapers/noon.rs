//! Noon.com (UAE, English) scraper configuration

use crate::traits::{ScraperConfig, SiteSelectors, Timings};

fn chain(selectors: &[&str]) -> Vec<String> {
    selectors.iter().map(|s| (*s).to_string()).collect()
}

/// Selectors and site constants for noon.com with default timings
pub fn config() -> ScraperConfig {
    config_with_timings(Timings::default())
}

/// Noon configuration with caller-supplied timings
pub fn config_with_timings(timings: Timings) -> ScraperConfig {
    // Class names are generated per build, so most selectors match on substrings
    ScraperConfig {
        name: "Noon".to_string(),
        origin: "https://www.noon.com".to_string(),
        search_url_pattern: "https://www.noon.com/uae-en/search/?q={query}".to_string(),
        product_path_marker: "/p/".to_string(),
        locale_segment: "/uae-en/".to_string(),
        default_seller: "noon".to_string(),
        currency: "AED".to_string(),
        other_sellers_phrase: "other seller".to_string(),
        description_highlights: 3,
        selectors: SiteSelectors {
            product_card: chain(&[
                r#"div[data-qa="product-card"]"#,
                r#"div[class*="productContainer"]"#,
                r#"a[class*="productBoxLink"]"#,
            ]),
            title: chain(&["h1"]),
            price: chain(&[r#"[class*="priceNowText"]"#, r#"[class*="priceNow"]"#]),
            rating: chain(&[r#"div[class*="rating"] span"#, r#"span[class*="rating"]"#]),
            reviews: chain(&[r#"[class*="reviews"]"#, r#"[class*="rating"]"#]),
            breadcrumbs: chain(&[
                r#"nav[class*="breadcrumb"] a"#,
                r#"[class*="Breadcrumb"] a"#,
            ]),
            highlights: chain(&[
                r#"ul[class*="highlights"] li"#,
                r#"div[class*="highlights"] li"#,
                r#"[class*="description"]"#,
            ]),
            seller_name: chain(&[r#"[class*="soldBy"]"#, r#"[class*="SoldBy"]"#]),
            other_sellers_button: chain(&["button"]),
            modal_seller_card: chain(&[
                r#"[class*="offerCard"]"#,
                r#"[class*="sellerCard"]"#,
                r#"div[class*="offer"]"#,
            ]),
            modal_seller_name: chain(&[
                r#"[class*="sellerName"]"#,
                r#"[class*="partner"] strong"#,
                "strong",
            ]),
            modal_seller_price: chain(&[r#"[class*="price"]"#]),
            modal_seller_rating: chain(&[r#"[class*="rating"]"#]),
            close_modal: chain(&[
                r#"button[class*="close"]"#,
                r#"[aria-label="Close"]"#,
                r#"button[class*="Close"]"#,
            ]),
            page_body: chain(&["body"]),
            anchor: chain(&["a"]),
        },
        timings,
    }
}
