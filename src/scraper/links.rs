//! Product link discovery on search result pages

use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info};

use crate::error::is_fatal;
use crate::models::SearchSession;
use crate::scraper::fields::FieldResolver;
use crate::traits::{BrowserSession, Field, ScraperConfig};

/// Whether the results page shows at least one product card within `wait`
pub async fn has_product_cards<B: BrowserSession>(
    browser: &B,
    config: &ScraperConfig,
    wait: Duration,
) -> Result<bool> {
    let resolver = FieldResolver::new(browser, config);
    Ok(resolver.element(Field::ProductCard, None, wait).await?.is_some())
}

/// Collect product URLs into `session`, falling back to a raw anchor scan
/// when the structured cards yield nothing.
///
/// # Returns
/// * `Result<usize>` - Number of URLs collected
pub async fn discover<B: BrowserSession>(
    browser: &B,
    config: &ScraperConfig,
    session: &mut SearchSession,
    wait: Duration,
) -> Result<usize> {
    let from_cards = collect_from_cards(browser, config, session, wait).await?;
    info!("Found {} product links in product cards", from_cards);
    if from_cards > 0 {
        return Ok(from_cards);
    }

    info!("Trying alternative method to find product links...");
    let from_anchors = collect_from_anchors(browser, config, session).await?;
    info!("Found {} product links by scanning anchors", from_anchors);
    Ok(from_anchors)
}

async fn collect_from_cards<B: BrowserSession>(
    browser: &B,
    config: &ScraperConfig,
    session: &mut SearchSession,
    wait: Duration,
) -> Result<usize> {
    let resolver = FieldResolver::new(browser, config);
    let cards = resolver.elements(Field::ProductCard, None, wait).await?;
    debug!("Found {} product cards", cards.len());

    let mut collected = 0;
    for card in &cards {
        match card_href(browser, config, card).await {
            Ok(Some(href)) => {
                let url = config.absolutize(&href);
                if url.contains(&config.product_path_marker) && session.insert(url) {
                    collected += 1;
                }
            }
            Ok(None) => {}
            Err(e) if is_fatal(&e) => return Err(e),
            Err(e) => debug!("Skipping product card: {:#}", e),
        }
    }
    Ok(collected)
}

/// The card's own href when it is a link, else the first link inside it
async fn card_href<B: BrowserSession>(
    browser: &B,
    config: &ScraperConfig,
    card: &B::Element,
) -> Result<Option<String>> {
    if browser.tag_name(card).await? == "a" {
        return browser.href(card).await;
    }

    let resolver = FieldResolver::new(browser, config);
    match resolver.element(Field::Anchor, Some(card), Duration::ZERO).await? {
        Some(anchor) => browser.href(&anchor).await,
        None => Ok(None),
    }
}

async fn collect_from_anchors<B: BrowserSession>(
    browser: &B,
    config: &ScraperConfig,
    session: &mut SearchSession,
) -> Result<usize> {
    let resolver = FieldResolver::new(browser, config);
    let anchors = resolver.elements(Field::Anchor, None, Duration::ZERO).await?;

    let mut collected = 0;
    for anchor in &anchors {
        let href = match browser.href(anchor).await {
            Ok(Some(href)) => href,
            Ok(None) => continue,
            Err(e) if is_fatal(&e) => return Err(e),
            Err(_) => continue,
        };

        let url = config.absolutize(&href);
        if url.contains(&config.product_path_marker)
            && url.contains(&config.locale_segment)
            && session.insert(url)
        {
            collected += 1;
        }
    }
    Ok(collected)
}
