//! Seller resolution, including the "other sellers" modal

use std::time::Duration;

use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::error::is_fatal;
use crate::models::Seller;
use crate::scraper::fields::{FieldResolver, degrade};
use crate::traits::{BrowserSession, Field, PageKey, ScraperConfig};

const SCROLL_INTO_VIEW_SCRIPT: &str = "arguments[0].scrollIntoView(true);";

/// Resolves every seller offering the product on the current page
pub struct SellerResolver<'a, B: BrowserSession> {
    browser: &'a B,
    config: &'a ScraperConfig,
    fields: FieldResolver<'a, B>,
}

impl<'a, B: BrowserSession> SellerResolver<'a, B> {
    pub fn new(browser: &'a B, config: &'a ScraperConfig) -> Self {
        Self {
            browser,
            config,
            fields: FieldResolver::new(browser, config),
        }
    }

    /// Primary seller first, then distinct modal sellers in listing order.
    ///
    /// Never empty: when nothing could be read a single platform-default
    /// seller with unknown price and rating is returned. Only a lost
    /// session is reported as an error.
    pub async fn resolve(&self) -> Result<Vec<Seller>> {
        let mut sellers = Vec::new();

        if let Err(e) = self.collect(&mut sellers).await {
            if is_fatal(&e) {
                return Err(e);
            }
            error!("Error extracting sellers: {:#}", e);
        }

        if sellers.is_empty() {
            sellers.push(Seller::platform_default(&self.config.default_seller));
        }
        Ok(sellers)
    }

    async fn collect(&self, sellers: &mut Vec<Seller>) -> Result<()> {
        let primary = self.primary().await?;
        let primary_price = primary.price.clone();
        sellers.push(primary);

        if let Err(e) = self.collect_other_sellers(sellers, primary_price.as_deref()).await {
            if is_fatal(&e) {
                return Err(e);
            }
            debug!("No other sellers found or error accessing modal: {:#}", e);
        }
        Ok(())
    }

    async fn primary(&self) -> Result<Seller> {
        let price = degrade(
            Field::Price,
            self.fields
                .price(None, self.config.timings.seller_price_wait)
                .await,
        )?;
        let name = degrade(
            Field::SellerName,
            self.fields.text_now(Field::SellerName, None).await,
        )?;
        let rating = degrade(Field::Rating, self.fields.text_now(Field::Rating, None).await)?;

        match &price {
            Some(price) => info!("Extracted price: {}", price),
            None => warn!(
                "Price not found for product. Tried selectors: {:?}",
                self.config.selectors.price
            ),
        }

        Ok(Seller {
            name: name.unwrap_or_else(|| self.config.default_seller.clone()),
            price,
            rating,
        })
    }

    async fn other_sellers_button(&self) -> Result<Option<B::Element>> {
        let candidates = self
            .fields
            .elements(Field::OtherSellersButton, None, Duration::ZERO)
            .await?;

        for candidate in candidates {
            let text = self.browser.text(&candidate).await?;
            if text.to_lowercase().contains(&self.config.other_sellers_phrase) {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    async fn collect_other_sellers(
        &self,
        sellers: &mut Vec<Seller>,
        primary_price: Option<&str>,
    ) -> Result<()> {
        let Some(button) = self.other_sellers_button().await? else {
            return Ok(());
        };
        info!("Found 'Other Sellers' button, clicking to view all sellers...");

        let timings = &self.config.timings;
        self.browser
            .execute_script(SCROLL_INTO_VIEW_SCRIPT, std::slice::from_ref(&button))
            .await?;
        timings.modal_scroll_pause.pause().await;
        self.browser.click(&button).await?;
        timings.modal_open_pause.pause().await;

        let cards = self
            .fields
            .elements(Field::ModalSellerCard, None, timings.modal_wait)
            .await?;
        info!("Found {} seller cards in modal", cards.len());

        for card in &cards {
            match self.modal_seller(card, primary_price).await {
                Ok(Some(seller)) => {
                    if !sellers.iter().any(|known| known.name == seller.name) {
                        sellers.push(seller);
                    }
                }
                Ok(None) => {}
                Err(e) if is_fatal(&e) => return Err(e),
                Err(e) => debug!("Skipping seller card: {:#}", e),
            }
        }

        self.close_modal().await
    }

    async fn modal_seller(
        &self,
        card: &B::Element,
        primary_price: Option<&str>,
    ) -> Result<Option<Seller>> {
        let Some(name) = self.fields.text_now(Field::ModalSellerName, Some(card)).await? else {
            return Ok(None);
        };
        let price = self
            .fields
            .text_now(Field::ModalSellerPrice, Some(card))
            .await?
            .and_then(|raw| self.fields.tag_price(&raw))
            .or_else(|| primary_price.map(str::to_string));
        let rating = self
            .fields
            .text_now(Field::ModalSellerRating, Some(card))
            .await?;

        Ok(Some(Seller { name, price, rating }))
    }

    /// Dismiss the modal with its close control, or Escape on the page body
    async fn close_modal(&self) -> Result<()> {
        let close = self
            .fields
            .element(Field::CloseModal, None, Duration::ZERO)
            .await?;

        match close {
            Some(button) => self.browser.click(&button).await?,
            None => {
                let body = self
                    .fields
                    .element(Field::PageBody, None, Duration::ZERO)
                    .await?;
                if let Some(body) = body {
                    self.browser.send_key(&body, PageKey::Escape).await?;
                }
            }
        }

        self.config.timings.modal_close_pause.pause().await;
        Ok(())
    }
}
