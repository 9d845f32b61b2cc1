//! Fallback-chain field resolution

use std::time::Duration;

use anyhow::Result;
use tracing::debug;

use crate::error::is_fatal;
use crate::traits::{BrowserSession, Field, ScraperConfig};

/// Reads the raw text content, which keeps currency glyphs `text()` may reflow
pub const TEXT_CONTENT_SCRIPT: &str = "return arguments[0].textContent;";

/// Drop every character outside printable ASCII and trim.
///
/// Rendered currency amounts carry bidi marks and other invisible
/// characters that break numeric parsing downstream.
pub fn sanitize_price(raw: &str) -> String {
    raw.chars()
        .filter(|c| (' '..='~').contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Treat a non-fatal resolution error as an absent field
pub fn degrade(field: Field, resolved: Result<Option<String>>) -> Result<Option<String>> {
    match resolved {
        Err(e) if !is_fatal(&e) => {
            debug!("Resolving {} failed, recording it as unknown: {:#}", field, e);
            Ok(None)
        }
        other => other,
    }
}

/// Resolves logical fields against the current page through their selector chains
pub struct FieldResolver<'a, B: BrowserSession> {
    browser: &'a B,
    config: &'a ScraperConfig,
}

impl<'a, B: BrowserSession> FieldResolver<'a, B> {
    pub fn new(browser: &'a B, config: &'a ScraperConfig) -> Self {
        Self { browser, config }
    }

    /// First element any candidate of `field` matches within `wait`
    pub async fn element(
        &self,
        field: Field,
        scope: Option<&B::Element>,
        wait: Duration,
    ) -> Result<Option<B::Element>> {
        let probe = self
            .browser
            .wait_for(
                self.config.selectors.chain(field),
                wait,
                self.config.timings.poll_interval,
                scope,
            )
            .await?;
        Ok(probe.map(|probe| probe.element))
    }

    /// All elements matched by the first candidate of `field` that matches within `wait`
    pub async fn elements(
        &self,
        field: Field,
        scope: Option<&B::Element>,
        wait: Duration,
    ) -> Result<Vec<B::Element>> {
        let chain = self.config.selectors.chain(field);
        let probe = self
            .browser
            .wait_for(chain, wait, self.config.timings.poll_interval, scope)
            .await?;

        match probe {
            Some(probe) => self.browser.find_all(&chain[probe.candidate], scope).await,
            None => Ok(Vec::new()),
        }
    }

    /// Trimmed text of `field` with the default element wait; blank text counts as absent
    pub async fn text(&self, field: Field, scope: Option<&B::Element>) -> Result<Option<String>> {
        self.text_within(field, scope, self.config.timings.element_wait)
            .await
    }

    /// Trimmed text of `field`, checking the page once without waiting
    pub async fn text_now(&self, field: Field, scope: Option<&B::Element>) -> Result<Option<String>> {
        self.text_within(field, scope, Duration::ZERO).await
    }

    async fn text_within(
        &self,
        field: Field,
        scope: Option<&B::Element>,
        wait: Duration,
    ) -> Result<Option<String>> {
        let Some(element) = self.element(field, scope, wait).await? else {
            return Ok(None);
        };
        let text = self.browser.text(&element).await?;
        let text = text.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }

    /// Sanitized, currency-tagged price read from the raw text content
    pub async fn price(&self, scope: Option<&B::Element>, wait: Duration) -> Result<Option<String>> {
        let Some(element) = self.element(Field::Price, scope, wait).await? else {
            return Ok(None);
        };
        let content = self
            .browser
            .execute_script(TEXT_CONTENT_SCRIPT, std::slice::from_ref(&element))
            .await?;

        Ok(self.tag_price(content.as_str().unwrap_or_default()))
    }

    /// Sanitize a raw price and tag it with the site currency exactly once
    pub fn tag_price(&self, raw: &str) -> Option<String> {
        let price = sanitize_price(raw);
        let amount = price
            .strip_prefix(self.config.currency.as_str())
            .unwrap_or(&price)
            .trim();
        (!amount.is_empty()).then(|| format!("{} {}", self.config.currency, amount))
    }

    /// Breadcrumb path without the "Home" crumb, joined with " > "
    pub async fn category(&self) -> Result<Option<String>> {
        let crumbs = self
            .elements(Field::Breadcrumbs, None, self.config.timings.element_wait)
            .await?;

        let mut parts = Vec::new();
        for crumb in &crumbs {
            let text = self.browser.text(crumb).await?;
            let text = text.trim();
            if !text.is_empty() && !text.eq_ignore_ascii_case("home") {
                parts.push(text.to_string());
            }
        }
        Ok((!parts.is_empty()).then(|| parts.join(" > ")))
    }

    /// First few highlight bullets joined with " | "
    pub async fn description(&self) -> Result<Option<String>> {
        let highlights = self
            .elements(Field::Highlights, None, self.config.timings.element_wait)
            .await?;

        let mut parts = Vec::new();
        for highlight in highlights.iter().take(self.config.description_highlights) {
            let text = self.browser.text(highlight).await?;
            let text = text.trim();
            if !text.is_empty() {
                parts.push(text.to_string());
            }
        }
        Ok((!parts.is_empty()).then(|| parts.join(" | ")))
    }
}
