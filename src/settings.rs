//! Run settings from the environment (after `.env` loading) and the command line

use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::{Result, anyhow, bail};

use crate::browser::BrowserOptions;

const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
const DEFAULT_OUTPUT_DIR: &str = "output";

/// Everything a single scraping run needs besides the site configuration
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub keywords: Vec<String>,
    /// Products per keyword; `None` scrapes every discovered product
    pub max_products: Option<NonZeroUsize>,
    pub browser: BrowserOptions,
    pub output_dir: PathBuf,
}

impl RunSettings {
    /// Reads `SCRAPER_*`, `WEBDRIVER_URL` and `CHROMEDRIVER_PATH`.
    ///
    /// Positional arguments, when given, replace `SCRAPER_KEYWORDS`.
    pub fn from_env_and_args() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), std::env::args().skip(1))
    }

    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        args: impl IntoIterator<Item = String>,
    ) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let args: Vec<String> = args
            .into_iter()
            .map(|arg| arg.trim().to_string())
            .filter(|arg| !arg.is_empty())
            .collect();
        let keywords = if args.is_empty() {
            var("SCRAPER_KEYWORDS")
                .map(|list| parse_keywords(&list))
                .unwrap_or_default()
        } else {
            args
        };
        if keywords.is_empty() {
            bail!("no search keywords given; pass them as arguments or set SCRAPER_KEYWORDS");
        }

        let max_products = var("SCRAPER_MAX_PRODUCTS")
            .map(|value| parse_max_products(&value))
            .transpose()?;
        let headless = var("SCRAPER_HEADLESS")
            .map(|value| parse_flag("SCRAPER_HEADLESS", &value))
            .transpose()?
            .unwrap_or(false);

        Ok(Self {
            keywords,
            max_products,
            browser: BrowserOptions {
                webdriver_url: var("WEBDRIVER_URL")
                    .unwrap_or_else(|| DEFAULT_WEBDRIVER_URL.to_string()),
                chromedriver_path: var("CHROMEDRIVER_PATH").map(PathBuf::from),
                headless,
            },
            output_dir: var("SCRAPER_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        })
    }

    /// Keyword used to tag the export file, only for single-keyword runs
    pub fn export_tag(&self) -> Option<&str> {
        match self.keywords.as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }
}

fn parse_keywords(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|keyword| !keyword.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_max_products(value: &str) -> Result<NonZeroUsize> {
    value
        .trim()
        .parse::<NonZeroUsize>()
        .map_err(|_| anyhow!("SCRAPER_MAX_PRODUCTS must be a positive integer, got '{value}'"))
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("{key} must be a boolean, got '{other}'"),
    }
}
