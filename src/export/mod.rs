//! # Tabular Export
//!
//! Writes a finished [`ScrapeResult`] to a timestamped CSV file, one line per
//! (product, seller) row, with the column order:
//!
//! `Search Keyword, Category, Title, Description, Price, Rating, Reviews, Seller, Product URL`
//!
//! File names follow `noon_scraper[_{keyword}]_{YYYY-mm-dd_HH-MM-SS}.csv`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use tracing::info;

use crate::models::ScrapeResult;

const FILENAME_PREFIX: &str = "noon_scraper";

/// CSV sink for scrape results
pub struct CsvExporter {
    output_dir: PathBuf,
}

impl CsvExporter {
    /// Creates the exporter, creating `output_dir` if it does not exist yet.
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir)
            .with_context(|| format!("creating output directory {}", output_dir.display()))?;
        Ok(Self { output_dir })
    }

    /// Writes every row of `result` to a new file.
    ///
    /// # Arguments
    /// * `result` - Rows to write; an empty result writes nothing
    /// * `keyword` - Optional tag embedded in the file name
    ///
    /// # Returns
    /// * `Result<Option<PathBuf>>` - The created file, or `None` when there was nothing to export
    pub fn export(&self, result: &ScrapeResult, keyword: Option<&str>) -> Result<Option<PathBuf>> {
        if result.is_empty() {
            info!("No data to export");
            return Ok(None);
        }

        let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
        let path = self.output_dir.join(file_name(keyword, &timestamp));
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("creating {}", path.display()))?;
        for row in result.rows() {
            writer.serialize(row)?;
        }
        writer.flush()?;

        info!("CSV file created: {} ({} rows)", path.display(), result.len());
        Ok(Some(path))
    }
}

fn file_name(keyword: Option<&str>, timestamp: &str) -> String {
    let keyword_part = keyword
        .map(|k| format!("_{}", sanitize_keyword(k)))
        .unwrap_or_default();
    format!("{FILENAME_PREFIX}{keyword_part}_{timestamp}.csv")
}

/// Keeps file names portable when keywords contain spaces or separators
fn sanitize_keyword(keyword: &str) -> String {
    keyword
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
