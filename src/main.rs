use anyhow::Result;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod browser;
mod error;
mod export;
mod models;
mod orchestrator;
mod scraper;
mod scrapers;
mod settings;
mod traits;

use browser::WebDriverSession;
use export::CsvExporter;
use orchestrator::ScrapeOrchestrator;
use settings::RunSettings;

const LOG_FILE: &str = "scraper.log";

/// Console plus `scraper.log`; the returned guard flushes the file on drop
fn init_logging() -> WorkerGuard {
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(".", LOG_FILE));
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = init_logging();

    let settings = RunSettings::from_env_and_args()?;
    let config = scrapers::noon::config();

    info!("Starting {} scraper", config.name);
    info!("Keywords: {}", settings.keywords.join(", "));
    match settings.max_products {
        Some(cap) => info!("Max products per keyword: {}", cap),
        None => info!("Max products per keyword: unlimited"),
    }

    let browser = WebDriverSession::launch(&settings.browser, &config.timings).await?;
    let result = ScrapeOrchestrator::new(browser, config)
        .run(&settings.keywords, settings.max_products)
        .await?;

    if result.is_empty() {
        warn!("No products were scraped");
        return Ok(());
    }

    let exporter = CsvExporter::new(&settings.output_dir)?;
    if let Some(path) = exporter.export(&result, settings.export_tag())? {
        info!("Scraped {} rows, saved to {}", result.len(), path.display());
    }
    Ok(())
}
