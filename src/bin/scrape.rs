use std::sync::Arc;

use anyhow::Context;

use subway_outlets::core::config::{AppPaths, ConfigService};
use subway_outlets::logging;
use subway_outlets::outlets::SqliteOutletStore;
use subway_outlets::scraper::{self, Geocoder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let paths = Arc::new(AppPaths::new());
    logging::init(&paths, "scraper.log");

    let config = ConfigService::new(paths.clone())
        .settings()
        .context("Failed to load configuration")?;

    let geocoder = Geocoder::new(&config.scraper)?;
    let store = SqliteOutletStore::new(&paths)
        .await
        .context("Failed to open outlet store")?;

    let summary = scraper::run(&config.scraper, &geocoder, &store).await?;
    tracing::info!(
        scraped = summary.scraped,
        geocoded = summary.geocoded,
        stored = summary.stored,
        "Scrape finished"
    );

    Ok(())
}
