//! Offline ingestion: fetch the locator page, geocode, upsert.

pub mod geocode;
pub mod locator;

use anyhow::Context;
use reqwest::Client;

use crate::core::config::settings::ScraperConfig;
use crate::outlets::{Outlet, OutletStore};

pub use geocode::Geocoder;
pub use locator::{parse_outlets, LocatorParser};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScrapeSummary {
    pub scraped: usize,
    pub geocoded: usize,
    pub stored: usize,
}

pub async fn fetch_page(config: &ScraperConfig) -> anyhow::Result<String> {
    let client = Client::builder()
        .timeout(config.timeout())
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    client
        .get(&config.locator_url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch {}", config.locator_url))?
        .error_for_status()
        .context("Locator page returned an error status")?
        .text()
        .await
        .context("Failed to read locator page")
}

/// Replaces page coordinates with geocoded ones where the geocoder knows the address.
///
/// Geocoding failures are logged and the page coordinates (if any) are kept.
pub async fn geocode_all(geocoder: &Geocoder, outlets: Vec<Outlet>) -> (Vec<Outlet>, usize) {
    let mut geocoded = 0;
    let mut located = Vec::with_capacity(outlets.len());

    for outlet in outlets {
        match geocoder.geocode(&outlet.address).await {
            Ok(Some(coordinates)) => {
                tracing::info!(
                    "Geocoded {}: ({}, {})",
                    outlet.name,
                    coordinates.0,
                    coordinates.1
                );
                geocoded += 1;
                located.push(outlet.with_coordinates(Some(coordinates)));
            }
            Ok(None) => {
                tracing::warn!("Could not geocode address: {}", outlet.address);
                located.push(outlet);
            }
            Err(err) => {
                tracing::warn!("Error geocoding {}: {:#}", outlet.address, err);
                located.push(outlet);
            }
        }
    }

    (located, geocoded)
}

/// Runs one full scrape into `store`. Finding nothing writes nothing.
pub async fn run(
    config: &ScraperConfig,
    geocoder: &Geocoder,
    store: &dyn OutletStore,
) -> anyhow::Result<ScrapeSummary> {
    let html = fetch_page(config).await?;
    let outlets = parse_outlets(&html, &config.area).context("Failed to compile locator patterns")?;

    if outlets.is_empty() {
        tracing::warn!("No outlets found in {} at {}", config.area, config.locator_url);
        return Ok(ScrapeSummary::default());
    }
    for outlet in &outlets {
        tracing::info!("Scraped outlet: {}", outlet.name);
    }

    let scraped = outlets.len();
    let (outlets, geocoded) = geocode_all(geocoder, outlets).await;

    store
        .upsert_batch(&outlets)
        .await
        .context("Failed to store scraped outlets")?;

    Ok(ScrapeSummary {
        scraped,
        geocoded,
        stored: outlets.len(),
    })
}
