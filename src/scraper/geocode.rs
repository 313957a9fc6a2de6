//! Address geocoding against the Google Geocoding JSON API.

use anyhow::{anyhow, Context};
use reqwest::Client;
use serde::Deserialize;

use crate::core::config::settings::ScraperConfig;

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Location,
}

#[derive(Debug, Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

pub struct Geocoder {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl Geocoder {
    pub fn new(config: &ScraperConfig) -> anyhow::Result<Self> {
        let api_key = config
            .google_maps_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| anyhow!("GOOGLE_MAPS_API_KEY is required for geocoding"))?
            .to_string();

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to build geocoding client")?;

        Ok(Self {
            client,
            endpoint: config.geocode_url.clone(),
            api_key,
        })
    }

    /// First result's location, or `None` when the address is unknown.
    pub async fn geocode(&self, address: &str) -> anyhow::Result<Option<(f64, f64)>> {
        let payload: GeocodeResponse = self
            .client
            .get(&self.endpoint)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await
            .context("Geocoding request failed")?
            .error_for_status()
            .context("Geocoding service returned an error status")?
            .json()
            .await
            .context("Failed to decode geocoding response")?;

        interpret(payload)
    }
}

fn interpret(payload: GeocodeResponse) -> anyhow::Result<Option<(f64, f64)>> {
    match payload.status.as_str() {
        "OK" => Ok(payload
            .results
            .first()
            .map(|result| (result.geometry.location.lat, result.geometry.location.lng))),
        "ZERO_RESULTS" => Ok(None),
        other => Err(anyhow!(
            "Geocoding failed with status {}: {}",
            other,
            payload.error_message.unwrap_or_default()
        )),
    }
}
