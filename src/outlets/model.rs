use serde::{Deserialize, Serialize};

/// Placeholder used by the scraper when no Waze link could be extracted.
pub const WAZE_NOT_AVAILABLE: &str = "Not available";

/// One physical restaurant location. `address` is the business key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outlet {
    pub name: String,
    pub address: String,
    pub operating_hours: String,
    pub waze_link: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl Outlet {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        operating_hours: impl Into<String>,
        waze_link: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            operating_hours: operating_hours.into(),
            waze_link: waze_link.into(),
            lat: None,
            lng: None,
        }
    }

    pub fn with_coordinates(mut self, coordinates: Option<(f64, f64)>) -> Self {
        (self.lat, self.lng) = match coordinates {
            Some((lat, lng)) => (Some(lat), Some(lng)),
            None => (None, None),
        };
        self
    }

    /// Coordinates only when both halves are present.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }

    /// Drops a lone latitude or longitude so the pair is all-or-nothing.
    pub fn normalized(mut self) -> Self {
        let coordinates = self.coordinates();
        self = self.with_coordinates(coordinates);
        self
    }

    /// Text fed to the embedding provider for this outlet.
    pub fn canonical_text(&self) -> String {
        format!(
            "Name: {}, Address: {}, Operating Hours: {}",
            self.name, self.address, self.operating_hours
        )
    }

    /// One line of the retrieval context block.
    pub fn context_line(&self) -> String {
        format!(
            "Name: {}, Address: {}, Operating Hours: {}, Waze Link: {}",
            self.name, self.address, self.operating_hours, self.waze_link
        )
    }
}

/// Ephemeral result of a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub address: String,
    pub score: f32,
}

impl Match {
    pub fn new(address: impl Into<String>, score: f32) -> Self {
        Self {
            address: address.into(),
            score,
        }
    }
}
