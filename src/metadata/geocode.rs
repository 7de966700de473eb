use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use super::{GpsCoordinates, Location};
use crate::config::GeocodeConfig;

/// Client for a Nominatim-compatible `/reverse` endpoint.
#[derive(Debug, Clone)]
pub struct ReverseGeocoder {
    client: Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    address: Option<NominatimAddress>,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    #[serde(default)]
    village: Option<String>,
    #[serde(default)]
    town: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

impl ReverseGeocoder {
    pub fn new(cfg: &GeocodeConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(cfg.timeout)
            .user_agent(cfg.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            endpoint: cfg.endpoint.clone(),
        })
    }

    /// Look up the place at `gps`.
    ///
    /// Returns `Ok(None)` when the service answers without a usable address.
    pub async fn lookup(&self, gps: GpsCoordinates) -> Result<Option<Location>, reqwest::Error> {
        let response: NominatimResponse = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", gps.latitude.to_string()),
                ("lon", gps.longitude.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(name) = response.display_name.as_deref() {
            info!(display_name = name, "reverse geocode resolved");
        }
        let Some(address) = response.address else {
            debug!(lat = gps.latitude, lon = gps.longitude, "geocoder returned no address");
            return Ok(None);
        };
        let location = address.into_location();
        Ok((!location.is_empty()).then_some(location))
    }
}

impl NominatimAddress {
    fn into_location(self) -> Location {
        let village = self.village.unwrap_or_default();
        let city = [self.city, self.town]
            .into_iter()
            .flatten()
            .chain(std::iter::once(village.clone()))
            .find(|s| !s.is_empty())
            .unwrap_or_default();
        Location {
            village,
            city,
            country: self.country.unwrap_or_default(),
        }
    }
}
