//! Geocoding relay client.
//!
//! Thin client for the Google Geocoding API used two ways: reverse geocoding
//! a coordinate pair to a city name for the news search, and forward
//! geocoding a manual address search to a coordinate pair for the map. The
//! API key stays server-side; the browser only ever talks to our relay
//! endpoints.

use log::{debug, warn};
use serde::Deserialize;

use crate::{GeoPoint, LensError, Result};

const GEOCODE_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    address_components: Vec<AddressComponent>,
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    long_name: String,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: GeoPoint,
}

pub struct GeocodeClient {
    http: reqwest::Client,
    api_key: Option<String>,
}

impl GeocodeClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }

    fn key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| LensError::Unconfigured {
                message: "No geocoding API key configured (set GMAPS_KEY)".to_string(),
            })
    }

    /// Resolves a coordinate pair to a city name.
    ///
    /// Falls back to the literal `"local"` when the provider returns no
    /// locality component, which keeps the downstream news search usable.
    pub async fn reverse_geocode(&self, lat: f64, lng: f64) -> Result<String> {
        let key = self.key()?;
        debug!("Reverse geocoding {},{}", lat, lng);

        let latlng = format!("{},{}", lat, lng);
        let response: GeocodeResponse = self
            .http
            .get(GEOCODE_ENDPOINT)
            .query(&[("latlng", latlng.as_str()), ("key", key)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let city = match city_from_results(&response.results) {
            Some(city) => city,
            None => {
                warn!("No locality found for {},{}", lat, lng);
                "local".to_string()
            }
        };

        debug!("Resolved {},{} to {}", lat, lng, city);
        Ok(city)
    }

    /// Resolves a free-form address to a coordinate pair.
    pub async fn geocode_address(&self, address: &str) -> Result<GeoPoint> {
        let key = self.key()?;
        debug!("Geocoding address: {}", address);

        let response: GeocodeResponse = self
            .http
            .get(GEOCODE_ENDPOINT)
            .query(&[("address", address), ("key", key)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .results
            .first()
            .and_then(|result| result.geometry.as_ref())
            .map(|geometry| geometry.location)
            .ok_or_else(|| LensError::LocationNotFound {
                query: address.to_string(),
            })
    }
}

/// Extracts the locality name from the first geocoding result
fn city_from_results(results: &[GeocodeResult]) -> Option<String> {
    results
        .first()?
        .address_components
        .iter()
        .find(|component| component.types.iter().any(|t| t == "locality"))
        .map(|component| component.long_name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_locality_from_first_result() {
        let response: GeocodeResponse = serde_json::from_str(
            r#"{
                "results": [{
                    "address_components": [
                        {"long_name": "500", "types": ["street_number"]},
                        {"long_name": "Austin", "types": ["locality", "political"]},
                        {"long_name": "Texas", "types": ["administrative_area_level_1"]}
                    ],
                    "geometry": {"location": {"lat": 30.2672, "lng": -97.7431}}
                }]
            }"#,
        )
        .unwrap();

        assert_eq!(city_from_results(&response.results).as_deref(), Some("Austin"));
    }

    #[test]
    fn missing_locality_yields_none() {
        let response: GeocodeResponse = serde_json::from_str(
            r#"{
                "results": [{
                    "address_components": [
                        {"long_name": "Texas", "types": ["administrative_area_level_1"]}
                    ]
                }]
            }"#,
        )
        .unwrap();

        assert!(city_from_results(&response.results).is_none());
    }

    #[test]
    fn empty_results_parse_cleanly() {
        let response: GeocodeResponse = serde_json::from_str(r#"{"results": []}"#).unwrap();
        assert!(city_from_results(&response.results).is_none());
    }
}
