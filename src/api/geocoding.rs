use async_trait::async_trait;
use log::warn;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

/// Place name recorded when reverse geocoding degrades.
pub const UNKNOWN_PLACE: &str = "Unknown";

/// Resolves a coordinate to a human-readable place name.
///
/// Never fails: `"Unknown"` stands in for any upstream failure.
#[async_trait]
pub trait PlaceResolver: Send + Sync {
    async fn resolve_name(&self, latitude: f64, longitude: f64) -> String;
}

#[derive(Debug, Deserialize)]
struct GeocodingEntry {
    name: Option<String>,
}

/// HTTP client for the reverse-geocoding endpoint.
#[derive(Debug, Clone)]
pub struct GeocodingClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl GeocodingClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    async fn request_name(&self, latitude: f64, longitude: f64) -> Option<String> {
        let response = self
            .http
            .get(self.base_url.as_str())
            .query(&[
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("limit", "1".to_string()),
                ("appid", self.api_key.clone()),
            ])
            .send()
            .await
            .ok()?;

        if response.status() != StatusCode::OK {
            warn!("geocoding endpoint returned {}", response.status());
            return None;
        }

        let body = response.text().await.ok()?;
        name_from_body(&body)
    }
}

#[async_trait]
impl PlaceResolver for GeocodingClient {
    async fn resolve_name(&self, latitude: f64, longitude: f64) -> String {
        match self.request_name(latitude, longitude).await {
            Some(name) => name,
            None => {
                warn!("no place name for ({latitude}, {longitude})");
                UNKNOWN_PLACE.to_string()
            }
        }
    }
}

/// Extracts the first result's non-empty `name` from a response body.
fn name_from_body(body: &str) -> Option<String> {
    let entries: Vec<GeocodingEntry> = serde_json::from_str(body).ok()?;
    entries
        .into_iter()
        .next()?
        .name
        .filter(|name| !name.is_empty())
}
