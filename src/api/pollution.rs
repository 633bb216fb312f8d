use async_trait::async_trait;
use log::warn;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

/// Source of PM10 readings for a coordinate.
///
/// Never fails: the degraded value `0.0` stands in for any upstream
/// failure, so a tick always has something to record.
#[async_trait]
pub trait PollutionSource: Send + Sync {
    async fn fetch_pm10(&self, latitude: f64, longitude: f64) -> f64;
}

#[derive(Debug, Deserialize)]
struct AirPollutionResponse {
    #[serde(default)]
    list: Vec<AirPollutionEntry>,
}

#[derive(Debug, Deserialize)]
struct AirPollutionEntry {
    #[serde(default)]
    components: Components,
}

#[derive(Debug, Default, Deserialize)]
struct Components {
    pm10: Option<f64>,
}

/// HTTP client for the air-pollution endpoint.
#[derive(Debug, Clone)]
pub struct PollutionClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl PollutionClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    async fn request_pm10(&self, latitude: f64, longitude: f64) -> Option<f64> {
        let response = self
            .http
            .get(self.base_url.as_str())
            .query(&[
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("appid", self.api_key.clone()),
            ])
            .send()
            .await
            .ok()?;

        if response.status() != StatusCode::OK {
            warn!("pollution endpoint returned {}", response.status());
            return None;
        }

        let body = response.text().await.ok()?;
        pm10_from_body(&body)
    }
}

#[async_trait]
impl PollutionSource for PollutionClient {
    async fn fetch_pm10(&self, latitude: f64, longitude: f64) -> f64 {
        match self.request_pm10(latitude, longitude).await {
            Some(pm10) => pm10,
            None => {
                warn!("pm10 unavailable for ({latitude}, {longitude}), recording 0.0");
                0.0
            }
        }
    }
}

/// Extracts `list[0].components.pm10` from a response body.
fn pm10_from_body(body: &str) -> Option<f64> {
    let parsed: AirPollutionResponse = serde_json::from_str(body).ok()?;
    parsed.list.first()?.components.pm10
}
