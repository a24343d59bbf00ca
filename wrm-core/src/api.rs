//! Remote sensor API client.
//!
//! - `GET {base}/api/station/{id}` -> current readings, one per parameter
//! - `GET {base}/api/{flow|oxygen|conductivity}/{id}?t={token}` -> history
//!
//! All requests are plain GETs. Any non-2xx status is a failure.

use crate::error::{Result, SensorError};
use crate::reading::{RawReading, SeriesKind, SeriesPoint};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;
use wrm_utils::dates::cache_bust_token;

/// Where sensor payloads come from.
#[async_trait]
pub trait SensorSource: Send + Sync {
    /// Current readings across all parameters for a station.
    async fn current_readings(&self, station_id: &str) -> Result<Vec<RawReading>>;

    /// Historical series of one parameter for a station.
    async fn series(&self, station_id: &str, kind: SeriesKind) -> Result<Vec<SeriesPoint>>;
}

/// [`SensorSource`] backed by the HTTP sensor API.
#[derive(Debug, Clone)]
pub struct HttpSensorSource {
    client: Client,
    base: String,
}

impl HttpSensorSource {
    pub fn new(client: Client, base: impl Into<String>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self { client, base }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn station_url(&self, station_id: &str) -> String {
        format!("{}/api/station/{}", self.base, station_id)
    }

    /// History URL with a cache-busting token so browser/proxy caches are
    /// bypassed.
    pub fn series_url(&self, station_id: &str, kind: SeriesKind, token: i64) -> String {
        format!(
            "{}/api/{}/{}?t={}",
            self.base,
            kind.endpoint(),
            station_id,
            token
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SensorError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| SensorError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl SensorSource for HttpSensorSource {
    async fn current_readings(&self, station_id: &str) -> Result<Vec<RawReading>> {
        self.get_json(&self.station_url(station_id)).await
    }

    async fn series(&self, station_id: &str, kind: SeriesKind) -> Result<Vec<SeriesPoint>> {
        let url = self.series_url(station_id, kind, cache_bust_token());
        self.get_json(&url).await
    }
}
