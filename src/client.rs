//! HTTP accessor for the sensor/prediction backend.
//!
//! Three idempotent calls against a fixed base URL:
//! - `GET /health`      – reachability probe, never fails to the caller
//! - `GET /sensor-data` – latest [`SensorSample`]
//! - `POST /predict`    – [`Prediction`] for a posted sample
//!
//! No retries happen here. The poller re-invokes on its next tick.

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::{Prediction, SensorSample};
use crate::Config;

// ---

pub const HEALTH_PATH: &str = "/health";
pub const SENSOR_DATA_PATH: &str = "/sensor-data";
pub const PREDICT_PATH: &str = "/predict";

/// Failure of a sensor or prediction fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Backend answered with a non-2xx status.
    #[error("{endpoint} returned HTTP {status}")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
    },

    /// Connection or transport failure.
    #[error("{endpoint} request failed: {message}")]
    Transport {
        endpoint: &'static str,
        message: String,
    },

    /// Request exceeded the configured timeout.
    #[error("{endpoint} timed out")]
    Timeout { endpoint: &'static str },

    /// Body was not JSON of the expected shape.
    #[error("{endpoint} returned a malformed body: {message}")]
    Malformed {
        endpoint: &'static str,
        message: String,
    },
}

impl FetchError {
    fn from_reqwest(endpoint: &'static str, err: reqwest::Error) -> Self {
        // ---
        if err.is_timeout() {
            FetchError::Timeout { endpoint }
        } else {
            FetchError::Transport {
                endpoint,
                message: err.to_string(),
            }
        }
    }
}

/// Thin client over a shared `reqwest::Client`. Cheap to clone.
#[derive(Debug, Clone)]
pub struct BackendClient {
    // ---
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Build a client for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        // ---
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(BackendClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(&config.backend_url, config.http_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `true` only when `GET /health` answers 2xx. Every failure is `false`.
    ///
    /// ```
    /// use std::time::Duration;
    /// use riverrevive_monitor::BackendClient;
    ///
    /// // Nothing listens on the discard port
    /// let client = BackendClient::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
    /// # tokio_test::block_on(async {
    /// assert!(!client.check_health().await);
    /// # });
    /// ```
    pub async fn check_health(&self) -> bool {
        // ---
        match self.http.get(self.url(HEALTH_PATH)).send().await {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                tracing::debug!("Health check returned HTTP {}", resp.status());
                false
            }
            Err(e) => {
                tracing::debug!("Health check failed: {}", e);
                false
            }
        }
    }

    /// Fetch the latest sensor sample.
    pub async fn fetch_sensor_data(&self) -> Result<SensorSample, FetchError> {
        // ---
        let resp = self
            .http
            .get(self.url(SENSOR_DATA_PATH))
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(SENSOR_DATA_PATH, e))?;

        read_json(SENSOR_DATA_PATH, resp).await
    }

    /// Ask the backend model for a clog prediction for `sample`.
    pub async fn fetch_prediction(&self, sample: &SensorSample) -> Result<Prediction, FetchError> {
        // ---
        let resp = self
            .http
            .post(self.url(PREDICT_PATH))
            .json(sample)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(PREDICT_PATH, e))?;

        read_json(PREDICT_PATH, resp).await
    }
}

/// Check the status, then decode the body as `T`.
async fn read_json<T: DeserializeOwned>(
    endpoint: &'static str,
    resp: reqwest::Response,
) -> Result<T, FetchError> {
    // ---
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status { endpoint, status });
    }

    let body = resp
        .bytes()
        .await
        .map_err(|e| FetchError::from_reqwest(endpoint, e))?;

    tracing::debug!("{} raw response: {}", endpoint, String::from_utf8_lossy(&body));

    serde_json::from_slice(&body).map_err(|e| FetchError::Malformed {
        endpoint,
        message: e.to_string(),
    })
}
