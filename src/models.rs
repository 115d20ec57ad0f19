//! Data models shared by the backend client, the poller and the snapshot routes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ---

/// Status text carried by the prediction that replaces a failed fetch.
pub const FETCH_ERROR_STATUS: &str = "⚠️ Error fetching data";

/// Error surfaced by the data cycle while the backend is unreachable.
pub const DISCONNECTED_MESSAGE: &str = "Backend server not connected";

/// Raw sensor sample as served by `GET /sensor-data`.
///
/// The same shape is posted back to `POST /predict`. Numeric fields that
/// arrive as `null` are read as `0.0`; any other type mismatch or a missing
/// field fails deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    // ---
    /// Turbidity in NTU.
    #[serde(deserialize_with = "number_or_zero")]
    pub turbidity: f64,
    /// Total dissolved solids, percent.
    #[serde(deserialize_with = "number_or_zero")]
    pub tds: f64,
    /// Inlet flow rate, L/min.
    #[serde(deserialize_with = "number_or_zero")]
    pub flow1: f64,
    /// Outlet flow rate, L/min.
    #[serde(deserialize_with = "number_or_zero")]
    pub flow2: f64,
    /// ISO-8601 timestamp as reported by the sensor, kept verbatim.
    pub timestamp: String,
}

/// Clog forecast returned by `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    // ---
    #[serde(deserialize_with = "number_or_zero")]
    pub predicted_days: f64,
    pub alert: bool,
    pub status: String,
}

impl Prediction {
    /// Prediction installed when a sensor or prediction fetch fails, so a
    /// bottomed-out value is never shown as an unflagged normal state.
    pub fn error_sentinel() -> Self {
        // ---
        Prediction {
            predicted_days: 0.0,
            alert: true,
            status: FETCH_ERROR_STATUS.to_string(),
        }
    }

    pub fn is_error_sentinel(&self) -> bool {
        self.alert && self.predicted_days == 0.0 && self.status == FETCH_ERROR_STATUS
    }
}

/// Backend reachability as last observed by the health cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Checking,
    Connected,
    Error,
}

/// Bookkeeping owned by the data cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchCycleState {
    // ---
    pub last_error: Option<String>,
    pub is_loading: bool,
    pub last_update: Option<DateTime<Utc>>,
}

/// Read `null` or a non-finite number as zero; reject every non-numeric type.
fn number_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.filter(|v| v.is_finite()).unwrap_or(0.0))
}
