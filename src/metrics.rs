//! Metric derivation: turns a sensor sample and a clog prediction into
//! display-ready, thresholded values.
//!
//! Everything here is pure and total. Non-finite inputs are read as zero, so
//! a stray NaN can never reach a clamp or a threshold comparison. Values stay
//! numeric all the way through; strings are produced only by the `format_*`
//! helpers at the very end.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{Prediction, SensorSample};

// ---

/// Horizon, in days, over which the choke level runs from 100% down to 0%.
pub const MAX_DAYS: f64 = 10.0;

/// Predictions strictly below this many days are critical.
pub const CRITICAL_DAYS: f64 = 2.0;

/// Predictions strictly below this many days (and not critical) are warnings.
pub const WARNING_DAYS: f64 = 5.0;

/// Choke levels above this percentage draw the choke bar in the hot color.
pub const CHOKE_HOT_PCT: f64 = 70.0;

/// Full-scale divisors for the bar gauges.
const FLOW_GAUGE_DIVISOR: f64 = 2.5;
const TURBIDITY_GAUGE_DIVISOR: f64 = 1.5;

/// Turbidity band boundaries, NTU.
const TURBIDITY_HIGH_NTU: f64 = 100.0;
const TURBIDITY_ELEVATED_NTU: f64 = 80.0;

/// Severity bucket for a clog prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Critical,
    Warning,
    Normal,
}

/// Color band for the turbidity gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurbidityBand {
    Normal,
    Elevated,
    High,
}

/// Display metrics for one (sample, prediction) pair. Never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedMetrics {
    // ---
    pub choke_level_pct: f64,
    pub alert_level: AlertLevel,
    pub choke_hot: bool,
    pub turbidity_band: TurbidityBand,
    pub flow_gauge_pct: f64,
    pub turbidity_gauge_pct: f64,
    /// Display strings keyed by field name.
    pub formatted: BTreeMap<&'static str, String>,
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn clamp_pct(value: f64) -> f64 {
    finite_or_zero(value).clamp(0.0, 100.0)
}

/// Estimated clog percentage: 100% at zero days left, 0% at [`MAX_DAYS`] or more.
pub fn choke_level(predicted_days: f64) -> f64 {
    // ---
    let days = finite_or_zero(predicted_days);
    clamp_pct(((MAX_DAYS - days) / MAX_DAYS) * 100.0)
}

/// Bucket a prediction. Both boundaries are strict, so exactly 2 days is a
/// warning and exactly 5 days is normal.
pub fn alert_severity(predicted_days: f64) -> AlertLevel {
    // ---
    let days = finite_or_zero(predicted_days);
    if days < CRITICAL_DAYS {
        AlertLevel::Critical
    } else if days < WARNING_DAYS {
        AlertLevel::Warning
    } else {
        AlertLevel::Normal
    }
}

pub fn choke_is_hot(choke_pct: f64) -> bool {
    finite_or_zero(choke_pct) > CHOKE_HOT_PCT
}

pub fn turbidity_band(turbidity_ntu: f64) -> TurbidityBand {
    // ---
    let ntu = finite_or_zero(turbidity_ntu);
    if ntu > TURBIDITY_HIGH_NTU {
        TurbidityBand::High
    } else if ntu > TURBIDITY_ELEVATED_NTU {
        TurbidityBand::Elevated
    } else {
        TurbidityBand::Normal
    }
}

/// Fill percentage of the flow-rate bar.
pub fn flow_gauge_pct(flow_lpm: f64) -> f64 {
    clamp_pct(finite_or_zero(flow_lpm) / FLOW_GAUGE_DIVISOR)
}

/// Fill percentage of the turbidity bar.
pub fn turbidity_gauge_pct(turbidity_ntu: f64) -> f64 {
    clamp_pct(finite_or_zero(turbidity_ntu) / TURBIDITY_GAUGE_DIVISOR)
}

// ---
// Display formatting

fn fixed2(value: f64) -> String {
    format!("{:.2}", finite_or_zero(value))
}

pub fn format_ntu(value: f64) -> String {
    format!("{} NTU", fixed2(value))
}

pub fn format_percent(value: f64) -> String {
    format!("{}%", fixed2(value))
}

pub fn format_flow(value: f64) -> String {
    format!("{} L/min", fixed2(value))
}

pub fn format_days(value: f64) -> String {
    format!("{} days", fixed2(value))
}

/// Compute every display metric for a sample and its prediction.
pub fn derive_metrics(sample: &SensorSample, prediction: &Prediction) -> DerivedMetrics {
    // ---
    let choke_level_pct = choke_level(prediction.predicted_days);

    let mut formatted = BTreeMap::new();
    formatted.insert("turbidity", format_ntu(sample.turbidity));
    formatted.insert("tds", format_percent(sample.tds));
    formatted.insert("flow1", format_flow(sample.flow1));
    formatted.insert("flow2", format_flow(sample.flow2));
    formatted.insert("predicted_days", format_days(prediction.predicted_days));
    formatted.insert("choke_level", format_percent(choke_level_pct));

    DerivedMetrics {
        choke_level_pct,
        alert_level: alert_severity(prediction.predicted_days),
        choke_hot: choke_is_hot(choke_level_pct),
        turbidity_band: turbidity_band(sample.turbidity),
        flow_gauge_pct: flow_gauge_pct(sample.flow1),
        turbidity_gauge_pct: turbidity_gauge_pct(sample.turbidity),
        formatted,
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn create_test_sample(turbidity: f64, flow1: f64) -> SensorSample {
        // ---
        SensorSample {
            turbidity,
            tds: 72.0,
            flow1,
            flow2: 0.0,
            timestamp: "t".to_string(),
        }
    }

    fn create_test_prediction(days: f64) -> Prediction {
        Prediction {
            predicted_days: days,
            alert: false,
            status: "OK".to_string(),
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_choke_level_endpoints_and_clamping() {
        // ---
        assert_eq!(choke_level(0.0), 100.0);
        assert_eq!(choke_level(10.0), 0.0);
        assert_eq!(choke_level(-5.0), 100.0);
        assert_eq!(choke_level(15.0), 0.0);
        assert!(approx(choke_level(5.2), 48.0));
    }

    #[test]
    fn test_choke_level_non_increasing() {
        // ---
        let mut previous = choke_level(0.0);
        for step in 1..=100 {
            let current = choke_level(step as f64 / 10.0);
            assert!(current <= previous, "choke level rose at {}", step);
            previous = current;
        }
    }

    #[test]
    fn test_non_finite_days_read_as_zero() {
        // ---
        assert_eq!(choke_level(f64::NAN), 100.0);
        assert_eq!(alert_severity(f64::NAN), AlertLevel::Critical);
        assert_eq!(choke_level(f64::INFINITY), 100.0);
    }

    #[test]
    fn test_alert_severity_boundaries() {
        // ---
        assert_eq!(alert_severity(1.9), AlertLevel::Critical);
        assert_eq!(alert_severity(2.0), AlertLevel::Warning);
        assert_eq!(alert_severity(4.9), AlertLevel::Warning);
        assert_eq!(alert_severity(5.0), AlertLevel::Normal);
        assert_eq!(alert_severity(-1.0), AlertLevel::Critical);
    }

    #[test]
    fn test_choke_bar_compares_numerically() {
        // ---
        assert!(choke_is_hot(72.0));
        assert!(!choke_is_hot(70.0));
        // "8%" would sort above "70" as text
        assert!(!choke_is_hot(8.0));
    }

    #[test]
    fn test_gauges_and_turbidity_band() {
        // ---
        assert_eq!(flow_gauge_pct(180.0), 72.0);
        assert_eq!(flow_gauge_pct(400.0), 100.0);
        assert_eq!(flow_gauge_pct(-10.0), 0.0);
        assert!(approx(turbidity_gauge_pct(92.0), 61.333333333333336));
        assert_eq!(turbidity_gauge_pct(300.0), 100.0);

        assert_eq!(turbidity_band(110.0), TurbidityBand::High);
        assert_eq!(turbidity_band(100.0), TurbidityBand::Elevated);
        assert_eq!(turbidity_band(85.0), TurbidityBand::Elevated);
        assert_eq!(turbidity_band(80.0), TurbidityBand::Normal);
    }

    #[test]
    fn test_formatting_two_decimals_with_units() {
        // ---
        assert_eq!(format_ntu(92.0), "92.00 NTU");
        assert_eq!(format_percent(72.456), "72.46%");
        assert_eq!(format_flow(180.0), "180.00 L/min");
        assert_eq!(format_days(5.2), "5.20 days");
        assert_eq!(format_days(f64::NAN), "0.00 days");
    }

    #[test]
    fn test_derive_metrics_for_reference_reading() {
        // ---
        let sample = create_test_sample(92.0, 180.0);
        let prediction = create_test_prediction(5.2);

        let metrics = derive_metrics(&sample, &prediction);

        assert!(approx(metrics.choke_level_pct, 48.0));
        assert_eq!(metrics.alert_level, AlertLevel::Normal);
        assert!(!metrics.choke_hot);
        assert_eq!(metrics.turbidity_band, TurbidityBand::Elevated);
        assert_eq!(metrics.flow_gauge_pct, 72.0);
        assert_eq!(metrics.formatted["choke_level"], "48.00%");
        assert_eq!(metrics.formatted["turbidity"], "92.00 NTU");
        assert_eq!(metrics.formatted["tds"], "72.00%");
        assert_eq!(metrics.formatted["flow2"], "0.00 L/min");
        assert_eq!(metrics.formatted["predicted_days"], "5.20 days");
    }

    #[test]
    fn test_derive_metrics_for_error_sentinel() {
        // ---
        let sample = create_test_sample(50.0, 100.0);
        let metrics = derive_metrics(&sample, &Prediction::error_sentinel());

        assert_eq!(metrics.choke_level_pct, 100.0);
        assert_eq!(metrics.alert_level, AlertLevel::Critical);
        assert!(metrics.choke_hot);
    }
}
