//! The three fixed monitoring junctions along the river, and the advisory
//! line shown for the selected one.

use serde::Serialize;

use crate::metrics::{alert_severity, format_days, AlertLevel};
use crate::models::Prediction;

// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Junction {
    pub id: u8,
    pub name: &'static str,
}

pub const JUNCTIONS: [Junction; 3] = [
    Junction { id: 1, name: "Wazirabad" },
    Junction { id: 2, name: "Nizamuddin" },
    Junction { id: 3, name: "Okhla" },
];

/// Junction selected when the caller does not pick one.
pub const DEFAULT_JUNCTION: u8 = 1;

pub fn find(id: u8) -> Option<&'static Junction> {
    JUNCTIONS.iter().find(|j| j.id == id)
}

impl Junction {
    /// Display label, e.g. `Junction 1 (Wazirabad)`.
    pub fn label(&self) -> String {
        format!("Junction {} ({})", self.id, self.name)
    }
}

/// Advisory text for a junction given its latest prediction.
///
/// The fetch-error sentinel is reported through its own status text rather
/// than as a zero-day forecast.
pub fn advisory(junction: &Junction, prediction: &Prediction) -> String {
    // ---
    if prediction.is_error_sentinel() {
        return prediction.status.clone();
    }

    let days = format_days(prediction.predicted_days);
    match alert_severity(prediction.predicted_days) {
        AlertLevel::Critical => format!(
            "Critical: {} is predicted to clog within {}. Immediate action recommended.",
            junction.label(),
            days
        ),
        AlertLevel::Warning => format!(
            "Warning: {} requires maintenance within {}.",
            junction.label(),
            days
        ),
        AlertLevel::Normal => format!("{} operating normally.", junction.label()),
    }
}
