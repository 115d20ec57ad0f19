//! Dashboard state container.
//!
//! One task owns the [`DashboardSnapshot`] and applies every change through
//! [`DashboardSnapshot::apply`]. The two polling cycles never touch it
//! directly; each holds a typed writer that can only send the updates for
//! the fields that cycle owns:
//! - [`HealthWriter`] writes `connection`
//! - [`DataWriter`] writes `sample`, `prediction` and `cycle`
//!
//! Readers get an immutable copy through a `watch` channel.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::metrics::{derive_metrics, DerivedMetrics};
use crate::models::{
    ConnectionState, FetchCycleState, Prediction, SensorSample, DISCONNECTED_MESSAGE,
};

// ---

/// Everything the presentation layer renders, as of the last applied update.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    // ---
    pub connection: ConnectionState,
    pub sample: Option<SensorSample>,
    pub prediction: Option<Prediction>,
    pub cycle: FetchCycleState,
}

/// Changes the data cycle may make.
#[derive(Debug, Clone, PartialEq)]
pub enum DataUpdate {
    /// Firing skipped because the backend is not connected.
    Disconnected,
    /// Firing started: loading on, previous error cleared.
    Started,
    SampleReceived(SensorSample),
    PredictionReceived(Prediction),
    /// Sensor or prediction fetch failed with this message.
    Failed(String),
    /// Firing over: loading off.
    Finished,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StateUpdate {
    Connection(ConnectionState),
    Data(DataUpdate),
}

impl DashboardSnapshot {
    /// Metrics for the current sample and prediction, once both exist.
    pub fn derived(&self) -> Option<DerivedMetrics> {
        match (&self.sample, &self.prediction) {
            (Some(sample), Some(prediction)) => Some(derive_metrics(sample, prediction)),
            _ => None,
        }
    }

    /// Apply one update. `now` stamps a received sample.
    pub fn apply(&mut self, update: StateUpdate, now: DateTime<Utc>) {
        // ---
        match update {
            StateUpdate::Connection(state) => self.connection = state,
            StateUpdate::Data(DataUpdate::Disconnected) => {
                self.cycle.last_error = Some(DISCONNECTED_MESSAGE.to_string());
            }
            StateUpdate::Data(DataUpdate::Started) => {
                self.cycle.is_loading = true;
                self.cycle.last_error = None;
            }
            StateUpdate::Data(DataUpdate::SampleReceived(sample)) => {
                self.sample = Some(sample);
                // Keep the stamp strictly increasing even if the clock stalls
                let stamp = match self.cycle.last_update {
                    Some(prev) if now <= prev => prev + chrono::Duration::microseconds(1),
                    _ => now,
                };
                self.cycle.last_update = Some(stamp);
            }
            StateUpdate::Data(DataUpdate::PredictionReceived(prediction)) => {
                self.prediction = Some(prediction);
            }
            StateUpdate::Data(DataUpdate::Failed(message)) => {
                self.cycle.last_error = Some(message);
                self.prediction = Some(Prediction::error_sentinel());
                self.cycle.is_loading = false;
            }
            StateUpdate::Data(DataUpdate::Finished) => {
                self.cycle.is_loading = false;
            }
        }
    }
}

// ---
// Writers

/// Write handle held by the health cycle.
#[derive(Debug, Clone)]
pub struct HealthWriter {
    tx: mpsc::UnboundedSender<StateUpdate>,
}

impl HealthWriter {
    pub fn set_connection(&self, state: ConnectionState) {
        let _ = self.tx.send(StateUpdate::Connection(state));
    }
}

/// Write handle held by the data cycle.
#[derive(Debug, Clone)]
pub struct DataWriter {
    tx: mpsc::UnboundedSender<StateUpdate>,
}

impl DataWriter {
    pub fn send(&self, update: DataUpdate) {
        // Store gone means we are shutting down
        let _ = self.tx.send(StateUpdate::Data(update));
    }

    /// Mark a firing as started. Loading is switched off again when the
    /// returned guard drops, however the firing ends.
    pub fn begin(&self) -> LoadingGuard {
        self.send(DataUpdate::Started);
        LoadingGuard {
            writer: self.clone(),
        }
    }
}

#[derive(Debug)]
pub struct LoadingGuard {
    writer: DataWriter,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.writer.send(DataUpdate::Finished);
    }
}

// ---
// Store

/// The task that owns the snapshot.
#[derive(Debug)]
pub struct StateStore {
    rx: mpsc::UnboundedReceiver<StateUpdate>,
    snapshot_tx: watch::Sender<DashboardSnapshot>,
}

/// Create the store, one writer per cycle and a snapshot reader.
pub fn channel() -> (
    StateStore,
    HealthWriter,
    DataWriter,
    watch::Receiver<DashboardSnapshot>,
) {
    // ---
    let (tx, rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(DashboardSnapshot::default());

    (
        StateStore { rx, snapshot_tx },
        HealthWriter { tx: tx.clone() },
        DataWriter { tx },
        snapshot_rx,
    )
}

impl StateStore {
    /// Apply updates until `shutdown` fires or every writer is dropped.
    ///
    /// Cancellation is checked before each update, so nothing is applied
    /// once shutdown has been observed.
    pub async fn run(mut self, shutdown: CancellationToken) {
        // ---
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::debug!("State store stopping");
                    break;
                }
                update = self.rx.recv() => match update {
                    Some(update) => {
                        self.snapshot_tx.send_modify(|s| s.apply(update, Utc::now()));
                    }
                    None => break,
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;

    fn create_test_sample(turbidity: f64) -> SensorSample {
        // ---
        SensorSample {
            turbidity,
            tds: 72.0,
            flow1: 180.0,
            flow2: 0.0,
            timestamp: "t".to_string(),
        }
    }

    fn at(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 26, 18, 45, secs).unwrap()
    }

    #[test]
    fn test_disconnected_keeps_previous_readings() {
        // ---
        let mut snap = DashboardSnapshot::default();
        snap.apply(StateUpdate::Data(DataUpdate::SampleReceived(create_test_sample(92.0))), at(0));
        snap.apply(
            StateUpdate::Data(DataUpdate::PredictionReceived(Prediction {
                predicted_days: 5.2,
                alert: false,
                status: "OK".to_string(),
            })),
            at(0),
        );
        let before = snap.clone();

        snap.apply(StateUpdate::Data(DataUpdate::Disconnected), at(5));

        assert_eq!(snap.sample, before.sample);
        assert_eq!(snap.prediction, before.prediction);
        assert_eq!(snap.cycle.last_update, before.cycle.last_update);
        assert_eq!(snap.cycle.last_error.as_deref(), Some("Backend server not connected"));
    }

    #[test]
    fn test_failure_installs_sentinel_and_stops_loading() {
        // ---
        let mut snap = DashboardSnapshot::default();
        snap.apply(StateUpdate::Data(DataUpdate::Started), at(0));
        assert!(snap.cycle.is_loading);

        snap.apply(StateUpdate::Data(DataUpdate::Failed("boom".to_string())), at(0));

        assert!(!snap.cycle.is_loading);
        assert_eq!(snap.cycle.last_error.as_deref(), Some("boom"));
        assert_eq!(snap.prediction, Some(Prediction::error_sentinel()));
    }

    #[test]
    fn test_started_clears_previous_error() {
        // ---
        let mut snap = DashboardSnapshot::default();
        snap.apply(StateUpdate::Data(DataUpdate::Disconnected), at(0));
        snap.apply(StateUpdate::Data(DataUpdate::Started), at(1));
        assert!(snap.cycle.last_error.is_none());
    }

    #[test]
    fn test_sample_stamp_strictly_increases() {
        // ---
        let mut snap = DashboardSnapshot::default();
        snap.apply(StateUpdate::Data(DataUpdate::SampleReceived(create_test_sample(1.0))), at(10));
        let first = snap.cycle.last_update.unwrap();

        // Clock went backwards
        snap.apply(StateUpdate::Data(DataUpdate::SampleReceived(create_test_sample(2.0))), at(5));
        let second = snap.cycle.last_update.unwrap();

        assert!(second > first);
        assert_eq!(snap.sample.as_ref().unwrap().turbidity, 2.0);
    }

    #[test]
    fn test_connection_update_touches_only_connection() {
        // ---
        let mut snap = DashboardSnapshot::default();
        assert_eq!(snap.connection, ConnectionState::Checking);

        snap.apply(StateUpdate::Connection(ConnectionState::Error), at(0));

        assert_eq!(snap.connection, ConnectionState::Error);
        assert_eq!(snap.cycle, FetchCycleState::default());
        assert!(snap.sample.is_none());
        assert!(snap.derived().is_none());
    }

    #[tokio::test]
    async fn test_loading_guard_resets_on_drop() {
        // ---
        let (store, _health, data, mut snapshot) = channel();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(store.run(shutdown.clone()));

        {
            let _guard = data.begin();
            data.send(DataUpdate::Failed("early exit".to_string()));
        }

        snapshot
            .wait_for(|s| s.cycle.last_error.is_some() && !s.cycle.is_loading)
            .await
            .unwrap();

        shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_no_updates_applied_after_shutdown() {
        // ---
        let (store, health, _data, snapshot) = channel();
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        health.set_connection(ConnectionState::Connected);
        store.run(shutdown).await;

        assert_eq!(snapshot.borrow().connection, ConnectionState::Checking);
    }
}
