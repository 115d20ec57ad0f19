//! Polling orchestrator.
//!
//! Runs two independent periodic cycles against the backend:
//! - **health** (default every 30s): probes `/health` and records the
//!   connection state
//! - **data** (default every 5s): gated on the connection state, fetches a
//!   sensor sample and then its prediction
//!
//! Each cycle runs in its own task, so a slow sensor fetch never delays a
//! health probe. Both cycles report through their [`state`](crate::state)
//! writer to a single store task. All three tasks share one
//! `CancellationToken`; [`PollerHandle::stop`] cancels it and joins them, so
//! the snapshot is frozen once `stop` returns.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::BackendClient;
use crate::models::ConnectionState;
use crate::state::{self, DashboardSnapshot, DataUpdate, DataWriter, HealthWriter};
use crate::Config;

// ---

/// Configured but not yet running poller.
#[derive(Debug, Clone)]
pub struct Poller {
    // ---
    client: BackendClient,
    health_interval: Duration,
    data_interval: Duration,
}

/// Handle to a running poller.
#[derive(Debug)]
pub struct PollerHandle {
    // ---
    snapshot: watch::Receiver<DashboardSnapshot>,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Poller {
    pub fn new(client: BackendClient, health_interval: Duration, data_interval: Duration) -> Self {
        Poller {
            client,
            health_interval,
            data_interval,
        }
    }

    pub fn from_config(client: BackendClient, config: &Config) -> Self {
        Self::new(client, config.health_interval, config.data_interval)
    }

    /// Start the store and both cycles under a fresh shutdown token.
    pub fn spawn(self) -> PollerHandle {
        self.spawn_with_shutdown(CancellationToken::new())
    }

    /// Start the store and both cycles. Cancelling `shutdown` (or any parent
    /// of it) stops all three tasks.
    pub fn spawn_with_shutdown(self, shutdown: CancellationToken) -> PollerHandle {
        // ---
        let (store, health_writer, data_writer, snapshot) = state::channel();

        info!(
            "Starting poller against {} (health every {:?}, data every {:?})",
            self.client.base_url(),
            self.health_interval,
            self.data_interval
        );

        let tasks = vec![
            tokio::spawn(store.run(shutdown.clone())),
            tokio::spawn(run_health_cycle(
                self.client.clone(),
                health_writer,
                self.health_interval,
                shutdown.clone(),
            )),
            tokio::spawn(run_data_cycle(
                self.client,
                data_writer,
                snapshot.clone(),
                self.data_interval,
                shutdown.clone(),
            )),
        ];

        PollerHandle {
            snapshot,
            shutdown,
            tasks,
        }
    }
}

impl PollerHandle {
    /// Copy of the current dashboard state.
    pub fn snapshot(&self) -> DashboardSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver that is notified on every applied update.
    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshot.clone()
    }

    /// Token that stops the poller when cancelled. Other shutdown-aware
    /// tasks can share it.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Cancel both cycles and the store, then wait for them to exit.
    ///
    /// The snapshot is frozen as of the last update the store applied. A
    /// firing cut off mid-flight leaves `cycle.is_loading == true` in that
    /// frozen copy; it does not mean a load is still running.
    pub async fn stop(self) {
        // ---
        self.shutdown.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("Poller task ended abnormally: {}", e);
            }
        }
        info!("Poller stopped");
    }
}

// ---
// Single firings

/// One health probe. Returns the state it recorded.
pub async fn health_firing(client: &BackendClient, writer: &HealthWriter) -> ConnectionState {
    // ---
    let state = if client.check_health().await {
        ConnectionState::Connected
    } else {
        ConnectionState::Error
    };
    writer.set_connection(state);
    state
}

/// One data firing: sensor fetch strictly before prediction fetch.
///
/// Skipped with the disconnected message unless `connection` is
/// `Connected`. Every failure is turned into a [`DataUpdate::Failed`];
/// nothing propagates to the caller.
pub async fn data_firing(client: &BackendClient, connection: ConnectionState, writer: &DataWriter) {
    // ---
    if connection != ConnectionState::Connected {
        debug!("Data firing skipped, backend is {:?}", connection);
        writer.send(DataUpdate::Disconnected);
        return;
    }

    let _loading = writer.begin();

    let sample = match client.fetch_sensor_data().await {
        Ok(sample) => sample,
        Err(e) => {
            warn!("Sensor fetch failed: {}", e);
            writer.send(DataUpdate::Failed(e.to_string()));
            return;
        }
    };
    debug!(
        "Sensor sample: turbidity={} tds={} flow1={} flow2={} at {}",
        sample.turbidity, sample.tds, sample.flow1, sample.flow2, sample.timestamp
    );
    writer.send(DataUpdate::SampleReceived(sample.clone()));

    match client.fetch_prediction(&sample).await {
        Ok(prediction) => {
            debug!(
                "Prediction: {} days, alert={}, status={}",
                prediction.predicted_days, prediction.alert, prediction.status
            );
            writer.send(DataUpdate::PredictionReceived(prediction));
        }
        Err(e) => {
            warn!("Prediction fetch failed: {}", e);
            writer.send(DataUpdate::Failed(e.to_string()));
        }
    }
}

// ---
// Cycles

fn ticker(period: Duration) -> tokio::time::Interval {
    // First tick completes immediately
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

async fn run_health_cycle(
    client: BackendClient,
    writer: HealthWriter,
    period: Duration,
    shutdown: CancellationToken,
) {
    // ---
    let mut ticker = ticker(period);
    let mut previous = ConnectionState::Checking;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let state = tokio::select! {
            _ = shutdown.cancelled() => break,
            state = health_firing(&client, &writer) => state,
        };

        if state != previous {
            match state {
                ConnectionState::Connected => info!("Backend connected at {}", client.base_url()),
                _ => warn!("Backend unreachable at {}", client.base_url()),
            }
            previous = state;
        }
    }

    debug!("Health cycle stopped");
}

async fn run_data_cycle(
    client: BackendClient,
    writer: DataWriter,
    mut snapshot: watch::Receiver<DashboardSnapshot>,
    period: Duration,
    shutdown: CancellationToken,
) {
    // ---
    // Give the first health probe one period to report before the first
    // firing, so startup does not flash the disconnected message.
    let first_probe = snapshot.wait_for(|s| s.connection != ConnectionState::Checking);
    tokio::select! {
        _ = shutdown.cancelled() => return,
        _ = tokio::time::timeout(period, first_probe) => {}
    }

    let mut ticker = ticker(period);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let connection = snapshot.borrow().connection;

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = data_firing(&client, connection, &writer) => {}
        }
    }

    debug!("Data cycle stopped");
}
