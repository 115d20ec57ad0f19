//! Polling and metric derivation core for the RiverRevive water-quality
//! dashboard.
//!
//! The commonly used types are re-exported from this root (EMBP gateway),
//! so callers and `routes/*.rs` rarely need the module paths.
//!
//! - `config`    – environment-driven [`Config`]
//! - `models`    – wire and state types
//! - `metrics`   – pure metric derivation
//! - `junctions` – the three fixed monitoring points
//! - `client`    – [`BackendClient`] for `/health`, `/sensor-data`, `/predict`
//! - `state`     – single-owner snapshot store
//! - `poller`    – health and data cycles
//! - `routes`    – read-only HTTP surface over the snapshot

pub mod client;
pub mod config;
pub mod junctions;
pub mod metrics;
pub mod models;
pub mod poller;
pub mod routes;
pub mod state;

pub use client::{BackendClient, FetchError};
pub use config::Config;
pub use metrics::{alert_severity, choke_level, derive_metrics, AlertLevel, DerivedMetrics};
pub use models::{ConnectionState, FetchCycleState, Prediction, SensorSample};
pub use poller::{Poller, PollerHandle};
pub use state::DashboardSnapshot;
