//! Application entry point for the `riverrevive-monitor` service.
//!
//! Startup sequence:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Spawning the poller (health and data cycles against the backend)
//! - Serving the read-only snapshot routes until Ctrl-C
//!
//! # Environment Variables
//! - `BACKEND_URL` (optional) – backend base URL (default: `http://localhost:8000`)
//! - `HEALTH_INTERVAL_SECS`, `DATA_INTERVAL_SECS`, `HTTP_TIMEOUT_SECS` (optional)
//! - `MONITOR_BIND_ADDR` (optional) – snapshot server address (default: `0.0.0.0:8080`)
//! - `MONITOR_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `MONITOR_SPAN_EVENTS` (optional) – span event mode for tracing
use std::{env, io::IsTerminal};

use anyhow::{anyhow, Result};
use axum::Router;
use dotenvy::dotenv;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use riverrevive_monitor::{config, routes, BackendClient, Poller};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let client = BackendClient::from_config(&cfg)
        .map_err(|e| anyhow!("Failed to build HTTP client for '{}': {}", cfg.backend_url, e))?;

    let poller = Poller::from_config(client, &cfg).spawn();
    let shutdown = poller.shutdown_token();

    let app: Router = routes::router(poller.subscribe());

    tracing::info!("Listening on {}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(cfg.bind_addr).await?;

    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Ctrl-C received, shutting down"),
            Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
        }
        signal.cancel();
    });

    let serve_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { serve_shutdown.cancelled().await })
        .await?;

    poller.stop().await;

    Ok(())
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `MONITOR_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by `RUST_LOG`, falling back to `MONITOR_LOG_LEVEL`
///
/// Called once at startup, before any logging macros are invoked.
fn init_tracing() {
    // ---
    let span_events = match env::var("MONITOR_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("MONITOR_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},hyper=warn,reqwest=warn"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
