//! Service alert snapshot inspector.
//!
//! Opens the configured snapshot, checks the rebuilt indexes, logs
//! registry statistics, and prints matching alerts as JSON.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `SERVICE_ALERTS_SNAPSHOT_PATH`: snapshot file to open (required to see anything)
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: pretty)
//!
//! ## Usage
//!
//! ```bash
//! alert_registry                 # all alerts
//! alert_registry 10              # alerts on line 10
//! alert_registry 10 0            # alerts on line 10, direction 0
//! ```

use std::time::Instant;

use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use service_alerts::{AlertQuery, AlertRegistry, RegistryConfig};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "alert_registry=info,service_alerts=info".into());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let line = args.next();
    let direction = args.next();

    let config = RegistryConfig::from_env();
    info!(
        persistent = config.is_persistent(),
        path = ?config.snapshot_path(),
        "registry configuration"
    );
    let start = Instant::now();
    let registry = AlertRegistry::open(config);
    let stats = registry.stats();

    info!(
        alerts = stats.alert_count,
        line_keys = stats.line_keys,
        line_direction_keys = stats.line_direction_keys,
        latency_ms = start.elapsed().as_millis() as u64,
        "snapshot opened"
    );

    if let Err(e) = registry.check_indexes() {
        error!(error = %e, "index check failed");
        return Err(e.into());
    }

    let alerts = match (line.as_deref(), direction.as_deref()) {
        (Some(line), Some(direction)) => registry.find_by_line_and_direction(line, direction),
        (Some(line), None) => registry.find_by_line(line),
        _ => registry.list_all(&AlertQuery::all()).alerts,
    };

    info!(matched = alerts.len(), "query complete");
    println!("{}", serde_json::to_string_pretty(&alerts)?);

    Ok(())
}
