//! Health check endpoint handler.
//!
//! This module provides the `/health` endpoint handler that returns
//! sampler status and internal statistics as plain text.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::{debug, instrument};

use crate::state::SharedState;

// Time conversion constants
const SECONDS_PER_HOUR: f64 = 3600.0;
const MINUTES_PER_HOUR: f64 = 60.0;
const HOURS_PER_DAY: f64 = 24.0;

/// Handler for the /health endpoint.
///
/// Reports 503 until the first sampling cycle has completed.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /health request");
    state.health_stats.record_http_request();

    let status = state.table.status();
    let (code, message) = match status.last_updated {
        Some(_) => (StatusCode::OK, "OK"),
        None => (StatusCode::SERVICE_UNAVAILABLE, "Waiting for first sampling cycle"),
    };

    let uptime_hours = state.start_time.elapsed().as_secs_f64() / SECONDS_PER_HOUR;
    let uptime_str = if uptime_hours < 1.0 {
        format!("{:.1} minutes", uptime_hours * MINUTES_PER_HOUR)
    } else if uptime_hours < HOURS_PER_DAY {
        format!("{:.1} hours", uptime_hours)
    } else {
        format!("{:.1} days", uptime_hours / HOURS_PER_DAY)
    };

    let table = state.health_stats.render_table();
    let version = env!("CARGO_PKG_VERSION");
    let built = env!("VERGEN_BUILD_TIMESTAMP");

    debug!("Health check: {} - {}", code, message);
    (
        code,
        [("Content-Type", "text/plain; charset=utf-8")],
        format!(
            "{message}\n\nmemchart {version} (built {built})\nUptime: {uptime_str}\n\
             Tracked processes: {}\nCompleted cycles: {}\n\n{table}",
            status.processes, status.cycles
        ),
    )
}
