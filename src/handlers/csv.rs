//! CSV endpoint handler.

use axum::{extract::State, http::header, response::IntoResponse};
use std::time::Instant;
use tracing::{debug, instrument};

use memchart::render_csv;

use crate::state::SharedState;

/// Handler for the `/csv` endpoint.
#[instrument(skip(state))]
pub async fn csv_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let start = Instant::now();
    debug!("Processing /csv request");
    state.health_stats.record_http_request();
    state.health_stats.record_export_call();

    let view = state.table.snapshot_view();
    let body = render_csv(&view);

    state
        .health_stats
        .record_request_duration(start.elapsed().as_secs_f64() * 1000.0);
    debug!("CSV snapshot served: {} processes", view.len());
    ([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], body)
}
