//! Root endpoint handler serving the JSON snapshot.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::time::Instant;
use tracing::{debug, error, instrument};

use memchart::{capture_timestamp, render_json};

use crate::state::SharedState;

/// Handler for the root `/` endpoint.
#[instrument(skip(state))]
pub async fn root_handler(State(state): State<SharedState>) -> Response {
    let start = Instant::now();
    debug!("Processing / request");
    state.health_stats.record_http_request();
    state.health_stats.record_export_call();

    let view = state.table.snapshot_view();
    let response = match render_json(&view, &capture_timestamp()) {
        Ok(mut body) => {
            body.push('\n');
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                body,
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to serialize snapshot: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to serialize snapshot",
            )
                .into_response()
        }
    };

    state
        .health_stats
        .record_request_duration(start.elapsed().as_secs_f64() * 1000.0);
    debug!("JSON snapshot served: {} processes", view.len());
    response
}
