//! Application state management for memchart.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers. The sampler holds its own handle on the same table.

use memchart::health_stats::HealthStats;
use memchart::SnapshotTable;
use prometheus::Registry;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::metrics::ProcessMetrics;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// State shared across requests.
pub struct AppState {
    /// Read-only for handlers; only the sampler writes it.
    pub table: Arc<SnapshotTable>,
    pub config: Arc<Config>,
    pub registry: Registry,
    pub metrics: ProcessMetrics,
    pub health_stats: Arc<HealthStats>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}
