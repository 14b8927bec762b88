//! HTTP endpoint handlers for memchart.
//!
//! This module provides handlers for all HTTP endpoints:
//! - `/`: JSON snapshot
//! - `/csv`: CSV snapshot
//! - `/health`: Health check endpoint
//! - `/metrics`: Prometheus metrics endpoint

pub mod csv;
pub mod health;
pub mod metrics;
pub mod root;

// Re-export handlers
pub use csv::csv_handler;
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use root::root_handler;
