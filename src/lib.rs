//! memchart: per-process memory snapshots from `/proc/<pid>/smaps`.
//!
//! The library holds the snapshot engine: the smaps parser and aggregator,
//! the per-pid prober, the lock-guarded snapshot table, the sampler that
//! reconciles it, and the JSON/CSV exporters. The `memchart` binary wraps it
//! with a CLI, configuration, logging and an HTTP surface.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use memchart::{ExportFormat, Sampler, SamplerSettings, SnapshotTable};
//!
//! let table = Arc::new(SnapshotTable::new());
//! let sampler = Sampler::new(table, SamplerSettings::default());
//! sampler
//!     .run_once(ExportFormat::Csv, &mut std::io::stdout())
//!     .expect("sampling failed");
//! ```

pub mod cache;
pub mod error;
pub mod export;
pub mod health_stats;
pub mod process;
pub mod sampler;

// Re-export main types for convenience
pub use cache::{SnapshotTable, SnapshotView, TableChange};
pub use error::{ProbeError, SampleError};
pub use export::{capture_timestamp, render_csv, render_json, ExportFormat, CSV_HEADER};
pub use process::{MemoryTotals, ProcessRecord};
pub use sampler::{CycleReport, Sampler, SamplerSettings};
