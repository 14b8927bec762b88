//! Process-related modules for reading per-process memory from the proc root.
//!
//! This module provides:
//! - `memory`: smaps parsing and RSS/PSS/USS aggregation
//! - `probe`: building one `ProcessRecord` per pid
//! - `scanner`: pid discovery

pub mod memory;
pub mod probe;
pub mod scanner;

// Re-export commonly used types
pub use memory::{aggregate, memory_totals, parse_or_zero, parse_smaps, Mappings, MemoryTotals};
pub use probe::{is_kernel_process, parse_stat_name, probe_process, ProcessRecord};
pub use scanner::collect_pids;
