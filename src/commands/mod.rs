//! CLI command implementations for memchart.
//!
//! - `check`: proc access and parsing validation

pub mod check;

// Re-export command functions
pub use check::command_check;
