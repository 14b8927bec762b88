//! Builds one `ProcessRecord` from `/proc/<pid>`.
//!
//! Three files are read per pid: `cmdline` (raw bytes), `smaps` (mapping
//! accounting) and `stat` (for the parenthesized process name).

use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;

use crate::error::ProbeError;
use crate::process::memory::memory_totals;

/// One process's identity and aggregated memory usage (kB).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessRecord {
    #[serde(skip)]
    pub cmdline: Vec<u8>,
    pub name: String,
    pub rss: u64,
    pub pss: u64,
    pub uss: u64,
}

/// Kernel threads have an empty command line.
pub fn is_kernel_process(record: &ProcessRecord) -> bool {
    record.cmdline.is_empty()
}

/// Extracts the text strictly between the first `(` and the last `)`.
///
/// Returns an empty name when the pair is missing or out of order.
pub fn parse_stat_name(stat: &str) -> String {
    match (stat.find('('), stat.rfind(')')) {
        (Some(open), Some(close)) if open < close => stat[open + 1..close].to_string(),
        _ => String::new(),
    }
}

/// Reads and aggregates a single process.
pub fn probe_process(proc_root: &Path, pid: &str) -> Result<ProcessRecord, ProbeError> {
    let proc_path = proc_root.join(pid);

    let cmdline = fs::read(proc_path.join("cmdline"))
        .map_err(|e| classify(&proc_path, pid, "cmdline", e))?;
    let smaps = fs::read(proc_path.join("smaps"))
        .map_err(|e| classify(&proc_path, pid, "smaps", e))?;
    let stat = fs::read(proc_path.join("stat"))
        .map_err(|e| classify(&proc_path, pid, "stat", e))?;

    let totals = memory_totals(&String::from_utf8_lossy(&smaps));
    let name = parse_stat_name(&String::from_utf8_lossy(&stat));

    Ok(ProcessRecord {
        cmdline,
        name,
        rss: totals.rss,
        pss: totals.pss,
        uss: totals.uss,
    })
}

/// A read error means the process vanished if the error says so, or if its
/// directory is gone by the time we look.
fn classify(proc_path: &Path, pid: &str, file: &'static str, source: io::Error) -> ProbeError {
    if source.kind() == io::ErrorKind::NotFound || !proc_path.exists() {
        ProbeError::NotFound {
            pid: pid.to_string(),
        }
    } else {
        ProbeError::Read {
            pid: pid.to_string(),
            file,
            source,
        }
    }
}
