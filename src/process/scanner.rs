//! Process discovery under the proc root.

use std::fs;
use std::path::Path;

use crate::error::SampleError;

/// Lists every entry under `root` whose name starts with an ASCII digit.
///
/// Unlike per-pid reads, failing to read `root` itself is fatal for the cycle.
pub fn collect_pids(root: &Path) -> Result<Vec<String>, SampleError> {
    let entries = fs::read_dir(root).map_err(|source| SampleError::Enumeration {
        root: root.to_path_buf(),
        source,
    })?;

    let mut pids = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| SampleError::Enumeration {
            root: root.to_path_buf(),
            source,
        })?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.starts_with(|c: char| c.is_ascii_digit()) {
            pids.push(name.to_string());
        }
    }
    Ok(pids)
}
