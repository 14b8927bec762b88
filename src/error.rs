//! Error types for the snapshot engine.
//!
//! Per-pid failures (`ProbeError`) are contained within one sampling cycle.
//! Only `SampleError::Enumeration` is fatal to the caller.

use std::io;
use std::path::PathBuf;

/// Failure to build a record for a single pid.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The pid's directory under the proc root is gone.
    #[error("process {pid} no longer exists")]
    NotFound { pid: String },

    /// Any other read failure (permission denied, races during read).
    #[error("failed to read {file} for process {pid}")]
    Read {
        pid: String,
        file: &'static str,
        #[source]
        source: io::Error,
    },
}

impl ProbeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProbeError::NotFound { .. })
    }
}

/// Failure of a whole sampling cycle.
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("cannot enumerate processes under {}", root.display())]
    Enumeration {
        root: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize snapshot")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write snapshot")]
    Write(#[from] io::Error),

    #[error("sampling task aborted: {0}")]
    Join(String),
}

/// Formats an error followed by each of its sources, separated by `: `.
pub fn display_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_read_error_message_not_repeated() {
        let err = ProbeError::Read {
            pid: "42".into(),
            file: "smaps",
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "failed to read smaps for process 42");
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("denied"));
        assert_eq!(
            display_chain(&err),
            "failed to read smaps for process 42: denied"
        );
    }

    #[test]
    fn test_enumeration_chain() {
        let err = SampleError::Enumeration {
            root: PathBuf::from("/missing"),
            source: io::Error::new(io::ErrorKind::NotFound, "no such directory"),
        };
        assert_eq!(
            display_chain(&err),
            "cannot enumerate processes under /missing: no such directory"
        );
    }

    #[test]
    fn test_not_found_has_no_source() {
        let err = ProbeError::NotFound { pid: "7".into() };
        assert!(err.is_not_found());
        assert_eq!(display_chain(&err), "process 7 no longer exists");
    }
}
