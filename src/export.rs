//! JSON and CSV renderings of a snapshot view.

use serde::Serialize;
use std::fmt::Write as FmtWrite;
use std::str::FromStr;

use crate::cache::SnapshotView;

/// Column order of the CSV export. USS comes before PSS.
pub const CSV_HEADER: &str = "pid,name,rss,uss,pss";

/// Output format of a one-shot dump.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!("unknown export format '{other}'")),
        }
    }
}

#[derive(Serialize)]
struct Snapshot<'a> {
    time: &'a str,
    pids: &'a SnapshotView,
}

/// Wall-clock capture time in the `hh:mm:ss` (12-hour) form used by the JSON export.
pub fn capture_timestamp() -> String {
    chrono::Local::now().format("%I:%M:%S").to_string()
}

/// Renders the view as an indented JSON document.
pub fn render_json(view: &SnapshotView, timestamp: &str) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&Snapshot {
        time: timestamp,
        pids: view,
    })
}

/// Renders the view as CSV with a header row.
pub fn render_csv(view: &SnapshotView) -> String {
    let mut out = String::with_capacity(64 * (view.len() + 1));
    writeln!(out, "{CSV_HEADER}").ok();
    for (pid, record) in view.iter() {
        writeln!(
            out,
            "{},{},{},{},{}",
            csv_field(pid),
            csv_field(&record.name),
            record.rss,
            record.uss,
            record.pss
        )
        .ok();
    }
    out
}

/// Quotes a field when it would otherwise break the row.
fn csv_field(field: &str) -> String {
    let needs_quotes = field.starts_with(' ') || field.contains([',', '"', '\r', '\n']);
    if needs_quotes {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessRecord;

    fn view() -> SnapshotView {
        [
            ("42", "bash", 100, 60, 50),
            ("7", "tmux: server", 40, 30, 20),
        ]
        .into_iter()
        .map(|(pid, name, rss, pss, uss)| {
            (
                pid.to_string(),
                ProcessRecord {
                    cmdline: b"x\0".to_vec(),
                    name: name.to_string(),
                    rss,
                    pss,
                    uss,
                },
            )
        })
        .collect()
    }

    #[test]
    fn test_render_csv_column_order() {
        let csv = render_csv(&view());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "pid,name,rss,uss,pss");
        assert_eq!(lines[1], "7,tmux: server,40,20,30");
        assert_eq!(lines[2], "42,bash,100,50,60");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_render_csv_empty() {
        assert_eq!(render_csv(&SnapshotView::default()), "pid,name,rss,uss,pss\n");
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("bash"), "bash");
        assert_eq!(csv_field(""), "");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field(" lead"), "\" lead\"");
    }

    #[test]
    fn test_render_json() {
        let json = render_json(&view(), "03:04:05").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["time"], "03:04:05");
        assert_eq!(value["pids"]["42"]["name"], "bash");
        assert_eq!(value["pids"]["42"]["rss"], 100);
        assert_eq!(value["pids"]["42"]["pss"], 60);
        assert_eq!(value["pids"]["42"]["uss"], 50);
        assert!(value["pids"]["42"].get("cmdline").is_none());
        // Indented output
        assert!(json.contains("\n  \"pids\""));
    }

    #[test]
    fn test_export_format_from_str() {
        assert_eq!("csv".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
        assert_eq!("JSON".parse::<ExportFormat>(), Ok(ExportFormat::Json));
        assert!("xml".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_capture_timestamp_shape() {
        let ts = capture_timestamp();
        assert_eq!(ts.len(), 8);
        assert_eq!(ts.matches(':').count(), 2);
    }
}
