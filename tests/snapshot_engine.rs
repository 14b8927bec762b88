//! Integration tests for the snapshot engine.
//!
//! These tests build a fake proc tree in a temporary directory and drive the
//! sampler through several cycles, checking table reconciliation and that the
//! JSON and CSV renderings agree.

use memchart::{
    render_csv, render_json, ExportFormat, Sampler, SamplerSettings, SnapshotTable, CSV_HEADER,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn write_process(root: &Path, pid: &str, name: &str, cmdline: &[u8], smaps: &str) {
    let dir = root.join(pid);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("cmdline"), cmdline).unwrap();
    fs::write(dir.join("smaps"), smaps).unwrap();
    fs::write(dir.join("stat"), format!("{pid} ({name}) S 1 {pid} {pid} 0")).unwrap();
}

const CAT_SMAPS: &str = "\
00400000-0040b000 r-xp 00000000 08:01 1234 /bin/cat
Size:                 44 kB
Rss:                   4 kB
Pss:                   2 kB
Shared_Clean:          0 kB
Shared_Dirty:          0 kB
Private_Clean:         4 kB
Private_Dirty:         0 kB
VmFlags: rd ex mr mw me dw
";

const SHELL_SMAPS: &str = "\
00400000-004f0000 r-xp 00000000 08:01 99 /bin/bash
Rss:                 900 kB
Pss:                 300 kB
Private_Clean:       100 kB
Private_Dirty:        50 kB
7ffd1000-7ffd2000 rw-p 00000000 00:00 0 [stack]
Rss:                  12 kB
Pss:                  12 kB
Private_Clean:         0 kB
Private_Dirty:        12 kB
";

fn sampler_for(root: &Path) -> Sampler {
    Sampler::new(
        Arc::new(SnapshotTable::new()),
        SamplerSettings {
            proc_root: root.to_path_buf(),
            ..SamplerSettings::default()
        },
    )
}

#[test]
fn test_cycle_aggregates_each_process() {
    let dir = tempfile::tempdir().unwrap();
    write_process(dir.path(), "100", "cat", b"cat\0/etc/hosts\0", CAT_SMAPS);
    write_process(dir.path(), "200", "bash", b"-bash\0", SHELL_SMAPS);

    let sampler = sampler_for(dir.path());
    sampler.run_cycle().unwrap();

    let view = sampler.table().snapshot_view();
    let cat = view.get("100").unwrap();
    assert_eq!((cat.rss, cat.pss, cat.uss), (4, 2, 4));
    assert_eq!(cat.name, "cat");

    let bash = view.get("200").unwrap();
    assert_eq!((bash.rss, bash.pss, bash.uss), (912, 312, 162));
}

#[test]
fn test_exited_process_is_evicted() {
    let dir = tempfile::tempdir().unwrap();
    write_process(dir.path(), "10", "sshd", b"/usr/sbin/sshd\0", CAT_SMAPS);
    write_process(dir.path(), "11", "cron", b"/usr/sbin/cron\0", CAT_SMAPS);

    let sampler = sampler_for(dir.path());
    sampler.run_cycle().unwrap();
    assert_eq!(sampler.table().len(), 2);

    fs::remove_dir_all(dir.path().join("11")).unwrap();
    let report = sampler.run_cycle().unwrap();

    assert_eq!(report.removed, 1);
    let view = sampler.table().snapshot_view();
    assert!(view.contains("10"));
    assert!(!view.contains("11"));
}

#[test]
fn test_explicit_pid_without_directory_is_evicted() {
    let dir = tempfile::tempdir().unwrap();
    write_process(dir.path(), "7", "redis", b"redis-server\0", CAT_SMAPS);

    let table = Arc::new(SnapshotTable::new());
    let sampler = Sampler::new(
        Arc::clone(&table),
        SamplerSettings {
            proc_root: dir.path().to_path_buf(),
            pids: vec!["7".into()],
            ..SamplerSettings::default()
        },
    );
    sampler.run_cycle().unwrap();
    assert!(table.snapshot_view().contains("7"));

    fs::remove_dir_all(dir.path().join("7")).unwrap();
    sampler.run_cycle().unwrap();
    assert!(table.is_empty());
}

#[test]
fn test_kernel_threads_never_enter_table() {
    let dir = tempfile::tempdir().unwrap();
    write_process(dir.path(), "2", "kthreadd", b"", "");
    write_process(dir.path(), "3", "rcu_gp", b"", CAT_SMAPS);
    write_process(dir.path(), "400", "cat", b"cat\0", CAT_SMAPS);

    let sampler = sampler_for(dir.path());
    let report = sampler.run_cycle().unwrap();

    assert_eq!(report.kernel_skipped, 2);
    let view = sampler.table().snapshot_view();
    assert_eq!(view.len(), 1);
    assert!(view.contains("400"));
}

#[test]
fn test_read_error_keeps_stale_record() {
    let dir = tempfile::tempdir().unwrap();
    write_process(dir.path(), "55", "postgres", b"postgres\0", CAT_SMAPS);

    let sampler = sampler_for(dir.path());
    sampler.run_cycle().unwrap();

    // A directory where a file is expected fails to read, but the pid still exists.
    let cmdline = dir.path().join("55").join("cmdline");
    fs::remove_file(&cmdline).unwrap();
    fs::create_dir(&cmdline).unwrap();
    fs::write(dir.path().join("55").join("smaps"), SHELL_SMAPS).unwrap();

    let report = sampler.run_cycle().unwrap();
    assert_eq!(report.read_errors, 1);
    assert_eq!(report.removed, 0);

    let view = sampler.table().snapshot_view();
    let record = view.get("55").unwrap();
    assert_eq!((record.rss, record.pss, record.uss), (4, 2, 4));
}

#[test]
fn test_json_and_csv_agree() {
    let dir = tempfile::tempdir().unwrap();
    write_process(dir.path(), "100", "cat", b"cat\0", CAT_SMAPS);
    write_process(dir.path(), "9", "tmux: server", b"tmux\0", SHELL_SMAPS);

    let sampler = sampler_for(dir.path());
    sampler.run_cycle().unwrap();
    let view = sampler.table().snapshot_view();

    let json: serde_json::Value =
        serde_json::from_str(&render_json(&view, "01:02:03").unwrap()).unwrap();
    let csv = render_csv(&view);
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some(CSV_HEADER));

    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), json["pids"].as_object().unwrap().len());

    // pid 9 sorts before pid 100.
    assert_eq!(rows[0], "9,tmux: server,912,162,312");
    assert_eq!(rows[1], "100,cat,4,4,2");

    for row in rows {
        let fields: Vec<&str> = row.split(',').collect();
        let entry = &json["pids"][fields[0]];
        assert_eq!(entry["name"], fields[1]);
        assert_eq!(entry["rss"].to_string(), fields[2]);
        assert_eq!(entry["uss"].to_string(), fields[3]);
        assert_eq!(entry["pss"].to_string(), fields[4]);
    }
    assert_eq!(json["time"], "01:02:03");
}

#[test]
fn test_rendering_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write_process(dir.path(), "31", "nginx", b"nginx\0", SHELL_SMAPS);
    write_process(dir.path(), "4", "cat", b"cat\0", CAT_SMAPS);

    let sampler = sampler_for(dir.path());
    sampler.run_cycle().unwrap();

    let first = sampler.table().snapshot_view();
    let second = sampler.table().snapshot_view();
    assert_eq!(render_csv(&first), render_csv(&second));
    assert_eq!(
        render_json(&first, "12:00:00").unwrap(),
        render_json(&second, "12:00:00").unwrap()
    );
}

#[test]
fn test_run_once_csv_output() {
    let dir = tempfile::tempdir().unwrap();
    write_process(dir.path(), "100", "cat", b"cat\0", CAT_SMAPS);

    let sampler = sampler_for(dir.path());
    let mut out = Vec::new();
    let report = sampler.run_once(ExportFormat::Csv, &mut out).unwrap();

    assert_eq!(report.upserted, 1);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        format!("{CSV_HEADER}\n100,cat,4,4,2\n")
    );
}

#[test]
fn test_empty_cmdline_ignored_even_if_previously_tracked() {
    let dir = tempfile::tempdir().unwrap();
    write_process(dir.path(), "77", "worker", b"worker\0", CAT_SMAPS);

    let sampler = sampler_for(dir.path());
    sampler.run_cycle().unwrap();

    // A zombie reports an empty cmdline; its existing record is left as is.
    fs::write(dir.path().join("77").join("cmdline"), b"").unwrap();
    let report = sampler.run_cycle().unwrap();

    assert_eq!(report.kernel_skipped, 1);
    assert!(sampler.table().snapshot_view().contains("77"));
}
