//! Integration tests for health stats module.
//!
//! These tests verify that HealthStats starts empty and that a sampler wired
//! to it records cycles and per-pid outcomes.

use memchart::health_stats::HealthStats;
use memchart::{Sampler, SamplerSettings, SnapshotTable};
use std::fs;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[test]
fn test_health_stats_initialize_empty() {
    let stats = HealthStats::new();

    let (cur, avg, _, _, count) = stats.tracked_processes.snapshot();
    assert_eq!(count, 0);
    assert_eq!(cur, 0.0);
    assert_eq!(avg, 0.0);

    assert_eq!(stats.cycle_success_count.load(Ordering::Relaxed), 0);
    assert_eq!(stats.vanished_processes.load(Ordering::Relaxed), 0);
    assert_eq!(stats.proc_read_errors.load(Ordering::Relaxed), 0);
    assert_eq!(stats.get_cycle_success_rate(), 100.0);
    assert_eq!(stats.get_last_cycle_age_str(), "N/A");
}

#[test]
fn test_sampler_records_into_health_stats() {
    let dir = tempfile::tempdir().unwrap();
    let proc_dir = dir.path().join("12");
    fs::create_dir(&proc_dir).unwrap();
    fs::write(proc_dir.join("cmdline"), b"/usr/bin/top\0").unwrap();
    fs::write(
        proc_dir.join("smaps"),
        "00400000-00401000 r-xp 00000000 08:01 1 /usr/bin/top\nRss: 8 kB\nPss: 8 kB\n",
    )
    .unwrap();
    fs::write(proc_dir.join("stat"), "12 (top) S 1").unwrap();

    let stats = Arc::new(HealthStats::new());
    let sampler = Sampler::with_stats(
        Arc::new(SnapshotTable::new()),
        SamplerSettings {
            proc_root: dir.path().to_path_buf(),
            pids: vec!["12".into(), "13".into()],
            ..SamplerSettings::default()
        },
        Arc::clone(&stats),
    );

    sampler.run_cycle().unwrap();

    assert_eq!(stats.cycle_success_count.load(Ordering::Relaxed), 1);
    assert_eq!(stats.cycle_failure_count.load(Ordering::Relaxed), 0);
    // pid 13 has no directory.
    assert_eq!(stats.vanished_processes.load(Ordering::Relaxed), 1);

    let (tracked, _, _, _, count) = stats.tracked_processes.snapshot();
    assert_eq!(count, 1);
    assert_eq!(tracked, 1.0);

    let (_, _, _, _, probes) = stats.probe_duration_ms.snapshot();
    assert_eq!(probes, 2);
    assert_ne!(stats.get_last_cycle_age_str(), "N/A");
}

#[test]
fn test_enumeration_failure_lowers_success_rate() {
    let dir = tempfile::tempdir().unwrap();
    let stats = Arc::new(HealthStats::new());
    let sampler = Sampler::with_stats(
        Arc::new(SnapshotTable::new()),
        SamplerSettings {
            proc_root: dir.path().to_path_buf(),
            ..SamplerSettings::default()
        },
        Arc::clone(&stats),
    );
    sampler.run_cycle().unwrap();

    let broken = Sampler::with_stats(
        Arc::new(SnapshotTable::new()),
        SamplerSettings {
            proc_root: dir.path().join("missing"),
            ..SamplerSettings::default()
        },
        Arc::clone(&stats),
    );
    assert!(broken.run_cycle().is_err());

    assert_eq!(stats.get_cycle_success_rate(), 50.0);
}

#[test]
fn test_render_table_sections() {
    let stats = HealthStats::new();
    stats.record_cycle(3, 0.25);
    stats.record_http_request();

    let table = stats.render_table();
    assert!(table.contains("SAMPLING"));
    assert!(table.contains("PROBE OUTCOMES"));
    assert!(table.contains("HTTP SERVER"));
    assert!(table.contains("tracked_processes"));
    assert!(table.contains("completed_cycles"));
}
