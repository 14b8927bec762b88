//! Sampling cycles: enumerate pids, probe each, reconcile the snapshot table.
//!
//! A cycle can run once (the CLI dump path) or repeatedly on a fixed period
//! (the service path). Per-pid failures never abort a cycle; only failing to
//! enumerate the proc root does.

use ahash::AHashSet;
use rayon::prelude::*;
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

use crate::cache::{SnapshotTable, TableChange};
use crate::error::{display_chain, ProbeError, SampleError};
use crate::export::{capture_timestamp, render_csv, render_json, ExportFormat};
use crate::health_stats::HealthStats;
use crate::process::{collect_pids, is_kernel_process, probe_process};

pub const DEFAULT_PROC_ROOT: &str = "/proc";
pub const DEFAULT_INTERVAL_SECS: u64 = 120;

/// Plain values the sampler needs from configuration.
#[derive(Debug, Clone)]
pub struct SamplerSettings {
    pub proc_root: PathBuf,
    pub interval: Duration,
    /// Print CSV to stdout after every cycle.
    pub verbose: bool,
    /// Fixed pids to probe; empty means enumerate the proc root every cycle.
    pub pids: Vec<String>,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from(DEFAULT_PROC_ROOT),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            verbose: false,
            pids: Vec::new(),
        }
    }
}

/// Summary of one reconciliation cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CycleReport {
    pub probed: usize,
    pub upserted: usize,
    pub removed: usize,
    pub kernel_skipped: usize,
    pub read_errors: usize,
    pub duration: Duration,
}

enum ProbeOutcome {
    Change(TableChange),
    Kernel,
    ReadFailed,
}

/// Owns the sampling settings and writes the shared table.
pub struct Sampler {
    table: Arc<SnapshotTable>,
    settings: SamplerSettings,
    stats: Arc<HealthStats>,
}

impl Sampler {
    pub fn new(table: Arc<SnapshotTable>, settings: SamplerSettings) -> Self {
        Self::with_stats(table, settings, Arc::new(HealthStats::new()))
    }

    pub fn with_stats(
        table: Arc<SnapshotTable>,
        settings: SamplerSettings,
        stats: Arc<HealthStats>,
    ) -> Self {
        Self {
            table,
            settings,
            stats,
        }
    }

    pub fn table(&self) -> &Arc<SnapshotTable> {
        &self.table
    }

    fn probe_one(&self, pid: &str) -> ProbeOutcome {
        let parse_start = Instant::now();
        let result = probe_process(&self.settings.proc_root, pid);
        self.stats
            .record_probe_duration_ms(parse_start.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok(record) if is_kernel_process(&record) => {
                debug!("Skipping process {} ({}): kernel thread", pid, record.name);
                ProbeOutcome::Kernel
            }
            Ok(record) => {
                debug!(
                    "Including process {}: {} (RSS: {} kB, PSS: {} kB, USS: {} kB)",
                    pid, record.name, record.rss, record.pss, record.uss
                );
                ProbeOutcome::Change(TableChange::Upsert(pid.to_string(), record))
            }
            Err(ProbeError::NotFound { pid }) => {
                debug!("No process with pid {}", pid);
                self.stats.record_vanished_process();
                ProbeOutcome::Change(TableChange::Remove(pid))
            }
            Err(e) => {
                warn!("{}", display_chain(&e));
                self.stats.record_proc_read_error();
                if let ProbeError::Read { source, .. } = &e {
                    if source.kind() == std::io::ErrorKind::PermissionDenied {
                        self.stats.record_permission_denied();
                    }
                }
                ProbeOutcome::ReadFailed
            }
        }
    }

    /// Runs one enumerate/probe/reconcile cycle.
    #[instrument(skip(self), fields(root = %self.settings.proc_root.display()))]
    pub fn run_cycle(&self) -> Result<CycleReport, SampleError> {
        let start = Instant::now();

        let pids = if self.settings.pids.is_empty() {
            let mut pids = match collect_pids(&self.settings.proc_root) {
                Ok(pids) => pids,
                Err(e) => {
                    self.stats.record_scan_failure();
                    return Err(e);
                }
            };
            // Tracked pids missing from the listing are probed once more so
            // that exited processes leave through the NotFound path.
            let listed: AHashSet<&str> = pids.iter().map(String::as_str).collect();
            let gone: Vec<String> = self
                .table
                .pids()
                .into_iter()
                .filter(|pid| !listed.contains(pid.as_str()))
                .collect();
            pids.extend(gone);
            pids
        } else {
            self.settings.pids.clone()
        };
        debug!("Collected {} pids", pids.len());

        let outcomes: Vec<ProbeOutcome> = pids.par_iter().map(|pid| self.probe_one(pid)).collect();

        let mut report = CycleReport {
            probed: pids.len(),
            ..CycleReport::default()
        };
        let mut changes = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                ProbeOutcome::Change(change) => changes.push(change),
                ProbeOutcome::Kernel => report.kernel_skipped += 1,
                ProbeOutcome::ReadFailed => report.read_errors += 1,
            }
        }

        let applied = self.table.apply_cycle(changes, start);
        report.upserted = applied.upserted;
        report.removed = applied.removed;
        report.duration = start.elapsed();

        self.stats
            .record_cycle(self.table.len() as u64, report.duration.as_secs_f64());
        self.stats.record_scan_success();

        Ok(report)
    }

    /// Runs a single cycle and writes one rendering of the result.
    pub fn run_once<W: Write>(
        &self,
        format: ExportFormat,
        out: &mut W,
    ) -> Result<CycleReport, SampleError> {
        let report = self.run_cycle()?;
        let view = self.table.snapshot_view();
        let rendered = match format {
            ExportFormat::Csv => render_csv(&view),
            ExportFormat::Json => {
                let mut json = render_json(&view, &capture_timestamp())?;
                json.push('\n');
                json
            }
        };
        out.write_all(rendered.as_bytes())?;
        out.flush()?;
        Ok(report)
    }

    /// Samples on a fixed period until `shutdown` resolves.
    ///
    /// Returns an error only when enumeration fails; callers treat that as fatal.
    pub async fn run_continuous<F>(self: Arc<Self>, shutdown: F) -> Result<(), SampleError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            "Sampling every {}s from {}",
            self.settings.interval.as_secs(),
            self.settings.proc_root.display()
        );

        loop {
            let sampler = Arc::clone(&self);
            let report = tokio::task::spawn_blocking(move || sampler.run_cycle())
                .await
                .map_err(|e| SampleError::Join(e.to_string()))?;

            let report = match report {
                Ok(report) => report,
                Err(e) => {
                    error!("Sampling cycle failed: {}", display_chain(&e));
                    return Err(e);
                }
            };

            info!(
                "Cycle completed: {} processes tracked, {} probed, {} removed, {} kernel, {} read errors, {:.2}ms",
                self.table.len(),
                report.probed,
                report.removed,
                report.kernel_skipped,
                report.read_errors,
                report.duration.as_secs_f64() * 1000.0
            );

            if self.settings.verbose {
                let csv = render_csv(&self.table.snapshot_view());
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(csv.as_bytes())?;
                stdout.flush()?;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.settings.interval) => {}
                _ = &mut shutdown => {
                    info!("Sampler stopping");
                    return Ok(());
                }
            }
        }
    }
}
