//! Prometheus metrics definitions for memchart.
//!
//! Per-process gauges mirror the JSON/CSV snapshot (values in kB, labelled by
//! pid and name). Sampler gauges describe the state of the snapshot table.
//!
//! Scrapes share one set of gauges, so [`ProcessMetrics::scrape`] holds a lock
//! from reset through encoding.

use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use memchart::cache::{SnapshotView, TableStatus};

/// Buffer capacity for metrics encoding.
const BUFFER_CAP: usize = 256 * 1024;

/// Collection of Prometheus metrics exported on `/metrics`.
#[derive(Clone)]
pub struct ProcessMetrics {
    // ========== Per-process Memory ==========
    pub process_rss_kilobytes: GaugeVec, // labels: pid, name
    pub process_pss_kilobytes: GaugeVec, // labels: pid, name
    pub process_uss_kilobytes: GaugeVec, // labels: pid, name

    // ========== Sampler ==========
    pub processes_total: Gauge,
    pub sampler_cycles: Gauge,
    pub last_cycle_duration_seconds: Gauge,
    pub last_cycle_age_seconds: Gauge,
    pub scrape_duration_seconds: Gauge,

    scrape_lock: Arc<Mutex<()>>,
}

impl ProcessMetrics {
    /// Creates and registers all Prometheus metrics with the registry.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let labels = ["pid", "name"];

        let process_rss_kilobytes = GaugeVec::new(
            Opts::new(
                "memchart_process_rss_kilobytes",
                "Resident set size of the process, summed over all mappings",
            ),
            &labels,
        )?;
        let process_pss_kilobytes = GaugeVec::new(
            Opts::new(
                "memchart_process_pss_kilobytes",
                "Proportional set size of the process, summed over all mappings",
            ),
            &labels,
        )?;
        let process_uss_kilobytes = GaugeVec::new(
            Opts::new(
                "memchart_process_uss_kilobytes",
                "Unique set size (private clean + private dirty) of the process",
            ),
            &labels,
        )?;

        let processes_total = Gauge::new(
            "memchart_processes_total",
            "Number of processes currently held in the snapshot table",
        )?;
        let sampler_cycles = Gauge::new(
            "memchart_sampler_cycles",
            "Number of completed sampling cycles since start",
        )?;
        let last_cycle_duration_seconds = Gauge::new(
            "memchart_last_cycle_duration_seconds",
            "Wall time of the most recent sampling cycle",
        )?;
        let last_cycle_age_seconds = Gauge::new(
            "memchart_last_cycle_age_seconds",
            "Seconds since the most recent sampling cycle completed",
        )?;
        let scrape_duration_seconds = Gauge::new(
            "memchart_scrape_duration_seconds",
            "Time spent serving the previous /metrics request",
        )?;

        registry.register(Box::new(process_rss_kilobytes.clone()))?;
        registry.register(Box::new(process_pss_kilobytes.clone()))?;
        registry.register(Box::new(process_uss_kilobytes.clone()))?;
        registry.register(Box::new(processes_total.clone()))?;
        registry.register(Box::new(sampler_cycles.clone()))?;
        registry.register(Box::new(last_cycle_duration_seconds.clone()))?;
        registry.register(Box::new(last_cycle_age_seconds.clone()))?;
        registry.register(Box::new(scrape_duration_seconds.clone()))?;

        Ok(Self {
            process_rss_kilobytes,
            process_pss_kilobytes,
            process_uss_kilobytes,
            processes_total,
            sampler_cycles,
            last_cycle_duration_seconds,
            last_cycle_age_seconds,
            scrape_duration_seconds,
            scrape_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Refreshes the gauges from `view` and encodes `registry` in text format.
    pub fn scrape(
        &self,
        registry: &Registry,
        view: &SnapshotView,
        status: &TableStatus,
    ) -> Result<String, prometheus::Error> {
        let _guard = self
            .scrape_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let start = Instant::now();

        self.update(view, status);
        let mut buffer = Vec::with_capacity(BUFFER_CAP);
        TextEncoder::new().encode(&registry.gather(), &mut buffer)?;

        self.scrape_duration_seconds
            .set(start.elapsed().as_secs_f64());
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// Replaces all per-process series with the contents of `view`.
    ///
    /// Series of processes that left the table disappear with the reset.
    fn update(&self, view: &SnapshotView, status: &TableStatus) {
        self.process_rss_kilobytes.reset();
        self.process_pss_kilobytes.reset();
        self.process_uss_kilobytes.reset();

        for (pid, record) in view.iter() {
            let labels = [pid, record.name.as_str()];
            self.process_rss_kilobytes
                .with_label_values(&labels)
                .set(record.rss as f64);
            self.process_pss_kilobytes
                .with_label_values(&labels)
                .set(record.pss as f64);
            self.process_uss_kilobytes
                .with_label_values(&labels)
                .set(record.uss as f64);
        }

        self.processes_total.set(view.len() as f64);
        self.sampler_cycles.set(status.cycles as f64);
        self.last_cycle_duration_seconds
            .set(status.last_cycle_duration.as_secs_f64());
        self.last_cycle_age_seconds.set(
            status
                .last_updated
                .map(|t| t.elapsed().as_secs_f64())
                .unwrap_or(0.0),
        );
    }
}
