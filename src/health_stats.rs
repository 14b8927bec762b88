//! Health statistics and monitoring for memchart.
//!
//! This module tracks sampler performance, per-pid probe failures and HTTP
//! request counts, and renders them as the plain-text `/health` table.

use std::collections::VecDeque;
use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock as StdRwLock};
use std::time::{Duration, Instant};

/// Running statistics for a single metric.
#[derive(Clone, Copy, Default)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            *self = Self {
                count: 1,
                sum: value,
                min: value,
                max: value,
                last: value,
            };
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

/// Thread-safe wrapper for running statistics.
#[derive(Default)]
pub struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    pub fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    /// Returns `(last, avg, max, min, count)`.
    pub fn snapshot(&self) -> (f64, f64, f64, f64, u64) {
        if let Ok(s) = self.inner.lock() {
            (s.last, s.avg(), s.max, s.min, s.count)
        } else {
            (0.0, 0.0, 0.0, 0.0, 0)
        }
    }
}

/// Sliding window of HTTP request timestamps (last 10 minutes).
pub struct RequestTimestamps {
    inner: Mutex<VecDeque<Instant>>,
}

impl Default for RequestTimestamps {
    fn default() -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(1024)),
        }
    }
}

impl RequestTimestamps {
    const WINDOW: Duration = Duration::from_secs(600);

    pub fn record(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            let now = Instant::now();
            guard.push_back(now);
            while guard
                .front()
                .is_some_and(|&t| now.duration_since(t) > Self::WINDOW)
            {
                guard.pop_front();
            }
        }
    }

    pub fn count_last_minute(&self) -> u64 {
        if let Ok(guard) = self.inner.lock() {
            guard
                .iter()
                .filter(|t| t.elapsed() <= Duration::from_secs(60))
                .count() as u64
        } else {
            0
        }
    }
}

/// Internal statistics for the sampler and the HTTP surface.
pub struct HealthStats {
    // Sampling
    pub tracked_processes: Stat,
    pub cycle_duration_seconds: Stat,
    pub probe_duration_ms: Stat,
    pub cycle_success_count: AtomicU64,
    pub cycle_failure_count: AtomicU64,

    // Per-pid outcomes
    pub vanished_processes: AtomicU64,
    pub proc_read_errors: AtomicU64,
    pub permission_denied_count: AtomicU64,

    // HTTP server
    pub http_request_timestamps: RequestTimestamps,
    pub request_duration_ms: Stat,
    pub export_calls: AtomicU64,

    pub last_cycle_time: StdRwLock<Option<Instant>>,
}

impl Default for HealthStats {
    fn default() -> Self {
        Self {
            tracked_processes: Stat::default(),
            cycle_duration_seconds: Stat::default(),
            probe_duration_ms: Stat::default(),
            cycle_success_count: AtomicU64::new(0),
            cycle_failure_count: AtomicU64::new(0),
            vanished_processes: AtomicU64::new(0),
            proc_read_errors: AtomicU64::new(0),
            permission_denied_count: AtomicU64::new(0),
            http_request_timestamps: RequestTimestamps::default(),
            request_duration_ms: Stat::default(),
            export_calls: AtomicU64::new(0),
            last_cycle_time: StdRwLock::new(None),
        }
    }
}

impl HealthStats {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn record_cycle(&self, tracked: u64, duration_seconds: f64) {
        self.tracked_processes.add_sample(tracked as f64);
        self.cycle_duration_seconds.add_sample(duration_seconds);
        if let Ok(mut guard) = self.last_cycle_time.write() {
            *guard = Some(Instant::now());
        }
    }

    pub fn record_scan_success(&self) {
        self.cycle_success_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scan_failure(&self) {
        self.cycle_failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_probe_duration_ms(&self, duration_ms: f64) {
        self.probe_duration_ms.add_sample(duration_ms);
    }

    pub fn record_vanished_process(&self) {
        self.vanished_processes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_proc_read_error(&self) {
        self.proc_read_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_permission_denied(&self) {
        self.permission_denied_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_http_request(&self) {
        self.http_request_timestamps.record();
    }

    pub fn record_request_duration(&self, duration_ms: f64) {
        self.request_duration_ms.add_sample(duration_ms);
    }

    pub fn record_export_call(&self) {
        self.export_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_cycle_success_rate(&self) -> f64 {
        let success = self.cycle_success_count.load(Ordering::Relaxed);
        let failure = self.cycle_failure_count.load(Ordering::Relaxed);
        let total = success + failure;
        if total == 0 {
            100.0
        } else {
            (success as f64 / total as f64) * 100.0
        }
    }

    /// Seconds since the last completed cycle, or "N/A".
    pub fn get_last_cycle_age_str(&self) -> String {
        match self.last_cycle_time.read() {
            Ok(guard) => (*guard)
                .map(|t| format!("{}s ago", t.elapsed().as_secs()))
                .unwrap_or_else(|| "N/A".to_string()),
            Err(_) => "N/A".to_string(),
        }
    }

    pub fn render_table(&self) -> String {
        let left_col = 26usize;
        let col_w = 12usize;

        let mut out = String::new();
        let stat_row = |out: &mut String, label: &str, stat: &Stat, precision: usize| {
            let (cur, avg, max, min, _) = stat.snapshot();
            writeln!(
                out,
                "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
                label,
                format!("{:.*}", precision, cur),
                format!("{:.*}", precision, avg),
                format!("{:.*}", precision, max),
                format!("{:.*}", precision, min),
                left = left_col,
                col = col_w
            )
            .ok();
        };
        let counter_row = |out: &mut String, label: &str, value: String| {
            writeln!(
                out,
                "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
                label,
                value,
                "N/A",
                "N/A",
                "N/A",
                left = left_col,
                col = col_w
            )
            .ok();
        };

        writeln!(out, "HEALTH ENDPOINT - MEMCHART INTERNAL STATS").ok();
        writeln!(out, "==========================================").ok();
        writeln!(out).ok();
        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "",
            "current",
            "average",
            "max",
            "min",
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(out).ok();
        writeln!(out, "SAMPLING").ok();
        writeln!(out, "--------").ok();
        stat_row(&mut out, "tracked_processes", &self.tracked_processes, 0);
        stat_row(&mut out, "cycle_duration (s)", &self.cycle_duration_seconds, 3);
        stat_row(&mut out, "probe_duration (ms)", &self.probe_duration_ms, 3);
        counter_row(
            &mut out,
            "completed_cycles",
            self.cycle_success_count.load(Ordering::Relaxed).to_string(),
        );
        counter_row(
            &mut out,
            "cycle_success_rate (%)",
            format!("{:.1}", self.get_cycle_success_rate()),
        );
        counter_row(&mut out, "last_cycle", self.get_last_cycle_age_str());

        writeln!(out).ok();
        writeln!(out, "PROBE OUTCOMES").ok();
        writeln!(out, "--------------").ok();
        counter_row(
            &mut out,
            "vanished_processes",
            self.vanished_processes.load(Ordering::Relaxed).to_string(),
        );
        counter_row(
            &mut out,
            "proc_read_errors",
            self.proc_read_errors.load(Ordering::Relaxed).to_string(),
        );
        counter_row(
            &mut out,
            "permission_denied",
            self.permission_denied_count
                .load(Ordering::Relaxed)
                .to_string(),
        );

        writeln!(out).ok();
        writeln!(out, "HTTP SERVER").ok();
        writeln!(out, "-----------").ok();
        counter_row(
            &mut out,
            "http_requests_last_minute",
            self.http_request_timestamps.count_last_minute().to_string(),
        );
        stat_row(&mut out, "request_duration (ms)", &self.request_duration_ms, 1);
        counter_row(
            &mut out,
            "export_calls",
            self.export_calls.load(Ordering::Relaxed).to_string(),
        );

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stat() {
        let mut s = RunningStat::default();
        assert_eq!(s.avg(), 0.0);
        s.add(2.0);
        s.add(4.0);
        s.add(0.0);
        assert_eq!(s.count, 3);
        assert_eq!(s.min, 0.0);
        assert_eq!(s.max, 4.0);
        assert_eq!(s.last, 0.0);
        assert_eq!(s.avg(), 2.0);
    }

    #[test]
    fn test_cycle_success_rate() {
        let stats = HealthStats::new();
        assert_eq!(stats.get_cycle_success_rate(), 100.0);
        stats.record_scan_success();
        stats.record_scan_success();
        stats.record_scan_success();
        stats.record_scan_failure();
        assert_eq!(stats.get_cycle_success_rate(), 75.0);
    }
}
