// Launch metrics
//
// Lightweight counters for what happened during one launcher run, logged once
// at shutdown.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Counters shared by the plugin loader, the simulation thread and the
/// lifecycle monitor.
///
/// Uses relaxed atomics: every counter is independent and only read for the
/// summary after the simulation thread has been joined.
#[derive(Debug)]
pub struct LaunchMetrics {
    /// Plugins whose load call returned a valid handle
    pub plugins_loaded: AtomicUsize,

    /// Plugins whose load call returned a failure code
    pub plugins_failed: AtomicUsize,

    /// Plugins unloaded at shutdown
    pub plugins_unloaded: AtomicUsize,

    /// Engine ticks driven by the simulation thread
    pub ticks: AtomicU64,

    /// Completed-run transitions observed
    pub runs: AtomicU64,

    /// Scene/model loads that succeeded
    pub asset_loads: AtomicUsize,

    /// Scene/model loads that failed or were not recognized
    pub asset_load_failures: AtomicUsize,

    /// Lifecycle events delivered to at least one subscriber
    pub lifecycle_broadcasts: AtomicU64,

    /// Lifecycle events sent while nobody was subscribed
    pub lifecycle_broadcasts_dropped: AtomicU64,

    start_time: Instant,
}

/// Plain copy of the counters, for assertions and reporting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub plugins_loaded: usize,
    pub plugins_failed: usize,
    pub plugins_unloaded: usize,
    pub ticks: u64,
    pub runs: u64,
    pub asset_loads: usize,
    pub asset_load_failures: usize,
    pub lifecycle_broadcasts: u64,
    pub lifecycle_broadcasts_dropped: u64,
}

impl LaunchMetrics {
    pub fn new() -> Self {
        Self {
            plugins_loaded: AtomicUsize::new(0),
            plugins_failed: AtomicUsize::new(0),
            plugins_unloaded: AtomicUsize::new(0),
            ticks: AtomicU64::new(0),
            runs: AtomicU64::new(0),
            asset_loads: AtomicUsize::new(0),
            asset_load_failures: AtomicUsize::new(0),
            lifecycle_broadcasts: AtomicU64::new(0),
            lifecycle_broadcasts_dropped: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_plugin_loaded(&self) {
        self.plugins_loaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_plugin_failed(&self) {
        self.plugins_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_plugin_unloaded(&self) {
        self.plugins_unloaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_run(&self) {
        self.runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_asset_load(&self, success: bool) {
        if success {
            self.asset_loads.fetch_add(1, Ordering::Relaxed);
        } else {
            self.asset_load_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_lifecycle_broadcast(&self) {
        self.lifecycle_broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lifecycle_broadcast_dropped(&self) {
        self.lifecycle_broadcasts_dropped
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Time since the launcher started
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            plugins_loaded: self.plugins_loaded.load(Ordering::Relaxed),
            plugins_failed: self.plugins_failed.load(Ordering::Relaxed),
            plugins_unloaded: self.plugins_unloaded.load(Ordering::Relaxed),
            ticks: self.ticks.load(Ordering::Relaxed),
            runs: self.runs.load(Ordering::Relaxed),
            asset_loads: self.asset_loads.load(Ordering::Relaxed),
            asset_load_failures: self.asset_load_failures.load(Ordering::Relaxed),
            lifecycle_broadcasts: self.lifecycle_broadcasts.load(Ordering::Relaxed),
            lifecycle_broadcasts_dropped: self.lifecycle_broadcasts_dropped.load(Ordering::Relaxed),
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        let snapshot = self.snapshot();
        tracing::info!("=== Launch Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Plugins: {} loaded, {} failed, {} unloaded",
            snapshot.plugins_loaded,
            snapshot.plugins_failed,
            snapshot.plugins_unloaded
        );
        tracing::info!(
            "Simulation: {} ticks, {} runs, {} scene/model loads ({} failed)",
            snapshot.ticks,
            snapshot.runs,
            snapshot.asset_loads,
            snapshot.asset_load_failures
        );
        tracing::debug!(
            "Lifecycle events: {} delivered, {} without subscribers",
            snapshot.lifecycle_broadcasts,
            snapshot.lifecycle_broadcasts_dropped
        );
    }
}

impl Default for LaunchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_metrics_creation() {
        let metrics = LaunchMetrics::new();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_record_plugin_operations() {
        let metrics = LaunchMetrics::new();

        metrics.record_plugin_loaded();
        metrics.record_plugin_loaded();
        metrics.record_plugin_failed();
        metrics.record_plugin_unloaded();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.plugins_loaded, 2);
        assert_eq!(snapshot.plugins_failed, 1);
        assert_eq!(snapshot.plugins_unloaded, 1);
    }

    #[test]
    fn test_record_asset_loads() {
        let metrics = LaunchMetrics::new();
        metrics.record_asset_load(true);
        metrics.record_asset_load(false);
        metrics.record_asset_load(false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.asset_loads, 1);
        assert_eq!(snapshot.asset_load_failures, 2);
    }

    #[test]
    fn test_counters_across_threads() {
        let metrics = Arc::new(LaunchMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..100 {
                        metrics.record_tick();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.snapshot().ticks, 400);
    }

    #[test]
    fn test_uptime() {
        let metrics = LaunchMetrics::new();
        thread::sleep(Duration::from_millis(10));
        assert!(metrics.uptime().as_millis() >= 10);
    }
}
