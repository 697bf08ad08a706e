//! Metrics Collection
//!
//! Collects and exposes metrics for monitoring the resolver.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Metrics collector for the resolver service
#[derive(Default)]
pub struct Metrics {
    /// Start time for uptime calculation
    start_time: Option<Instant>,

    /// Total resolution requests (resolve + profile)
    pub resolutions: AtomicU64,

    /// Answers served from the positive cache
    pub positive_cache_hits: AtomicU64,

    /// Answers served from the negative cache
    pub negative_cache_hits: AtomicU64,

    /// Answers served from the mirror
    pub mirror_hits: AtomicU64,

    /// Ledger lookups issued
    pub ledger_lookups: AtomicU64,

    /// Ledger transport failures on the lookup path
    pub ledger_errors: AtomicU64,

    /// Mirror read/write failures on the lookup path
    pub mirror_errors: AtomicU64,

    /// Names answered through the system DNS fallback
    pub fallback_resolutions: AtomicU64,

    /// NotFound answers
    pub not_found: AtomicU64,

    /// Forced refreshes
    pub forced_refreshes: AtomicU64,

    /// Completed reconciliation passes
    pub reconcile_passes: AtomicU64,

    /// Passes skipped because one was already running
    pub reconcile_skipped: AtomicU64,

    /// Passes aborted (ledger or mirror unavailable)
    pub reconcile_failures: AtomicU64,

    /// Cumulative records updated by reconciliation
    pub reconcile_updated: AtomicU64,

    /// Cumulative records added by reconciliation
    pub reconcile_added: AtomicU64,

    /// Cumulative per-record reconciliation errors
    pub reconcile_errors: AtomicU64,

    /// Cumulative records marked banned by the staleness step
    pub reconcile_marked_banned: AtomicU64,

    /// Unix timestamp of the last completed pass
    pub last_reconcile_at: AtomicU64,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time
            .map(|t| t.elapsed().as_secs())
            .unwrap_or(0)
    }

    pub fn inc_resolutions(&self) {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_positive_cache_hits(&self) {
        self.positive_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_negative_cache_hits(&self) {
        self.negative_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_mirror_hits(&self) {
        self.mirror_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_ledger_lookups(&self) {
        self.ledger_lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_ledger_errors(&self) {
        self.ledger_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_mirror_errors(&self) {
        self.mirror_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_fallback_resolutions(&self) {
        self.fallback_resolutions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_forced_refreshes(&self) {
        self.forced_refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reconcile_skipped(&self) {
        self.reconcile_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reconcile_failures(&self) {
        self.reconcile_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed reconciliation pass
    pub fn record_pass(&self, updated: u64, added: u64, errors: u64, marked_banned: u64) {
        self.reconcile_passes.fetch_add(1, Ordering::Relaxed);
        self.reconcile_updated.fetch_add(updated, Ordering::Relaxed);
        self.reconcile_added.fetch_add(added, Ordering::Relaxed);
        self.reconcile_errors.fetch_add(errors, Ordering::Relaxed);
        self.reconcile_marked_banned.fetch_add(marked_banned, Ordering::Relaxed);
        self.last_reconcile_at
            .store(chrono::Utc::now().timestamp().max(0) as u64, Ordering::Relaxed);
    }

    /// Export metrics in Prometheus format
    pub fn to_prometheus(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "# HELP ledger_dns_uptime_seconds Resolver uptime in seconds\n\
             # TYPE ledger_dns_uptime_seconds gauge\n\
             ledger_dns_uptime_seconds {}\n\n",
            self.uptime_secs()
        ));

        let counters: [(&str, &str, &AtomicU64); 17] = [
            ("resolutions_total", "Resolution requests", &self.resolutions),
            ("positive_cache_hits_total", "Answers from the positive cache", &self.positive_cache_hits),
            ("negative_cache_hits_total", "Answers from the negative cache", &self.negative_cache_hits),
            ("mirror_hits_total", "Answers from the mirror", &self.mirror_hits),
            ("ledger_lookups_total", "Ledger lookups issued", &self.ledger_lookups),
            ("ledger_errors_total", "Ledger transport failures", &self.ledger_errors),
            ("mirror_errors_total", "Mirror failures on the lookup path", &self.mirror_errors),
            ("fallback_resolutions_total", "Answers from system DNS", &self.fallback_resolutions),
            ("not_found_total", "NotFound answers", &self.not_found),
            ("forced_refreshes_total", "Forced refreshes", &self.forced_refreshes),
            ("reconcile_passes_total", "Completed reconciliation passes", &self.reconcile_passes),
            ("reconcile_skipped_total", "Skipped reconciliation passes", &self.reconcile_skipped),
            ("reconcile_failures_total", "Aborted reconciliation passes", &self.reconcile_failures),
            ("reconcile_updated_total", "Records updated by reconciliation", &self.reconcile_updated),
            ("reconcile_added_total", "Records added by reconciliation", &self.reconcile_added),
            ("reconcile_errors_total", "Per-record reconciliation errors", &self.reconcile_errors),
            ("reconcile_marked_banned_total", "Records marked banned", &self.reconcile_marked_banned),
        ];

        for (name, help, value) in counters {
            output.push_str(&format!(
                "# HELP ledger_dns_{name} {help}\n\
                 # TYPE ledger_dns_{name} counter\n\
                 ledger_dns_{name} {}\n\n",
                value.load(Ordering::Relaxed)
            ));
        }

        output.push_str(&format!(
            "# HELP ledger_dns_last_reconcile_timestamp Unix time of the last completed pass\n\
             # TYPE ledger_dns_last_reconcile_timestamp gauge\n\
             ledger_dns_last_reconcile_timestamp {}\n\n",
            self.last_reconcile_at.load(Ordering::Relaxed)
        ));

        output
    }

    /// Export metrics as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "uptime_secs": self.uptime_secs(),
            "resolution": {
                "requests": self.resolutions.load(Ordering::Relaxed),
                "positive_cache_hits": self.positive_cache_hits.load(Ordering::Relaxed),
                "negative_cache_hits": self.negative_cache_hits.load(Ordering::Relaxed),
                "mirror_hits": self.mirror_hits.load(Ordering::Relaxed),
                "ledger_lookups": self.ledger_lookups.load(Ordering::Relaxed),
                "ledger_errors": self.ledger_errors.load(Ordering::Relaxed),
                "mirror_errors": self.mirror_errors.load(Ordering::Relaxed),
                "fallback": self.fallback_resolutions.load(Ordering::Relaxed),
                "not_found": self.not_found.load(Ordering::Relaxed),
                "forced_refreshes": self.forced_refreshes.load(Ordering::Relaxed),
            },
            "reconciliation": {
                "passes": self.reconcile_passes.load(Ordering::Relaxed),
                "skipped": self.reconcile_skipped.load(Ordering::Relaxed),
                "failures": self.reconcile_failures.load(Ordering::Relaxed),
                "updated": self.reconcile_updated.load(Ordering::Relaxed),
                "added": self.reconcile_added.load(Ordering::Relaxed),
                "errors": self.reconcile_errors.load(Ordering::Relaxed),
                "marked_banned": self.reconcile_marked_banned.load(Ordering::Relaxed),
                "last_pass_at": self.last_reconcile_at.load(Ordering::Relaxed),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_increment() {
        let metrics = Metrics::new();

        metrics.inc_resolutions();
        metrics.inc_resolutions();
        metrics.inc_mirror_hits();

        assert_eq!(metrics.resolutions.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.mirror_hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_record_pass_accumulates() {
        let metrics = Metrics::new();
        metrics.record_pass(2, 1, 0, 0);
        metrics.record_pass(0, 3, 1, 2);

        assert_eq!(metrics.reconcile_passes.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.reconcile_updated.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.reconcile_added.load(Ordering::Relaxed), 4);
        assert_eq!(metrics.reconcile_errors.load(Ordering::Relaxed), 1);
        assert!(metrics.last_reconcile_at.load(Ordering::Relaxed) > 1_700_000_000);
    }

    #[test]
    fn test_prometheus_format() {
        let metrics = Metrics::new();
        metrics.inc_ledger_lookups();
        metrics.record_pass(5, 0, 0, 0);

        let output = metrics.to_prometheus();

        assert!(output.contains("ledger_dns_ledger_lookups_total 1"));
        assert!(output.contains("ledger_dns_reconcile_updated_total 5"));
        assert!(output.contains("# TYPE ledger_dns_uptime_seconds gauge"));
    }

    #[test]
    fn test_json_format() {
        let metrics = Metrics::new();
        metrics.inc_not_found();

        let json = metrics.to_json();

        assert_eq!(json["resolution"]["not_found"], 1);
        assert_eq!(json["reconciliation"]["passes"], 0);
    }
}
