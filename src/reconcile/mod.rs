//! Reconciliation Module
//!
//! Periodically brings the mirror in line with the ledger's full domain
//! listing. A pass:
//!
//! 1. fetches the listing (abort on failure)
//! 2. scans the mirror (abort on failure)
//! 3. for each listed domain, re-reads the mirrored record and updates
//!    changed fields, or inserts it
//! 4. optionally marks mirrored domains absent from the listing as banned
//!
//! Only one pass runs at a time; a second request is skipped, not queued.
//! Per-record write failures are counted and never stop the pass.

pub mod diff;
mod scheduler;

pub use scheduler::ReconcileScheduler;

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::api::Metrics;
use crate::cache::ResolutionCache;
use crate::config::MissingDomainPolicy;
use crate::ledger::{Ledger, LedgerError, ListedDomain};
use crate::mirror::{Mirror, MirrorError};
use crate::types::DomainRecord;

/// Default pause between mirror writes
pub const DEFAULT_WRITE_DELAY: Duration = Duration::from_millis(50);

/// Reasons a pass did not run to completion
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("reconciliation already running")]
    AlreadyRunning,

    #[error("ledger listing failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("mirror scan failed: {0}")]
    Mirror(#[from] MirrorError),
}

/// Outcome of a completed pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    pub updated: u64,
    pub added: u64,
    pub errors: u64,
    pub unchanged: u64,
    pub marked_banned: u64,

    /// Domains in the ledger listing
    pub listed_total: u64,

    pub duration: Duration,
}

/// Result of a manual trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Started,
    AlreadyRunning,
}

/// What happened to one listing entry
enum EntryOutcome {
    Unchanged,
    Updated(DomainRecord),
    Added(DomainRecord),
}

/// Holds the single-flight flag for the lifetime of a pass
struct PassGuard {
    running: Arc<AtomicBool>,
}

impl PassGuard {
    fn acquire(running: &Arc<AtomicBool>) -> Option<Self> {
        running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                running: running.clone(),
            })
    }
}

impl Drop for PassGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Ledger → mirror reconciliation engine
pub struct Reconciler {
    ledger: Arc<dyn Ledger>,
    mirror: Arc<dyn Mirror>,
    cache: Arc<ResolutionCache>,
    metrics: Arc<Metrics>,
    write_delay: Duration,
    policy: MissingDomainPolicy,
    running: Arc<AtomicBool>,
    last_report: Mutex<Option<ReconcileReport>>,
}

impl Reconciler {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        mirror: Arc<dyn Mirror>,
        cache: Arc<ResolutionCache>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            ledger,
            mirror,
            cache,
            metrics,
            write_delay: DEFAULT_WRITE_DELAY,
            policy: MissingDomainPolicy::default(),
            running: Arc::new(AtomicBool::new(false)),
            last_report: Mutex::new(None),
        }
    }

    /// Pause between mirror writes
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    /// Handling of mirrored domains absent from the listing
    pub fn with_policy(mut self, policy: MissingDomainPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Whether a pass is in flight
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Report of the last completed pass
    pub fn last_report(&self) -> Option<ReconcileReport> {
        self.last_report.lock().clone()
    }

    /// Run one pass to completion, or skip if one is already running
    pub async fn run_pass(&self) -> Result<ReconcileReport, ReconcileError> {
        match PassGuard::acquire(&self.running) {
            Some(guard) => self.run_guarded(guard).await,
            None => {
                self.metrics.inc_reconcile_skipped();
                info!("⏭️  Reconciliation already running, skipping");
                Err(ReconcileError::AlreadyRunning)
            }
        }
    }

    /// Start a pass in the background
    pub fn trigger(self: &Arc<Self>) -> TriggerOutcome {
        match PassGuard::acquire(&self.running) {
            Some(guard) => {
                let reconciler = self.clone();
                tokio::spawn(async move {
                    // Outcome is logged and recorded by the pass itself
                    let _ = reconciler.run_guarded(guard).await;
                });
                TriggerOutcome::Started
            }
            None => {
                self.metrics.inc_reconcile_skipped();
                debug!("Manual reconciliation requested while a pass is running");
                TriggerOutcome::AlreadyRunning
            }
        }
    }

    async fn run_guarded(&self, _guard: PassGuard) -> Result<ReconcileReport, ReconcileError> {
        info!("🔄 Starting reconciliation pass");

        let result = self.sync().await;
        match &result {
            Ok(report) => {
                self.metrics.record_pass(
                    report.updated,
                    report.added,
                    report.errors,
                    report.marked_banned,
                );
                info!(
                    "✅ Reconciliation complete: {} updated, {} added, {} errors ({} unchanged, {} marked banned, {} listed) in {:?}",
                    report.updated,
                    report.added,
                    report.errors,
                    report.unchanged,
                    report.marked_banned,
                    report.listed_total,
                    report.duration
                );
                *self.last_report.lock() = Some(report.clone());
            }
            Err(e) => {
                self.metrics.inc_reconcile_failures();
                warn!("Reconciliation pass aborted: {}", e);
            }
        }

        result
    }

    async fn sync(&self) -> Result<ReconcileReport, ReconcileError> {
        let started = Instant::now();

        let listing = self.ledger.list_all().await?;
        let mut unlisted: HashSet<String> = self
            .mirror
            .scan()?
            .into_iter()
            .map(|record| record.name)
            .collect();

        let mut report = ReconcileReport {
            listed_total: listing.domains.len() as u64,
            ..Default::default()
        };
        let mut seen = HashSet::new();

        for entry in &listing.domains {
            if entry.name.is_empty() {
                warn!("Skipping listing entry {} without a name", entry.profile_id);
                report.errors += 1;
                continue;
            }
            if !seen.insert(entry.name.clone()) {
                debug!("Duplicate listing entry for {}", entry.name);
                continue;
            }
            if !entry.profile_id_matches() {
                warn!(
                    "Listed profile id {} for {} does not match derived identifier {}",
                    entry.profile_id,
                    entry.name,
                    entry.identifier()
                );
            }
            unlisted.remove(&entry.name);

            match self.apply_entry(entry) {
                Ok(EntryOutcome::Unchanged) => {
                    report.unchanged += 1;
                    continue;
                }
                Ok(EntryOutcome::Updated(record)) => {
                    self.cache.refresh_if_cached(&record);
                    report.updated += 1;
                }
                Ok(EntryOutcome::Added(record)) => {
                    self.cache.refresh_if_cached(&record);
                    report.added += 1;
                }
                Err(e) => {
                    warn!("Failed to reconcile {}: {}", entry.name, e);
                    report.errors += 1;
                }
            }

            self.pace().await;
        }

        if self.policy == MissingDomainPolicy::MarkBanned {
            self.mark_missing(unlisted, &mut report).await;
        }

        report.duration = started.elapsed();
        Ok(report)
    }

    /// Write one listing entry against the mirror's current record
    fn apply_entry(&self, entry: &ListedDomain) -> Result<EntryOutcome, MirrorError> {
        if let Some(current) = self.mirror.find_by_name(&entry.name)? {
            return self.update_entry(entry, current);
        }

        let record = entry.overlay(DomainRecord::new(&entry.name));
        match self.mirror.insert(&record) {
            Ok(()) => {
                debug!("Added {} -> {}", record.name, record.address);
                Ok(EntryOutcome::Added(record))
            }
            // Created since the read, usually by a resolver write-through
            Err(MirrorError::Conflict(reason)) => match self.mirror.find_by_name(&entry.name)? {
                Some(current) => self.update_entry(entry, current),
                None => Err(MirrorError::Conflict(reason)),
            },
            Err(e) => Err(e),
        }
    }

    fn update_entry(
        &self,
        entry: &ListedDomain,
        mut current: DomainRecord,
    ) -> Result<EntryOutcome, MirrorError> {
        let incoming = entry.overlay(current.clone());
        let changes = diff::changed_fields(&current, &incoming);
        if changes.is_empty() {
            return Ok(EntryOutcome::Unchanged);
        }

        diff::apply_changes(&mut current, &incoming, &changes);
        self.mirror.upsert(&current)?;

        debug!("Updated {} ({:?})", current.name, changes);
        Ok(EntryOutcome::Updated(current))
    }

    /// Flag mirrored domains the ledger no longer lists. Nothing is deleted.
    async fn mark_missing(&self, missing: HashSet<String>, report: &mut ReconcileReport) {
        let mut missing: Vec<String> = missing.into_iter().collect();
        missing.sort();

        for name in missing {
            let mut record = match self.mirror.find_by_name(&name) {
                Ok(Some(record)) if !record.is_banned => record,
                Ok(_) => continue,
                Err(e) => {
                    warn!("Failed to read {} before marking it banned: {}", name, e);
                    report.errors += 1;
                    continue;
                }
            };

            record.is_banned = true;
            record.touch();

            match self.mirror.upsert(&record) {
                Ok(()) => {
                    info!("🚫 {} no longer listed by the ledger, marked banned", record.name);
                    self.cache.refresh_if_cached(&record);
                    report.marked_banned += 1;
                }
                Err(e) => {
                    warn!("Failed to mark {} banned: {}", record.name, e);
                    report.errors += 1;
                }
            }

            self.pace().await;
        }
    }

    async fn pace(&self) {
        if !self.write_delay.is_zero() {
            tokio::time::sleep(self.write_delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::FixtureLedger;
    use crate::mirror::DomainMirror;
    use crate::resolver::Resolver;
    use tempfile::TempDir;

    struct Harness {
        reconciler: Arc<Reconciler>,
        ledger: Arc<FixtureLedger>,
        mirror: Arc<DomainMirror>,
        cache: Arc<ResolutionCache>,
        metrics: Arc<Metrics>,
        _dir: TempDir,
    }

    fn harness_with(policy: MissingDomainPolicy) -> Harness {
        build_harness(policy, Duration::ZERO)
    }

    fn build_harness(policy: MissingDomainPolicy, write_delay: Duration) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Arc::new(FixtureLedger::new());
        let mirror = Arc::new(DomainMirror::open(dir.path()).unwrap());
        let cache = Arc::new(ResolutionCache::new(
            Duration::from_secs(3600),
            Duration::from_secs(1800),
        ));
        let metrics = Arc::new(Metrics::new());
        let reconciler = Arc::new(
            Reconciler::new(ledger.clone(), mirror.clone(), cache.clone(), metrics.clone())
                .with_write_delay(write_delay)
                .with_policy(policy),
        );

        Harness {
            reconciler,
            ledger,
            mirror,
            cache,
            metrics,
            _dir: dir,
        }
    }

    fn harness() -> Harness {
        harness_with(MissingDomainPolicy::Retain)
    }

    fn ledger_record(name: &str, address: &str) -> DomainRecord {
        let mut record = DomainRecord::new(name);
        record.address = address.to_string();
        record.owner = Some("0xowner".to_string());
        record.rps = Some(10);
        record
    }

    #[tokio::test]
    async fn test_first_pass_adds_listed_domains() {
        let h = harness();
        h.ledger.upsert(ledger_record("a.domain", "10.0.0.1"));
        h.ledger.upsert(ledger_record("b.domain", "10.0.0.2"));

        let report = h.reconciler.run_pass().await.unwrap();

        assert_eq!(report.added, 2);
        assert_eq!(report.updated, 0);
        assert_eq!(report.errors, 0);
        assert_eq!(report.listed_total, 2);

        let a = h.mirror.find_by_name("a.domain").unwrap().unwrap();
        assert_eq!(a.address, "10.0.0.1");
        assert_eq!(a.owner.as_deref(), Some("0xowner"));
        assert!(a.is_domain);
    }

    #[tokio::test]
    async fn test_updates_changed_adds_new_ignores_unlisted() {
        let h = harness();
        h.ledger.upsert(ledger_record("a.domain", "10.0.0.1"));
        h.ledger.upsert(ledger_record("b.domain", "10.0.0.2"));
        h.reconciler.run_pass().await.unwrap();

        let unrelated = ledger_record("z.domain", "10.0.0.26");
        h.mirror.insert(&unrelated).unwrap();

        h.ledger.upsert(ledger_record("b.domain", "10.0.0.9"));
        h.ledger.upsert(ledger_record("c.domain", "10.0.0.3"));

        let report = h.reconciler.run_pass().await.unwrap();

        assert_eq!(report.updated, 1);
        assert_eq!(report.added, 1);
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.errors, 0);

        let b = h.mirror.find_by_name("b.domain").unwrap().unwrap();
        assert_eq!(b.address, "10.0.0.9");
        assert_eq!(h.mirror.find_by_name("z.domain").unwrap().unwrap(), unrelated);
        assert_eq!(h.mirror.count().unwrap(), 4);
    }

    #[tokio::test]
    async fn test_second_pass_is_noop() {
        let h = harness();
        h.ledger.upsert(ledger_record("a.domain", "10.0.0.1"));
        h.ledger.upsert(ledger_record("b.domain", "10.0.0.2"));
        h.reconciler.run_pass().await.unwrap();

        let before = h.mirror.find_by_name("a.domain").unwrap().unwrap();
        let report = h.reconciler.run_pass().await.unwrap();

        assert_eq!(report.updated, 0);
        assert_eq!(report.added, 0);
        assert_eq!(report.unchanged, 2);
        assert_eq!(h.mirror.find_by_name("a.domain").unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn test_overlay_keeps_fields_outside_listing() {
        let h = harness();
        let full = FixtureLedger::with_fixtures()
            .lookup_by_name("example.domain")
            .await
            .unwrap()
            .unwrap();
        h.mirror.insert(&full).unwrap();
        h.ledger.upsert(full.clone());

        let report = h.reconciler.run_pass().await.unwrap();
        assert_eq!(report.updated, 1);

        let mirrored = h.mirror.find_by_name("example.domain").unwrap().unwrap();
        assert_eq!(mirrored.signer, full.signer);
        assert_eq!(mirrored.owned_subrecords, full.owned_subrecords);
        assert_eq!(mirrored.balance, full.balance);
        assert_ne!(mirrored.metadata, full.metadata);
    }

    #[tokio::test]
    async fn test_refreshes_only_cached_entries() {
        let h = harness();
        h.ledger.upsert(ledger_record("a.domain", "10.0.0.1"));
        h.ledger.upsert(ledger_record("b.domain", "10.0.0.2"));
        h.reconciler.run_pass().await.unwrap();

        h.cache
            .insert_positive(h.mirror.find_by_name("a.domain").unwrap().unwrap());

        h.ledger.upsert(ledger_record("a.domain", "10.0.0.11"));
        h.ledger.upsert(ledger_record("b.domain", "10.0.0.12"));
        h.reconciler.run_pass().await.unwrap();

        match h.cache.lookup("a.domain") {
            crate::cache::CacheLookup::Hit(record) => assert_eq!(record.address, "10.0.0.11"),
            other => panic!("expected cached record, got {:?}", other),
        }
        assert!(!h.cache.is_positive("b.domain"));
    }

    #[tokio::test]
    async fn test_ledger_unreachable_aborts_pass() {
        let h = harness();
        h.mirror.insert(&ledger_record("a.domain", "10.0.0.1")).unwrap();
        h.ledger.set_unreachable(true);

        let result = h.reconciler.run_pass().await;

        assert!(matches!(result, Err(ReconcileError::Ledger(_))));
        assert!(!h.reconciler.is_running());
        assert!(h.reconciler.last_report().is_none());
        assert_eq!(h.mirror.count().unwrap(), 1);
        assert_eq!(
            h.metrics.reconcile_failures.load(Ordering::Relaxed),
            1
        );
    }

    #[tokio::test]
    async fn test_concurrent_pass_is_skipped() {
        let h = harness();
        h.ledger.upsert(ledger_record("a.domain", "10.0.0.1"));
        let gate = h.ledger.hold_next_listing();

        let reconciler = h.reconciler.clone();
        let first = tokio::spawn(async move { reconciler.run_pass().await });

        while !h.reconciler.is_running() {
            tokio::task::yield_now().await;
        }

        assert!(matches!(
            h.reconciler.run_pass().await,
            Err(ReconcileError::AlreadyRunning)
        ));
        assert_eq!(h.reconciler.trigger(), TriggerOutcome::AlreadyRunning);

        gate.notify_one();
        let report = first.await.unwrap().unwrap();

        assert_eq!(report.added, 1);
        assert_eq!(h.ledger.listing_count(), 1);
        assert_eq!(h.metrics.reconcile_skipped.load(Ordering::Relaxed), 2);
        assert!(!h.reconciler.is_running());
    }

    #[tokio::test]
    async fn test_trigger_runs_in_background() {
        let h = harness();
        h.ledger.upsert(ledger_record("a.domain", "10.0.0.1"));

        assert_eq!(h.reconciler.trigger(), TriggerOutcome::Started);

        for _ in 0..200 {
            if h.reconciler.last_report().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(h.reconciler.last_report().unwrap().added, 1);
        assert!(h.mirror.find_by_name("a.domain").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_mark_banned_policy() {
        let h = harness_with(MissingDomainPolicy::MarkBanned);
        h.ledger.upsert(ledger_record("a.domain", "10.0.0.1"));
        h.mirror.insert(&ledger_record("gone.domain", "10.0.0.5")).unwrap();

        let report = h.reconciler.run_pass().await.unwrap();
        assert_eq!(report.marked_banned, 1);

        let gone = h.mirror.find_by_name("gone.domain").unwrap().unwrap();
        assert!(gone.is_banned);
        assert_eq!(gone.address, "10.0.0.5");
        assert_eq!(h.mirror.count().unwrap(), 2);

        let again = h.reconciler.run_pass().await.unwrap();
        assert_eq!(again.marked_banned, 0);
    }

    #[tokio::test]
    async fn test_retain_policy_leaves_missing_untouched() {
        let h = harness();
        let gone = ledger_record("gone.domain", "10.0.0.5");
        h.mirror.insert(&gone).unwrap();

        let report = h.reconciler.run_pass().await.unwrap();

        assert_eq!(report.marked_banned, 0);
        assert_eq!(h.mirror.find_by_name("gone.domain").unwrap().unwrap(), gone);
    }

    #[tokio::test]
    async fn test_relisted_domain_is_unbanned() {
        let h = harness();
        let mut banned = ledger_record("a.domain", "10.0.0.1");
        banned.is_banned = true;
        h.mirror.insert(&banned).unwrap();
        h.ledger.upsert(ledger_record("a.domain", "10.0.0.1"));

        let report = h.reconciler.run_pass().await.unwrap();

        assert_eq!(report.updated, 1);
        assert!(!h.mirror.find_by_name("a.domain").unwrap().unwrap().is_banned);
    }

    /// Mirror that rejects writes for one name
    struct FailingMirror {
        inner: DomainMirror,
        failing: String,
    }

    impl FailingMirror {
        fn check(&self, record: &DomainRecord) -> Result<(), MirrorError> {
            if record.name == self.failing {
                return Err(MirrorError::WriteFailed("injected".to_string()));
            }
            Ok(())
        }
    }

    impl Mirror for FailingMirror {
        fn find_by_name(&self, name: &str) -> Result<Option<DomainRecord>, MirrorError> {
            self.inner.find_by_name(name)
        }

        fn find_by_identifier(&self, identifier: &str) -> Result<Option<DomainRecord>, MirrorError> {
            self.inner.find_by_identifier(identifier)
        }

        fn insert(&self, record: &DomainRecord) -> Result<(), MirrorError> {
            self.check(record)?;
            self.inner.insert(record)
        }

        fn upsert(&self, record: &DomainRecord) -> Result<(), MirrorError> {
            self.check(record)?;
            self.inner.upsert(record)
        }

        fn scan(&self) -> Result<Vec<DomainRecord>, MirrorError> {
            self.inner.scan()
        }

        fn count(&self) -> Result<usize, MirrorError> {
            self.inner.count()
        }

        fn flush(&self) -> Result<(), MirrorError> {
            self.inner.flush()
        }
    }

    #[tokio::test]
    async fn test_record_failure_does_not_stop_pass() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Arc::new(FixtureLedger::new());
        ledger.upsert(ledger_record("a.domain", "10.0.0.1"));
        ledger.upsert(ledger_record("b.domain", "10.0.0.2"));
        ledger.upsert(ledger_record("c.domain", "10.0.0.3"));

        let mirror = Arc::new(FailingMirror {
            inner: DomainMirror::open(dir.path()).unwrap(),
            failing: "b.domain".to_string(),
        });
        let cache = Arc::new(ResolutionCache::new(
            Duration::from_secs(60),
            Duration::from_secs(60),
        ));
        let reconciler = Reconciler::new(ledger, mirror.clone(), cache, Arc::new(Metrics::new()))
            .with_write_delay(Duration::ZERO);

        let report = reconciler.run_pass().await.unwrap();

        assert_eq!(report.added, 2);
        assert_eq!(report.errors, 1);
        assert!(mirror.find_by_name("c.domain").unwrap().is_some());
        assert!(mirror.find_by_name("b.domain").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_delay_paces_pass() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Arc::new(FixtureLedger::new());
        ledger.upsert(ledger_record("a.domain", "10.0.0.1"));
        ledger.upsert(ledger_record("b.domain", "10.0.0.2"));

        let mirror = Arc::new(DomainMirror::open(dir.path()).unwrap());
        let cache = Arc::new(ResolutionCache::new(
            Duration::from_secs(60),
            Duration::from_secs(60),
        ));
        let reconciler = Reconciler::new(ledger, mirror, cache, Arc::new(Metrics::new()))
            .with_write_delay(Duration::from_millis(20));

        let report = reconciler.run_pass().await.unwrap();

        assert_eq!(report.added, 2);
        assert!(report.duration >= Duration::from_millis(40));
    }

    fn resolver_for(h: &Harness) -> Resolver {
        Resolver::new(h.ledger.clone(), h.mirror.clone(), h.cache.clone(), h.metrics.clone())
    }

    async fn wait_until(mut done: impl FnMut() -> bool) {
        for _ in 0..500 {
            if done() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("condition never held");
    }

    #[tokio::test]
    async fn test_pass_keeps_fields_refreshed_during_pass() {
        let h = build_harness(MissingDomainPolicy::Retain, Duration::from_millis(100));
        h.mirror.insert(&ledger_record("a.domain", "10.0.0.1")).unwrap();
        h.mirror.insert(&ledger_record("b.domain", "10.0.0.2")).unwrap();

        let mut signed = ledger_record("b.domain", "10.0.0.12");
        signed.signer = Some("0xsigner".to_string());
        h.ledger.upsert(ledger_record("a.domain", "10.0.0.11"));
        h.ledger.upsert(signed);

        let reconciler = h.reconciler.clone();
        let pass = tokio::spawn(async move { reconciler.run_pass().await });

        // a is written, the pass is now pacing before b
        wait_until(|| h.mirror.find_by_name("a.domain").unwrap().unwrap().address == "10.0.0.11").await;
        let refreshed = resolver_for(&h).force_refresh("b.domain").await.unwrap();
        assert_eq!(refreshed.signer.as_deref(), Some("0xsigner"));

        let report = pass.await.unwrap().unwrap();
        assert_eq!(report.errors, 0);

        let b = h.mirror.find_by_name("b.domain").unwrap().unwrap();
        assert_eq!(b.signer.as_deref(), Some("0xsigner"));
        assert_eq!(b.address, "10.0.0.12");

        match h.cache.lookup("b.domain") {
            crate::cache::CacheLookup::Hit(cached) => assert_eq!(cached.signer.as_deref(), Some("0xsigner")),
            other => panic!("expected cached record, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_domain_resolved_during_pass_is_not_an_error() {
        let h = build_harness(MissingDomainPolicy::Retain, Duration::from_millis(100));
        h.ledger.upsert(ledger_record("a.domain", "10.0.0.1"));
        h.ledger.upsert(ledger_record("b.domain", "10.0.0.2"));

        let reconciler = h.reconciler.clone();
        let pass = tokio::spawn(async move { reconciler.run_pass().await });

        wait_until(|| h.mirror.find_by_name("a.domain").unwrap().is_some()).await;
        assert_eq!(resolver_for(&h).resolve("b.domain").await.unwrap(), "10.0.0.2");

        let report = pass.await.unwrap().unwrap();
        assert_eq!(report.errors, 0);
        assert_eq!(report.added, 1);
        assert_eq!(h.mirror.count().unwrap(), 2);
    }
}
