//! Periodic reconciliation
//!
//! First pass fires immediately, then once per interval. Stopping is only
//! observed between passes, so an in-flight pass always completes.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use super::Reconciler;

/// Handle to the background reconciliation task
pub struct ReconcileScheduler {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ReconcileScheduler {
    /// Spawn the periodic task
    pub fn start(reconciler: Arc<Reconciler>, interval: Duration) -> Self {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            info!("⏰ Reconciliation scheduled every {}s", interval.as_secs());

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {}
                }

                // Skips and failures are logged by the pass
                let _ = reconciler.run_pass().await;
            }

            info!("⏰ Reconciliation scheduler stopped");
        });

        Self { stop_tx, handle }
    }

    /// Ask the task to stop after the current pass
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Wait for the task to exit
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            error!("Reconciliation scheduler panicked: {}", e);
        }
    }

    /// Stop and wait
    pub async fn shutdown(self) {
        self.stop();
        self.join().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Metrics;
    use crate::cache::ResolutionCache;
    use crate::ledger::FixtureLedger;
    use crate::mirror::{DomainMirror, Mirror};

    fn build(ledger: Arc<FixtureLedger>, dir: &tempfile::TempDir) -> (Arc<Reconciler>, Arc<DomainMirror>) {
        let mirror = Arc::new(DomainMirror::open(dir.path()).unwrap());
        let cache = Arc::new(ResolutionCache::new(
            Duration::from_secs(60),
            Duration::from_secs(60),
        ));
        let reconciler = Reconciler::new(ledger, mirror.clone(), cache, Arc::new(Metrics::new()))
            .with_write_delay(Duration::ZERO);
        (Arc::new(reconciler), mirror)
    }

    #[tokio::test]
    async fn test_first_pass_is_immediate() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Arc::new(FixtureLedger::with_fixtures());
        let (reconciler, mirror) = build(ledger.clone(), &dir);

        let scheduler = ReconcileScheduler::start(reconciler.clone(), Duration::from_secs(3600));

        for _ in 0..200 {
            if reconciler.last_report().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        scheduler.shutdown().await;

        assert_eq!(ledger.listing_count(), 1);
        assert_eq!(mirror.count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_stop_waits_for_inflight_pass() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Arc::new(FixtureLedger::with_fixtures());
        let gate = ledger.hold_next_listing();
        let (reconciler, mirror) = build(ledger.clone(), &dir);

        let scheduler = ReconcileScheduler::start(reconciler.clone(), Duration::from_secs(3600));

        while !reconciler.is_running() {
            tokio::task::yield_now().await;
        }

        scheduler.stop();
        let join = tokio::spawn(scheduler.join());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!join.is_finished());

        gate.notify_one();
        join.await.unwrap();

        assert!(reconciler.last_report().is_some());
        assert_eq!(mirror.count().unwrap(), 2);
        assert_eq!(ledger.listing_count(), 1);
    }
}
