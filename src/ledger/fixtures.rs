//! In-memory fixture ledger
//!
//! Serves a fixed set of domain profiles without a node. Used for local
//! development (`--fixture-ledger`) and as the ledger double in tests:
//! profiles can be changed at runtime, calls are counted, the ledger can
//! be made unreachable, and a listing can be held open on a gate.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

use super::protocol::DomainProfileEntry;
use super::{Ledger, LedgerError, LedgerListing, ListedDomain};
use crate::identifier;
use crate::types::{DomainRecord, Subrecord};

/// Fixture-backed ledger
#[derive(Default)]
pub struct FixtureLedger {
    /// Profiles keyed by name (listing order is name order)
    profiles: RwLock<BTreeMap<String, DomainRecord>>,

    /// Simulated network latency per call
    latency: Duration,

    /// When set, every call fails with a transport error
    unreachable: AtomicBool,

    /// Gate the next `list_all` waits on
    list_gate: Mutex<Option<Arc<Notify>>>,

    lookups: AtomicUsize,
    listings: AtomicUsize,
}

impl FixtureLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger seeded with the development fixtures
    pub fn with_fixtures() -> Self {
        let ledger = Self::new();
        for record in fixture_records() {
            ledger.upsert(record);
        }
        ledger
    }

    /// Add simulated latency to every call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Insert or replace a profile
    pub fn upsert(&self, record: DomainRecord) {
        self.profiles.write().insert(record.name.clone(), record);
    }

    /// Remove a profile
    pub fn remove(&self, name: &str) {
        self.profiles.write().remove(&identifier::normalize_name(name));
    }

    /// Make every call fail with a transport error
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Hold the next listing until the returned gate is notified
    pub fn hold_next_listing(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.list_gate.lock() = Some(gate.clone());
        gate
    }

    /// Number of `lookup_by_name` calls served
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Number of `list_all` calls served
    pub fn listing_count(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }

    async fn simulate_call(&self) -> Result<(), LedgerError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(LedgerError::Transport("fixture ledger unreachable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Ledger for FixtureLedger {
    async fn lookup_by_name(&self, name: &str) -> Result<Option<DomainRecord>, LedgerError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.simulate_call().await?;

        let id = identifier::derive(name);
        let found = {
            let profiles = self.profiles.read();
            profiles
                .values()
                .find(|record| record.identifier == id && record.is_domain)
                .cloned()
        };

        debug!("[fixture] lookup {} -> {}", name, found.is_some());
        Ok(found)
    }

    async fn list_all(&self) -> Result<LedgerListing, LedgerError> {
        self.listings.fetch_add(1, Ordering::SeqCst);

        let gate = self.list_gate.lock().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.simulate_call().await?;

        let domains: Vec<ListedDomain> = self
            .profiles
            .read()
            .values()
            .filter(|record| record.is_domain)
            .map(|record| {
                ListedDomain::from(DomainProfileEntry {
                    profile_id: record.identifier.clone(),
                    name: record.name.clone(),
                    ip: record.has_address().then(|| record.address.clone()),
                    rps: record.rps.map(serde_json::Value::from),
                    height: None,
                    extra: None,
                    owner: record.owner.clone(),
                })
            })
            .collect();

        Ok(LedgerListing {
            total: domains.len() as u64,
            domains,
        })
    }
}

// =============================================================================
// DEVELOPMENT FIXTURES
// =============================================================================

fn fixture_records() -> Vec<DomainRecord> {
    let mut example = DomainRecord::new("example.domain");
    example.address = "192.168.1.100".to_string();
    example.owner = Some("0xabcdef1234567890".to_string());
    example.signer = Some("0x9876543210abcdef".to_string());
    example.metadata = Some("0xdata123456".to_string());
    example.rps = Some(95);
    example.is_candidate = true;
    example.missed = Some(0);
    example.balance = Some(1000);
    example.owned_subrecords = vec![
        fixture_subrecord("0xsubdomain1", "subdomain1.example.domain", "192.168.1.101", 80, 500),
        fixture_subrecord("0xsubdomain2", "subdomain2.example.domain", "192.168.1.102", 75, 300),
    ];

    let mut test = DomainRecord::new("test.domain");
    test.address = "192.168.1.200".to_string();
    test.owner = Some("0x1234567890abcdef".to_string());
    test.signer = Some("0xfedcba0987654321".to_string());
    test.metadata = Some("0xdata654321".to_string());
    test.rps = Some(85);
    test.is_rented = true;
    test.tenant = Some("0x2468ace13579bdf".to_string());
    test.rented_at = Some(1000);
    test.duration = Some(10000);
    test.missed = Some(0);
    test.balance = Some(2000);
    let mut rented = fixture_subrecord("0xsubdomain3", "subdomain.test.domain", "192.168.1.201", 70, 800);
    rented.ownership_type = Some("rented".to_string());
    rented.tenant = Some("0x13579bdf2468ace".to_string());
    rented.rented_at = Some(1100);
    rented.duration = Some(5000);
    test.owned_subrecords = vec![rented];

    vec![example, test]
}

fn fixture_subrecord(id: &str, name: &str, address: &str, rps: u64, balance: u64) -> Subrecord {
    Subrecord {
        id: id.to_string(),
        name: name.to_string(),
        address: Some(address.to_string()),
        metadata: None,
        owner: None,
        rps: Some(rps),
        ownership_type: Some("owned".to_string()),
        tenant: None,
        rented_at: None,
        duration: None,
        is_candidate: false,
        is_banned: false,
        is_domain: true,
        offered_at: None,
        bid_amount: None,
        buyer: None,
        balance: Some(balance),
        bid_target: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixture_lookup() {
        let ledger = FixtureLedger::with_fixtures();

        let record = ledger.lookup_by_name("Example.Domain").await.unwrap().unwrap();
        assert_eq!(record.address, "192.168.1.100");
        assert_eq!(record.owned_subrecords.len(), 2);

        assert!(ledger.lookup_by_name("missing.domain").await.unwrap().is_none());
        assert_eq!(ledger.lookup_count(), 2);
    }

    #[tokio::test]
    async fn test_non_domain_is_filtered() {
        let ledger = FixtureLedger::new();
        let mut record = DomainRecord::new("profile.only");
        record.is_domain = false;
        ledger.upsert(record);

        assert!(ledger.lookup_by_name("profile.only").await.unwrap().is_none());
        assert!(ledger.list_all().await.unwrap().domains.is_empty());
    }

    #[tokio::test]
    async fn test_listing_in_name_order() {
        let ledger = FixtureLedger::with_fixtures();
        let listing = ledger.list_all().await.unwrap();

        assert_eq!(listing.total, 2);
        assert_eq!(listing.domains[0].name, "example.domain");
        assert_eq!(listing.domains[1].name, "test.domain");
        assert!(listing.domains.iter().all(ListedDomain::profile_id_matches));
    }

    #[tokio::test]
    async fn test_unreachable() {
        let ledger = FixtureLedger::with_fixtures();
        ledger.set_unreachable(true);

        assert!(matches!(
            ledger.lookup_by_name("example.domain").await,
            Err(LedgerError::Transport(_))
        ));
        assert!(ledger.list_all().await.is_err());
    }

    #[tokio::test]
    async fn test_latency_is_simulated() {
        let ledger = FixtureLedger::with_fixtures().with_latency(Duration::from_millis(30));

        let started = std::time::Instant::now();
        ledger.lookup_by_name("example.domain").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
