//! Resolver Module
//!
//! Answers name queries through the lookup cascade:
//!
//! 1. negative cache → NotFound
//! 2. positive cache → cached record
//! 3. mirror → record (cached positive)
//! 4. ledger → record (persisted and cached) or absence (cached negative)
//!
//! Ledger transport failures are answered as NotFound but are never
//! cached negative; the next query goes back to the ledger.

mod fallback;

pub use fallback::{AddressFallback, SystemDnsFallback, FALLBACK_METADATA};

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::api::Metrics;
use crate::cache::{CacheLookup, ResolutionCache};
use crate::identifier;
use crate::ledger::Ledger;
use crate::mirror::{Mirror, MirrorError};
use crate::types::DomainRecord;

/// Resolution outcomes other than success
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("domain not found")]
    NotFound,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<MirrorError> for ResolveError {
    fn from(e: MirrorError) -> Self {
        ResolveError::Internal(e.to_string())
    }
}

/// Lookup cascade over cache, mirror and ledger
pub struct Resolver {
    ledger: Arc<dyn Ledger>,
    mirror: Arc<dyn Mirror>,
    cache: Arc<ResolutionCache>,
    metrics: Arc<Metrics>,
    fallback: Option<Arc<dyn AddressFallback>>,
}

impl Resolver {
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
            fallback: None,
        }
    }

    /// Consult a secondary address source for names the ledger does not know
    pub fn with_fallback(mut self, fallback: Arc<dyn AddressFallback>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Resolve a name to its address
    pub async fn resolve(&self, name: &str) -> Result<String, ResolveError> {
        self.get_record(name).await.map(|record| record.address)
    }

    /// Resolve a name to its full record
    pub async fn get_record(&self, name: &str) -> Result<DomainRecord, ResolveError> {
        let name = identifier::normalize_name(name);
        self.metrics.inc_resolutions();

        let result = if name.is_empty() {
            Err(ResolveError::NotFound)
        } else {
            self.cascade(&name).await
        };

        if matches!(result, Err(ResolveError::NotFound)) {
            self.metrics.inc_not_found();
        }
        result
    }

    async fn cascade(&self, name: &str) -> Result<DomainRecord, ResolveError> {
        match self.cache.lookup(name) {
            CacheLookup::Absent => {
                self.metrics.inc_negative_cache_hits();
                debug!("{} found in negative cache", name);
                return Err(ResolveError::NotFound);
            }
            CacheLookup::Hit(record) => {
                self.metrics.inc_positive_cache_hits();
                debug!("{} found in cache, address {}", name, record.address);
                return Ok(record);
            }
            CacheLookup::Miss => {}
        }

        match self.mirror.find_by_name(name) {
            Ok(Some(record)) if record.is_resolvable() => {
                self.metrics.inc_mirror_hits();
                debug!("{} found in mirror, address {}", name, record.address);
                self.cache.insert_positive(record.clone());
                return Ok(record);
            }
            Ok(Some(_)) => {
                debug!("{} is mirrored but not a domain", name);
                self.cache.insert_negative(name);
                return Err(ResolveError::NotFound);
            }
            Ok(None) => {}
            Err(e) => {
                self.metrics.inc_mirror_errors();
                error!("Mirror read failed for {}: {}", name, e);
                return Err(e.into());
            }
        }

        self.metrics.inc_ledger_lookups();
        match self.ledger.lookup_by_name(name).await {
            Ok(Some(record)) if record.is_resolvable() => {
                info!("{} found in ledger, address {}", name, record.address);
                self.persist(&record);
                self.cache.insert_positive(record.clone());
                Ok(record)
            }
            Ok(_) => {
                if let Some(record) = self.try_fallback(name).await {
                    return Ok(record);
                }
                debug!("{} not found in ledger", name);
                self.cache.insert_negative(name);
                Err(ResolveError::NotFound)
            }
            Err(e) => {
                self.metrics.inc_ledger_errors();
                warn!("Ledger unavailable while resolving {}: {}", name, e);
                Err(ResolveError::NotFound)
            }
        }
    }

    /// Query the ledger directly and overwrite mirror and cache with the answer
    pub async fn force_refresh(&self, name: &str) -> Result<DomainRecord, ResolveError> {
        let name = identifier::normalize_name(name);
        if name.is_empty() {
            return Err(ResolveError::NotFound);
        }

        self.metrics.inc_forced_refreshes();
        self.metrics.inc_ledger_lookups();
        info!("Force-refreshing {}", name);

        match self.ledger.lookup_by_name(&name).await {
            Ok(Some(mut record)) if record.is_resolvable() => {
                record.touch();
                self.persist(&record);
                self.cache.insert_positive(record.clone());
                info!("{} refreshed, address {}", name, record.address);
                Ok(record)
            }
            Ok(_) => {
                // Disappearance in the mirror is reconciliation's call
                info!("{} no longer in ledger or not a domain", name);
                self.cache.insert_negative(&name);
                Err(ResolveError::NotFound)
            }
            Err(e) => {
                self.metrics.inc_ledger_errors();
                warn!("Ledger unavailable while refreshing {}: {}", name, e);
                Err(ResolveError::NotFound)
            }
        }
    }

    /// Write a ledger-sourced record through to the mirror.
    ///
    /// A failed write is logged; the record is still served from cache.
    fn persist(&self, record: &DomainRecord) {
        if let Err(e) = self.mirror.upsert(record) {
            self.metrics.inc_mirror_errors();
            error!("Failed to persist {} to mirror: {}", record.name, e);
        }
    }

    async fn try_fallback(&self, name: &str) -> Option<DomainRecord> {
        let fallback = self.fallback.as_ref()?;
        let ip = fallback.lookup(name).await?;

        info!("{} resolved via system DNS to {}", name, ip);

        let mut record = DomainRecord::new(name);
        record.address = ip.to_string();
        record.metadata = Some(FALLBACK_METADATA.to_string());

        self.persist(&record);
        self.cache.insert_positive(record.clone());
        self.metrics.inc_fallback_resolutions();
        Some(record)
    }
}
