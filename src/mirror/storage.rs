//! Domain Mirror Storage (RocksDB)
//!
//! Layout:
//! - `domain:<name>`  → bincode(DomainRecord)
//! - `ident:<identifier>` → name

use parking_lot::Mutex;
use rocksdb::{IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use tracing::{info, warn};

use super::{Mirror, MirrorError};
use crate::identifier;
use crate::types::DomainRecord;

/// Key prefixes for different data types
const PREFIX_DOMAIN: &[u8] = b"domain:";
const PREFIX_IDENT: &[u8] = b"ident:";

/// Domain mirror backed by RocksDB
pub struct DomainMirror {
    /// RocksDB instance
    db: DB,

    /// Serializes uniqueness checks with the writes they guard
    write_lock: Mutex<()>,
}

impl DomainMirror {
    /// Open or create a mirror at the given path
    pub fn open(path: &Path) -> Result<Self, MirrorError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_max_open_files(100);
        opts.set_keep_log_file_num(3);

        let db = DB::open(&opts, path).map_err(|e| MirrorError::OpenFailed(e.to_string()))?;
        let mirror = Self {
            db,
            write_lock: Mutex::new(()),
        };

        info!("📦 Opened domain mirror with {} records", mirror.count()?);
        Ok(mirror)
    }

    fn get_record(&self, key: &[u8]) -> Result<Option<DomainRecord>, MirrorError> {
        match self.db.get(key).map_err(|e| MirrorError::ReadFailed(e.to_string()))? {
            Some(bytes) => bincode::deserialize(&bytes)
                .map(Some)
                .map_err(|e| MirrorError::Codec(e.to_string())),
            None => Ok(None),
        }
    }

    /// Name currently holding an identifier, if any
    fn identifier_owner(&self, identifier: &str) -> Result<Option<String>, MirrorError> {
        let owner = self
            .db
            .get(ident_key(identifier))
            .map_err(|e| MirrorError::ReadFailed(e.to_string()))?;

        Ok(owner.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn write_record(&self, record: &DomainRecord) -> Result<(), MirrorError> {
        let value = bincode::serialize(record).map_err(|e| MirrorError::Codec(e.to_string()))?;

        let mut batch = WriteBatch::default();
        batch.put(domain_key(&record.name), value);
        batch.put(ident_key(&record.identifier), record.name.as_bytes());

        self.db
            .write(batch)
            .map_err(|e| MirrorError::WriteFailed(e.to_string()))
    }

    /// Reject records whose identifier is not derived from their name
    fn check_identifier(record: &DomainRecord) -> Result<(), MirrorError> {
        if record.identifier != identifier::derive(&record.name) {
            return Err(MirrorError::Conflict(format!(
                "identifier {} does not match name {}",
                record.identifier, record.name
            )));
        }
        Ok(())
    }
}

impl Mirror for DomainMirror {
    fn find_by_name(&self, name: &str) -> Result<Option<DomainRecord>, MirrorError> {
        self.get_record(&domain_key(&identifier::normalize_name(name)))
    }

    fn find_by_identifier(&self, identifier: &str) -> Result<Option<DomainRecord>, MirrorError> {
        let id = identifier.to_lowercase();
        if !identifier::is_identifier(&id) {
            return Ok(None);
        }

        match self.identifier_owner(&id)? {
            Some(name) => self.get_record(&domain_key(&name)),
            None => Ok(None),
        }
    }

    fn insert(&self, record: &DomainRecord) -> Result<(), MirrorError> {
        Self::check_identifier(record)?;
        let _guard = self.write_lock.lock();

        let name_taken = self
            .db
            .get(domain_key(&record.name))
            .map_err(|e| MirrorError::ReadFailed(e.to_string()))?
            .is_some();
        if name_taken {
            return Err(MirrorError::Conflict(format!("name {}", record.name)));
        }

        if self.identifier_owner(&record.identifier)?.is_some() {
            return Err(MirrorError::Conflict(format!("identifier {}", record.identifier)));
        }

        self.write_record(record)
    }

    fn upsert(&self, record: &DomainRecord) -> Result<(), MirrorError> {
        Self::check_identifier(record)?;
        let _guard = self.write_lock.lock();

        if let Some(owner) = self.identifier_owner(&record.identifier)? {
            if owner != record.name {
                return Err(MirrorError::Conflict(format!(
                    "identifier {} held by {}",
                    record.identifier, owner
                )));
            }
        }

        self.write_record(record)
    }

    fn scan(&self) -> Result<Vec<DomainRecord>, MirrorError> {
        let mut records = Vec::new();
        let iter = self
            .db
            .iterator(IteratorMode::From(PREFIX_DOMAIN, rocksdb::Direction::Forward));

        for item in iter {
            let (key, value) = item.map_err(|e| MirrorError::ReadFailed(e.to_string()))?;

            if !key.starts_with(PREFIX_DOMAIN) {
                break;
            }

            match bincode::deserialize::<DomainRecord>(&value) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    "Skipping corrupt mirror entry {}: {}",
                    String::from_utf8_lossy(&key),
                    e
                ),
            }
        }

        Ok(records)
    }

    fn count(&self) -> Result<usize, MirrorError> {
        let mut count = 0;
        let iter = self
            .db
            .iterator(IteratorMode::From(PREFIX_DOMAIN, rocksdb::Direction::Forward));

        for item in iter {
            let (key, _) = item.map_err(|e| MirrorError::ReadFailed(e.to_string()))?;
            if !key.starts_with(PREFIX_DOMAIN) {
                break;
            }
            count += 1;
        }

        Ok(count)
    }

    fn flush(&self) -> Result<(), MirrorError> {
        self.db
            .flush()
            .map_err(|e| MirrorError::WriteFailed(e.to_string()))
    }
}

/// Create storage key for a domain name
fn domain_key(name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(PREFIX_DOMAIN.len() + name.len());
    key.extend_from_slice(PREFIX_DOMAIN);
    key.extend_from_slice(name.as_bytes());
    key
}

/// Create index key for an identifier
fn ident_key(identifier: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(PREFIX_IDENT.len() + identifier.len());
    key.extend_from_slice(PREFIX_IDENT);
    key.extend_from_slice(identifier.as_bytes());
    key
}
