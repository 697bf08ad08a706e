//! Domain identifier derivation
//!
//! The ledger keys domain profiles by HASH160 of the lowercased name,
//! the same construction used for Bitcoin addresses:
//! `RIPEMD160(SHA256(utf8(lowercase(name))))`, rendered as lowercase hex.
//! This is the join key between local names and ledger records.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Length of a rendered identifier (20 bytes as hex)
pub const IDENTIFIER_HEX_LEN: usize = 40;

/// Normalize a domain name to its identity form
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Derive the ledger identifier for a domain name
pub fn derive(name: &str) -> String {
    let normalized = name.to_lowercase();
    let sha = Sha256::digest(normalized.as_bytes());
    let hash160 = Ripemd160::digest(sha);
    hex::encode(hash160)
}

/// Check that a string looks like a rendered identifier
pub fn is_identifier(value: &str) -> bool {
    value.len() == IDENTIFIER_HEX_LEN
        && value.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
