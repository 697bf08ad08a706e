//! Field-level record diff
//!
//! Reconciliation only rewrites the fields that actually changed. Identity
//! fields (`name`, `identifier`) and `updated_at` are never tracked.

use crate::types::DomainRecord;

/// Mutable fields compared during reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedField {
    Address,
    Owner,
    Signer,
    Metadata,
    Rps,
    IsRented,
    Tenant,
    RentedAt,
    Duration,
    IsBanned,
    IsCandidate,
    IsDomain,
    Missed,
    OfferedAt,
    BidAmount,
    Buyer,
    Balance,
    BidTarget,
    OwnedSubrecords,
}

impl TrackedField {
    pub const ALL: [TrackedField; 19] = [
        TrackedField::Address,
        TrackedField::Owner,
        TrackedField::Signer,
        TrackedField::Metadata,
        TrackedField::Rps,
        TrackedField::IsRented,
        TrackedField::Tenant,
        TrackedField::RentedAt,
        TrackedField::Duration,
        TrackedField::IsBanned,
        TrackedField::IsCandidate,
        TrackedField::IsDomain,
        TrackedField::Missed,
        TrackedField::OfferedAt,
        TrackedField::BidAmount,
        TrackedField::Buyer,
        TrackedField::Balance,
        TrackedField::BidTarget,
        TrackedField::OwnedSubrecords,
    ];

    /// Whether this field differs between two records
    pub fn differs(self, current: &DomainRecord, incoming: &DomainRecord) -> bool {
        match self {
            TrackedField::Address => current.address != incoming.address,
            TrackedField::Owner => current.owner != incoming.owner,
            TrackedField::Signer => current.signer != incoming.signer,
            TrackedField::Metadata => {
                !metadata_equal(current.metadata.as_deref(), incoming.metadata.as_deref())
            }
            TrackedField::Rps => current.rps != incoming.rps,
            TrackedField::IsRented => current.is_rented != incoming.is_rented,
            TrackedField::Tenant => current.tenant != incoming.tenant,
            TrackedField::RentedAt => current.rented_at != incoming.rented_at,
            TrackedField::Duration => current.duration != incoming.duration,
            TrackedField::IsBanned => current.is_banned != incoming.is_banned,
            TrackedField::IsCandidate => current.is_candidate != incoming.is_candidate,
            TrackedField::IsDomain => current.is_domain != incoming.is_domain,
            TrackedField::Missed => current.missed != incoming.missed,
            TrackedField::OfferedAt => current.offered_at != incoming.offered_at,
            TrackedField::BidAmount => current.bid_amount != incoming.bid_amount,
            TrackedField::Buyer => current.buyer != incoming.buyer,
            TrackedField::Balance => current.balance != incoming.balance,
            TrackedField::BidTarget => current.bid_target != incoming.bid_target,
            TrackedField::OwnedSubrecords => current.owned_subrecords != incoming.owned_subrecords,
        }
    }

    /// Copy this field from `source` into `target`
    pub fn copy(self, source: &DomainRecord, target: &mut DomainRecord) {
        match self {
            TrackedField::Address => target.address = source.address.clone(),
            TrackedField::Owner => target.owner = source.owner.clone(),
            TrackedField::Signer => target.signer = source.signer.clone(),
            TrackedField::Metadata => target.metadata = source.metadata.clone(),
            TrackedField::Rps => target.rps = source.rps,
            TrackedField::IsRented => target.is_rented = source.is_rented,
            TrackedField::Tenant => target.tenant = source.tenant.clone(),
            TrackedField::RentedAt => target.rented_at = source.rented_at,
            TrackedField::Duration => target.duration = source.duration,
            TrackedField::IsBanned => target.is_banned = source.is_banned,
            TrackedField::IsCandidate => target.is_candidate = source.is_candidate,
            TrackedField::IsDomain => target.is_domain = source.is_domain,
            TrackedField::Missed => target.missed = source.missed,
            TrackedField::OfferedAt => target.offered_at = source.offered_at,
            TrackedField::BidAmount => target.bid_amount = source.bid_amount,
            TrackedField::Buyer => target.buyer = source.buyer.clone(),
            TrackedField::Balance => target.balance = source.balance,
            TrackedField::BidTarget => target.bid_target = source.bid_target.clone(),
            TrackedField::OwnedSubrecords => {
                target.owned_subrecords = source.owned_subrecords.clone()
            }
        }
    }
}

/// Fields that differ between the mirrored record and the ledger's view
pub fn changed_fields(current: &DomainRecord, incoming: &DomainRecord) -> Vec<TrackedField> {
    TrackedField::ALL
        .into_iter()
        .filter(|field| field.differs(current, incoming))
        .collect()
}

/// Overwrite exactly `fields` on `target` and bump its mutation time
pub fn apply_changes(target: &mut DomainRecord, source: &DomainRecord, fields: &[TrackedField]) {
    for field in fields {
        field.copy(source, target);
    }
    if !fields.is_empty() {
        target.touch();
    }
}

/// Compare metadata in canonical form.
///
/// JSON payloads compare by value, so key order and whitespace do not
/// count as changes; anything else compares as raw text.
fn metadata_equal(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) if a == b => true,
        (Some(a), Some(b)) => {
            match (
                serde_json::from_str::<serde_json::Value>(a),
                serde_json::from_str::<serde_json::Value>(b),
            ) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            }
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Subrecord;

    fn record(address: &str) -> DomainRecord {
        let mut record = DomainRecord::new("alpha.domain");
        record.address = address.to_string();
        record.owner = Some("0xowner".to_string());
        record.metadata = Some(r#"{"extra":null,"height":10,"rps":5}"#.to_string());
        record
    }

    #[test]
    fn test_identical_records_have_no_changes() {
        let a = record("10.0.0.1");
        let mut b = a.clone();
        b.touch();
        assert!(changed_fields(&a, &b).is_empty());
    }

    #[test]
    fn test_detects_changed_fields() {
        let a = record("10.0.0.1");
        let mut b = a.clone();
        b.address = "10.0.0.2".to_string();
        b.is_banned = true;

        assert_eq!(
            changed_fields(&a, &b),
            vec![TrackedField::Address, TrackedField::IsBanned]
        );
    }

    #[test]
    fn test_metadata_compared_canonically() {
        let a = record("10.0.0.1");
        let mut b = a.clone();
        b.metadata = Some(r#"{ "rps": 5, "height": 10, "extra": null }"#.to_string());
        assert!(changed_fields(&a, &b).is_empty());

        b.metadata = Some(r#"{"rps":6,"height":10,"extra":null}"#.to_string());
        assert_eq!(changed_fields(&a, &b), vec![TrackedField::Metadata]);

        b.metadata = Some("0xdata".to_string());
        assert_eq!(changed_fields(&a, &b), vec![TrackedField::Metadata]);
    }

    #[test]
    fn test_subrecords_compared_structurally() {
        let a = record("10.0.0.1");
        let mut b = a.clone();
        b.owned_subrecords.push(Subrecord {
            id: "0xsub".to_string(),
            name: "sub.alpha.domain".to_string(),
            address: Some("10.0.0.9".to_string()),
            metadata: None,
            owner: None,
            rps: None,
            ownership_type: None,
            tenant: None,
            rented_at: None,
            duration: None,
            is_candidate: false,
            is_banned: false,
            is_domain: true,
            offered_at: None,
            bid_amount: None,
            buyer: None,
            balance: None,
            bid_target: None,
        });

        assert_eq!(changed_fields(&a, &b), vec![TrackedField::OwnedSubrecords]);
    }

    #[test]
    fn test_apply_changes_touches_only_listed_fields() {
        let mut current = record("10.0.0.1");
        current.signer = Some("0xsigner".to_string());
        let before = current.updated_at;

        let mut incoming = current.clone();
        incoming.address = "10.0.0.2".to_string();
        incoming.signer = None;

        apply_changes(&mut current, &incoming, &[TrackedField::Address]);

        assert_eq!(current.address, "10.0.0.2");
        assert_eq!(current.signer.as_deref(), Some("0xsigner"));
        assert!(current.updated_at >= before);
    }
}
