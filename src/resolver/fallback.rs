//! System DNS fallback
//!
//! Consulted only after the ledger confirms a name is absent, and only
//! when `fallback_to_system_dns` is enabled.

use async_trait::async_trait;
use std::net::IpAddr;
use tracing::debug;

/// Metadata stored on records that came from the system resolver
pub const FALLBACK_METADATA: &str = r#"{"source":"standard_dns"}"#;

/// Secondary address source for names the ledger does not know
#[async_trait]
pub trait AddressFallback: Send + Sync {
    async fn lookup(&self, name: &str) -> Option<IpAddr>;
}

/// Resolve through the operating system resolver
pub struct SystemDnsFallback;

#[async_trait]
impl AddressFallback for SystemDnsFallback {
    async fn lookup(&self, name: &str) -> Option<IpAddr> {
        match tokio::net::lookup_host((name, 0)).await {
            Ok(mut addrs) => addrs.next().map(|addr| addr.ip()),
            Err(e) => {
                debug!("System DNS could not resolve {}: {}", name, e);
                None
            }
        }
    }
}
