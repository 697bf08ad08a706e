//! Resolver Configuration
//!
//! Configurable parameters for the resolver service.
//! Loaded from TOML, then overridden from the command line.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Upper bound on the reconciliation interval (one year)
const MAX_RECONCILE_INTERVAL_SECS: u64 = 365 * 24 * 60 * 60;

/// What reconciliation does with mirrored domains missing from the ledger listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingDomainPolicy {
    /// Leave them untouched
    #[default]
    Retain,

    /// Set `is_banned` on them (never deleted)
    MarkBanned,
}

/// Main configuration for the resolver service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    // === Network ===

    /// Port for the HTTP API
    pub api_port: u16,

    // === Ledger ===

    /// Ledger node JSON-RPC endpoint
    pub ledger_rpc_url: String,

    /// Basic-auth user for the ledger node
    pub ledger_rpc_user: Option<String>,

    /// Basic-auth password for the ledger node
    pub ledger_rpc_password: Option<String>,

    /// Per-request timeout for ledger calls (seconds)
    pub ledger_timeout_secs: u64,

    // === Reconciliation ===

    /// Interval between reconciliation passes (seconds)
    pub reconcile_interval_secs: u64,

    /// Pause between mirror writes during a pass (milliseconds)
    pub reconcile_write_delay_ms: u64,

    /// Handling of mirrored domains absent from the ledger listing
    pub missing_domain_policy: MissingDomainPolicy,

    // === Cache ===

    /// TTL for successful resolutions (seconds)
    pub positive_cache_ttl_secs: u64,

    /// TTL for confirmed absences (seconds)
    pub negative_cache_ttl_secs: u64,

    /// Interval for sweeping expired cache entries (seconds, 0 disables)
    pub cache_sweep_interval_secs: u64,

    // === Fallback ===

    /// Try the system resolver when the ledger has no such domain
    pub fallback_to_system_dns: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            // Network
            api_port: 3100,

            // Ledger
            ledger_rpc_url: "http://127.0.0.1:8332".to_string(),
            ledger_rpc_user: None,
            ledger_rpc_password: None,
            ledger_timeout_secs: 30,

            // Reconciliation
            reconcile_interval_secs: 15 * 60,  // 15 minutes
            reconcile_write_delay_ms: 50,
            missing_domain_policy: MissingDomainPolicy::Retain,

            // Cache
            positive_cache_ttl_secs: 3600,     // 1 hour
            negative_cache_ttl_secs: 1800,     // 30 minutes
            cache_sweep_interval_secs: 300,

            // Fallback
            fallback_to_system_dns: false,
        }
    }
}

impl ResolverConfig {
    /// Load configuration from TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    // Builder-style methods for CLI overrides

    pub fn with_api_port(mut self, port: Option<u16>) -> Self {
        if let Some(port) = port {
            self.api_port = port;
        }
        self
    }

    pub fn with_rpc_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.ledger_rpc_url = url;
        }
        self
    }

    pub fn with_rpc_credentials(mut self, user: Option<String>, password: Option<String>) -> Self {
        if user.is_some() {
            self.ledger_rpc_user = user;
        }
        if password.is_some() {
            self.ledger_rpc_password = password;
        }
        self
    }

    pub fn with_reconcile_interval_mins(mut self, minutes: Option<u64>) -> Self {
        if let Some(minutes) = minutes {
            self.reconcile_interval_secs = minutes.saturating_mul(60);
        }
        self
    }

    /// Ledger basic-auth credentials, if both halves are configured
    pub fn ledger_credentials(&self) -> Option<(String, String)> {
        match (&self.ledger_rpc_user, &self.ledger_rpc_password) {
            (Some(user), Some(password)) => Some((user.clone(), password.clone())),
            _ => None,
        }
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    pub fn reconcile_write_delay(&self) -> Duration {
        Duration::from_millis(self.reconcile_write_delay_ms)
    }

    pub fn positive_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.positive_cache_ttl_secs)
    }

    pub fn negative_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.negative_cache_ttl_secs)
    }

    /// Validate configuration values
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.ledger_rpc_url.trim().is_empty() {
            anyhow::bail!("ledger_rpc_url must not be empty");
        }

        if self.ledger_rpc_user.is_some() != self.ledger_rpc_password.is_some() {
            anyhow::bail!("ledger_rpc_user and ledger_rpc_password must be set together");
        }

        if self.ledger_timeout_secs == 0 {
            anyhow::bail!("ledger_timeout_secs must be greater than zero");
        }

        if self.reconcile_interval_secs == 0 {
            anyhow::bail!("reconcile_interval_secs must be greater than zero");
        }

        if self.reconcile_interval_secs > MAX_RECONCILE_INTERVAL_SECS {
            anyhow::bail!(
                "reconcile_interval_secs must be at most {} (got {})",
                MAX_RECONCILE_INTERVAL_SECS,
                self.reconcile_interval_secs
            );
        }

        if self.positive_cache_ttl_secs == 0 || self.negative_cache_ttl_secs == 0 {
            anyhow::bail!(
                "cache TTLs must be greater than zero (positive={}, negative={})",
                self.positive_cache_ttl_secs,
                self.negative_cache_ttl_secs
            );
        }

        Ok(())
    }
}
