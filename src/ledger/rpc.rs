//! JSON-RPC client for the ledger node

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use super::protocol::{
    DomainProfilesResponse, JsonRpcRequest, JsonRpcResponse, ProfileResponse,
    METHOD_GET_DOMAIN_PROFILES, METHOD_GET_PROFILE,
};
use super::{Ledger, LedgerError, LedgerListing};
use crate::config::ResolverConfig;
use crate::identifier;
use crate::types::DomainRecord;

/// Request id sent with every call
const RPC_CLIENT_ID: &str = "ledger-dns";

/// RPC client for the ledger node
pub struct RpcLedger {
    url: String,
    credentials: Option<(String, String)>,
    timeout_secs: u64,
    client: Client,
}

impl RpcLedger {
    /// Create a new client; the timeout bounds every request end to end
    pub fn new(
        url: &str,
        credentials: Option<(String, String)>,
        timeout_secs: u64,
    ) -> Result<Self, LedgerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        Ok(Self {
            url: url.to_string(),
            credentials,
            timeout_secs,
            client,
        })
    }

    /// Build a client from service configuration
    pub fn from_config(config: &ResolverConfig) -> Result<Self, LedgerError> {
        Self::new(
            &config.ledger_rpc_url,
            config.ledger_credentials(),
            config.ledger_timeout_secs,
        )
    }

    /// Make a JSON-RPC call; a null result is `Ok(None)`
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<Option<T>, LedgerError> {
        let request = JsonRpcRequest {
            jsonrpc: "1.0",
            id: RPC_CLIENT_ID,
            method,
            params,
        };

        let mut builder = self.client.post(&self.url).json(&request);
        if let Some((user, password)) = &self.credentials {
            builder = builder.basic_auth(user, Some(password));
        }

        let response = builder.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;

        // Nodes answer RPC errors with a non-2xx status and a JSON body,
        // so try the envelope first and fall back to the status code.
        match decode_response(&body) {
            Ok(result) => Ok(result),
            Err(LedgerError::Malformed(_)) if !status.is_success() => {
                Err(LedgerError::Http(status.as_u16()))
            }
            Err(e) => Err(e),
        }
    }

    fn transport_error(&self, error: reqwest::Error) -> LedgerError {
        if error.is_timeout() {
            LedgerError::Timeout(self.timeout_secs)
        } else {
            LedgerError::Transport(error.to_string())
        }
    }
}

/// Decode a JSON-RPC response body
fn decode_response<T: DeserializeOwned>(body: &[u8]) -> Result<Option<T>, LedgerError> {
    let envelope: JsonRpcResponse<T> =
        serde_json::from_slice(body).map_err(|e| LedgerError::Malformed(e.to_string()))?;

    if let Some(error) = envelope.error {
        return Err(LedgerError::Rpc {
            code: error.code,
            message: error.message,
        });
    }

    Ok(envelope.result)
}

/// RPC error codes the node uses for an unknown profile id
const PROFILE_NOT_FOUND_CODES: [i64; 2] = [-5, -8];

/// Map the node's "no such profile" errors to absence.
///
/// Every other RPC error (warm-up, internal error, overload) stays an
/// error so it is never mistaken for a confirmed absence.
fn absent_on_not_found<T>(result: Result<Option<T>, LedgerError>) -> Result<Option<T>, LedgerError> {
    match result {
        Err(LedgerError::Rpc { code, message }) if PROFILE_NOT_FOUND_CODES.contains(&code) => {
            debug!("Ledger has no such profile ({}: {})", code, message);
            Ok(None)
        }
        other => other,
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn lookup_by_name(&self, name: &str) -> Result<Option<DomainRecord>, LedgerError> {
        let id = identifier::derive(name);
        debug!("Looking up {} as {}", name, id);

        let profile: Option<ProfileResponse> =
            absent_on_not_found(self.call(METHOD_GET_PROFILE, serde_json::json!([id])).await)?;

        match profile {
            Some(profile) if profile.is_domain() => Ok(Some(profile.into_record(name))),
            Some(_) => {
                debug!("Profile {} exists but is not a domain", id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn list_all(&self) -> Result<LedgerListing, LedgerError> {
        let response: DomainProfilesResponse = self
            .call(METHOD_GET_DOMAIN_PROFILES, serde_json::json!([]))
            .await?
            .ok_or_else(|| LedgerError::Malformed("empty domain listing".to_string()))?;

        if response.total as usize != response.domains.len() {
            warn!(
                "Ledger reported total {} but listed {} domains",
                response.total,
                response.domains.len()
            );
        }

        Ok(response.into())
    }
}
