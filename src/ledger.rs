//! Stateless request layer for the participant node's JSON Ledger API.
//!
//! Every operation issues a single HTTP request against `{endpoint}{path}`
//! with bearer-token injection when configured. Non-2xx responses raise
//! [`ClientError::Api`] carrying the status code and request path; remote
//! 404s on point lookups are mapped to `None` by the caller-facing methods.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::{not_found_to_none, ClientError, ClientResult};
use crate::types::{ConnectionStatus, Contract, Party, Transaction};
use crate::wire;

const DEFAULT_TIMEOUT_MS: u64 = 10_000;

pub struct LedgerClient {
    endpoint: String,
    auth_token: Option<String>,
    http: reqwest::Client,
    timeout: Duration,
}

/// Options for the active-contracts snapshot call.
#[derive(Debug, Clone, Default)]
pub struct ActiveContractsOptions {
    pub template_ids: Vec<String>,
    /// Snapshot offset; defaults to the current ledger end.
    pub offset: Option<u64>,
    pub verbose: bool,
}

/// Options for the transaction-stream call. Begin is exclusive, end
/// inclusive; `limit` truncates client-side after the fetch (no server-side
/// limit is assumed reliable).
#[derive(Debug, Clone, Default)]
pub struct TransactionsOptions {
    pub begin_offset: u64,
    pub end_offset: Option<u64>,
    pub limit: Option<usize>,
}

/// Builds the transaction filter for ACS and stream requests.
///
/// With no template ids this produces a wildcard filter scoped to *any
/// party* (requesting created-event blobs), relying on the server to enforce
/// visibility; with template ids it scopes cumulative template filters to
/// the exact requesting party. The asymmetry is a reproduced behavior of the
/// deployed system, kept for product-owner review rather than silently
/// unified.
pub fn build_transaction_filter(party_id: &str, template_ids: &[String]) -> Value {
    if template_ids.is_empty() {
        return json!({
            "filtersByParty": {},
            "filtersForAnyParty": {
                "cumulative": [{
                    "identifierFilter": {
                        "WildcardFilter": {
                            "value": {"includeCreatedEventBlob": true}
                        }
                    }
                }]
            }
        });
    }

    let cumulative: Vec<Value> = template_ids
        .iter()
        .map(|tid| {
            json!({
                "identifierFilter": {
                    "TemplateFilter": {
                        "value": {
                            "templateId": tid,
                            "includeCreatedEventBlob": true
                        }
                    }
                }
            })
        })
        .collect();

    json!({
        "filtersByParty": {
            party_id: {"cumulative": cumulative}
        }
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerEndResponse {
    #[serde(default)]
    offset: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartiesResponse {
    #[serde(default)]
    party_details: Vec<RawPartyDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPartyDetails {
    party: String,
    display_name: Option<String>,
    #[serde(default)]
    is_local: bool,
}

impl From<RawPartyDetails> for Party {
    fn from(raw: RawPartyDetails) -> Self {
        Party {
            party_id: raw.party,
            display_name: raw.display_name.filter(|d| !d.is_empty()),
            is_local: raw.is_local,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllocatePartyResponse {
    party_details: RawPartyDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionByIdResponse {
    transaction: wire::RawTransaction,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContractEventsResponse {
    created: Option<ContractCreatedEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContractCreatedEntry {
    created_event: wire::RawCreatedEvent,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackagesResponse {
    #[serde(default)]
    package_ids: Vec<String>,
}

impl LedgerClient {
    pub fn new(endpoint: &str, auth_token: Option<String>) -> Self {
        Self::with_timeout(endpoint, auth_token, Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }

    pub fn with_timeout(endpoint: &str, auth_token: Option<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            auth_token,
            http: reqwest::Client::new(),
            timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn execute(&self, req: reqwest::RequestBuilder, path: &str) -> ClientResult<Value> {
        let mut req = req.timeout(self.timeout);
        if let Some(token) = &self.auth_token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }

        let res = req.send().await.map_err(|e| ClientError::Transport {
            path: path.to_string(),
            source: e,
        })?;

        let status = res.status();
        let body = res.text().await.map_err(|e| ClientError::Transport {
            path: path.to_string(),
            source: e,
        })?;

        if !status.is_success() {
            log::warn!("[ledger_api] {} -> {}", path, status);
            return Err(ClientError::Api {
                status: status.as_u16(),
                path: path.to_string(),
                body,
            });
        }

        // An empty body is an empty success value, not an error
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| ClientError::malformed(path, e.to_string()))
    }

    async fn get(&self, path: &str) -> ClientResult<Value> {
        log::debug!("[ledger_api] GET {}", path);
        let url = format!("{}{}", self.endpoint, path);
        self.execute(self.http.get(url), path).await
    }

    async fn post(&self, path: &str, body: Value) -> ClientResult<Value> {
        log::debug!("[ledger_api] POST {}", path);
        let url = format!("{}{}", self.endpoint, path);
        self.execute(self.http.post(url).json(&body), path).await
    }

    fn parse<T: DeserializeOwned>(path: &str, value: Value) -> ClientResult<T> {
        serde_json::from_value(value).map_err(|e| ClientError::malformed(path, e.to_string()))
    }

    /// Sole connectivity probe: fetches the current ledger-end offset.
    pub async fn ping(&self) -> ClientResult<u64> {
        let path = "/v2/state/ledger-end";
        let v = self.get(path).await?;
        if v.is_null() {
            return Ok(0);
        }
        let end: LedgerEndResponse = Self::parse(path, v)?;
        Ok(end.offset)
    }

    /// Wraps [`ping`](Self::ping); any failure becomes a disconnected
    /// status with a message. Never returns an error.
    pub async fn connection_status(&self) -> ConnectionStatus {
        match self.ping().await {
            Ok(ledger_end) => ConnectionStatus::Connected {
                endpoint: self.endpoint.clone(),
                ledger_end,
            },
            Err(e) => ConnectionStatus::Disconnected {
                endpoint: self.endpoint.clone(),
                error: e.to_string(),
            },
        }
    }

    /// Lists parties known to the participant. A response omitting the
    /// party-details field is an empty list, not an error.
    pub async fn parties(&self) -> ClientResult<Vec<Party>> {
        let path = "/v2/parties";
        let v = self.get(path).await?;
        if v.is_null() {
            return Ok(Vec::new());
        }
        let res: PartiesResponse = Self::parse(path, v)?;
        Ok(res.party_details.into_iter().map(Party::from).collect())
    }

    pub async fn allocate_party(&self, hint: &str) -> ClientResult<Party> {
        let path = "/v2/parties";
        let v = self
            .post(path, json!({"partyIdHint": hint, "identityProviderId": ""}))
            .await?;
        let res: AllocatePartyResponse = Self::parse(path, v)?;
        Ok(res.party_details.into())
    }

    /// Fetches the active-contract snapshot for `party_id` at the requested
    /// offset (default: current ledger end). Entries without a created-event
    /// payload are silently skipped.
    pub async fn active_contracts(
        &self,
        party_id: &str,
        opts: &ActiveContractsOptions,
    ) -> ClientResult<Vec<Contract>> {
        let path = "/v2/state/active-contracts";
        let at_offset = match opts.offset {
            Some(o) => o,
            None => self.ping().await?,
        };

        let body = json!({
            "filter": build_transaction_filter(party_id, &opts.template_ids),
            "verbose": opts.verbose,
            "activeAtOffset": at_offset,
        });

        let v = self.post(path, body).await?;
        if v.is_null() {
            return Ok(Vec::new());
        }
        let entries: Vec<wire::RawAcsEntry> = Self::parse(path, v)?;

        let mut contracts = Vec::with_capacity(entries.len());
        for entry in entries {
            match wire::contract_from_acs_entry(entry, at_offset) {
                Ok(Some(c)) => contracts.push(c),
                Ok(None) => {}
                Err(e) => return Err(ClientError::malformed(path, e.to_string())),
            }
        }
        log::info!(
            "[ledger_api] loaded {} active contracts for {}",
            contracts.len(),
            party_id
        );
        Ok(contracts)
    }

    /// Fetches flat transactions visible to `party_id` in the offset range
    /// `(begin, end]`, truncated client-side to `limit`.
    pub async fn transactions(
        &self,
        party_id: &str,
        opts: &TransactionsOptions,
    ) -> ClientResult<Vec<Transaction>> {
        let path = "/v2/updates/transactions";
        let end = match opts.end_offset {
            Some(o) => o,
            None => self.ping().await?,
        };

        let body = json!({
            "beginExclusive": opts.begin_offset,
            "endInclusive": end,
            "filter": build_transaction_filter(party_id, &[]),
            "verbose": false,
        });

        let v = self.post(path, body).await?;
        if v.is_null() {
            return Ok(Vec::new());
        }
        let items: Vec<wire::RawUpdateEnvelope> = Self::parse(path, v)?;

        let mut txs = Vec::new();
        for item in items {
            match wire::transaction_from_update(item.update) {
                Ok(Some(tx)) => txs.push(tx),
                Ok(None) => {}
                Err(e) => return Err(ClientError::malformed(path, e.to_string())),
            }
        }
        if let Some(limit) = opts.limit {
            txs.truncate(limit);
        }
        log::info!("[ledger_api] loaded {} transactions for {}", txs.len(), party_id);
        Ok(txs)
    }

    /// Point lookup of one transaction. Remote 404 yields `None`.
    pub async fn transaction_by_id(
        &self,
        update_id: &str,
        party_id: &str,
    ) -> ClientResult<Option<Transaction>> {
        let path = "/v2/updates/transaction-by-id";
        let res = self
            .post(
                path,
                json!({"updateId": update_id, "requestingParties": [party_id]}),
            )
            .await;
        match not_found_to_none(res)? {
            None => Ok(None),
            Some(v) => {
                let body: TransactionByIdResponse = Self::parse(path, v)?;
                let tx = wire::transaction_from_raw(body.transaction)
                    .map_err(|e| ClientError::malformed(path, e.to_string()))?;
                Ok(Some(tx))
            }
        }
    }

    /// Point lookup of one contract by id. Remote 404 yields `None`; a
    /// response without a created event (archived before pruning) also
    /// yields `None`.
    pub async fn contract(
        &self,
        contract_id: &str,
        party_id: &str,
    ) -> ClientResult<Option<Contract>> {
        let path = "/v2/events/contract";
        let res = self
            .post(
                path,
                json!({"contractId": contract_id, "requestingParties": [party_id]}),
            )
            .await;
        match not_found_to_none(res)? {
            None => Ok(None),
            Some(v) => {
                let body: ContractEventsResponse = Self::parse(path, v)?;
                match body.created {
                    None => Ok(None),
                    Some(entry) => wire::contract_from_created(entry.created_event, 0)
                        .map(Some)
                        .map_err(|e| ClientError::malformed(path, e.to_string())),
                }
            }
        }
    }

    /// Lists uploaded package ids; a response omitting the list is `[]`.
    pub async fn list_packages(&self) -> ClientResult<Vec<String>> {
        let path = "/v2/packages";
        let v = self.get(path).await?;
        if v.is_null() {
            return Ok(Vec::new());
        }
        let res: PackagesResponse = Self::parse(path, v)?;
        Ok(res.package_ids)
    }

    /// Package metadata by id. Remote 404 yields `None`.
    pub async fn package(&self, package_id: &str) -> ClientResult<Option<Value>> {
        let path = format!("/v2/packages/{}", urlencoding::encode(package_id));
        not_found_to_none(self.get(&path).await)
    }
}

/// Seam between the projection store and the ledger. The store depends on
/// this trait so its load/commit behavior is testable with a scripted
/// implementation.
#[async_trait]
pub trait LedgerApi: Send + Sync {
    async fn ping(&self) -> ClientResult<u64>;
    async fn parties(&self) -> ClientResult<Vec<Party>>;
    async fn active_contracts(
        &self,
        party_id: &str,
        opts: &ActiveContractsOptions,
    ) -> ClientResult<Vec<Contract>>;
    async fn transactions(
        &self,
        party_id: &str,
        opts: &TransactionsOptions,
    ) -> ClientResult<Vec<Transaction>>;
}

#[async_trait]
impl LedgerApi for LedgerClient {
    async fn ping(&self) -> ClientResult<u64> {
        LedgerClient::ping(self).await
    }

    async fn parties(&self) -> ClientResult<Vec<Party>> {
        LedgerClient::parties(self).await
    }

    async fn active_contracts(
        &self,
        party_id: &str,
        opts: &ActiveContractsOptions,
    ) -> ClientResult<Vec<Contract>> {
        LedgerClient::active_contracts(self, party_id, opts).await
    }

    async fn transactions(
        &self,
        party_id: &str,
        opts: &TransactionsOptions,
    ) -> ClientResult<Vec<Transaction>> {
        LedgerClient::transactions(self, party_id, opts).await
    }
}
