//! Client for the network-state ("Scan") API family: scan endpoint
//! directory, recent updates, member traffic status, and mining rounds.
//! No authentication; these are public read-only endpoints.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{ClientError, ClientResult};
use crate::types::{DomainScans, MiningRound, ScanEndpoint, TrafficStatus, UpdateEventSummary, UpdateSummary};

const DEFAULT_TIMEOUT_MS: u64 = 10_000;

pub struct ScanClient {
    base_url: String,
    http: reqwest::Client,
    timeout: Duration,
}

/// Open and issuing mining-round tables, keyed by contract id.
#[derive(Debug, Clone, Default)]
pub struct MiningRounds {
    pub open: HashMap<String, MiningRound>,
    pub issuing: HashMap<String, MiningRound>,
}

#[derive(Debug, Deserialize)]
struct ScansResponse {
    #[serde(default)]
    scans: Vec<RawDomainScans>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
struct RawDomainScans {
    domain_id: String,
    #[serde(default)]
    scans: Vec<RawScanEndpoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
struct RawScanEndpoint {
    public_url: String,
    svc_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    #[serde(default)]
    transactions: Vec<RawScanUpdate>,
}

#[derive(Debug, Deserialize)]
struct RawScanUpdate {
    update_id: Option<String>,
    record_time: Option<DateTime<Utc>>,
    /// Either an array of events or an object keyed by event id, depending
    /// on the scan version.
    events: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct TrafficStatusResponse {
    traffic_status: Option<RawTrafficStatus>,
}

#[derive(Debug, Deserialize)]
struct RawTrafficStatus {
    actual: Option<RawTrafficActual>,
    target: Option<RawTrafficTarget>,
}

#[derive(Debug, Deserialize)]
struct RawTrafficActual {
    #[serde(default)]
    total_consumed: u64,
    #[serde(default)]
    total_limit: u64,
}

#[derive(Debug, Deserialize)]
struct RawTrafficTarget {
    #[serde(default)]
    total_purchased: u64,
}

impl ScanClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn execute(&self, req: reqwest::RequestBuilder, path: &str) -> ClientResult<Value> {
        let res = req
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ClientError::Transport {
                path: path.to_string(),
                source: e,
            })?;

        let status = res.status();
        let body = res.text().await.map_err(|e| ClientError::Transport {
            path: path.to_string(),
            source: e,
        })?;

        if !status.is_success() {
            log::warn!("[scan_api] {} -> {}", path, status);
            return Err(ClientError::Api {
                status: status.as_u16(),
                path: path.to_string(),
                body,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| ClientError::malformed(path, e.to_string()))
    }

    async fn get(&self, path: &str) -> ClientResult<Value> {
        log::debug!("[scan_api] GET {}", path);
        self.execute(self.http.get(format!("{}{}", self.base_url, path)), path)
            .await
    }

    async fn post(&self, path: &str, body: Value) -> ClientResult<Value> {
        log::debug!("[scan_api] POST {}", path);
        self.execute(
            self.http.post(format!("{}{}", self.base_url, path)).json(&body),
            path,
        )
        .await
    }

    /// Directory of approved scan endpoints per domain.
    pub async fn scans(&self) -> ClientResult<Vec<DomainScans>> {
        let path = "/v0/scans";
        let v = self.get(path).await?;
        if v.is_null() {
            return Ok(Vec::new());
        }
        let res: ScansResponse =
            serde_json::from_value(v).map_err(|e| ClientError::malformed(path, e.to_string()))?;
        Ok(res
            .scans
            .into_iter()
            .map(|d| DomainScans {
                domain_id: d.domain_id,
                scans: d
                    .scans
                    .into_iter()
                    .map(|s| ScanEndpoint {
                        public_url: s.public_url,
                        svc_name: s.svc_name,
                    })
                    .collect(),
            })
            .collect())
    }

    /// Most recent update summaries, newest first.
    pub async fn updates(&self, count: usize) -> ClientResult<Vec<UpdateSummary>> {
        let path = "/v2/updates";
        let v = self.post(path, json!({"page_size": count})).await?;
        if v.is_null() {
            return Ok(Vec::new());
        }
        let res: UpdatesResponse =
            serde_json::from_value(v).map_err(|e| ClientError::malformed(path, e.to_string()))?;
        Ok(res
            .transactions
            .into_iter()
            .filter_map(|u| {
                let update_id = u.update_id?;
                Some(UpdateSummary {
                    update_id,
                    record_time: u.record_time,
                    events: parse_update_events(u.events.as_ref()),
                })
            })
            .collect())
    }

    /// Traffic accounting for one member of a domain.
    pub async fn traffic_status(
        &self,
        domain_id: &str,
        member_id: &str,
    ) -> ClientResult<TrafficStatus> {
        let path = format!(
            "/v0/domains/{}/members/{}/traffic-status",
            urlencoding::encode(domain_id),
            urlencoding::encode(member_id)
        );
        let v = self.get(&path).await?;
        if v.is_null() {
            return Ok(TrafficStatus::default());
        }
        let res: TrafficStatusResponse =
            serde_json::from_value(v).map_err(|e| ClientError::malformed(&path, e.to_string()))?;
        let raw = res.traffic_status.unwrap_or(RawTrafficStatus {
            actual: None,
            target: None,
        });
        let actual = raw.actual.unwrap_or(RawTrafficActual {
            total_consumed: 0,
            total_limit: 0,
        });
        Ok(TrafficStatus {
            total_consumed: actual.total_consumed,
            total_limit: actual.total_limit,
            total_purchased: raw.target.map(|t| t.total_purchased).unwrap_or(0),
        })
    }

    /// Current open and issuing mining rounds.
    pub async fn mining_rounds(&self) -> ClientResult<MiningRounds> {
        let path = "/v0/open-and-issuing-mining-rounds";
        let v = self
            .post(
                path,
                json!({
                    "cached_open_mining_round_contract_ids": [],
                    "cached_issuing_round_contract_ids": [],
                }),
            )
            .await?;
        if v.is_null() {
            return Ok(MiningRounds::default());
        }
        Ok(MiningRounds {
            open: parse_round_table(v.get("open_mining_rounds")),
            issuing: parse_round_table(v.get("issuing_mining_rounds")),
        })
    }
}

/// Normalizes the scan update event collection, which is either an array of
/// event objects or an object keyed by event id.
fn parse_update_events(events: Option<&Value>) -> Vec<UpdateEventSummary> {
    let items: Vec<&Value> = match events {
        Some(Value::Array(arr)) => arr.iter().collect(),
        Some(Value::Object(map)) => map.values().collect(),
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| {
            let template_id = item
                .get("template_id")
                .or_else(|| item.get("templateId"))
                .and_then(Value::as_str)?
                .to_string();
            let choice = item
                .get("choice")
                .and_then(Value::as_str)
                .map(str::to_string);
            Some(UpdateEventSummary { template_id, choice })
        })
        .collect()
}

/// Mining-round tables are keyed by contract id; each value wraps the
/// contract with its payload.
fn parse_round_table(table: Option<&Value>) -> HashMap<String, MiningRound> {
    let Some(Value::Object(map)) = table else {
        return HashMap::new();
    };

    map.iter()
        .map(|(contract_id, entry)| {
            let contract = entry.get("contract").unwrap_or(entry);
            let payload = contract.get("payload").cloned().unwrap_or(Value::Null);
            let round_number = payload
                .get("round")
                .and_then(|r| r.get("number"))
                .and_then(|n| {
                    n.as_u64()
                        .or_else(|| n.as_str().and_then(|s| s.parse().ok()))
                });
            let opens_at = payload
                .get("opensAt")
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<DateTime<Utc>>().ok());
            (
                contract_id.clone(),
                MiningRound {
                    contract_id: contract_id.clone(),
                    round_number,
                    opens_at,
                    payload,
                },
            )
        })
        .collect()
}
