//! Client for the public network explorer statistics API, reached through a
//! third-party CORS relay. Unauthenticated; every call is best-effort and
//! callers degrade to empty defaults on failure.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::error::{ClientError, ClientResult};
use crate::types::{ActivityPoint, NetworkStats, PricePoint, UpdateEventSummary, UpdateSummary, ValidatorInfo};

const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Query window for the history facets. Each selector scopes only its own
/// facet's query parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimePeriod {
    Day,
    Week,
    Month,
}

impl std::str::FromStr for TimePeriod {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" | "24h" | "1d" => Ok(TimePeriod::Day),
            "week" | "7d" => Ok(TimePeriod::Week),
            "month" | "30d" => Ok(TimePeriod::Month),
            _ => Err(anyhow::anyhow!(
                "Invalid period '{s}'. Valid options: day, week, month"
            )),
        }
    }
}

impl std::fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimePeriod::Day => write!(f, "day"),
            TimePeriod::Week => write!(f, "week"),
            TimePeriod::Month => write!(f, "month"),
        }
    }
}

impl Default for TimePeriod {
    fn default() -> Self {
        TimePeriod::Day
    }
}

pub struct ExplorerApiClient {
    base_url: String,
    http: reqwest::Client,
    timeout: Duration,
}

/// Builds the request URL. A relay base of the form `{relay}?url={target}`
/// carries the upstream URL in a query parameter, so the path (including its
/// own query string) must be percent-encoded into that parameter; a plain
/// base is simple concatenation.
fn compose_url(base: &str, path: &str) -> String {
    match base.split_once("?url=") {
        Some((relay, target)) => {
            format!("{relay}?url={}", urlencoding::encode(&format!("{target}{path}")))
        }
        None => format!("{base}{path}"),
    }
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    total_supply: Option<f64>,
    circulating_supply: Option<f64>,
    active_validators: Option<u64>,
    total_transactions: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    usd: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawPoint {
    time: Option<DateTime<Utc>>,
    usd: Option<f64>,
    tx_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawValidator {
    name: Option<String>,
    party_id: Option<String>,
    rewards: Option<f64>,
}

impl ExplorerApiClient {
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

    async fn get(&self, path: &str) -> ClientResult<Value> {
        log::debug!("[explorer_api] GET {}", path);
        let res = self
            .http
            .get(compose_url(&self.base_url, path))
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
            log::warn!("[explorer_api] {} -> {}", path, status);
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

    fn parse<T: serde::de::DeserializeOwned>(path: &str, v: Value) -> ClientResult<T> {
        serde_json::from_value(v).map_err(|e| ClientError::malformed(path, e.to_string()))
    }

    pub async fn stats(&self) -> ClientResult<NetworkStats> {
        let path = "/v0/stats";
        let v = self.get(path).await?;
        if v.is_null() {
            return Ok(NetworkStats::default());
        }
        let res: StatsResponse = Self::parse(path, v)?;
        Ok(NetworkStats {
            total_supply: res.total_supply,
            circulating_supply: res.circulating_supply,
            active_validators: res.active_validators,
            total_transactions: res.total_transactions,
        })
    }

    /// Current USD price; `None` when the facet reports no value.
    pub async fn price(&self) -> ClientResult<Option<f64>> {
        let path = "/v0/price";
        let v = self.get(path).await?;
        if v.is_null() {
            return Ok(None);
        }
        let res: PriceResponse = Self::parse(path, v)?;
        Ok(res.usd)
    }

    /// Recent publicly visible update summaries.
    pub async fn recent_updates(&self, count: usize) -> ClientResult<Vec<UpdateSummary>> {
        let path = format!("/v0/updates?count={count}");
        let v = self.get(&path).await?;
        if v.is_null() {
            return Ok(Vec::new());
        }
        let items: Vec<Value> = Self::parse(&path, v)?;
        Ok(items
            .into_iter()
            .filter_map(|item| {
                let update_id = item
                    .get("update_id")
                    .or_else(|| item.get("updateId"))
                    .and_then(Value::as_str)?
                    .to_string();
                let record_time = item
                    .get("record_time")
                    .and_then(Value::as_str)
                    .and_then(|s| s.parse::<DateTime<Utc>>().ok());
                let events = item
                    .get("events")
                    .and_then(Value::as_array)
                    .map(|arr| {
                        arr.iter()
                            .filter_map(|e| {
                                let template_id = e
                                    .get("template_id")
                                    .and_then(Value::as_str)?
                                    .to_string();
                                Some(UpdateEventSummary {
                                    template_id,
                                    choice: e
                                        .get("choice")
                                        .and_then(Value::as_str)
                                        .map(str::to_string),
                                })
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                Some(UpdateSummary {
                    update_id,
                    record_time,
                    events,
                })
            })
            .collect())
    }

    pub async fn activity(&self, period: TimePeriod) -> ClientResult<Vec<ActivityPoint>> {
        let path = format!("/v0/activity?period={period}");
        let v = self.get(&path).await?;
        if v.is_null() {
            return Ok(Vec::new());
        }
        let points: Vec<RawPoint> = Self::parse(&path, v)?;
        Ok(points
            .into_iter()
            .map(|p| ActivityPoint {
                time: p.time,
                tx_count: p.tx_count.unwrap_or(0),
            })
            .collect())
    }

    pub async fn price_history(&self, period: TimePeriod) -> ClientResult<Vec<PricePoint>> {
        let path = format!("/v0/price/history?period={period}");
        let v = self.get(&path).await?;
        if v.is_null() {
            return Ok(Vec::new());
        }
        let points: Vec<RawPoint> = Self::parse(&path, v)?;
        Ok(points
            .into_iter()
            .filter_map(|p| {
                p.usd.map(|usd| PricePoint { time: p.time, usd })
            })
            .collect())
    }

    pub async fn validators(&self, period: TimePeriod) -> ClientResult<Vec<ValidatorInfo>> {
        let path = format!("/v0/validators?period={period}");
        let v = self.get(&path).await?;
        if v.is_null() {
            return Ok(Vec::new());
        }
        let raw: Vec<RawValidator> = Self::parse(&path, v)?;
        Ok(raw
            .into_iter()
            .filter_map(|r| {
                let name = r.name.filter(|n| !n.is_empty())?;
                Some(ValidatorInfo {
                    name,
                    party_id: r.party_id,
                    rewards: r.rewards,
                })
            })
            .collect())
    }
}
