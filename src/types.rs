use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// A party known to the participant node.
///
/// Identity is the full `party_id` in `DisplayName::fingerprint` format;
/// parties are immutable once fetched and refreshed wholesale by re-listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub party_id: String,
    pub display_name: Option<String>,
    pub is_local: bool,
}

impl Party {
    /// Human-readable prefix of the party id (everything before `::`).
    pub fn short_name(&self) -> &str {
        self.party_id.split("::").next().unwrap_or(&self.party_id)
    }
}

/// A normalized active contract as seen by one party.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub contract_id: String,
    pub template_id: String,
    pub payload: Value,
    pub signatories: Vec<String>,
    pub observers: Vec<String>,
    /// Union of signatories and observers, deduplicated.
    pub stakeholders: BTreeSet<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub offset: u64,
    pub contract_key: Option<Value>,
    /// Decoded created-event blob, when the filter requested it.
    pub created_event_blob: Option<Vec<u8>>,
}

impl Contract {
    /// Package id segment of the template id (first colon-delimited part).
    pub fn package_id(&self) -> &str {
        self.template_id.split(':').next().unwrap_or(&self.template_id)
    }

    /// `Module:Entity` part of the template id, for display.
    pub fn template_name(&self) -> &str {
        match self.template_id.split_once(':') {
            Some((_, rest)) => rest,
            None => &self.template_id,
        }
    }
}

/// A normalized ledger transaction (one update).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub update_id: String,
    pub offset: u64,
    pub effective_at: Option<DateTime<Utc>>,
    pub workflow_id: Option<String>,
    pub command_id: Option<String>,
    pub events: Vec<Event>,
}

/// Closed sum over the ledger event kinds.
///
/// Every consumption site matches exhaustively; adding a kind is a
/// compile-checked change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    Created(CreatedEvent),
    Exercised(ExercisedEvent),
    Archived(ArchivedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedEvent {
    pub event_id: Option<String>,
    pub contract_id: String,
    pub template_id: String,
    pub offset: u64,
    pub node_id: u64,
    pub create_arguments: Value,
    pub signatories: Vec<String>,
    pub observers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExercisedEvent {
    pub event_id: Option<String>,
    pub contract_id: String,
    pub template_id: String,
    pub offset: u64,
    pub node_id: u64,
    pub choice: String,
    pub choice_argument: Value,
    pub acting_parties: Vec<String>,
    pub consuming: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedEvent {
    pub event_id: Option<String>,
    pub contract_id: String,
    pub template_id: String,
    pub offset: u64,
    pub node_id: u64,
    pub witness_parties: Vec<String>,
}

impl Event {
    pub fn contract_id(&self) -> &str {
        match self {
            Event::Created(e) => &e.contract_id,
            Event::Exercised(e) => &e.contract_id,
            Event::Archived(e) => &e.contract_id,
        }
    }

    pub fn template_id(&self) -> &str {
        match self {
            Event::Created(e) => &e.template_id,
            Event::Exercised(e) => &e.template_id,
            Event::Archived(e) => &e.template_id,
        }
    }

    pub fn offset(&self) -> u64 {
        match self {
            Event::Created(e) => e.offset,
            Event::Exercised(e) => e.offset,
            Event::Archived(e) => e.offset,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::Created(_) => "created",
            Event::Exercised(_) => "exercised",
            Event::Archived(_) => "archived",
        }
    }
}

/// Result of the connectivity probe. Failures are data, never panics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConnectionStatus {
    Connected { endpoint: String, ledger_end: u64 },
    Disconnected { endpoint: String, error: String },
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected { .. })
    }
}

// ---------------------------------------------------------------------------
// Network-state (Scan API + public explorer) records
// ---------------------------------------------------------------------------

/// One approved scan endpoint, as listed by the scan directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanEndpoint {
    pub public_url: String,
    pub svc_name: Option<String>,
}

/// Approved scan endpoints for one synchronization domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainScans {
    pub domain_id: String,
    pub scans: Vec<ScanEndpoint>,
}

/// Summary of one recent update as reported by the Scan API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSummary {
    pub update_id: String,
    pub record_time: Option<DateTime<Utc>>,
    pub events: Vec<UpdateEventSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateEventSummary {
    pub template_id: String,
    /// Exercised choice name; absent for create/archive events.
    pub choice: Option<String>,
}

/// An open or issuing mining round, keyed by its contract id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningRound {
    pub contract_id: String,
    pub round_number: Option<u64>,
    pub opens_at: Option<DateTime<Utc>>,
    pub payload: Value,
}

/// Traffic accounting for one member of a domain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrafficStatus {
    pub total_consumed: u64,
    pub total_limit: u64,
    pub total_purchased: u64,
}

/// Headline statistics from the public explorer API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkStats {
    pub total_supply: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub active_validators: Option<u64>,
    pub total_transactions: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub time: Option<DateTime<Utc>>,
    pub usd: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityPoint {
    pub time: Option<DateTime<Utc>>,
    pub tx_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorInfo {
    pub name: String,
    pub party_id: Option<String>,
    pub rewards: Option<f64>,
}
