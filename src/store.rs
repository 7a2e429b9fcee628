//! Party-scoped projection store: owns the single current view of the
//! ledger for exactly one active party.
//!
//! All mutation goes through well-defined entry points on one owned state
//! machine instance; there is no ambient shared state. Loads are guarded by
//! per-facet generation tickets: a commit from a superseded load (an older
//! refresh, or a load started for a previously selected party) is rejected,
//! so the committed snapshot always corresponds to the most recently issued
//! request. A slow stale response can never clobber a fresher one.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ClientResult;
use crate::ledger::{ActiveContractsOptions, LedgerApi, TransactionsOptions};
use crate::types::{Contract, Party, Transaction};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConnectionPhase {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Facet {
    Contracts,
    Transactions,
}

/// Proof that a load was started against the current party and generation.
/// Commits present it back; stale tickets are rejected.
#[derive(Debug, Clone)]
pub struct LoadTicket {
    facet: Facet,
    generation: u64,
    party_id: String,
}

/// The committed projection for the active party: contracts keyed by
/// contract id (unique within a snapshot) plus the loaded transaction list.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub contracts: HashMap<String, Contract>,
    pub transactions: Vec<Transaction>,
}

impl Snapshot {
    /// Highest offset observed across loaded data. Display-oriented only;
    /// reloads are wholesale, so this is not a correctness watermark.
    pub fn current_offset(&self) -> u64 {
        let tx_max = self.transactions.iter().map(|t| t.offset).max().unwrap_or(0);
        let c_max = self.contracts.values().map(|c| c.offset).max().unwrap_or(0);
        tx_max.max(c_max)
    }
}

pub struct ExplorerStore {
    client: Option<Arc<dyn LedgerApi>>,
    endpoint: Option<String>,
    phase: ConnectionPhase,
    connect_error: Option<String>,
    ledger_end: u64,

    parties: Vec<Party>,
    active_party: Option<Party>,
    snapshot: Snapshot,

    contracts_generation: u64,
    transactions_generation: u64,
    contracts_loading: bool,
    transactions_loading: bool,
    contracts_error: Option<String>,
    transactions_error: Option<String>,

    tx_page_limit: usize,
}

impl ExplorerStore {
    pub fn new(tx_page_limit: usize) -> Self {
        Self {
            client: None,
            endpoint: None,
            phase: ConnectionPhase::Disconnected,
            connect_error: None,
            ledger_end: 0,
            parties: Vec::new(),
            active_party: None,
            snapshot: Snapshot::default(),
            contracts_generation: 0,
            transactions_generation: 0,
            contracts_loading: false,
            transactions_loading: false,
            contracts_error: None,
            transactions_error: None,
            tx_page_limit,
        }
    }

    // ----- read access -----

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn connect_error(&self) -> Option<&str> {
        self.connect_error.as_deref()
    }

    pub fn ledger_end(&self) -> u64 {
        self.ledger_end
    }

    pub fn parties(&self) -> &[Party] {
        &self.parties
    }

    pub fn active_party(&self) -> Option<&Party> {
        self.active_party.as_ref()
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn contracts_error(&self) -> Option<&str> {
        self.contracts_error.as_deref()
    }

    pub fn transactions_error(&self) -> Option<&str> {
        self.transactions_error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.contracts_loading || self.transactions_loading
    }

    // ----- connection lifecycle -----

    /// Probes connectivity and lists parties. On any failure the store
    /// records the error and stays disconnected with no client reference;
    /// a failed connect never leaves partial state behind.
    pub async fn connect(&mut self, client: Arc<dyn LedgerApi>, endpoint: &str) -> bool {
        self.phase = ConnectionPhase::Connecting;
        self.connect_error = None;

        let probed = match client.ping().await {
            Ok(ledger_end) => ledger_end,
            Err(e) => {
                log::warn!("[store] connect to {} failed: {}", endpoint, e);
                self.connect_error = Some(e.to_string());
                self.phase = ConnectionPhase::Disconnected;
                return false;
            }
        };

        let parties = match client.parties().await {
            Ok(parties) => parties,
            Err(e) => {
                log::warn!("[store] party listing on {} failed: {}", endpoint, e);
                self.connect_error = Some(e.to_string());
                self.phase = ConnectionPhase::Disconnected;
                return false;
            }
        };

        log::info!(
            "[store] connected to {} at offset {} ({} parties)",
            endpoint,
            probed,
            parties.len()
        );
        self.client = Some(client);
        self.endpoint = Some(endpoint.to_string());
        self.ledger_end = probed;
        self.parties = parties;
        self.phase = ConnectionPhase::Connected;
        true
    }

    /// Clears connection, party, and all party-scoped data atomically.
    pub fn disconnect(&mut self) {
        self.client = None;
        self.endpoint = None;
        self.phase = ConnectionPhase::Disconnected;
        self.connect_error = None;
        self.ledger_end = 0;
        self.parties.clear();
        self.active_party = None;
        self.snapshot = Snapshot::default();
        self.contracts_generation += 1;
        self.transactions_generation += 1;
        self.contracts_loading = false;
        self.transactions_loading = false;
        self.contracts_error = None;
        self.transactions_error = None;
    }

    // ----- load/commit entry points -----

    /// Starts a load for the active party, superseding any in-flight load of
    /// the same facet. Returns `None` when no party is selected.
    pub fn begin_load(&mut self, facet: Facet) -> Option<LoadTicket> {
        let party = self.active_party.as_ref()?;
        let generation = match facet {
            Facet::Contracts => {
                self.contracts_generation += 1;
                self.contracts_loading = true;
                self.contracts_generation
            }
            Facet::Transactions => {
                self.transactions_generation += 1;
                self.transactions_loading = true;
                self.transactions_generation
            }
        };
        Some(LoadTicket {
            facet,
            generation,
            party_id: party.party_id.clone(),
        })
    }

    fn ticket_is_current(&self, ticket: &LoadTicket) -> bool {
        let generation_ok = match ticket.facet {
            Facet::Contracts => ticket.generation == self.contracts_generation,
            Facet::Transactions => ticket.generation == self.transactions_generation,
        };
        let party_ok = self
            .active_party
            .as_ref()
            .map(|p| p.party_id == ticket.party_id)
            .unwrap_or(false);
        generation_ok && party_ok
    }

    /// Commits a contracts load. Returns `false` (no state change) when the
    /// ticket was superseded. A failed load records the error and keeps the
    /// previously committed contracts: stale-but-present beats empty.
    pub fn commit_contracts(&mut self, ticket: LoadTicket, result: ClientResult<Vec<Contract>>) -> bool {
        debug_assert_eq!(ticket.facet, Facet::Contracts);
        if !self.ticket_is_current(&ticket) {
            log::debug!(
                "[store] dropping stale contracts commit for {} (gen {})",
                ticket.party_id,
                ticket.generation
            );
            return false;
        }
        self.contracts_loading = false;
        match result {
            Ok(contracts) => {
                self.snapshot.contracts = contracts
                    .into_iter()
                    .map(|c| (c.contract_id.clone(), c))
                    .collect();
                self.contracts_error = None;
            }
            Err(e) => {
                self.contracts_error = Some(e.to_string());
            }
        }
        true
    }

    /// Commits a transactions load; same supersession and failure rules as
    /// [`commit_contracts`](Self::commit_contracts).
    pub fn commit_transactions(
        &mut self,
        ticket: LoadTicket,
        result: ClientResult<Vec<Transaction>>,
    ) -> bool {
        debug_assert_eq!(ticket.facet, Facet::Transactions);
        if !self.ticket_is_current(&ticket) {
            log::debug!(
                "[store] dropping stale transactions commit for {} (gen {})",
                ticket.party_id,
                ticket.generation
            );
            return false;
        }
        self.transactions_loading = false;
        match result {
            Ok(mut txs) => {
                txs.sort_by(|a, b| b.offset.cmp(&a.offset));
                self.snapshot.transactions = txs;
                self.transactions_error = None;
            }
            Err(e) => {
                self.transactions_error = Some(e.to_string());
            }
        }
        true
    }

    // ----- party lens -----

    /// Switches the active party and reloads contracts and transactions
    /// wholesale. The previous party's snapshot is dropped immediately, not
    /// merged, so the visible set always belongs to the selected party.
    pub async fn set_active_party(&mut self, party: Party) {
        log::info!("[store] switching active party to {}", party.party_id);
        self.active_party = Some(party);
        self.snapshot = Snapshot::default();
        self.contracts_error = None;
        self.transactions_error = None;
        self.reload().await;
    }

    /// Reloads contracts and transactions concurrently for the current
    /// party. Each facet manages its own loading/error flags; one failing
    /// does not block the other, and failures keep previously loaded data.
    pub async fn refresh(&mut self) {
        self.reload().await;
    }

    async fn reload(&mut self) {
        let Some(client) = self.client.clone() else {
            return;
        };
        let Some(party_id) = self.active_party.as_ref().map(|p| p.party_id.clone()) else {
            return;
        };

        // Tickets issued before the await points; any later switch or
        // refresh supersedes these commits.
        let contracts_ticket = self.begin_load(Facet::Contracts);
        let transactions_ticket = self.begin_load(Facet::Transactions);

        let acs_opts = ActiveContractsOptions::default();
        let tx_opts = TransactionsOptions {
            begin_offset: 0,
            end_offset: None,
            limit: Some(self.tx_page_limit),
        };

        let (contracts, transactions) = tokio::join!(
            client.active_contracts(&party_id, &acs_opts),
            client.transactions(&party_id, &tx_opts),
        );

        if let Ok(end) = client.ping().await {
            self.ledger_end = end;
        }

        if let Some(ticket) = contracts_ticket {
            self.commit_contracts(ticket, contracts);
        }
        if let Some(ticket) = transactions_ticket {
            self.commit_transactions(ticket, transactions);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use serde_json::Value;
    use std::collections::BTreeSet;

    fn party(id: &str) -> Party {
        Party {
            party_id: id.to_string(),
            display_name: None,
            is_local: true,
        }
    }

    fn contract(id: &str) -> Contract {
        Contract {
            contract_id: id.to_string(),
            template_id: "pkg:M:T".to_string(),
            payload: Value::Null,
            signatories: vec!["p::1".to_string()],
            observers: Vec::new(),
            stakeholders: BTreeSet::from(["p::1".to_string()]),
            created_at: None,
            offset: 1,
            contract_key: None,
            created_event_blob: None,
        }
    }

    fn store_with_party(id: &str) -> ExplorerStore {
        let mut store = ExplorerStore::new(100);
        store.active_party = Some(party(id));
        store.phase = ConnectionPhase::Connected;
        store
    }

    #[test]
    fn test_superseded_commit_is_rejected() {
        let mut store = store_with_party("p1::fp");

        let slow = store.begin_load(Facet::Contracts).unwrap();
        let fresh = store.begin_load(Facet::Contracts).unwrap();

        assert!(store.commit_contracts(fresh, Ok(vec![contract("new")])));
        // The older load finishing later must not clobber the fresh commit
        assert!(!store.commit_contracts(slow, Ok(vec![contract("old")])));
        assert!(store.snapshot().contracts.contains_key("new"));
        assert!(!store.snapshot().contracts.contains_key("old"));
    }

    #[test]
    fn test_party_switch_invalidates_in_flight_ticket() {
        let mut store = store_with_party("p1::fp");
        let p1_ticket = store.begin_load(Facet::Contracts).unwrap();

        store.active_party = Some(party("p2::fp"));
        store.snapshot = Snapshot::default();
        let p2_ticket = store.begin_load(Facet::Contracts).unwrap();

        assert!(store.commit_contracts(p2_ticket, Ok(vec![contract("p2-c")])));
        assert!(!store.commit_contracts(p1_ticket, Ok(vec![contract("p1-c")])));

        let ids: Vec<&str> = store.snapshot().contracts.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["p2-c"]);
    }

    #[test]
    fn test_failed_load_keeps_previous_data() {
        let mut store = store_with_party("p1::fp");

        let t = store.begin_load(Facet::Contracts).unwrap();
        assert!(store.commit_contracts(t, Ok(vec![contract("c1")])));

        let t = store.begin_load(Facet::Contracts).unwrap();
        let failed: ClientResult<Vec<Contract>> = Err(ClientError::Api {
            status: 500,
            path: "/v2/state/active-contracts".into(),
            body: String::new(),
        });
        assert!(store.commit_contracts(t, failed));

        // Error recorded, data retained
        assert!(store.contracts_error().is_some());
        assert!(store.snapshot().contracts.contains_key("c1"));
    }

    #[test]
    fn test_begin_load_without_party_yields_no_ticket() {
        let mut store = ExplorerStore::new(100);
        assert!(store.begin_load(Facet::Contracts).is_none());
    }

    #[test]
    fn test_transactions_sorted_newest_first() {
        let mut store = store_with_party("p1::fp");
        let t = store.begin_load(Facet::Transactions).unwrap();
        let tx = |id: &str, offset: u64| Transaction {
            update_id: id.to_string(),
            offset,
            effective_at: None,
            workflow_id: None,
            command_id: None,
            events: Vec::new(),
        };
        assert!(store.commit_transactions(t, Ok(vec![tx("a", 3), tx("b", 9), tx("c", 5)])));
        let offsets: Vec<u64> = store.snapshot().transactions.iter().map(|t| t.offset).collect();
        assert_eq!(offsets, vec![9, 5, 3]);
        assert_eq!(store.snapshot().current_offset(), 9);
    }

    #[test]
    fn test_disconnect_clears_everything() {
        let mut store = store_with_party("p1::fp");
        let t = store.begin_load(Facet::Contracts).unwrap();
        store.commit_contracts(t, Ok(vec![contract("c1")]));

        store.disconnect();
        assert_eq!(store.phase(), ConnectionPhase::Disconnected);
        assert!(store.active_party().is_none());
        assert!(store.snapshot().contracts.is_empty());
        assert!(store.parties().is_empty());
        assert!(!store.is_loading());
    }
}
