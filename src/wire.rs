//! Wire model adapter: typed shapes for the JSON Ledger API payloads and
//! pure conversions into the normalized domain records in [`crate::types`].
//!
//! Field absence is handled explicitly: optional collections default to
//! empty, but record-identifying fields (`contractId`, `templateId`,
//! `updateId`) are validated and missing ones raise a structural error
//! naming the field; they are never silently defaulted.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use thiserror::Error;

use crate::types::{
    ArchivedEvent, Contract, CreatedEvent, Event, ExercisedEvent, Transaction,
};

#[derive(Debug, Error)]
pub enum WireError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("unsupported update shape: {0}")]
    UnsupportedShape(&'static str),

    #[error("invalid base64 in createdEventBlob: {0}")]
    BadBlob(String),
}

/// Union of signatories and observers. Stakeholder lists are sets, so
/// duplicates collapse.
pub fn stakeholder_union(signatories: &[String], observers: &[String]) -> BTreeSet<String> {
    signatories.iter().chain(observers.iter()).cloned().collect()
}

// ---------------------------------------------------------------------------
// Raw shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCreatedEvent {
    pub event_id: Option<String>,
    pub contract_id: Option<String>,
    pub template_id: Option<String>,
    pub offset: Option<u64>,
    pub node_id: Option<u64>,
    pub create_argument: Option<Value>,
    #[serde(default)]
    pub signatories: Vec<String>,
    #[serde(default)]
    pub observers: Vec<String>,
    pub contract_key: Option<Value>,
    pub created_event_blob: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawExercisedEvent {
    pub event_id: Option<String>,
    pub contract_id: Option<String>,
    pub template_id: Option<String>,
    pub offset: Option<u64>,
    pub node_id: Option<u64>,
    pub choice: Option<String>,
    pub choice_argument: Option<Value>,
    #[serde(default)]
    pub acting_parties: Vec<String>,
    #[serde(default)]
    pub consuming: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawArchivedEvent {
    pub event_id: Option<String>,
    pub contract_id: Option<String>,
    pub template_id: Option<String>,
    pub offset: Option<u64>,
    pub node_id: Option<u64>,
    #[serde(default)]
    pub witness_parties: Vec<String>,
}

/// Externally tagged event union, as it appears in transaction bodies.
#[derive(Debug, Clone, Deserialize)]
pub enum RawEvent {
    CreatedEvent(RawCreatedEvent),
    ExercisedEvent(RawExercisedEvent),
    ArchivedEvent(RawArchivedEvent),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    pub update_id: Option<String>,
    pub offset: Option<u64>,
    pub effective_at: Option<DateTime<Utc>>,
    pub workflow_id: Option<String>,
    pub command_id: Option<String>,
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

/// One item of the transaction stream. Flat transactions are the shape the
/// rest of the system consumes; trees are a documented extension point and
/// currently rejected; checkpoints and reassignments carry no transaction
/// and are skipped.
#[derive(Debug, Clone, Deserialize)]
pub enum RawUpdate {
    Transaction(RawTransaction),
    TransactionTree(Value),
    OffsetCheckpoint(Value),
    Reassignment(Value),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUpdateEnvelope {
    pub update: RawUpdate,
}

/// One entry of the active-contracts response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAcsEntry {
    pub contract_entry: Option<RawContractEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub enum RawContractEntry {
    JsActiveContract(RawActiveContract),
    /// Heartbeat entry carrying no contract.
    JsEmpty(Value),
    JsIncompleteAssigned(Value),
    JsIncompleteUnassigned(Value),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawActiveContract {
    pub created_event: RawCreatedEvent,
    pub synchronizer_id: Option<String>,
    pub reassignment_counter: Option<u64>,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

/// Builds a [`Contract`] from a raw created event. `fallback_offset` is used
/// when the event itself carries none (the ACS response reports the snapshot
/// offset at the top level).
pub fn contract_from_created(raw: RawCreatedEvent, fallback_offset: u64) -> Result<Contract, WireError> {
    let contract_id = raw.contract_id.ok_or(WireError::MissingField("contractId"))?;
    let template_id = raw.template_id.ok_or(WireError::MissingField("templateId"))?;

    let created_event_blob = match raw.created_event_blob {
        Some(b64) if !b64.is_empty() => Some(
            BASE64
                .decode(b64.as_bytes())
                .map_err(|e| WireError::BadBlob(e.to_string()))?,
        ),
        _ => None,
    };

    Ok(Contract {
        contract_id,
        template_id,
        payload: raw.create_argument.unwrap_or(Value::Null),
        stakeholders: stakeholder_union(&raw.signatories, &raw.observers),
        signatories: raw.signatories,
        observers: raw.observers,
        created_at: raw.created_at,
        offset: raw.offset.unwrap_or(fallback_offset),
        contract_key: raw.contract_key,
        created_event_blob,
    })
}

/// Maps one ACS entry into a contract. Entries without a created-event
/// payload (heartbeats, incomplete reassignments) yield `None`.
pub fn contract_from_acs_entry(
    entry: RawAcsEntry,
    fallback_offset: u64,
) -> Result<Option<Contract>, WireError> {
    match entry.contract_entry {
        Some(RawContractEntry::JsActiveContract(active)) => {
            contract_from_created(active.created_event, fallback_offset).map(Some)
        }
        Some(RawContractEntry::JsEmpty(_))
        | Some(RawContractEntry::JsIncompleteAssigned(_))
        | Some(RawContractEntry::JsIncompleteUnassigned(_))
        | None => Ok(None),
    }
}

pub fn event_from_raw(raw: RawEvent, fallback_offset: u64) -> Result<Event, WireError> {
    match raw {
        RawEvent::CreatedEvent(e) => {
            let contract_id = e.contract_id.ok_or(WireError::MissingField("contractId"))?;
            let template_id = e.template_id.ok_or(WireError::MissingField("templateId"))?;
            Ok(Event::Created(CreatedEvent {
                event_id: e.event_id,
                contract_id,
                template_id,
                offset: e.offset.unwrap_or(fallback_offset),
                node_id: e.node_id.unwrap_or(0),
                create_arguments: e.create_argument.unwrap_or(Value::Null),
                signatories: e.signatories,
                observers: e.observers,
            }))
        }
        RawEvent::ExercisedEvent(e) => {
            let contract_id = e.contract_id.ok_or(WireError::MissingField("contractId"))?;
            let template_id = e.template_id.ok_or(WireError::MissingField("templateId"))?;
            let choice = e.choice.ok_or(WireError::MissingField("choice"))?;
            Ok(Event::Exercised(ExercisedEvent {
                event_id: e.event_id,
                contract_id,
                template_id,
                offset: e.offset.unwrap_or(fallback_offset),
                node_id: e.node_id.unwrap_or(0),
                choice,
                choice_argument: e.choice_argument.unwrap_or(Value::Null),
                acting_parties: e.acting_parties,
                consuming: e.consuming,
            }))
        }
        RawEvent::ArchivedEvent(e) => {
            let contract_id = e.contract_id.ok_or(WireError::MissingField("contractId"))?;
            let template_id = e.template_id.ok_or(WireError::MissingField("templateId"))?;
            Ok(Event::Archived(ArchivedEvent {
                event_id: e.event_id,
                contract_id,
                template_id,
                offset: e.offset.unwrap_or(fallback_offset),
                node_id: e.node_id.unwrap_or(0),
                witness_parties: e.witness_parties,
            }))
        }
    }
}

pub fn transaction_from_raw(raw: RawTransaction) -> Result<Transaction, WireError> {
    let update_id = raw.update_id.ok_or(WireError::MissingField("updateId"))?;
    let offset = raw.offset.unwrap_or(0);

    let events = raw
        .events
        .into_iter()
        .map(|e| event_from_raw(e, offset))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Transaction {
        update_id,
        offset,
        effective_at: raw.effective_at,
        workflow_id: raw.workflow_id,
        command_id: raw.command_id,
        events,
    })
}

/// Extracts the flat transaction from a stream item. Checkpoints and
/// reassignments yield `None`; tree items are not consumed by this system.
pub fn transaction_from_update(update: RawUpdate) -> Result<Option<Transaction>, WireError> {
    match update {
        RawUpdate::Transaction(tx) => transaction_from_raw(tx).map(Some),
        RawUpdate::OffsetCheckpoint(_) | RawUpdate::Reassignment(_) => Ok(None),
        RawUpdate::TransactionTree(_) => Err(WireError::UnsupportedShape("TransactionTree")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn created(contract_id: &str) -> RawCreatedEvent {
        serde_json::from_value(json!({
            "contractId": contract_id,
            "templateId": "pkg:Splice.Amulet:Amulet",
            "offset": 42,
            "nodeId": 0,
            "createArgument": {"owner": "alice::fp"},
            "signatories": ["alice::fp", "dso::fp"],
            "observers": ["bob::fp", "alice::fp"]
        }))
        .unwrap()
    }

    #[test]
    fn test_stakeholders_are_deduplicated_union() {
        let c = contract_from_created(created("c-1"), 0).unwrap();
        let expected: Vec<&str> = vec!["alice::fp", "bob::fp", "dso::fp"];
        assert_eq!(c.stakeholders.iter().map(String::as_str).collect::<Vec<_>>(), expected);
        // Union is idempotent: observers overlapping signatories add nothing
        assert_eq!(c.stakeholders.len(), 3);
    }

    #[test]
    fn test_missing_contract_id_is_structural_error() {
        let raw: RawCreatedEvent = serde_json::from_value(json!({
            "templateId": "pkg:M:T"
        }))
        .unwrap();
        let err = contract_from_created(raw, 0).unwrap_err();
        assert!(matches!(err, WireError::MissingField("contractId")));
    }

    #[test]
    fn test_missing_template_id_is_structural_error() {
        let raw: RawCreatedEvent = serde_json::from_value(json!({
            "contractId": "c-1"
        }))
        .unwrap();
        let err = contract_from_created(raw, 0).unwrap_err();
        assert!(matches!(err, WireError::MissingField("templateId")));
    }

    #[test]
    fn test_created_event_blob_is_base64_decoded() {
        let raw: RawCreatedEvent = serde_json::from_value(json!({
            "contractId": "c-1",
            "templateId": "pkg:M:T",
            "createdEventBlob": "aGVsbG8="
        }))
        .unwrap();
        let c = contract_from_created(raw, 7).unwrap();
        assert_eq!(c.created_event_blob.as_deref(), Some(&b"hello"[..]));
        // No offset on the event: fall back to the snapshot offset
        assert_eq!(c.offset, 7);
    }

    #[test]
    fn test_acs_heartbeat_entry_is_skipped() {
        let entry: RawAcsEntry = serde_json::from_value(json!({
            "contractEntry": {"JsEmpty": {}}
        }))
        .unwrap();
        assert!(contract_from_acs_entry(entry, 0).unwrap().is_none());
    }

    #[test]
    fn test_acs_active_contract_entry_maps() {
        let entry: RawAcsEntry = serde_json::from_value(json!({
            "contractEntry": {"JsActiveContract": {
                "createdEvent": {
                    "contractId": "c-9",
                    "templateId": "pkg:M:T",
                    "signatories": ["p::1"]
                },
                "synchronizerId": "global-domain::fp"
            }}
        }))
        .unwrap();
        let c = contract_from_acs_entry(entry, 3).unwrap().unwrap();
        assert_eq!(c.contract_id, "c-9");
        assert_eq!(c.offset, 3);
    }

    #[test]
    fn test_event_union_parses_exercised() {
        let raw: RawEvent = serde_json::from_value(json!({
            "ExercisedEvent": {
                "contractId": "c-2",
                "templateId": "pkg:M:T",
                "choice": "Transfer_Accept",
                "actingParties": ["alice::fp"],
                "consuming": true,
                "offset": 10,
                "nodeId": 4
            }
        }))
        .unwrap();
        match event_from_raw(raw, 0).unwrap() {
            Event::Exercised(e) => {
                assert_eq!(e.choice, "Transfer_Accept");
                assert!(e.consuming);
                assert_eq!(e.node_id, 4);
            }
            other => panic!("expected exercised event, got {}", other.kind()),
        }
    }

    #[test]
    fn test_transaction_tree_items_are_rejected() {
        let env: RawUpdateEnvelope = serde_json::from_value(json!({
            "update": {"TransactionTree": {"updateId": "u-1"}}
        }))
        .unwrap();
        let err = transaction_from_update(env.update).unwrap_err();
        assert!(matches!(err, WireError::UnsupportedShape("TransactionTree")));
    }

    #[test]
    fn test_offset_checkpoint_items_are_skipped() {
        let env: RawUpdateEnvelope = serde_json::from_value(json!({
            "update": {"OffsetCheckpoint": {"offset": 99}}
        }))
        .unwrap();
        assert!(transaction_from_update(env.update).unwrap().is_none());
    }

    #[test]
    fn test_flat_transaction_maps_with_events() {
        let env: RawUpdateEnvelope = serde_json::from_value(json!({
            "update": {"Transaction": {
                "updateId": "u-7",
                "offset": 55,
                "effectiveAt": "2026-01-05T10:00:00Z",
                "commandId": "cmd-1",
                "events": [
                    {"CreatedEvent": {"contractId": "c-1", "templateId": "pkg:M:T"}},
                    {"ArchivedEvent": {"contractId": "c-0", "templateId": "pkg:M:T", "witnessParties": ["p::1"]}}
                ]
            }}
        }))
        .unwrap();
        let tx = transaction_from_update(env.update).unwrap().unwrap();
        assert_eq!(tx.update_id, "u-7");
        assert_eq!(tx.events.len(), 2);
        // Events without their own offset inherit the transaction offset
        assert_eq!(tx.events[0].offset(), 55);
        assert_eq!(tx.events[1].kind(), "archived");
    }
}
