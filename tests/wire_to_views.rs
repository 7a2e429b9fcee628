//! Pipeline test: a captured-style transaction stream payload through the
//! wire adapter into the derived views.

use serde_json::json;
use std::collections::HashMap;

use cantx::types::Contract;
use cantx::views;
use cantx::wire;

#[test]
fn test_stream_payload_to_event_counts() {
    let payload = json!([
        {"update": {"Transaction": {
            "updateId": "u-1",
            "offset": 10,
            "events": [
                {"CreatedEvent": {"contractId": "c-1", "templateId": "pkg:Splice.Amulet:Amulet"}},
                {"ExercisedEvent": {
                    "contractId": "c-0",
                    "templateId": "pkg:Splice.AmuletRules:AmuletRules",
                    "choice": "AmuletRules_Transfer",
                    "consuming": false
                }}
            ]
        }}},
        {"update": {"OffsetCheckpoint": {"offset": 11}}},
        {"update": {"Transaction": {
            "updateId": "u-2",
            "offset": 12,
            "events": [
                {"ArchivedEvent": {"contractId": "c-1", "templateId": "pkg:Splice.Amulet:Amulet"}}
            ]
        }}}
    ]);

    let envelopes: Vec<wire::RawUpdateEnvelope> = serde_json::from_value(payload).unwrap();
    let transactions: Vec<_> = envelopes
        .into_iter()
        .filter_map(|env| wire::transaction_from_update(env.update).unwrap())
        .collect();

    // The checkpoint item is dropped, both transactions survive
    assert_eq!(transactions.len(), 2);

    let counts = views::event_kind_counts(&transactions);
    assert_eq!(counts.created, 1);
    assert_eq!(counts.exercised, 1);
    assert_eq!(counts.archived, 1);
}

#[test]
fn test_acs_payload_to_template_usage() {
    let payload = json!([
        {"contractEntry": {"JsActiveContract": {"createdEvent": {
            "contractId": "c-1",
            "templateId": "pkg:Splice.Amulet:Amulet",
            "signatories": ["alice::fp", "dso::fp"]
        }}}},
        {"contractEntry": {"JsActiveContract": {"createdEvent": {
            "contractId": "c-2",
            "templateId": "pkg:Splice.Amulet:Amulet",
            "signatories": ["bob::fp", "dso::fp"]
        }}}},
        {"contractEntry": {"JsActiveContract": {"createdEvent": {
            "contractId": "c-3",
            "templateId": "pkg:Splice.Wallet:WalletInstall",
            "signatories": ["alice::fp"]
        }}}},
        {"contractEntry": {"JsEmpty": {}}}
    ]);

    let entries: Vec<wire::RawAcsEntry> = serde_json::from_value(payload).unwrap();
    let contracts: HashMap<String, Contract> = entries
        .into_iter()
        .filter_map(|e| wire::contract_from_acs_entry(e, 100).unwrap())
        .map(|c| (c.contract_id.clone(), c))
        .collect();

    assert_eq!(contracts.len(), 3);

    let usage = views::template_usage(&contracts);
    assert_eq!(usage[0].template_id, "pkg:Splice.Amulet:Amulet");
    assert_eq!(usage[0].count, 2);
    assert_eq!(usage[0].stakeholders.len(), 3);

    let tree = views::package_tree(&usage);
    assert_eq!(tree["pkg"].len(), 2);
}
