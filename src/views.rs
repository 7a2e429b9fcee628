//! Derived-view builders: pure functions recomputed on read over the
//! committed projection and the network update summaries.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::types::{Contract, Event, Transaction, UpdateSummary};
use crate::util_text::relative_age;

/// Most recent transfer-like events shown in the network overview.
const TRANSFER_FEED_CAP: usize = 8;

/// Per-template usage over the current contract snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateUsage {
    pub template_id: String,
    pub count: usize,
    pub stakeholders: BTreeSet<String>,
}

/// Counts of each event kind across loaded transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventKindCounts {
    pub created: usize,
    pub exercised: usize,
    pub archived: usize,
}

/// A transfer-like event extracted from the update feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferActivity {
    pub update_id: String,
    pub template_id: String,
    pub choice: Option<String>,
    pub age: String,
}

/// Groups the contract snapshot by template id. Sorted by count descending,
/// then template id for a stable order.
pub fn template_usage(contracts: &HashMap<String, Contract>) -> Vec<TemplateUsage> {
    let mut by_template: BTreeMap<&str, TemplateUsage> = BTreeMap::new();
    for contract in contracts.values() {
        let entry = by_template
            .entry(&contract.template_id)
            .or_insert_with(|| TemplateUsage {
                template_id: contract.template_id.clone(),
                count: 0,
                stakeholders: BTreeSet::new(),
            });
        entry.count += 1;
        entry.stakeholders.extend(contract.stakeholders.iter().cloned());
    }

    let mut usage: Vec<TemplateUsage> = by_template.into_values().collect();
    usage.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.template_id.cmp(&b.template_id)));
    usage
}

/// Groups template ids by package id (the first colon-delimited segment),
/// producing a package -> templates tree.
pub fn package_tree(usage: &[TemplateUsage]) -> BTreeMap<String, Vec<String>> {
    let mut tree: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for u in usage {
        let package = u.template_id.split(':').next().unwrap_or(&u.template_id);
        tree.entry(package.to_string()).or_default().push(u.template_id.clone());
    }
    for templates in tree.values_mut() {
        templates.sort();
        templates.dedup();
    }
    tree
}

pub fn event_kind_counts(transactions: &[Transaction]) -> EventKindCounts {
    let mut counts = EventKindCounts::default();
    for tx in transactions {
        for event in &tx.events {
            match event {
                Event::Created(_) => counts.created += 1,
                Event::Exercised(_) => counts.exercised += 1,
                Event::Archived(_) => counts.archived += 1,
            }
        }
    }
    counts
}

fn is_transfer_like(template_id: &str, choice: Option<&str>) -> bool {
    let template_matches = template_id.to_lowercase().contains("transfer");
    let choice_matches = choice
        .map(|c| c.to_lowercase().contains("transfer"))
        .unwrap_or(false);
    template_matches || choice_matches
}

/// Extracts transfer-like events from the update feed: case-insensitive
/// substring match on the exercised choice name or the template name, most
/// recent first, capped to the last 8 matches.
pub fn extract_transfers(updates: &[UpdateSummary], now: DateTime<Utc>) -> Vec<TransferActivity> {
    let mut sorted: Vec<&UpdateSummary> = updates.iter().collect();
    sorted.sort_by(|a, b| b.record_time.cmp(&a.record_time));

    let mut transfers = Vec::new();
    for update in sorted {
        for event in &update.events {
            if !is_transfer_like(&event.template_id, event.choice.as_deref()) {
                continue;
            }
            let age = match update.record_time {
                Some(t) => relative_age((now - t).num_seconds()),
                None => "-".to_string(),
            };
            transfers.push(TransferActivity {
                update_id: update.update_id.clone(),
                template_id: event.template_id.clone(),
                choice: event.choice.clone(),
                age,
            });
            if transfers.len() >= TRANSFER_FEED_CAP {
                return transfers;
            }
        }
    }
    transfers
}
