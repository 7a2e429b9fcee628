use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;

use cantx::aggregator::{FacetPeriods, NetworkAggregator};
use cantx::config::{self, Config, Mode};
use cantx::explorer_api::ExplorerApiClient;
use cantx::ledger::LedgerClient;
use cantx::prefs;
use cantx::scan::ScanClient;
use cantx::store::ExplorerStore;
use cantx::types::Party;
use cantx::util_text::truncate_id;
use cantx::views;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cfg = config::load()?;
    cfg.print_summary();

    match cfg.mode {
        Mode::Ledger => run_ledger(cfg).await,
        Mode::Network => run_network(cfg).await,
    }
}

/// Picks the party to view: explicit selection by full id or name prefix,
/// otherwise the first local party, otherwise the first listed.
fn select_party(parties: &[Party], requested: Option<&str>) -> Option<Party> {
    if let Some(requested) = requested {
        return parties
            .iter()
            .find(|p| p.party_id == requested || p.short_name() == requested)
            .cloned();
    }
    parties
        .iter()
        .find(|p| p.is_local)
        .or_else(|| parties.first())
        .cloned()
}

async fn run_ledger(cfg: Config) -> Result<()> {
    let timeout = Duration::from_millis(cfg.request_timeout_ms);
    let client = Arc::new(LedgerClient::with_timeout(
        &cfg.ledger_url,
        cfg.auth_token.clone(),
        timeout,
    ));

    let mut store = ExplorerStore::new(cfg.tx_page_limit);
    if !store.connect(client, &cfg.ledger_url).await {
        return Err(anyhow!(
            "could not connect to {}: {}",
            cfg.ledger_url,
            store.connect_error().unwrap_or("unknown error")
        ));
    }

    println!("Connected to {} (ledger end: {})", cfg.ledger_url, store.ledger_end());

    let Some(party) = select_party(store.parties(), cfg.party.as_deref()) else {
        match cfg.party {
            Some(p) => return Err(anyhow!("party '{p}' not found on this participant")),
            None => {
                println!("No parties on this participant yet.");
                return Ok(());
            }
        }
    };

    println!("Viewing as {} ({})\n", party.short_name(), truncate_id(&party.party_id, 40));
    store.set_active_party(party).await;

    if let Some(err) = store.contracts_error() {
        println!("! contracts failed to load: {err}");
    }
    if let Some(err) = store.transactions_error() {
        println!("! transactions failed to load: {err}");
    }

    let snapshot = store.snapshot();
    println!(
        "Active contracts: {} (offset {})",
        snapshot.contracts.len(),
        snapshot.current_offset()
    );

    let usage = views::template_usage(&snapshot.contracts);
    if !usage.is_empty() {
        println!("\nTemplates:");
        for u in &usage {
            println!("  {:>5}  {}  ({} stakeholders)", u.count, u.template_id, u.stakeholders.len());
        }

        println!("\nPackages:");
        for (package, templates) in views::package_tree(&usage) {
            println!("  {}  ({} templates)", truncate_id(&package, 24), templates.len());
        }
    }

    let counts = views::event_kind_counts(&snapshot.transactions);
    println!(
        "\nTransactions: {} ({} created / {} exercised / {} archived events)",
        snapshot.transactions.len(),
        counts.created,
        counts.exercised,
        counts.archived
    );
    for tx in snapshot.transactions.iter().take(10) {
        let when = tx
            .effective_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  #{:<8} {}  {}  {} events",
            tx.offset,
            truncate_id(&tx.update_id, 24),
            when,
            tx.events.len()
        );
    }

    save_connection_prefs(&cfg);
    Ok(())
}

async fn run_network(cfg: Config) -> Result<()> {
    let timeout = Duration::from_millis(cfg.request_timeout_ms);
    let aggregator = NetworkAggregator::new(
        ScanClient::with_timeout(&cfg.scan_url, timeout),
        ExplorerApiClient::with_timeout(&cfg.explorer_url, timeout),
    );

    let periods = FacetPeriods {
        activity: cfg.activity_period,
        price: cfg.price_period,
        validators: cfg.validators_period,
    };

    let view = aggregator.fetch(periods).await;
    if let Some(err) = &view.error {
        return Err(anyhow!("{err}"));
    }

    println!("Network overview ({})\n", cfg.scan_url);

    for domain in &view.scans {
        println!("Domain {}", truncate_id(&domain.domain_id, 40));
        for scan in &domain.scans {
            println!("  scan: {} {}", scan.public_url, scan.svc_name.as_deref().unwrap_or(""));
        }
    }

    match view.price {
        Some(usd) => println!("\nPrice: ${usd:.4}"),
        None => println!("\nPrice: unknown"),
    }
    if let Some(validators) = view.stats.active_validators {
        println!("Active validators: {validators}");
    }
    if let Some(total) = view.stats.total_transactions {
        println!("Total transactions: {total}");
    }
    println!(
        "Activity points: {} ({}), price points: {} ({}), validators listed: {} ({})",
        view.activity.len(),
        cfg.activity_period,
        view.price_history.len(),
        cfg.price_period,
        view.validators.len(),
        cfg.validators_period
    );

    let transfers = views::extract_transfers(&view.updates, chrono::Utc::now());
    if !transfers.is_empty() {
        println!("\nRecent transfers:");
        for t in &transfers {
            println!(
                "  {:<10} {}  {}",
                t.age,
                t.choice.as_deref().unwrap_or("(create)"),
                t.template_id
            );
        }
    }

    if !view.facet_errors.is_empty() {
        println!("\nDegraded facets:");
        for err in &view.facet_errors {
            println!("  - {err}");
        }
    }

    if let (Some(domain_id), Some(member_id)) = (&cfg.domain_id, &cfg.member_id) {
        let status = aggregator.fetch_member_status(domain_id, member_id).await;
        println!("\nMember {}", truncate_id(member_id, 40));
        if let Some(traffic) = &status.traffic {
            println!(
                "  traffic: {} / {} consumed ({} purchased)",
                traffic.total_consumed, traffic.total_limit, traffic.total_purchased
            );
        }
        println!(
            "  mining rounds: {} open, {} issuing",
            status.rounds.open.len(),
            status.rounds.issuing.len()
        );
        for err in &status.facet_errors {
            println!("  - {err}");
        }
    }

    save_connection_prefs(&cfg);
    Ok(())
}

/// Writes the connection form fields back to the preferences file, keeping
/// the unrelated UI settings as-is.
fn save_connection_prefs(cfg: &Config) {
    let mut saved = prefs::load();
    saved.ledger_url = Some(cfg.ledger_url.clone());
    saved.auth_token = cfg.auth_token.clone();
    saved.scan_url = Some(cfg.scan_url.clone());
    saved.domain_id = cfg.domain_id.clone();
    saved.member_id = cfg.member_id.clone();
    if let Err(e) = prefs::save(&saved) {
        log::warn!("[cantx] could not save preferences: {e}");
    }
}
