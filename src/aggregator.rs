//! Multi-source aggregator for the network explorer: fans out to the
//! independent read endpoints concurrently and merges whatever came back.
//!
//! Every facet degrades independently: a failed call yields that facet's
//! typed empty default, never an aborted aggregation. Only when both primary
//! calls (scan directory and scan update history) fail is a top-level error
//! reported, since that means the configured scan endpoint itself is
//! unreachable.

use crate::error::ClientResult;
use crate::explorer_api::{ExplorerApiClient, TimePeriod};
use crate::scan::{MiningRounds, ScanClient};
use crate::types::{
    ActivityPoint, DomainScans, NetworkStats, PricePoint, TrafficStatus, UpdateSummary,
    ValidatorInfo,
};

const UPDATES_PAGE_SIZE: usize = 20;

/// Per-facet query windows. Each selector scopes only its own facet.
#[derive(Debug, Clone, Copy, Default)]
pub struct FacetPeriods {
    pub activity: TimePeriod,
    pub price: TimePeriod,
    pub validators: TimePeriod,
}

/// Combined best-effort view over all facets.
#[derive(Debug, Default)]
pub struct NetworkView {
    /// Set only when both primary facets failed.
    pub error: Option<String>,
    /// Non-fatal per-facet failures, for display as "unknown" fields.
    pub facet_errors: Vec<String>,

    pub scans: Vec<DomainScans>,
    pub updates: Vec<UpdateSummary>,
    pub stats: NetworkStats,
    pub price: Option<f64>,
    pub public_updates: Vec<UpdateSummary>,
    pub activity: Vec<ActivityPoint>,
    pub price_history: Vec<PricePoint>,
    pub validators: Vec<ValidatorInfo>,
}

/// Traffic and round state for a configured member; fetched separately from
/// the facet fan-out, with the same partial-failure tolerance.
#[derive(Debug, Default)]
pub struct MemberStatus {
    pub traffic: Option<TrafficStatus>,
    pub rounds: MiningRounds,
    pub facet_errors: Vec<String>,
}

pub struct NetworkAggregator {
    scan: ScanClient,
    explorer: ExplorerApiClient,
}

impl NetworkView {
    /// Pure merge of the eight facet results; the fan-out stays separately
    /// testable from the fetching.
    #[allow(clippy::too_many_arguments)]
    pub fn assemble(
        scans: ClientResult<Vec<DomainScans>>,
        updates: ClientResult<Vec<UpdateSummary>>,
        stats: ClientResult<NetworkStats>,
        price: ClientResult<Option<f64>>,
        public_updates: ClientResult<Vec<UpdateSummary>>,
        activity: ClientResult<Vec<ActivityPoint>>,
        price_history: ClientResult<Vec<PricePoint>>,
        validators: ClientResult<Vec<ValidatorInfo>>,
    ) -> Self {
        let mut view = NetworkView::default();

        let primaries_failed = scans.is_err() && updates.is_err();
        if primaries_failed {
            let scan_err = scans.as_ref().err().map(ToString::to_string).unwrap_or_default();
            view.error = Some(format!("scan endpoint unreachable: {scan_err}"));
        }

        view.scans = view.take(scans, "scans");
        view.updates = view.take(updates, "updates");
        view.stats = view.take(stats, "stats");
        view.price = view.take(price, "price");
        view.public_updates = view.take(public_updates, "public updates");
        view.activity = view.take(activity, "activity");
        view.price_history = view.take(price_history, "price history");
        view.validators = view.take(validators, "validators");

        view
    }

    fn take<T: Default>(&mut self, result: ClientResult<T>, facet: &str) -> T {
        match result {
            Ok(v) => v,
            Err(e) => {
                log::debug!("[aggregator] facet '{}' degraded: {}", facet, e);
                self.facet_errors.push(format!("{facet}: {e}"));
                T::default()
            }
        }
    }
}

impl NetworkAggregator {
    pub fn new(scan: ScanClient, explorer: ExplorerApiClient) -> Self {
        Self { scan, explorer }
    }

    /// Issues all eight facet requests concurrently; completion order is not
    /// assumed anywhere, and any subset may fail.
    pub async fn fetch(&self, periods: FacetPeriods) -> NetworkView {
        let (scans, updates, stats, price, public_updates, activity, price_history, validators) = tokio::join!(
            self.scan.scans(),
            self.scan.updates(UPDATES_PAGE_SIZE),
            self.explorer.stats(),
            self.explorer.price(),
            self.explorer.recent_updates(UPDATES_PAGE_SIZE),
            self.explorer.activity(periods.activity),
            self.explorer.price_history(periods.price),
            self.explorer.validators(periods.validators),
        );

        let view = NetworkView::assemble(
            scans,
            updates,
            stats,
            price,
            public_updates,
            activity,
            price_history,
            validators,
        );
        if let Some(err) = &view.error {
            log::warn!("[aggregator] {}", err);
        } else {
            log::info!(
                "[aggregator] merged view: {} domains, {} updates, {} degraded facets",
                view.scans.len(),
                view.updates.len(),
                view.facet_errors.len()
            );
        }
        view
    }

    /// Traffic status and mining rounds for a configured member; each half
    /// degrades independently.
    pub async fn fetch_member_status(&self, domain_id: &str, member_id: &str) -> MemberStatus {
        let (traffic, rounds) = tokio::join!(
            self.scan.traffic_status(domain_id, member_id),
            self.scan.mining_rounds(),
        );

        let mut status = MemberStatus::default();
        match traffic {
            Ok(t) => status.traffic = Some(t),
            Err(e) => status.facet_errors.push(format!("traffic: {e}")),
        }
        match rounds {
            Ok(r) => status.rounds = r,
            Err(e) => status.facet_errors.push(format!("mining rounds: {e}")),
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;

    fn fail<T>(path: &str) -> ClientResult<T> {
        Err(ClientError::Api {
            status: 502,
            path: path.to_string(),
            body: String::new(),
        })
    }

    fn sample_scans() -> Vec<DomainScans> {
        vec![DomainScans {
            domain_id: "global::fp".to_string(),
            scans: Vec::new(),
        }]
    }

    fn sample_updates() -> Vec<UpdateSummary> {
        vec![UpdateSummary {
            update_id: "u-1".to_string(),
            record_time: None,
            events: Vec::new(),
        }]
    }

    #[test]
    fn test_secondary_failures_degrade_without_top_level_error() {
        // 6 of 8 facets fail, but both primaries succeed
        let view = NetworkView::assemble(
            Ok(sample_scans()),
            Ok(sample_updates()),
            fail("/v0/stats"),
            fail("/v0/price"),
            fail("/v0/updates"),
            fail("/v0/activity"),
            fail("/v0/price/history"),
            fail("/v0/validators"),
        );

        assert!(view.error.is_none());
        assert_eq!(view.scans.len(), 1);
        assert_eq!(view.updates.len(), 1);
        // Failed facets at their documented empty defaults
        assert_eq!(view.stats.total_supply, None);
        assert_eq!(view.price, None);
        assert!(view.public_updates.is_empty());
        assert!(view.activity.is_empty());
        assert!(view.price_history.is_empty());
        assert!(view.validators.is_empty());
        assert_eq!(view.facet_errors.len(), 6);
    }

    #[test]
    fn test_both_primaries_failing_is_a_top_level_error() {
        let view = NetworkView::assemble(
            fail("/v0/scans"),
            fail("/v2/updates"),
            Ok(NetworkStats::default()),
            Ok(Some(0.05)),
            Ok(Vec::new()),
            Ok(Vec::new()),
            Ok(Vec::new()),
            Ok(Vec::new()),
        );

        let err = view.error.expect("expected top-level error");
        assert!(err.contains("unreachable"));
        // Non-primary facets still populated
        assert_eq!(view.price, Some(0.05));
    }

    #[test]
    fn test_one_primary_succeeding_keeps_aggregate_healthy() {
        let view = NetworkView::assemble(
            Ok(sample_scans()),
            fail("/v2/updates"),
            Ok(NetworkStats::default()),
            Ok(None),
            Ok(Vec::new()),
            Ok(Vec::new()),
            Ok(Vec::new()),
            Ok(Vec::new()),
        );
        assert!(view.error.is_none());
        assert!(view.updates.is_empty());
        assert_eq!(view.facet_errors.len(), 1);
    }
}
