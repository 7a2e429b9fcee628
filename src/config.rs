use anyhow::{anyhow, Result};
use clap::Parser;

use crate::explorer_api::TimePeriod;
use crate::prefs::Prefs;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Mode {
    Ledger,
    Network,
}

impl std::str::FromStr for Mode {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ledger" | "contracts" => Ok(Mode::Ledger),
            "network" | "scan" => Ok(Mode::Network),
            _ => Err(anyhow!("Invalid mode '{s}'. Valid options: ledger, network")),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Ledger => write!(f, "ledger"),
            Mode::Network => write!(f, "network"),
        }
    }
}

/// Cantx - Canton Ledger Explorer
///
/// Terminal client for a Canton participant's JSON Ledger API and the
/// network-state Scan API.
/// Configuration priority: CLI args > Environment variables > Saved
/// preferences > Defaults
#[derive(Parser, Debug, Default)]
#[command(name = "cantx")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Canton Ledger Explorer", long_about = None)]
pub struct CliArgs {
    /// View to render: ledger (party-scoped contracts) or network (scan aggregate)
    #[arg(short, long, env = "MODE", value_parser = clap::value_parser!(Mode))]
    pub mode: Option<Mode>,

    /// JSON Ledger API endpoint of the participant node
    #[arg(long, env = "LEDGER_API_URL")]
    pub ledger_url: Option<String>,

    /// Bearer token for the Ledger API (omit for unauthenticated nodes)
    #[arg(long, env = "LEDGER_AUTH_TOKEN")]
    pub auth_token: Option<String>,

    /// Scan API base URL for network state
    #[arg(long, env = "SCAN_API_URL")]
    pub scan_url: Option<String>,

    /// Public explorer statistics API base URL (reached via CORS relay)
    #[arg(long, env = "EXPLORER_API_URL")]
    pub explorer_url: Option<String>,

    /// Synchronization domain id for traffic status
    #[arg(long, env = "DOMAIN_ID")]
    pub domain_id: Option<String>,

    /// Member id for traffic status (e.g. "PAR::participant::fingerprint")
    #[arg(long, env = "MEMBER_ID")]
    pub member_id: Option<String>,

    /// Party to select on connect (full id or display-name prefix)
    #[arg(short, long, env = "PARTY")]
    pub party: Option<String>,

    /// HTTP request timeout in milliseconds (1000-60000)
    #[arg(long, env = "REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: Option<u64>,

    /// Maximum transactions to load per refresh (1-10000)
    #[arg(long, env = "TX_PAGE_LIMIT")]
    pub tx_page_limit: Option<usize>,

    /// Activity history window: day, week, or month
    #[arg(long, env = "ACTIVITY_PERIOD", value_parser = clap::value_parser!(TimePeriod))]
    pub activity_period: Option<TimePeriod>,

    /// Price history window: day, week, or month
    #[arg(long, env = "PRICE_PERIOD", value_parser = clap::value_parser!(TimePeriod))]
    pub price_period: Option<TimePeriod>,

    /// Validator leaderboard window: day, week, or month
    #[arg(long, env = "VALIDATORS_PERIOD", value_parser = clap::value_parser!(TimePeriod))]
    pub validators_period: Option<TimePeriod>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub mode: Mode,
    pub ledger_url: String,
    pub auth_token: Option<String>,
    pub scan_url: String,
    pub explorer_url: String,
    pub domain_id: Option<String>,
    pub member_id: Option<String>,
    pub party: Option<String>,
    pub request_timeout_ms: u64,
    pub tx_page_limit: usize,
    pub activity_period: TimePeriod,
    pub price_period: TimePeriod,
    pub validators_period: TimePeriod,
}

const DEFAULT_LEDGER_URL: &str = "http://localhost:7575";
const DEFAULT_SCAN_URL: &str = "https://scan.sv-1.global.canton.network.sync.global/api/scan";
// Public explorer API has no CORS headers; reached through a relay.
const DEFAULT_EXPLORER_URL: &str = "https://corsproxy.io/?url=https://api.cantonexplorer.io";

/// Validate that a value is within a given range (inclusive)
fn validate_in_range<T>(val: T, min: T, max: T, name: &str) -> Result<T>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if val < min || val > max {
        Err(anyhow!("{name} must be in range [{min}, {max}], got {val}"))
    } else {
        Ok(val)
    }
}

/// Validate URL format (basic check)
fn validate_url(url: &str, name: &str) -> Result<()> {
    if url.is_empty() {
        return Err(anyhow!("{name} cannot be empty"));
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow!("{name} must start with http:// or https://"))
    }
}

/// Load configuration from CLI args, environment variables, and saved
/// preferences. Priority: CLI args > Environment variables > Preferences >
/// Defaults. (clap resolves the env layer.)
pub fn load() -> Result<Config> {
    let args = CliArgs::parse();
    let prefs = crate::prefs::load();
    resolve(args, &prefs)
}

pub fn resolve(args: CliArgs, prefs: &Prefs) -> Result<Config> {
    let mode = args.mode.unwrap_or(Mode::Ledger);

    let ledger_url = args
        .ledger_url
        .or_else(|| prefs.ledger_url.clone())
        .unwrap_or_else(|| DEFAULT_LEDGER_URL.to_string());
    validate_url(&ledger_url, "LEDGER_API_URL")?;

    let scan_url = args
        .scan_url
        .or_else(|| prefs.scan_url.clone())
        .unwrap_or_else(|| DEFAULT_SCAN_URL.to_string());
    validate_url(&scan_url, "SCAN_API_URL")?;

    let explorer_url = args
        .explorer_url
        .unwrap_or_else(|| DEFAULT_EXPLORER_URL.to_string());
    validate_url(&explorer_url, "EXPLORER_API_URL")?;

    let request_timeout_ms = args.request_timeout_ms.unwrap_or(10_000);
    let request_timeout_ms =
        validate_in_range(request_timeout_ms, 1000, 60_000, "REQUEST_TIMEOUT_MS")?;

    let tx_page_limit = args.tx_page_limit.unwrap_or(200);
    let tx_page_limit = validate_in_range(tx_page_limit, 1, 10_000, "TX_PAGE_LIMIT")?;

    Ok(Config {
        mode,
        ledger_url,
        auth_token: args.auth_token.or_else(|| prefs.auth_token.clone()),
        scan_url,
        explorer_url,
        domain_id: args.domain_id.or_else(|| prefs.domain_id.clone()),
        member_id: args.member_id.or_else(|| prefs.member_id.clone()),
        party: args.party,
        request_timeout_ms,
        tx_page_limit,
        activity_period: args.activity_period.unwrap_or_default(),
        price_period: args.price_period.unwrap_or_default(),
        validators_period: args.validators_period.unwrap_or_default(),
    })
}

impl Config {
    pub fn print_summary(&self) {
        eprintln!("Cantx Configuration:");
        eprintln!("  Mode: {}", self.mode);
        eprintln!("  Ledger API: {}", self.ledger_url);
        eprintln!("  Scan API: {}", self.scan_url);
        eprintln!("  Request Timeout: {}ms", self.request_timeout_ms);
        eprintln!("  Tx Page Limit: {}", self.tx_page_limit);
        if self.auth_token.is_some() {
            eprintln!("  Ledger Auth: Configured");
        }
        if let Some(member) = &self.member_id {
            eprintln!("  Member: {member}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_resolve() {
        let cfg = resolve(CliArgs::default(), &Prefs::default()).unwrap();
        assert_eq!(cfg.mode, Mode::Ledger);
        assert_eq!(cfg.ledger_url, DEFAULT_LEDGER_URL);
        assert_eq!(cfg.request_timeout_ms, 10_000);
        assert_eq!(cfg.activity_period, TimePeriod::Day);
    }

    #[test]
    fn test_cli_overrides_prefs() {
        let prefs = Prefs {
            ledger_url: Some("http://saved:7575".to_string()),
            ..Prefs::default()
        };
        let args = CliArgs {
            ledger_url: Some("http://cli:7575".to_string()),
            ..CliArgs::default()
        };
        let cfg = resolve(args, &prefs).unwrap();
        assert_eq!(cfg.ledger_url, "http://cli:7575");
    }

    #[test]
    fn test_prefs_fill_missing_fields() {
        let prefs = Prefs {
            ledger_url: Some("http://saved:7575".to_string()),
            auth_token: Some("tok".to_string()),
            member_id: Some("PAR::p::fp".to_string()),
            ..Prefs::default()
        };
        let cfg = resolve(CliArgs::default(), &prefs).unwrap();
        assert_eq!(cfg.ledger_url, "http://saved:7575");
        assert_eq!(cfg.auth_token.as_deref(), Some("tok"));
        assert_eq!(cfg.member_id.as_deref(), Some("PAR::p::fp"));
    }

    #[test]
    fn test_timeout_out_of_range_rejected() {
        let args = CliArgs {
            request_timeout_ms: Some(100),
            ..CliArgs::default()
        };
        assert!(resolve(args, &Prefs::default()).is_err());
    }

    #[test]
    fn test_non_http_url_rejected() {
        let args = CliArgs {
            ledger_url: Some("ftp://nope".to_string()),
            ..CliArgs::default()
        };
        assert!(resolve(args, &Prefs::default()).is_err());
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("network".parse::<Mode>().unwrap(), Mode::Network);
        assert_eq!("contracts".parse::<Mode>().unwrap(), Mode::Ledger);
        assert!("tui".parse::<Mode>().is_err());
    }
}
