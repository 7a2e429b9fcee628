//! Cantx - Canton Ledger Explorer
//!
//! Client library for exploring a Canton/Daml participant node through its
//! JSON Ledger API, plus the network-state ("Scan") API family and the
//! public explorer statistics API.
//!
//! ## Architecture
//!
//! The core is a client-side data/cache layer:
//! - [`ledger`] issues authenticated one-shot HTTP calls to the participant
//! - [`wire`] normalizes the wire-level event/filter model into the domain
//!   records in [`types`]
//! - [`store`] owns the party-scoped projection (active contracts,
//!   transactions) with generation-guarded commits
//! - [`aggregator`] fans out to the independent network-state endpoints and
//!   merges a best-effort combined view
//! - [`views`] are pure derived-view builders recomputed on read

// Domain model and error taxonomy
pub mod error;
pub mod types;

// Wire model adapter (ledger API JSON -> normalized records)
pub mod wire;

// Request layers
pub mod explorer_api;
pub mod ledger;
pub mod scan;

// Party-scoped projection store
pub mod store;

// Multi-source network aggregator
pub mod aggregator;

// Derived-view builders (pure, recomputed on read)
pub mod views;

// Configuration and saved preferences
pub mod config;
pub mod prefs;

// Text helpers shared by views and the CLI
pub mod util_text;

// Re-export commonly used types
pub use config::{Config, Mode};
pub use error::{ClientError, ClientResult};
pub use ledger::{LedgerApi, LedgerClient};
pub use store::{ConnectionPhase, ExplorerStore};
pub use types::{Contract, Event, Party, Transaction};
