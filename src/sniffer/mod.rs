// Sniffer components
pub mod config;               // SnifferConfig, defaults, env/toml parsing, listing filters
pub mod core;                 // Subscription session loop, reconciliation, reconnect
pub mod decoder;              // Fixed-layout market account decoder
pub mod dedup;                // Known / in-flight identity sets
pub mod errors;               // SnifferError, DecodeError, PayloadError
pub mod filter;               // Quick-pool rejection by creator curve check
pub mod handler;              // Per-notification dedup -> decode -> filter -> launch

// Re-export commonly used types
pub use config::SnifferConfig;
pub use core::{SessionState, SessionSummary, SubscriptionClient};
pub use decoder::{decode, MarketRecord};
pub use dedup::{Admission, DedupTracker, Resolution};
pub use errors::{DecodeError, PayloadError, SnifferError};
pub use filter::FilterVerdict;
pub use handler::{AcceptedListing, DispatchOutcome, ListingHandler, ListingLauncher};
