// # cfddns-core
//
// Core library for the cfddns dynamic DNS updater.
//
// ## Architecture Overview
//
// - **reconcile**: pure diff of desired subdomains against provider
//   records — the only part with real decision logic
// - **IpSource**: trait for resolving the current public IPv4 address
// - **DnsProvider**: trait for reading and updating records via a
//   provider API
// - **Updater**: polling engine that ties the three together on a
//   fixed interval
// - **config**: YAML configuration model and validation
//
// ## Design Principles
//
// 1. **Pure core**: reconciliation does no I/O and is deterministic
// 2. **Thin collaborators**: providers and IP sources are single-shot;
//    scheduling and failure policy live in the engine
// 3. **Explicit state**: the last known IP is threaded through the poll
//    loop, never held in module state
// 4. **Best effort updates**: one record's failure never blocks the rest

pub mod config;
pub mod engine;
pub mod error;
pub mod reconcile;
pub mod traits;

// Re-export core types for convenience
pub use config::{AuthConfig, Config, SubdomainSpec, Ttl, ZoneConfig};
pub use engine::{ApplyOutcome, Updater, ZoneHandle, apply_updates};
pub use error::{Error, Result};
pub use reconcile::{ProviderRecord, RecordKind, UpdateRequest, compute_updates};
pub use traits::{DnsProvider, IpSource, ZoneDetails};
