// # IP Source Trait
//
// Defines the interface for resolving the machine's public IPv4 address.
//
// Implementations are single-shot: one lookup per call, no caching, no
// background tasks. The engine decides when to poll and how to react to
// failures (log, keep the last known IP, retry next cycle).

use std::net::Ipv4Addr;

use async_trait::async_trait;

/// Trait for public IP source implementations
///
/// A source may fail per call with an error the engine logs and treats as
/// non-fatal for the overall cycle.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Resolve the current public IPv4 address
    async fn current(&self) -> Result<Ipv4Addr, crate::Error>;

    /// Name of the source, for logging
    fn source_name(&self) -> &'static str;
}
