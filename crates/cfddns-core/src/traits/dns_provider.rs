// # DNS Provider Trait
//
// Defines the interface for reading and updating DNS records via a
// provider's API.
//
// Providers are deliberately thin: stateless, single-shot API calls with
// full error propagation. Deciding *whether* a record needs updating is
// owned by the reconciler; deciding *when* to try again is owned by the
// polling engine. A provider that retries, caches, or second-guesses the
// computed updates breaks both.

use async_trait::async_trait;
use serde::Deserialize;

use crate::reconcile::{ProviderRecord, UpdateRequest};

/// Identifying details of a provider zone
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ZoneDetails {
    /// Zone identifier
    pub id: String,
    /// Zone name, i.e. the base domain
    pub name: String,
}

/// Trait for DNS provider implementations
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Fetch a zone's details, proving the zone id and credentials are valid
    ///
    /// Called once per zone at startup; the returned `name` becomes the
    /// base domain for FQDN construction.
    async fn zone_details(&self, zone_id: &str) -> Result<ZoneDetails, crate::Error>;

    /// List the zone's DNS records
    ///
    /// Returns records of all types; the caller filters to the kinds it
    /// reconciles.
    async fn list_records(&self, zone_id: &str) -> Result<Vec<ProviderRecord>, crate::Error>;

    /// Apply a single record update
    ///
    /// `new_ip` is the content to write; `request` carries everything else
    /// (record id, type, proxied flag, resolved TTL). Must perform exactly
    /// one update call — a failure is returned, not retried.
    async fn update_record(
        &self,
        request: &UpdateRequest,
        new_ip: &str,
    ) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
