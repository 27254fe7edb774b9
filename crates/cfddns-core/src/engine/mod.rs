//! Polling engine
//!
//! The [`Updater`] drives the whole update flow:
//!
//! ```text
//! ┌─────────────┐
//! │  IpSource   │── current IPv4 ──┐
//! └─────────────┘                  ▼
//!                          ┌──────────────┐   changed?   ┌──────────────┐
//!                          │   Updater    │─────────────►│ per zone:    │
//!                          │ (poll cycle) │              │ list records │
//!                          └──────────────┘              │ reconcile    │
//!                                                        │ apply updates│
//!                                                        └──────────────┘
//! ```
//!
//! One cycle: fetch the public IP, compare against the last known address,
//! and — only on change — reconcile and update every configured zone. The
//! last known IP is explicit state passed into and returned from each
//! cycle, so the engine holds no mutable state and each invocation is
//! independently testable.
//!
//! Failure policy per the error design: an IP-lookup or zone-level failure
//! is logged and retried on the next cycle; a single record's update
//! failure never aborts its siblings.

use std::net::Ipv4Addr;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::ZoneConfig;
use crate::error::{Error, Result};
use crate::reconcile::{UpdateRequest, compute_updates, group_by_zone};
use crate::traits::{DnsProvider, IpSource};

/// A configured zone bound to the provider that manages it
///
/// Produced by [`ZoneHandle::resolve`], which proves the zone id and
/// credentials against the live API and learns the zone's base domain.
pub struct ZoneHandle {
    provider: Box<dyn DnsProvider>,
    zone_id: String,
    base_domain: String,
    subdomains: Vec<crate::config::SubdomainSpec>,
}

impl ZoneHandle {
    /// Resolve a configured zone against the provider
    ///
    /// Fetches the zone's details to validate access and capture the zone
    /// name as the base domain. Fails if the zone id is unknown or the
    /// credentials are rejected.
    pub async fn resolve(provider: Box<dyn DnsProvider>, config: ZoneConfig) -> Result<Self> {
        let details = provider.zone_details(&config.zone_id).await?;
        info!(zone = %details.name, zone_id = %config.zone_id, "validated zone");

        Ok(Self {
            provider,
            zone_id: config.zone_id,
            base_domain: details.name,
            subdomains: config.subdomains,
        })
    }

    /// Build a handle from already-known zone details, skipping the
    /// provider round trip. Intended for tests and embedders that resolve
    /// zones themselves.
    pub fn with_base_domain(
        provider: Box<dyn DnsProvider>,
        zone_id: impl Into<String>,
        base_domain: impl Into<String>,
        subdomains: Vec<crate::config::SubdomainSpec>,
    ) -> Self {
        Self {
            provider,
            zone_id: zone_id.into(),
            base_domain: base_domain.into(),
            subdomains,
        }
    }

    /// The zone's base domain (its name at the provider)
    pub fn base_domain(&self) -> &str {
        &self.base_domain
    }

    /// The zone's provider identifier
    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }
}

/// Outcome of applying a batch of updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplyOutcome {
    /// Updates that succeeded
    pub succeeded: usize,
    /// Updates that failed (logged, not retried until the next cycle)
    pub failed: usize,
}

/// The polling update engine
///
/// Owns the IP source and the resolved zone handles. `run()` loops forever
/// at the configured interval; `run_cycle()` performs a single pass and is
/// safe to call repeatedly.
pub struct Updater {
    ip_source: Box<dyn IpSource>,
    zones: Vec<ZoneHandle>,
    global_ttl: Option<u32>,
    check_interval: Duration,
}

impl Updater {
    /// Create a new updater
    ///
    /// `zones` must be non-empty: an updater with nothing to manage is a
    /// configuration error.
    pub fn new(
        ip_source: Box<dyn IpSource>,
        zones: Vec<ZoneHandle>,
        global_ttl: Option<u32>,
        check_interval: Duration,
    ) -> Result<Self> {
        if zones.is_empty() {
            return Err(Error::config("No valid zones to manage"));
        }

        Ok(Self {
            ip_source,
            zones,
            global_ttl,
            check_interval,
        })
    }

    /// Run the poll loop until a shutdown signal arrives
    ///
    /// Performs one cycle immediately, then sleeps `check_interval` between
    /// cycles. SIGINT breaks the sleep and returns cleanly.
    pub async fn run(&self) -> Result<()> {
        info!(
            interval_secs = self.check_interval.as_secs(),
            zones = self.zones.len(),
            "starting periodic checks"
        );

        let mut last_known: Option<Ipv4Addr> = None;

        loop {
            last_known = self.run_cycle(last_known).await;

            tokio::select! {
                _ = tokio::time::sleep(self.check_interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Perform one poll cycle
    ///
    /// Takes the last known public IP and returns the value the next cycle
    /// should use: the new IP after a change was processed, or the input
    /// unchanged when the lookup failed or nothing changed.
    pub async fn run_cycle(&self, last_known: Option<Ipv4Addr>) -> Option<Ipv4Addr> {
        let ip = match self.ip_source.current().await {
            Ok(ip) => ip,
            Err(e) => {
                error!(source = self.ip_source.source_name(), "failed to obtain public IP: {e}");
                return last_known;
            }
        };

        if last_known == Some(ip) {
            debug!(%ip, "no IP change detected");
            return last_known;
        }

        info!(previous = ?last_known, current = %ip, "public IP changed");
        let new_ip = ip.to_string();

        for zone in &self.zones {
            if let Err(e) = self.sync_zone(zone, &new_ip).await {
                // Zone-level failures are transient; the next cycle retries.
                error!(zone = %zone.base_domain, "error processing zone: {e}");
            }
        }

        Some(ip)
    }

    /// Reconcile and update a single zone
    async fn sync_zone(&self, zone: &ZoneHandle, new_ip: &str) -> Result<()> {
        let records: Vec<_> = zone
            .provider
            .list_records(&zone.zone_id)
            .await?
            .into_iter()
            .filter(|record| record.kind.is_address())
            .collect();

        let updates = compute_updates(
            &zone.zone_id,
            &zone.base_domain,
            &zone.subdomains,
            &records,
            new_ip,
            self.global_ttl,
        );

        if updates.is_empty() {
            info!(zone = %zone.base_domain, "no records need updating");
            return Ok(());
        }

        let outcome = apply_updates(zone.provider.as_ref(), updates, new_ip).await;
        if outcome.failed > 0 {
            warn!(
                zone = %zone.base_domain,
                succeeded = outcome.succeeded,
                failed = outcome.failed,
                "zone updated with failures"
            );
        } else {
            info!(
                zone = %zone.base_domain,
                updated = outcome.succeeded,
                "zone updated"
            );
        }

        Ok(())
    }
}

/// Apply a batch of updates, best effort
///
/// Requests are grouped by zone and applied independently: one record's
/// failure is logged and must not prevent attempting the remaining records.
/// No rollback, no transaction.
pub async fn apply_updates(
    provider: &dyn DnsProvider,
    updates: Vec<UpdateRequest>,
    new_ip: &str,
) -> ApplyOutcome {
    let mut outcome = ApplyOutcome::default();

    for (zone_id, batch) in group_by_zone(updates) {
        debug!(%zone_id, count = batch.len(), "applying updates");

        for update in batch {
            match provider.update_record(&update, new_ip).await {
                Ok(()) => {
                    info!(
                        "updated {} from {} to {}",
                        update.fqdn, update.previous_content, new_ip
                    );
                    debug!(
                        fqdn = %update.fqdn,
                        record_type = update.record_type.as_str(),
                        proxied = update.proxied,
                        ttl = update.ttl,
                        "update detail"
                    );
                    outcome.succeeded += 1;
                }
                Err(e) => {
                    error!("failed to update {}: {}", update.fqdn, e);
                    outcome.failed += 1;
                }
            }
        }
    }

    outcome
}
