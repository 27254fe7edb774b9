//! Record reconciliation
//!
//! [`compute_updates`] is the decision core of the updater: given a zone's
//! desired subdomain specs and the records the provider currently serves,
//! it produces the minimal, ordered list of updates that converge the zone
//! to a new IP address. It is a pure function — no I/O, deterministic for
//! identical inputs — so the surrounding engine and providers stay thin.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{DEFAULT_TTL_SECS, SubdomainSpec, Ttl};

/// DNS record kind, as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    /// IPv4 address record
    #[serde(rename = "A")]
    A,
    /// IPv6 address record
    #[serde(rename = "AAAA")]
    Aaaa,
    /// Alias record
    #[serde(rename = "CNAME")]
    Cname,
    /// Any other record type, carried verbatim
    #[serde(untagged)]
    Other(String),
}

impl RecordKind {
    /// Whether this kind carries an IP address as its content
    pub fn is_address(&self) -> bool {
        matches!(self, RecordKind::A | RecordKind::Aaaa)
    }

    /// Wire name of the record type
    pub fn as_str(&self) -> &str {
        match self {
            RecordKind::A => "A",
            RecordKind::Aaaa => "AAAA",
            RecordKind::Cname => "CNAME",
            RecordKind::Other(name) => name,
        }
    }
}

/// A DNS record as currently provisioned at the provider
///
/// Fetched fresh on every reconciliation pass; never cached across runs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProviderRecord {
    /// Opaque provider identifier
    pub id: String,
    /// Fully-qualified record name (case-insensitive)
    pub name: String,
    /// Record type
    #[serde(rename = "type")]
    pub kind: RecordKind,
    /// Current record content (the IP string for address records)
    pub content: String,
    /// Current TTL, if the provider reports one
    #[serde(default)]
    pub ttl: Option<u32>,
    /// Current proxy flag, if the provider reports one
    #[serde(default)]
    pub proxied: Option<bool>,
}

/// One record update to execute against the provider
///
/// `previous_content` is the record's content *before* the update, retained
/// for audit logging; the new IP is supplied separately at execution time.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    /// Zone the record belongs to
    pub zone_id: String,
    /// Fully-qualified record name
    pub fqdn: String,
    /// Provider identifier of the record to update
    pub record_id: String,
    /// Record type to write back
    pub record_type: RecordKind,
    /// Proxy flag from the subdomain spec
    pub proxied: bool,
    /// Resolved TTL to write
    pub ttl: u32,
    /// Record content before the update
    pub previous_content: String,
}

/// Compute the updates needed to point `subdomains` at `new_ip`
///
/// `records` must already be filtered to the address record kinds of
/// interest. Output order follows subdomain declaration order, with at most
/// one request per distinct FQDN. Specs with no matching record are skipped:
/// this function never creates records.
pub fn compute_updates(
    zone_id: &str,
    base_domain: &str,
    subdomains: &[SubdomainSpec],
    records: &[ProviderRecord],
    new_ip: &str,
    global_ttl: Option<u32>,
) -> Vec<UpdateRequest> {
    let mut by_fqdn: HashMap<String, &ProviderRecord> =
        HashMap::with_capacity(records.len());
    for record in records {
        if let Some(shadowed) = by_fqdn.insert(record.name.to_lowercase(), record) {
            // Which record wins is undefined; a zone should not serve two
            // address records under one name.
            debug!(
                name = %record.name,
                shadowed_id = %shadowed.id,
                "duplicate record name in zone listing"
            );
        }
    }

    let mut seen = HashSet::new();
    let mut updates = Vec::new();

    for spec in subdomains {
        let fqdn = fqdn_for(&spec.name, base_domain);

        if !seen.insert(fqdn.clone()) {
            debug!(%fqdn, "duplicate subdomain spec, skipping");
            continue;
        }

        let Some(record) = by_fqdn.get(&fqdn) else {
            debug!(%fqdn, "no matching record in zone, skipping");
            continue;
        };

        if record.content == new_ip {
            debug!(%fqdn, ip = %new_ip, "record already current, skipping");
            continue;
        }

        updates.push(UpdateRequest {
            zone_id: zone_id.to_string(),
            fqdn,
            record_id: record.id.clone(),
            record_type: record.kind.clone(),
            proxied: spec.proxied,
            ttl: resolve_ttl(spec.ttl, global_ttl),
            previous_content: record.content.clone(),
        });
    }

    updates
}

/// Build the FQDN for a subdomain name within a base domain
///
/// The name is lower-cased and trimmed; `""` and `"@"` denote the apex.
pub fn fqdn_for(name: &str, base_domain: &str) -> String {
    let name = name.trim().to_lowercase();
    let base_domain = base_domain.trim().to_lowercase();
    if name.is_empty() || name == "@" {
        base_domain
    } else {
        format!("{name}.{base_domain}")
    }
}

/// Resolve the TTL to write for a subdomain
///
/// Precedence: the subdomain's own TTL if set (an explicit `Automatic`
/// resolves to the provider sentinel and overrides the global default),
/// otherwise the zone-global TTL, otherwise [`DEFAULT_TTL_SECS`].
pub fn resolve_ttl(spec_ttl: Option<Ttl>, global_ttl: Option<u32>) -> u32 {
    match spec_ttl {
        Some(ttl) => ttl.provider_value(),
        None => global_ttl.unwrap_or(DEFAULT_TTL_SECS),
    }
}

/// Group update requests by zone, preserving request order within each zone
///
/// Requests from one reconciliation pass share a zone, but the executor
/// contract supports batches spanning several.
pub fn group_by_zone(updates: Vec<UpdateRequest>) -> Vec<(String, Vec<UpdateRequest>)> {
    let mut groups: Vec<(String, Vec<UpdateRequest>)> = Vec::new();
    for update in updates {
        match groups.iter_mut().find(|(zone, _)| *zone == update.zone_id) {
            Some((_, batch)) => batch.push(update),
            None => groups.push((update.zone_id.clone(), vec![update])),
        }
    }
    groups
}
