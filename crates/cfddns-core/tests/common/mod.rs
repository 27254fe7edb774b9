//! Test doubles for engine tests
//!
//! Minimal in-memory implementations of the provider and IP source traits,
//! with atomic call counters so tests can assert on what the engine did.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use cfddns_core::error::{Error, Result};
use cfddns_core::reconcile::{ProviderRecord, RecordKind, UpdateRequest};
use cfddns_core::traits::{DnsProvider, IpSource, ZoneDetails};
use cfddns_core::{SubdomainSpec, Ttl};

/// An IP source returning a scripted sequence of results
pub struct ScriptedIpSource {
    results: Mutex<Vec<Result<Ipv4Addr>>>,
    call_count: Arc<AtomicUsize>,
}

impl ScriptedIpSource {
    /// `results` are yielded in order; the last entry repeats once exhausted.
    pub fn new(results: Vec<Result<Ipv4Addr>>) -> Self {
        assert!(!results.is_empty());
        Self {
            results: Mutex::new(results),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn fixed(ip: Ipv4Addr) -> Self {
        Self::new(vec![Ok(ip)])
    }

    pub fn failing() -> Self {
        Self::new(vec![Err(Error::ip_lookup("scripted failure"))])
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.call_count.clone()
    }
}

#[async_trait::async_trait]
impl IpSource for ScriptedIpSource {
    async fn current(&self) -> Result<Ipv4Addr> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let mut results = self.results.lock().unwrap();
        let next = if results.len() > 1 {
            results.remove(0)
        } else {
            match &results[0] {
                Ok(ip) => Ok(*ip),
                Err(_) => Err(Error::ip_lookup("scripted failure")),
            }
        };
        next
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// A mock DnsProvider serving a fixed record set and tracking update calls
pub struct MockDnsProvider {
    zone_name: String,
    records: Mutex<Vec<ProviderRecord>>,
    /// FQDNs whose updates fail with a provider error
    failing_fqdns: Vec<String>,
    list_call_count: Arc<AtomicUsize>,
    update_call_count: Arc<AtomicUsize>,
    updated: Arc<Mutex<Vec<UpdateRequest>>>,
}

impl MockDnsProvider {
    pub fn new(zone_name: &str, records: Vec<ProviderRecord>) -> Self {
        Self {
            zone_name: zone_name.to_string(),
            records: Mutex::new(records),
            failing_fqdns: Vec::new(),
            list_call_count: Arc::new(AtomicUsize::new(0)),
            update_call_count: Arc::new(AtomicUsize::new(0)),
            updated: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make updates for the given FQDN fail
    pub fn failing_on(mut self, fqdn: &str) -> Self {
        self.failing_fqdns.push(fqdn.to_string());
        self
    }

    pub fn list_call_count(&self) -> usize {
        self.list_call_count.load(Ordering::SeqCst)
    }

    pub fn update_call_count(&self) -> usize {
        self.update_call_count.load(Ordering::SeqCst)
    }

    /// Requests that were successfully applied, in order
    pub fn updated_requests(&self) -> Vec<UpdateRequest> {
        self.updated.lock().unwrap().clone()
    }

    /// Shared handles for asserting after the provider is boxed away
    pub fn counters(
        &self,
    ) -> (Arc<AtomicUsize>, Arc<AtomicUsize>, Arc<Mutex<Vec<UpdateRequest>>>) {
        (
            self.list_call_count.clone(),
            self.update_call_count.clone(),
            self.updated.clone(),
        )
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn zone_details(&self, zone_id: &str) -> Result<ZoneDetails> {
        Ok(ZoneDetails {
            id: zone_id.to_string(),
            name: self.zone_name.clone(),
        })
    }

    async fn list_records(&self, _zone_id: &str) -> Result<Vec<ProviderRecord>> {
        self.list_call_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.lock().unwrap().clone())
    }

    async fn update_record(&self, request: &UpdateRequest, new_ip: &str) -> Result<()> {
        self.update_call_count.fetch_add(1, Ordering::SeqCst);

        if self.failing_fqdns.contains(&request.fqdn) {
            return Err(Error::provider("mock", format!("refused {}", request.fqdn)));
        }

        // Mirror the provider's effect so later cycles see converged state.
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.iter_mut().find(|r| r.id == request.record_id) {
            record.content = new_ip.to_string();
        }

        self.updated.lock().unwrap().push(request.clone());
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

pub fn a_record(id: &str, name: &str, content: &str) -> ProviderRecord {
    ProviderRecord {
        id: id.to_string(),
        name: name.to_string(),
        kind: RecordKind::A,
        content: content.to_string(),
        ttl: Some(300),
        proxied: Some(false),
    }
}

pub fn spec(name: &str, proxied: bool, ttl: Option<Ttl>) -> SubdomainSpec {
    SubdomainSpec {
        name: name.to_string(),
        proxied,
        ttl,
    }
}
