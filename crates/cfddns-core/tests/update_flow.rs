//! Engine behavior tests
//!
//! Exercise the poll cycle end to end against in-memory doubles: change
//! detection, idempotence, partial-failure tolerance, and lookup-failure
//! handling.

mod common;

use std::net::Ipv4Addr;
use std::time::Duration;

use common::*;
use cfddns_core::engine::{Updater, ZoneHandle, apply_updates};
use cfddns_core::error::Error;
use cfddns_core::{Ttl, compute_updates};

const INTERVAL: Duration = Duration::from_secs(900);

fn ip(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}

fn example_zone(provider: MockDnsProvider) -> ZoneHandle {
    ZoneHandle::with_base_domain(
        Box::new(provider),
        "test-zone",
        "example.com",
        vec![
            spec("test", true, Some(Ttl::Seconds(120))),
            spec("@", false, None),
        ],
    )
}

#[tokio::test]
async fn changed_ip_updates_all_matching_records() {
    let provider = MockDnsProvider::new(
        "example.com",
        vec![
            a_record("r1", "test.example.com", "1.1.1.1"),
            a_record("r2", "example.com", "1.1.1.1"),
        ],
    );
    let (_, update_count, updated) = provider.counters();

    let updater = Updater::new(
        Box::new(ScriptedIpSource::fixed(ip("2.2.2.2"))),
        vec![example_zone(provider)],
        Some(300),
        INTERVAL,
    )
    .unwrap();

    let last_known = updater.run_cycle(None).await;
    assert_eq!(last_known, Some(ip("2.2.2.2")));

    assert_eq!(update_count.load(std::sync::atomic::Ordering::SeqCst), 2);
    let updated = updated.lock().unwrap();
    assert_eq!(updated[0].fqdn, "test.example.com");
    assert_eq!(updated[0].ttl, 120);
    assert_eq!(updated[1].fqdn, "example.com");
    assert_eq!(updated[1].ttl, 300);
}

#[tokio::test]
async fn unchanged_ip_touches_no_zone() {
    let provider = MockDnsProvider::new(
        "example.com",
        vec![a_record("r1", "test.example.com", "1.1.1.1")],
    );
    let (list_count, update_count, _) = provider.counters();

    let updater = Updater::new(
        Box::new(ScriptedIpSource::fixed(ip("2.2.2.2"))),
        vec![example_zone(provider)],
        None,
        INTERVAL,
    )
    .unwrap();

    let last_known = updater.run_cycle(Some(ip("2.2.2.2"))).await;
    assert_eq!(last_known, Some(ip("2.2.2.2")));

    assert_eq!(list_count.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert_eq!(update_count.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn second_cycle_with_same_ip_is_idempotent() {
    let provider = MockDnsProvider::new(
        "example.com",
        vec![a_record("r1", "test.example.com", "1.1.1.1")],
    );
    let (list_count, update_count, _) = provider.counters();

    let updater = Updater::new(
        Box::new(ScriptedIpSource::fixed(ip("2.2.2.2"))),
        vec![example_zone(provider)],
        None,
        INTERVAL,
    )
    .unwrap();

    let after_first = updater.run_cycle(None).await;
    let after_second = updater.run_cycle(after_first).await;

    assert_eq!(after_second, Some(ip("2.2.2.2")));
    assert_eq!(list_count.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(update_count.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn lookup_failure_keeps_last_known_ip() {
    let provider = MockDnsProvider::new(
        "example.com",
        vec![a_record("r1", "test.example.com", "1.1.1.1")],
    );
    let (list_count, _, _) = provider.counters();

    let updater = Updater::new(
        Box::new(ScriptedIpSource::failing()),
        vec![example_zone(provider)],
        None,
        INTERVAL,
    )
    .unwrap();

    let last_known = updater.run_cycle(Some(ip("9.9.9.9"))).await;
    assert_eq!(last_known, Some(ip("9.9.9.9")));
    assert_eq!(list_count.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn one_failing_record_does_not_block_siblings() {
    let provider = MockDnsProvider::new(
        "example.com",
        vec![
            a_record("r1", "test.example.com", "1.1.1.1"),
            a_record("r2", "example.com", "1.1.1.1"),
        ],
    )
    .failing_on("test.example.com");
    let (_, update_count, updated) = provider.counters();

    let updater = Updater::new(
        Box::new(ScriptedIpSource::fixed(ip("2.2.2.2"))),
        vec![example_zone(provider)],
        None,
        INTERVAL,
    )
    .unwrap();

    let last_known = updater.run_cycle(None).await;
    // The cycle completes and the IP is considered processed.
    assert_eq!(last_known, Some(ip("2.2.2.2")));

    // Both updates were attempted, only the sibling landed.
    assert_eq!(update_count.load(std::sync::atomic::Ordering::SeqCst), 2);
    let updated = updated.lock().unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].fqdn, "example.com");
}

#[tokio::test]
async fn apply_updates_reports_partial_failure() {
    let provider = MockDnsProvider::new(
        "example.com",
        vec![
            a_record("r1", "a.example.com", "1.1.1.1"),
            a_record("r2", "b.example.com", "1.1.1.1"),
        ],
    )
    .failing_on("a.example.com");

    let updates = compute_updates(
        "test-zone",
        "example.com",
        &[spec("a", false, None), spec("b", false, None)],
        &[
            a_record("r1", "a.example.com", "1.1.1.1"),
            a_record("r2", "b.example.com", "1.1.1.1"),
        ],
        "2.2.2.2",
        None,
    );
    assert_eq!(updates.len(), 2);

    let outcome = apply_updates(&provider, updates, "2.2.2.2").await;
    assert_eq!(outcome.succeeded, 1);
    assert_eq!(outcome.failed, 1);
}

#[tokio::test]
async fn zone_resolution_captures_base_domain() {
    let provider = MockDnsProvider::new("example.com", Vec::new());

    let zone = ZoneHandle::resolve(
        Box::new(provider),
        cfddns_core::ZoneConfig {
            authentication: cfddns_core::config::AuthConfig::Token {
                api_token: "t".to_string(),
            },
            zone_id: "test-zone".to_string(),
            subdomains: vec![spec("www", false, None)],
        },
    )
    .await
    .unwrap();

    assert_eq!(zone.base_domain(), "example.com");
    assert_eq!(zone.zone_id(), "test-zone");
}

#[tokio::test]
async fn updater_rejects_empty_zone_list() {
    let result = Updater::new(
        Box::new(ScriptedIpSource::fixed(ip("2.2.2.2"))),
        Vec::new(),
        None,
        INTERVAL,
    );
    assert!(matches!(result, Err(Error::Config(_))));
}
