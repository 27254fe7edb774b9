//! Core traits for the updater
//!
//! - [`DnsProvider`]: query and update records via a provider API
//! - [`IpSource`]: resolve the machine's current public IP

pub mod dns_provider;
pub mod ip_source;

pub use dns_provider::{DnsProvider, ZoneDetails};
pub use ip_source::IpSource;
