// # HTTP IP Source
//
// Resolves the machine's public IPv4 address by asking an external lookup
// service. Services return the address as plain text; the response is
// trimmed and parsed.
//
// A lookup failure on one service falls through to the next configured
// service before the cycle gives up. The default list starts with
// api.ipify.org, which the updater has always used, with two widely
// deployed alternates behind it.

use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use cfddns_core::traits::IpSource;
use cfddns_core::{Error, Result};
use tracing::{debug, warn};

/// Public IP lookup services, tried in order
const DEFAULT_IP_SERVICES: &[&str] = &[
    "https://api.ipify.org",
    "https://ifconfig.me/ip",
    "https://icanhazip.com",
];

/// HTTP timeout per lookup request
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP-based public IPv4 source
pub struct HttpIpSource {
    services: Vec<String>,
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a source using the default service list
    pub fn new() -> Result<Self> {
        Self::with_services(
            DEFAULT_IP_SERVICES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }

    /// Create a source with a custom service list
    pub fn with_services(services: Vec<String>) -> Result<Self> {
        if services.is_empty() {
            return Err(Error::config("At least one IP lookup service is required"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { services, client })
    }

    /// Fetch and parse the IP from one service
    async fn fetch_from(&self, url: &str) -> Result<Ipv4Addr> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::ip_lookup(format!("request to {url} failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::ip_lookup(format!(
                "{url} answered {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::ip_lookup(format!("failed to read response from {url}: {e}")))?;

        parse_ipv4(&body)
            .ok_or_else(|| Error::ip_lookup(format!("invalid IPv4 in response from {url}: {body:?}")))
    }
}

#[async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self) -> Result<Ipv4Addr> {
        let mut last_error = None;

        for url in &self.services {
            match self.fetch_from(url).await {
                Ok(ip) => {
                    debug!(%url, %ip, "public IP resolved");
                    return Ok(ip);
                }
                Err(e) => {
                    warn!(%url, "IP lookup failed: {e}");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| Error::ip_lookup("no lookup services configured")))
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}

/// Parse a lookup service's plain-text response as an IPv4 address
fn parse_ipv4(body: &str) -> Option<Ipv4Addr> {
    body.trim().parse().ok()
}
