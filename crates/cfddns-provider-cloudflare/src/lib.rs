// # Cloudflare DNS Provider
//
// Implements the `DnsProvider` trait over the Cloudflare v4 REST API.
//
// The provider is stateless and single-shot: one API call per method, full
// error propagation, no retry or backoff (the engine retries on its next
// poll cycle), no caching. Credentials never appear in logs or `Debug`
// output.
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - Zone details: GET `/zones/:zone_id`
// - List DNS records: GET `/zones/:zone_id/dns_records`
// - Update DNS record: PUT `/zones/:zone_id/dns_records/:record_id`

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use cfddns_core::config::AuthConfig;
use cfddns_core::reconcile::{ProviderRecord, UpdateRequest};
use cfddns_core::traits::{DnsProvider, ZoneDetails};
use cfddns_core::{Error, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Page size for record listings; zones under DDNS management are far
/// smaller than this in practice
const LIST_RECORDS_PER_PAGE: u32 = 100;

/// Environment variables that override the configured credentials
const ENV_API_TOKEN: &str = "CF_DDNS_API_TOKEN";
const ENV_API_KEY: &str = "CF_DDNS_API_KEY";
const ENV_API_EMAIL: &str = "CF_DDNS_API_EMAIL";

/// Environment variable selecting dry-run mode (`CF_DDNS_MODE=dry-run`)
const ENV_MODE: &str = "CF_DDNS_MODE";

/// Resolved API credentials
#[derive(Clone)]
enum Credentials {
    /// Scoped API token, sent as a bearer header
    Token(String),
    /// Legacy global key + email header pair
    KeyEmail { key: String, email: String },
}

impl Credentials {
    /// Resolve credentials, preferring environment variables over the
    /// configured values.
    fn resolve(auth: &AuthConfig) -> Result<Self> {
        Self::resolve_with(
            std::env::var(ENV_API_TOKEN).ok(),
            std::env::var(ENV_API_KEY).ok(),
            std::env::var(ENV_API_EMAIL).ok(),
            auth,
        )
    }

    fn resolve_with(
        env_token: Option<String>,
        env_key: Option<String>,
        env_email: Option<String>,
        auth: &AuthConfig,
    ) -> Result<Self> {
        if let Some(token) = env_token.filter(|t| !t.is_empty()) {
            return Ok(Credentials::Token(token));
        }

        if let (Some(key), Some(email)) = (env_key, env_email) {
            if !key.is_empty() && !email.is_empty() {
                return Ok(Credentials::KeyEmail { key, email });
            }
        }

        match auth {
            AuthConfig::Token { api_token } => {
                if api_token.is_empty() {
                    return Err(Error::config("Cloudflare API token cannot be empty"));
                }
                Ok(Credentials::Token(api_token.clone()))
            }
            AuthConfig::Key { api_key, api_email } => {
                if api_key.is_empty() || api_email.is_empty() {
                    return Err(Error::config(
                        "Cloudflare api_key and api_email must both be set",
                    ));
                }
                Ok(Credentials::KeyEmail {
                    key: api_key.clone(),
                    email: api_email.clone(),
                })
            }
        }
    }
}

/// Cloudflare API response envelope
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiError>,
    result: Option<T>,
}

/// One error entry from the Cloudflare API envelope
#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: i64,
    message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// Cloudflare DNS provider
///
/// In dry-run mode all GET requests are performed but PUT updates are only
/// logged, never sent. Select it with `CF_DDNS_MODE=dry-run`.
pub struct CloudflareProvider {
    credentials: Credentials,
    client: reqwest::Client,
    dry_run: bool,
}

// Credentials never appear in Debug output
impl fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let auth_kind = match &self.credentials {
            Credentials::Token(_) => "token",
            Credentials::KeyEmail { .. } => "key+email",
        };
        f.debug_struct("CloudflareProvider")
            .field("credentials", &format_args!("<REDACTED {auth_kind}>"))
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a provider from zone credentials
    ///
    /// Environment variables (`CF_DDNS_API_TOKEN`, or `CF_DDNS_API_KEY` +
    /// `CF_DDNS_API_EMAIL`) take precedence over the configured values.
    /// Dry-run mode is read from `CF_DDNS_MODE`.
    pub fn new(auth: &AuthConfig) -> Result<Self> {
        let dry_run = std::env::var(ENV_MODE)
            .unwrap_or_default()
            .eq_ignore_ascii_case("dry-run");

        if dry_run {
            warn!("Cloudflare provider running in dry-run mode, no changes will be made");
        }

        Self::with_mode(auth, dry_run)
    }

    /// Create a provider with an explicit dry-run flag
    pub fn with_mode(auth: &AuthConfig, dry_run: bool) -> Result<Self> {
        let credentials = Credentials::resolve(auth)?;

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            credentials,
            client,
            dry_run,
        })
    }

    /// Whether this provider is in dry-run mode
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Build a request with authentication headers attached
    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header("Content-Type", "application/json");

        match &self.credentials {
            Credentials::Token(token) => builder.bearer_auth(token),
            Credentials::KeyEmail { key, email } => builder
                .header("X-Auth-Key", key)
                .header("X-Auth-Email", email),
        }
    }

    /// Send a request and unwrap the Cloudflare response envelope
    async fn send<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<T> {
        let response = builder.send().await.map_err(|e| {
            Error::provider("cloudflare", format!("{context}: HTTP request failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error response".to_string());
            return Err(classify_status(status.as_u16(), context, &body));
        }

        let envelope: ApiResponse<T> = response.json().await.map_err(|e| {
            Error::provider("cloudflare", format!("{context}: failed to parse response: {e}"))
        })?;

        if !envelope.success {
            let messages: Vec<String> =
                envelope.errors.iter().map(ToString::to_string).collect();
            return Err(Error::provider(
                "cloudflare",
                format!("{context}: API reported failure: {}", messages.join("; ")),
            ));
        }

        envelope.result.ok_or_else(|| {
            Error::provider("cloudflare", format!("{context}: response has no result"))
        })
    }
}

/// Map an HTTP status to the error taxonomy
fn classify_status(status: u16, context: &str, body: &str) -> Error {
    match status {
        401 | 403 => Error::auth(format!(
            "{context}: invalid credentials or insufficient permissions (status {status})"
        )),
        404 => Error::not_found(format!("{context}: {body}")),
        429 => Error::rate_limited(format!("{context}: status {status}, retry later")),
        500..=599 => Error::provider(
            "cloudflare",
            format!("{context}: server error (transient): {status} - {body}"),
        ),
        _ => Error::provider("cloudflare", format!("{context}: {status} - {body}")),
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn zone_details(&self, zone_id: &str) -> Result<ZoneDetails> {
        debug!(%zone_id, "fetching zone details");

        let url = format!("{CLOUDFLARE_API_BASE}/zones/{zone_id}");
        self.send(
            self.request(reqwest::Method::GET, &url),
            &format!("zone lookup for {zone_id}"),
        )
        .await
    }

    async fn list_records(&self, zone_id: &str) -> Result<Vec<ProviderRecord>> {
        debug!(%zone_id, "listing DNS records");

        let url = format!(
            "{CLOUDFLARE_API_BASE}/zones/{zone_id}/dns_records?per_page={LIST_RECORDS_PER_PAGE}"
        );
        let records: Vec<ProviderRecord> = self
            .send(
                self.request(reqwest::Method::GET, &url),
                &format!("record listing for zone {zone_id}"),
            )
            .await?;

        debug!(%zone_id, count = records.len(), "fetched records");
        Ok(records)
    }

    async fn update_record(&self, request: &UpdateRequest, new_ip: &str) -> Result<()> {
        let payload = serde_json::json!({
            "content": new_ip,
            "name": request.fqdn,
            "type": request.record_type.as_str(),
            "proxied": request.proxied,
            "ttl": request.ttl,
            "comment": format!(
                "Updated by cfddns on {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
            ),
        });

        let url = format!(
            "{CLOUDFLARE_API_BASE}/zones/{}/dns_records/{}",
            request.zone_id, request.record_id
        );

        if self.dry_run {
            info!(
                fqdn = %request.fqdn,
                "[dry-run] would PUT {url} with payload {payload}"
            );
            return Ok(());
        }

        // The result is the updated record object; nothing in it is needed
        // beyond the success flag.
        let _: serde_json::Value = self
            .send(
                self.request(reqwest::Method::PUT, &url).json(&payload),
                &format!("record update for {}", request.fqdn),
            )
            .await?;

        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}
