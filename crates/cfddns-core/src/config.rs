//! Configuration types for the updater
//!
//! The configuration file is YAML, discovered as `config.yaml` or
//! `config.yml` in the working directory. `${VAR}` / `$VAR` references to
//! environment variables with the `CF_DDNS_` prefix are expanded before
//! parsing, so credentials can stay out of the file itself.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// TTL applied when neither a subdomain nor the zone-global TTL is set
pub const DEFAULT_TTL_SECS: u32 = 300;

/// Provider sentinel meaning "let the provider choose the TTL"
pub const TTL_AUTOMATIC: u32 = 1;

/// Default interval between poll cycles (seconds)
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 900;

/// Environment variable prefix recognized during config expansion
const ENV_PREFIX: &str = "CF_DDNS_";

/// File names probed by [`Config::discover`], in order
const CONFIG_FILE_NAMES: &[&str] = &["config.yaml", "config.yml"];

/// Top-level updater configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Cloudflare zones to manage
    pub cloudflare: Vec<ZoneConfig>,

    /// Zone-global TTL default, in seconds
    #[serde(default)]
    pub ttl: Option<u32>,

    /// Interval between poll cycles, in seconds
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
}

impl Config {
    /// Parse configuration from a YAML string, expanding `CF_DDNS_*`
    /// environment references first.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let expanded = expand_env(yaml);
        Ok(serde_yaml::from_str(&expanded)?)
    }

    /// Load configuration from a file path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&raw)
    }

    /// Find and load the configuration file in `dir`
    ///
    /// Probes `config.yaml` then `config.yml`. Returns the path that was
    /// loaded alongside the parsed configuration.
    pub fn discover(dir: impl AsRef<Path>) -> Result<(PathBuf, Self)> {
        let dir = dir.as_ref();
        for name in CONFIG_FILE_NAMES {
            let candidate = dir.join(name);
            if candidate.exists() {
                let config = Self::load(&candidate)?;
                return Ok((candidate, config));
            }
        }
        Err(Error::config(format!(
            "Configuration file not found in {}. Tried: {}",
            dir.display(),
            CONFIG_FILE_NAMES.join(", ")
        )))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.cloudflare.is_empty() {
            return Err(Error::config("No zones configured"));
        }

        if let Some(ttl) = self.ttl {
            validate_ttl_seconds(ttl)?;
        }

        if self.check_interval_secs == 0 {
            return Err(Error::config("check_interval_secs must be > 0"));
        }

        for zone in &self.cloudflare {
            zone.validate()?;
        }

        Ok(())
    }

    /// Interval between poll cycles
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }
}

/// Configuration for a single Cloudflare zone
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// API credentials for this zone
    pub authentication: AuthConfig,

    /// Cloudflare zone identifier
    pub zone_id: String,

    /// Subdomains to keep pointed at the current public IP
    pub subdomains: Vec<SubdomainSpec>,
}

impl ZoneConfig {
    /// Validate this zone's configuration
    pub fn validate(&self) -> Result<()> {
        if self.zone_id.is_empty() {
            return Err(Error::config("zone_id cannot be empty"));
        }

        self.authentication.validate()?;

        if self.subdomains.is_empty() {
            return Err(Error::config(format!(
                "Zone {}: no subdomains configured",
                self.zone_id
            )));
        }

        for subdomain in &self.subdomains {
            if let Some(Ttl::Seconds(secs)) = subdomain.ttl {
                validate_ttl_seconds(secs)?;
            }
        }

        Ok(())
    }
}

/// Cloudflare API credentials
///
/// Either a scoped API token, or the legacy global key + account email pair.
#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuthConfig {
    /// Scoped API token (preferred)
    Token {
        /// API token with Zone:DNS:Edit permission
        api_token: String,
    },

    /// Legacy global API key
    Key {
        /// Global API key
        api_key: String,
        /// Account email paired with the key
        api_email: String,
    },
}

impl AuthConfig {
    /// Validate the credentials are present
    pub fn validate(&self) -> Result<()> {
        match self {
            AuthConfig::Token { api_token } => {
                if api_token.is_empty() {
                    return Err(Error::config("api_token cannot be empty"));
                }
            }
            AuthConfig::Key { api_key, api_email } => {
                if api_key.is_empty() || api_email.is_empty() {
                    return Err(Error::config(
                        "api_key and api_email must both be set",
                    ));
                }
            }
        }
        Ok(())
    }
}

// Credentials never appear in Debug output
impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthConfig::Token { .. } => f
                .debug_struct("Token")
                .field("api_token", &"<REDACTED>")
                .finish(),
            AuthConfig::Key { api_email, .. } => f
                .debug_struct("Key")
                .field("api_key", &"<REDACTED>")
                .field("api_email", api_email)
                .finish(),
        }
    }
}

/// A subdomain to manage within a zone
///
/// `name` is case-insensitive; `""` or `"@"` denotes the zone apex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubdomainSpec {
    /// Subdomain label, without the base domain
    pub name: String,

    /// Route traffic through the provider's proxy layer
    #[serde(default)]
    pub proxied: bool,

    /// Per-subdomain TTL override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<Ttl>,
}

/// A configured TTL value
///
/// The provider's "automatic" sentinel is the integer `1` on the wire.
/// Accepted input forms: a plain number of seconds, the sentinel `1`, or
/// the strings `"automatic"` / `"auto"`. An *unset* TTL is `Option::None`
/// on the containing field, never a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Let the provider choose
    Automatic,
    /// Explicit TTL in seconds
    Seconds(u32),
}

impl Ttl {
    /// The value sent to the provider API
    pub fn provider_value(&self) -> u32 {
        match self {
            Ttl::Automatic => TTL_AUTOMATIC,
            Ttl::Seconds(secs) => *secs,
        }
    }
}

impl<'de> Deserialize<'de> for Ttl {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Seconds(u32),
            Keyword(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Seconds(TTL_AUTOMATIC) => Ok(Ttl::Automatic),
            Repr::Seconds(secs) => Ok(Ttl::Seconds(secs)),
            Repr::Keyword(word)
                if word.eq_ignore_ascii_case("automatic")
                    || word.eq_ignore_ascii_case("auto") =>
            {
                Ok(Ttl::Automatic)
            }
            Repr::Keyword(word) => Err(serde::de::Error::custom(format!(
                "invalid ttl value {word:?}: expected seconds, 1, or \"automatic\""
            ))),
        }
    }
}

impl Serialize for Ttl {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u32(self.provider_value())
    }
}

fn default_check_interval_secs() -> u64 {
    DEFAULT_CHECK_INTERVAL_SECS
}

/// Explicit TTL seconds must fall within the provider's accepted range.
/// The sentinel `1` is always allowed and never reaches this check.
fn validate_ttl_seconds(secs: u32) -> Result<()> {
    if !(61..=86400).contains(&secs) {
        return Err(Error::config(format!(
            "ttl must be between 61 and 86400 seconds (got {secs})"
        )));
    }
    Ok(())
}

/// Expand `${VAR}` and `$VAR` references to `CF_DDNS_*` environment
/// variables. Unknown or non-prefixed references are left untouched;
/// `$$` escapes a literal `$`.
fn expand_env(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        match chars.peek().copied() {
            Some('$') => {
                chars.next();
                out.push('$');
            }
            Some('{') => {
                chars.next();
                let name: String = chars.by_ref().take_while(|&c| c != '}').collect();
                out.push_str(&resolve_env(&name, &format!("${{{name}}}")));
            }
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push_str(&resolve_env(&name, &format!("${name}")));
            }
            _ => out.push('$'),
        }
    }

    out
}

fn resolve_env(name: &str, literal: &str) -> String {
    if name.starts_with(ENV_PREFIX) {
        if let Ok(value) = std::env::var(name) {
            return value;
        }
    }
    literal.to_string()
}
