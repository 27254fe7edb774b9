// # cfddnsd - dynamic DNS update daemon
//
// Thin integration layer: reads configuration, wires the HTTP IP source
// and the Cloudflare provider into the core engine, and runs the poll
// loop. All update logic lives in cfddns-core.
//
// ## Configuration
//
// The YAML configuration file is discovered as `config.yaml` or
// `config.yml` in the working directory, or taken from `CF_DDNS_CONFIG`.
// `${VAR}` references to `CF_DDNS_*` environment variables are expanded
// before parsing.
//
// Environment overrides:
//
// - `CF_DDNS_CONFIG`: explicit path to the configuration file
// - `CF_DDNS_API_TOKEN` (or `CF_DDNS_API_KEY` + `CF_DDNS_API_EMAIL`):
//   credentials, taking precedence over the config file
// - `CF_DDNS_MODE=dry-run`: log intended updates without sending them
// - `CF_DDNS_LOG_LEVEL`: trace, debug, info, warn, error (default info)
// - `CHECK_INTERVAL`: seconds between poll cycles, overriding the config
//
// ## Example
//
// ```bash
// export CF_DDNS_API_TOKEN=your_token
// cd /etc/cfddns && cfddnsd
// ```

use std::env;
use std::process::ExitCode;
use std::time::Duration;

use cfddns_core::{Config, Error, Updater, ZoneHandle};
use cfddns_ip_http::HttpIpSource;
use cfddns_provider_cloudflare::CloudflareProvider;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DaemonExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DaemonExitCode> for ExitCode {
    fn from(code: DaemonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    // Initialize tracing before anything that might want to log
    let log_level = match env::var("CF_DDNS_LOG_LEVEL")
        .unwrap_or_default()
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
        return DaemonExitCode::ConfigError.into();
    }

    // Load and validate configuration
    let config = match load_configuration() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {e}");
            return DaemonExitCode::ConfigError.into();
        }
    };

    info!(
        zones = config.cloudflare.len(),
        "starting cfddnsd, configuration loaded"
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            return DaemonExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match run_daemon(config).await {
            Ok(()) => DaemonExitCode::CleanShutdown,
            Err(e @ Error::Config(_)) => {
                error!("Startup error: {e}");
                DaemonExitCode::ConfigError
            }
            Err(e) => {
                error!("Daemon error: {e}");
                DaemonExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Locate, parse, and validate the configuration file
fn load_configuration() -> cfddns_core::Result<Config> {
    let config = match env::var("CF_DDNS_CONFIG") {
        Ok(path) => Config::load(&path)?,
        Err(_) => {
            let cwd = std::env::current_dir()
                .map_err(|e| Error::config(format!("Cannot determine working directory: {e}")))?;
            let (path, config) = Config::discover(&cwd)?;
            info!("loaded configuration from {}", path.display());
            config
        }
    };

    config.validate()?;
    Ok(config)
}

/// Interval between poll cycles, honoring the `CHECK_INTERVAL` override
fn check_interval(config: &Config) -> Duration {
    match env::var("CHECK_INTERVAL").ok().and_then(|v| v.parse().ok()) {
        Some(secs) if secs > 0 => Duration::from_secs(secs),
        _ => config.check_interval(),
    }
}

/// Wire up the components and run the engine until shutdown
async fn run_daemon(config: Config) -> cfddns_core::Result<()> {
    let ip_source = HttpIpSource::new()?;
    let interval = check_interval(&config);
    let global_ttl = config.ttl;

    // Resolve every configured zone; drop the ones that fail validation.
    let mut zones = Vec::new();
    for zone_config in config.cloudflare {
        let zone_id = zone_config.zone_id.clone();

        let provider = match CloudflareProvider::new(&zone_config.authentication) {
            Ok(provider) => provider,
            Err(e) => {
                error!(%zone_id, "failed to build provider: {e}");
                continue;
            }
        };

        match ZoneHandle::resolve(Box::new(provider), zone_config).await {
            Ok(zone) => zones.push(zone),
            Err(e) => {
                error!(%zone_id, "failed to validate zone: {e}");
                continue;
            }
        }
    }

    if zones.is_empty() {
        return Err(Error::config("No valid zones found in configuration"));
    }
    info!(count = zones.len(), "validated zones");

    let updater = Updater::new(Box::new(ip_source), zones, global_ttl, interval)?;
    updater.run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_interval_falls_back_to_config() {
        let config = Config {
            cloudflare: Vec::new(),
            ttl: None,
            check_interval_secs: 600,
        };
        // CHECK_INTERVAL is unset in the test environment
        assert_eq!(check_interval(&config), Duration::from_secs(600));
    }
}
