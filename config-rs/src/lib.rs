//! config-rs/lib.rs
//! Process configuration for the status bridge
//! Loads every setting once at boot into a `BridgeConfig` that is passed by
//! reference to the components that need it

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

/// Name used for the `<NAME>_SERVICE_ADDR` / `<NAME>_SERVICE_PORT` variables
pub const SERVICE_NAME: &str = "STATUS_BRIDGE";

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_PAGERDUTY_URL: &str = "https://api.pagerduty.com";
pub const DEFAULT_TIMEZONE: &str = "Europe/Berlin";
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 30 * 60;
pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Settings for one bridge process
#[derive(Clone, PartialEq)]
pub struct BridgeConfig {
    /// Root URL of the Cachet installation (`CACHET_URL`)
    pub cachet_url: String,
    /// Cachet API token (`CACHET_KEY`)
    pub cachet_key: String,
    /// PagerDuty REST API token (`PAGERDUTY_KEY`)
    pub pagerduty_key: String,
    /// Shared secret for webhook signatures (`WEBHOOK_SECRET`)
    pub webhook_secret: String,
    /// PagerDuty API base URL (`PAGERDUTY_URL`)
    pub pagerduty_url: String,
    pub bind_address: SocketAddr,
    /// IANA name of the status page's timezone (`STATUS_BRIDGE_TIMEZONE`)
    pub timezone: String,
    /// Pause between maintenance reconciliation passes
    pub sync_interval: Duration,
    /// Page size used when listing status-page records
    pub page_size: u32,
    pub http_timeout: Duration,
}

impl BridgeConfig {
    /// Load configuration from `.env` (if present) and the process environment
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an explicit variable map
    pub fn from_map(vars: &HashMap<String, String>) -> Self {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    /// Build configuration from any variable source
    ///
    /// The four credentials are not validated; a missing value becomes an
    /// empty string and the first remote call that needs it fails.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).unwrap_or_else(|| {
                log::warn!("{} is not set", key);
                String::new()
            })
        };

        Self {
            cachet_url: required("CACHET_URL"),
            cachet_key: required("CACHET_KEY"),
            pagerduty_key: required("PAGERDUTY_KEY"),
            webhook_secret: required("WEBHOOK_SECRET"),
            pagerduty_url: lookup("PAGERDUTY_URL")
                .unwrap_or_else(|| DEFAULT_PAGERDUTY_URL.to_string()),
            bind_address: bind_address(SERVICE_NAME, DEFAULT_PORT, &lookup),
            timezone: lookup(&format!("{}_TIMEZONE", SERVICE_NAME))
                .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
            sync_interval: Duration::from_secs(parse_or(
                &lookup,
                "MAINTENANCE_SYNC_INTERVAL_SECS",
                DEFAULT_SYNC_INTERVAL_SECS,
            )),
            page_size: parse_or(&lookup, "STATUS_PAGE_PAGE_SIZE", DEFAULT_PAGE_SIZE),
            http_timeout: Duration::from_secs(parse_or(
                &lookup,
                "HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )),
        }
    }
}

impl fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("cachet_url", &self.cachet_url)
            .field("cachet_key", &redact(&self.cachet_key))
            .field("pagerduty_key", &redact(&self.pagerduty_key))
            .field("webhook_secret", &redact(&self.webhook_secret))
            .field("pagerduty_url", &self.pagerduty_url)
            .field("bind_address", &self.bind_address)
            .field("timezone", &self.timezone)
            .field("sync_interval", &self.sync_interval)
            .field("page_size", &self.page_size)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + fmt::Display + Copy,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            log::warn!("Invalid value '{}' in {}, using default {}", raw, key, default);
            default
        }),
        None => default,
    }
}

/// Port from `<SERVICE>_SERVICE_PORT`, falling back to `default_port`
fn service_port<F>(service_name: &str, default_port: u16, lookup: &F) -> u16
where
    F: Fn(&str) -> Option<String>,
{
    let var_name = format!("{}_SERVICE_PORT", service_name.to_uppercase());
    parse_or(lookup, &var_name, default_port)
}

/// Address to bind a service on
///
/// `<SERVICE>_SERVICE_ADDR` may hold `host:port` or `http://host:port`;
/// otherwise the service binds every interface on its port.
fn bind_address<F>(service_name: &str, default_port: u16, lookup: &F) -> SocketAddr
where
    F: Fn(&str) -> Option<String>,
{
    let var_name = format!("{}_SERVICE_ADDR", service_name.to_uppercase());

    if let Some(addr_str) = lookup(&var_name) {
        let stripped = addr_str
            .strip_prefix("http://")
            .or_else(|| addr_str.strip_prefix("https://"))
            .unwrap_or(&addr_str);

        match stripped.parse::<SocketAddr>() {
            Ok(addr) => return addr,
            Err(_) => log::warn!("Invalid address format in {}, using default", var_name),
        }
    }

    let port = service_port(service_name, default_port, lookup);
    SocketAddr::from(([0, 0, 0, 0], port))
}
