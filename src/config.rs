//! Fetch configuration consumed as a flat key-value map.
//!
//! Loading the map (files, environment, defaults layering) is the embedding
//! application's job; this module only interprets it. Every key has a
//! default, and an unparsable value falls back to that default with a
//! warning - configuration mistakes must never crash the fetch path.

use std::collections::HashMap;
use std::time::Duration;

use ipnet::IpNet;
use tracing::warn;

use crate::net::parse_deny_list;
use crate::user_agent;

/// Default connect timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Default response-headers timeout (15 seconds).
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 15_000;

/// Default total timeout for a whole redirect walk (60 seconds).
pub const DEFAULT_TOTAL_TIMEOUT_MS: u64 = 60_000;

/// Default maximum number of redirect hops.
pub const DEFAULT_MAX_REDIRECTS: u32 = 5;

/// Default decompressed payload ceiling (5 MiB).
pub const DEFAULT_MAX_BYTES: u64 = 5 * 1024 * 1024;

/// Settings for one [`SafeFetcher`](crate::SafeFetcher).
///
/// Immutable once the fetcher is constructed; the parsed deny list is the
/// only data shared across concurrent fetches and it is read-only.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Permit plain `http` URLs. Defaults to false: https only.
    pub allow_http: bool,
    /// Extra networks to block on top of the built-in non-unicast ranges.
    pub deny_cidrs: Vec<IpNet>,
    /// User-Agent header sent on every request.
    pub user_agent: String,
    /// TCP/TLS connect budget per hop.
    pub connect_timeout: Duration,
    /// Response-headers budget per hop.
    pub response_timeout: Duration,
    /// Budget for the whole redirect walk, fixed before the first hop.
    pub total_timeout: Duration,
    /// Maximum number of redirects followed before failing.
    pub max_redirects: u32,
    /// Decompressed payload ceiling in bytes.
    pub max_bytes: u64,

    // Test hooks: wiremock binds loopback ephemeral ports, which the
    // production rules reject before a socket ever opens.
    pub(crate) allow_non_unicast: bool,
    pub(crate) allow_any_port: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            allow_http: false,
            deny_cidrs: Vec::new(),
            user_agent: user_agent::default_fetch_user_agent(),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            response_timeout: Duration::from_millis(DEFAULT_RESPONSE_TIMEOUT_MS),
            total_timeout: Duration::from_millis(DEFAULT_TOTAL_TIMEOUT_MS),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            max_bytes: DEFAULT_MAX_BYTES,
            allow_non_unicast: false,
            allow_any_port: false,
        }
    }
}

impl FetchConfig {
    /// Builds a configuration from a flat key-value map.
    ///
    /// Recognized keys: `allow_http`, `deny_cidrs`, `user_agent`,
    /// `connect_timeout_ms`, `response_timeout_ms`, `total_timeout_ms`,
    /// `max_redirects`, `max_bytes`. Missing keys keep their defaults;
    /// unparsable values are logged and keep their defaults. Malformed
    /// deny-list entries are dropped individually.
    #[must_use]
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        let defaults = Self::default();
        Self {
            allow_http: map
                .get("allow_http")
                .map_or(defaults.allow_http, |v| parse_flag(v)),
            deny_cidrs: map
                .get("deny_cidrs")
                .map_or(defaults.deny_cidrs, |v| parse_deny_list(v)),
            user_agent: map
                .get("user_agent")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.user_agent),
            connect_timeout: duration_ms(map, "connect_timeout_ms", defaults.connect_timeout),
            response_timeout: duration_ms(map, "response_timeout_ms", defaults.response_timeout),
            total_timeout: duration_ms(map, "total_timeout_ms", defaults.total_timeout),
            max_redirects: parse_or_default(map, "max_redirects", defaults.max_redirects),
            max_bytes: parse_or_default(map, "max_bytes", defaults.max_bytes),
            allow_non_unicast: false,
            allow_any_port: false,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn duration_ms(map: &HashMap<String, String>, key: &str, default: Duration) -> Duration {
    map.get(key).map_or(default, |v| match v.trim().parse::<u64>() {
        Ok(ms) => Duration::from_millis(ms),
        Err(_) => {
            warn!(key, value = %v, "unparsable timeout value; keeping default");
            default
        }
    })
}

fn parse_or_default<T>(map: &HashMap<String, String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    map.get(key).map_or(default, |v| match v.trim().parse::<T>() {
        Ok(parsed) => parsed,
        Err(_) => {
            warn!(key, value = %v, "unparsable numeric value; keeping default");
            default
        }
    })
}
