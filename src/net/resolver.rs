//! SSRF-safe DNS resolution.
//!
//! The fetcher never lets the transport layer resolve hostnames on its own:
//! this module performs the forward lookup itself, requesting all A/AAAA
//! records, and the caller pins the eventual connection to one of the
//! surviving addresses. Resolver order is preserved - filtering must see
//! every candidate, and the connection pins to the first survivor rather
//! than a reordered preference.

use std::net::IpAddr;

use async_trait::async_trait;
use hickory_resolver::TokioResolver;
use ipnet::IpNet;

use super::classify::is_unicast;
use super::cidr::ip_in_list;
use crate::fetch::FetchError;

/// Result of one resolution attempt.
///
/// `safe` is the subset of `all` that passed classification and the deny
/// list; an empty `safe` set means "destination blocked". The full set is
/// kept for diagnostics so callers can log which addresses were seen.
#[derive(Debug, Clone)]
pub struct ResolvedAddrs {
    /// Every address the resolver returned, in resolver order.
    pub all: Vec<IpAddr>,
    /// The addresses that survived classification and the deny list.
    pub safe: Vec<IpAddr>,
}

/// Forward DNS lookup, abstracted for `dyn` dispatch so tests can substitute
/// a canned resolver.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolves a hostname to all of its A/AAAA addresses, in resolver order.
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, FetchError>;
}

/// Production resolver backed by hickory's tokio runtime resolver.
pub struct DnsResolver {
    inner: TokioResolver,
}

impl DnsResolver {
    /// Builds a resolver from system configuration.
    ///
    /// # Errors
    ///
    /// Returns a DNS-kind error when system resolver configuration cannot be
    /// read.
    pub fn from_system() -> Result<Self, FetchError> {
        let inner = TokioResolver::builder_tokio()
            .map_err(|e| FetchError::dns("system", e.to_string()))?
            .build();
        Ok(Self { inner })
    }
}

#[async_trait]
impl Resolver for DnsResolver {
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, FetchError> {
        let response = self
            .inner
            .lookup_ip(host)
            .await
            .map_err(|e| FetchError::dns(host, e.to_string()))?;

        let addrs: Vec<IpAddr> = response.iter().collect();
        if addrs.is_empty() {
            return Err(FetchError::dns(host, "no addresses found"));
        }
        Ok(addrs)
    }
}

/// Parses a host string as an IP literal, handling bracketed IPv6 forms.
///
/// Literal hosts skip DNS entirely; the literal itself is classified.
#[must_use]
pub fn literal_ip(host: &str) -> Option<IpAddr> {
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .ok()
}

/// Splits a resolved address set into survivors and the full diagnostic set.
///
/// An address survives iff it classifies as globally routable unicast and is
/// not covered by the deny list. This function never fails: the caller
/// decides what an empty survivor set means.
#[must_use]
pub fn partition_safe(all: Vec<IpAddr>, deny: &[IpNet]) -> ResolvedAddrs {
    let safe = all
        .iter()
        .copied()
        .filter(|ip| is_unicast(*ip) && !ip_in_list(*ip, deny))
        .collect();
    ResolvedAddrs { all, safe }
}
