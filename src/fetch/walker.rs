//! Redirect walker: validates, resolves, and fetches each hop under one
//! shared time budget.
//!
//! Control flow never opens a socket before the target has been validated
//! and at least one resolved address approved. Scheme and port checks
//! strictly precede DNS resolution on every path, so a rejected target
//! leaves no observable resolution side effect. Hops are strictly
//! sequential; a redirect target is re-validated from scratch exactly as the
//! initial URL was.

use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, LOCATION};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::body::{BodyStream, unsupported_media_type};
use super::constants::{ALLOWED_PORTS, FOLLOWED_REDIRECTS};
use super::error::FetchError;
use super::transport::{HopTimers, connect_and_get};
use crate::config::FetchConfig;
use crate::net::{DnsResolver, Resolver, literal_ip, partition_safe};

/// SSRF-hardened fetch client for user-supplied URLs.
///
/// Construction parses nothing beyond what [`FetchConfig`] already carries;
/// the deny list is immutable afterwards and shared read-only across
/// concurrent fetches. Each [`fetch`](Self::fetch) call is one independent
/// logical operation with no state shared between calls.
pub struct SafeFetcher {
    config: FetchConfig,
    resolver: Arc<dyn Resolver>,
}

/// Security-checked response for the caller to interpret.
///
/// Non-2xx final statuses are returned as-is rather than raised: callers
/// apply their own status mapping and rely on seeing the real code. The
/// body stream is already decompressed and size-bounded.
pub struct FetchedResponse {
    status: StatusCode,
    headers: HeaderMap,
    url: Url,
    body: BodyStream,
}

impl std::fmt::Debug for FetchedResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchedResponse")
            .field("status", &self.status)
            .field("url", &self.url.as_str())
            .finish_non_exhaustive()
    }
}

impl FetchedResponse {
    fn new(response: reqwest::Response, url: Url, max_bytes: u64, deadline: Instant) -> Self {
        let status = response.status();
        let headers = response.headers().clone();
        let body = BodyStream::new(response, url.to_string(), max_bytes, deadline);
        Self {
            status,
            headers,
            url,
            body,
        }
    }

    /// Final HTTP status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers of the final hop.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// URL of the final hop (after redirects).
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Consumes the response, returning the bounded body stream.
    #[must_use]
    pub fn into_body(self) -> BodyStream {
        self.body
    }

    /// Collects the whole bounded body into one buffer.
    ///
    /// # Errors
    ///
    /// Returns `payload_too_large`, `timeout_total`, or `upstream_error`
    /// when the stream fails mid-read.
    pub async fn bytes(self) -> Result<bytes::Bytes, FetchError> {
        self.body.collect_bytes().await
    }
}

/// Host and port that survived validation for one hop.
struct Target {
    host: String,
    port: u16,
}

impl SafeFetcher {
    /// Creates a fetcher using the system DNS resolver.
    ///
    /// # Errors
    ///
    /// Returns a DNS-kind error when system resolver configuration cannot be
    /// read.
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        Ok(Self::with_resolver(
            config,
            Arc::new(DnsResolver::from_system()?),
        ))
    }

    /// Creates a fetcher with a caller-supplied resolver.
    #[must_use]
    pub fn with_resolver(config: FetchConfig, resolver: Arc<dyn Resolver>) -> Self {
        Self { config, resolver }
    }

    /// Fetches `url`, following redirects under the configured policy.
    ///
    /// # Errors
    ///
    /// Returns one of the closed set of [`FetchError`] kinds; a non-2xx
    /// final status is NOT an error here.
    pub async fn fetch(&self, url: &str) -> Result<FetchedResponse, FetchError> {
        self.fetch_with_cancel(url, CancellationToken::new()).await
    }

    /// Fetches `url` with an external cancellation signal.
    ///
    /// Cancelling `cancel` tears down the in-flight request and surfaces as
    /// `timeout_total`.
    ///
    /// # Errors
    ///
    /// Same as [`fetch`](Self::fetch).
    #[instrument(skip(self, cancel), fields(url = %url))]
    pub async fn fetch_with_cancel(
        &self,
        url: &str,
        cancel: CancellationToken,
    ) -> Result<FetchedResponse, FetchError> {
        // The total budget is fixed here, before hop 0, and never extended
        // by individual hops.
        let deadline = Instant::now() + self.config.total_timeout;
        let mut current: Url = url.parse().map_err(|_| FetchError::invalid_url(url))?;

        for hop in 0..=self.config.max_redirects {
            let target = self.validate_target(&current)?;
            let pinned = self.resolve_pinned(&target.host).await?;

            debug!(hop, host = %target.host, %pinned, "dialing approved address");
            let timers = HopTimers {
                connect: self.config.connect_timeout,
                response: self.config.response_timeout,
                total_deadline: deadline,
            };
            let response = connect_and_get(
                &current,
                &target.host,
                pinned,
                target.port,
                &self.config.user_agent,
                timers,
                &cancel,
            )
            .await?;

            let status = response.status();
            if FOLLOWED_REDIRECTS.contains(&status.as_u16()) {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .ok_or_else(|| {
                        FetchError::missing_location(current.as_str(), status.as_u16())
                    })?
                    .to_str()
                    .map_err(|_| {
                        FetchError::redirect(current.as_str(), "Location header is not valid UTF-8")
                    })?
                    .to_owned();
                let next = current
                    .join(&location)
                    .map_err(|_| FetchError::invalid_url(&location))?;
                debug!(hop, status = status.as_u16(), from = %current, to = %next, "following redirect");
                // The just-completed response body is discarded with the drop.
                drop(response);
                current = next;
                continue;
            }
            if status.is_redirection() {
                return Err(FetchError::redirect(
                    current.as_str(),
                    format!("unhandled redirect status {}", status.as_u16()),
                ));
            }

            if let Some(content_type) = unsupported_media_type(response.headers()) {
                return Err(FetchError::unsupported_media_type(
                    current.as_str(),
                    content_type,
                ));
            }

            info!(status = status.as_u16(), final_url = %current, hops = hop, "fetch complete");
            return Ok(FetchedResponse::new(
                response,
                current,
                self.config.max_bytes,
                deadline,
            ));
        }

        Err(FetchError::redirect(url, "too many redirects"))
    }

    /// Scheme and port checks. Runs before any DNS resolution.
    fn validate_target(&self, url: &Url) -> Result<Target, FetchError> {
        match url.scheme() {
            "https" => {}
            "http" if self.config.allow_http => {}
            scheme => {
                return Err(FetchError::disallowed_scheme(url.as_str(), scheme));
            }
        }

        let host = url
            .host_str()
            .ok_or_else(|| FetchError::invalid_url(url.as_str()))?
            .to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| FetchError::invalid_url(url.as_str()))?;
        if !ALLOWED_PORTS.contains(&port) && !self.config.allow_any_port {
            return Err(FetchError::disallowed_port(url.as_str(), port));
        }

        Ok(Target { host, port })
    }

    /// Resolves the host and returns the one address the hop will dial.
    ///
    /// IP-literal hosts skip DNS and classify directly. The full resolved
    /// set is logged when everything is blocked, so operators can see which
    /// addresses a hostile record actually pointed at.
    async fn resolve_pinned(&self, host: &str) -> Result<std::net::IpAddr, FetchError> {
        let all = match literal_ip(host) {
            Some(ip) => vec![ip],
            None => self.resolver.lookup(host).await?,
        };
        let mut resolved = partition_safe(all, &self.config.deny_cidrs);
        if self.config.allow_non_unicast {
            resolved.safe = resolved
                .all
                .iter()
                .copied()
                .filter(|ip| !crate::net::ip_in_list(*ip, &self.config.deny_cidrs))
                .collect();
        }

        match resolved.safe.first().copied() {
            Some(pinned) => Ok(pinned),
            None => {
                warn!(host, addresses = ?resolved.all, "all resolved addresses blocked");
                Err(FetchError::blocked_destination(
                    host,
                    "no publicly routable addresses",
                ))
            }
        }
    }
}
