//! Error types for the fetch module.
//!
//! A closed taxonomy: every failed fetch surfaces as exactly one of these
//! kinds, with all partial state (sockets, timers, decoders) released before
//! the error returns. No retry hints are modeled - retry policy belongs to
//! the caller, as does mapping kinds to user-visible status codes.

use thiserror::Error;

/// Errors that can terminate a fetch attempt.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The supplied or redirect URL is malformed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The offending URL string.
        url: String,
    },

    /// URL scheme is not https (or http when explicitly allowed).
    #[error("scheme '{scheme}' not allowed for {url}")]
    DisallowedScheme {
        /// The URL that was rejected.
        url: String,
        /// The scheme that was rejected.
        scheme: String,
    },

    /// URL port is neither 80 nor 443.
    #[error("port {port} not allowed for {url}")]
    DisallowedPort {
        /// The URL that was rejected.
        url: String,
        /// The port that was rejected.
        port: u16,
    },

    /// Every resolved address was blocked by classification or the deny list.
    #[error("destination blocked for host {host}: {reason}")]
    BlockedDestination {
        /// The hostname whose addresses were all blocked.
        host: String,
        /// Why the destination was blocked.
        reason: String,
    },

    /// Forward DNS lookup failed.
    #[error("DNS resolution failed for {host}: {message}")]
    Dns {
        /// The hostname that failed to resolve.
        host: String,
        /// Resolver error detail.
        message: String,
    },

    /// TCP/TLS connect did not complete within the connect budget.
    #[error("connect timeout fetching {url}")]
    TimeoutConnect {
        /// The URL being fetched.
        url: String,
    },

    /// Response headers did not arrive within the response budget.
    #[error("response timeout fetching {url}")]
    TimeoutResponse {
        /// The URL being fetched.
        url: String,
    },

    /// The whole redirect walk exceeded its total budget, or the caller
    /// cancelled the operation.
    #[error("total time budget exceeded fetching {url}")]
    TimeoutTotal {
        /// The URL being fetched.
        url: String,
    },

    /// Too many redirects, or a redirect status this fetcher does not follow.
    #[error("redirect error fetching {url}: {reason}")]
    Redirect {
        /// The URL at which the walk failed.
        url: String,
        /// What went wrong with the redirect.
        reason: String,
    },

    /// A redirect status arrived without a Location header.
    #[error("HTTP {status} without Location header from {url}")]
    MissingLocation {
        /// The URL that returned the redirect.
        url: String,
        /// The redirect status code.
        status: u16,
    },

    /// The final response's Content-Type cannot carry a feed document.
    #[error("unsupported media type '{content_type}' from {url}")]
    UnsupportedMediaType {
        /// The URL that returned the response.
        url: String,
        /// The offending Content-Type essence.
        content_type: String,
    },

    /// Decompressed payload exceeded the configured ceiling.
    #[error("decompressed payload exceeds {limit} bytes fetching {url}")]
    PayloadTooLarge {
        /// The URL being fetched.
        url: String,
        /// The configured ceiling in bytes.
        limit: u64,
    },

    /// Any transport or stream failure not covered by a more specific kind.
    #[error("upstream error fetching {url}: {message}")]
    Upstream {
        /// The URL being fetched.
        url: String,
        /// Underlying failure detail.
        message: String,
    },
}

impl FetchError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a disallowed scheme error.
    pub fn disallowed_scheme(url: impl Into<String>, scheme: impl Into<String>) -> Self {
        Self::DisallowedScheme {
            url: url.into(),
            scheme: scheme.into(),
        }
    }

    /// Creates a disallowed port error.
    pub fn disallowed_port(url: impl Into<String>, port: u16) -> Self {
        Self::DisallowedPort {
            url: url.into(),
            port,
        }
    }

    /// Creates a blocked destination error.
    pub fn blocked_destination(host: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BlockedDestination {
            host: host.into(),
            reason: reason.into(),
        }
    }

    /// Creates a DNS failure error.
    pub fn dns(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Dns {
            host: host.into(),
            message: message.into(),
        }
    }

    /// Creates a connect timeout error.
    pub fn timeout_connect(url: impl Into<String>) -> Self {
        Self::TimeoutConnect { url: url.into() }
    }

    /// Creates a response-headers timeout error.
    pub fn timeout_response(url: impl Into<String>) -> Self {
        Self::TimeoutResponse { url: url.into() }
    }

    /// Creates a total timeout error.
    pub fn timeout_total(url: impl Into<String>) -> Self {
        Self::TimeoutTotal { url: url.into() }
    }

    /// Creates a redirect error.
    pub fn redirect(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Redirect {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a missing Location error.
    pub fn missing_location(url: impl Into<String>, status: u16) -> Self {
        Self::MissingLocation {
            url: url.into(),
            status,
        }
    }

    /// Creates an unsupported media type error.
    pub fn unsupported_media_type(
        url: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self::UnsupportedMediaType {
            url: url.into(),
            content_type: content_type.into(),
        }
    }

    /// Creates a payload-too-large error.
    pub fn payload_too_large(url: impl Into<String>, limit: u64) -> Self {
        Self::PayloadTooLarge {
            url: url.into(),
            limit,
        }
    }

    /// Creates an upstream error.
    pub fn upstream(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Stable snake_case label for this kind.
    ///
    /// Callers that map fetch failures to wire-level status codes key off
    /// these labels rather than matching variants.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUrl { .. } => "invalid_url",
            Self::DisallowedScheme { .. } => "disallowed_scheme",
            Self::DisallowedPort { .. } => "disallowed_port",
            Self::BlockedDestination { .. } => "blocked_destination",
            Self::Dns { .. } => "dns_error",
            Self::TimeoutConnect { .. } => "timeout_connect",
            Self::TimeoutResponse { .. } => "timeout_response",
            Self::TimeoutTotal { .. } => "timeout_total",
            Self::Redirect { .. } => "redirect_error",
            Self::MissingLocation { .. } => "missing_location",
            Self::UnsupportedMediaType { .. } => "unsupported_media_type",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::Upstream { .. } => "upstream_error",
        }
    }
}

// Note on From trait implementations:
// We intentionally do NOT implement `From<reqwest::Error>` or
// `From<std::io::Error>` because every variant requires context (url, host)
// that the source errors don't carry. The helper constructors are the
// correct pattern here as they force callers to provide that context.
