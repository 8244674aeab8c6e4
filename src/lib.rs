//! Feedguard Core Library
//!
//! This library provides an outbound HTTP(S) fetch client hardened against
//! Server-Side Request Forgery (SSRF) and resource-exhaustion attacks. It
//! retrieves remote documents (syndication feeds) from arbitrary
//! user-controlled URLs: every target is validated before any socket opens,
//! DNS is resolved by the crate itself and the connection pinned to an
//! approved address, every phase of the exchange is bounded in time,
//! redirects are re-validated per hop, and decompressed payload size is
//! capped.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`net`] - CIDR deny-list parsing, address classification, safe DNS resolution
//! - [`fetch`] - Pinned-address transport, redirect walker, decoding pipeline
//! - [`config`] - Flat key-value configuration with fail-soft defaults
//!
//! Feed parsing, persistence, and scheduling live outside this crate; the
//! single entry point is [`SafeFetcher::fetch`], which yields a response
//! whose body stream is already decompressed and size-bounded.
//!
//! # Example
//!
//! ```no_run
//! use feedguard::{FetchConfig, SafeFetcher};
//!
//! # async fn example() -> Result<(), feedguard::FetchError> {
//! let fetcher = SafeFetcher::new(FetchConfig::default())?;
//! let response = fetcher.fetch("https://example.com/feed.xml").await?;
//! println!("status: {}", response.status());
//! let body = response.bytes().await?;
//! println!("fetched {} bytes", body.len());
//! # Ok(())
//! # }
//! ```

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod fetch;
pub mod net;
pub(crate) mod user_agent;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use config::FetchConfig;
pub use fetch::{BodyStream, FetchError, FetchedResponse, SafeFetcher};
pub use net::{
    IpClass, ResolvedAddrs, Resolver, classify, ip_in_list, is_unicast, parse_cidr,
    parse_deny_list,
};
