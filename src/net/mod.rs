//! Network-level validation: CIDR deny-lists, address classification, and
//! SSRF-safe DNS resolution.
//!
//! Blocking is two-tier: non-unicast addresses (loopback, private, link-local,
//! multicast, reserved, unspecified) are rejected unconditionally by
//! [`classify`], and operators can additionally exclude ranges like
//! carrier-grade-NAT space or internal peering blocks through a configurable
//! CIDR deny-list without having to special-case the built-in ranges.

mod cidr;
mod classify;
mod resolver;

pub use cidr::{ip_in_list, parse_cidr, parse_deny_list};
pub use classify::{IpClass, classify, is_unicast};
pub use resolver::{DnsResolver, ResolvedAddrs, Resolver, literal_ip, partition_safe};
