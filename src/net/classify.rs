//! Globally-routable-unicast classification for IPv4 and IPv6 addresses.
//!
//! Anything that classifies as non-unicast is blocked unconditionally,
//! independent of the configured deny-list. IPv4-mapped and IPv4-compatible
//! IPv6 addresses classify as their embedded IPv4 address so the v6 encodings
//! of loopback, private, and link-local space cannot slip through.
//!
//! Carrier-grade-NAT space (100.64.0.0/10) and the benchmarking range
//! (198.18.0.0/15) deliberately classify as unicast: excluding those is what
//! the operator deny-list is for.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Range classification of a single IP address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpClass {
    /// Globally routable unicast - the only class allowed to connect.
    Unicast,
    /// 127.0.0.0/8 or ::1.
    Loopback,
    /// RFC 1918 space or fc00::/7 unique-local.
    Private,
    /// 169.254.0.0/16 or fe80::/10.
    LinkLocal,
    /// 224.0.0.0/4 or ff00::/8.
    Multicast,
    /// This-network, documentation, future-use, and broadcast ranges.
    Reserved,
    /// 0.0.0.0 or ::.
    Unspecified,
}

/// Classifies an address into its range class.
#[must_use]
pub fn classify(ip: IpAddr) -> IpClass {
    match ip {
        IpAddr::V4(v4) => classify_v4(v4),
        IpAddr::V6(v6) => classify_v6(v6),
    }
}

/// Returns true iff the address is globally routable unicast.
#[must_use]
pub fn is_unicast(ip: IpAddr) -> bool {
    classify(ip) == IpClass::Unicast
}

fn classify_v4(ip: Ipv4Addr) -> IpClass {
    if ip.is_unspecified() {
        return IpClass::Unspecified;
    }
    if ip.is_loopback() {
        return IpClass::Loopback;
    }
    if ip.is_private() {
        return IpClass::Private;
    }
    if ip.is_link_local() {
        return IpClass::LinkLocal;
    }
    if ip.is_multicast() {
        return IpClass::Multicast;
    }

    let o = ip.octets();
    // This-network 0.0.0.0/8 (beyond the unspecified address itself)
    if o[0] == 0 {
        return IpClass::Reserved;
    }
    // Future-use 240.0.0.0/4, which includes limited broadcast
    if o[0] >= 240 {
        return IpClass::Reserved;
    }
    // IETF protocol assignments 192.0.0.0/24 and documentation ranges
    if (o[0] == 192 && o[1] == 0 && (o[2] == 0 || o[2] == 2))
        || (o[0] == 198 && o[1] == 51 && o[2] == 100)
        || (o[0] == 203 && o[1] == 0 && o[2] == 113)
    {
        return IpClass::Reserved;
    }

    IpClass::Unicast
}

fn classify_v6(ip: Ipv6Addr) -> IpClass {
    if ip.is_unspecified() {
        return IpClass::Unspecified;
    }
    // ::1 before any IPv4-embedding checks
    if ip.is_loopback() {
        return IpClass::Loopback;
    }
    // IPv4-mapped (::ffff:x.x.x.x) classifies as the embedded address
    if let Some(v4) = ip.to_ipv4_mapped() {
        return classify_v4(v4);
    }
    // IPv4-compatible (::x.x.x.x) - deprecated but still parses and routes
    let s = ip.segments();
    if s[0..6] == [0, 0, 0, 0, 0, 0] && (s[6] != 0 || s[7] > 1) {
        let v4 = Ipv4Addr::new(
            (s[6] >> 8) as u8,
            s[6] as u8,
            (s[7] >> 8) as u8,
            s[7] as u8,
        );
        return classify_v4(v4);
    }
    // fe80::/10 link-local (is_unicast_link_local is unstable)
    if (s[0] & 0xffc0) == 0xfe80 {
        return IpClass::LinkLocal;
    }
    // fc00::/7 unique-local
    if (s[0] & 0xfe00) == 0xfc00 {
        return IpClass::Private;
    }
    if ip.is_multicast() {
        return IpClass::Multicast;
    }
    // 2001:db8::/32 documentation
    if s[0] == 0x2001 && s[1] == 0xdb8 {
        return IpClass::Reserved;
    }

    IpClass::Unicast
}
