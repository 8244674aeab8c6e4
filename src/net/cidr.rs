//! CIDR deny-list parsing and membership checks.
//!
//! Deny-list entries come from operator configuration. A malformed entry is
//! dropped with a warning instead of failing the fetch path: this is a
//! deny-list, not an allow-list, so a bad rule narrows coverage but must
//! never turn into a crash or an open gate for the rest of the list.

use std::net::IpAddr;

use ipnet::IpNet;
use tracing::warn;

/// Parses a single CIDR entry (`10.0.0.0/8`, `fc00::/7`).
///
/// Returns `None` for anything that is not standard CIDR notation; callers
/// skip the entry.
#[must_use]
pub fn parse_cidr(text: &str) -> Option<IpNet> {
    text.trim().parse::<IpNet>().ok()
}

/// Parses a whitespace- and/or comma-separated deny-list string.
///
/// Unparsable entries are logged and dropped; the surviving networks are
/// returned in input order.
#[must_use]
pub fn parse_deny_list(raw: &str) -> Vec<IpNet> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let parsed = parse_cidr(entry);
            if parsed.is_none() {
                warn!(entry, "ignoring malformed CIDR in deny list");
            }
            parsed
        })
        .collect()
}

/// Returns true iff `ip` falls inside any of the given networks.
///
/// Standard prefix-mask semantics; a v4 address never matches a v6 network
/// and vice versa.
#[must_use]
pub fn ip_in_list(ip: IpAddr, cidrs: &[IpNet]) -> bool {
    cidrs.iter().any(|net| net.contains(&ip))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use tracing::field::{Field, Visit};
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context, Layer};
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::registry::LookupSpan;

    use super::*;

    #[derive(Default)]
    struct EventFieldVisitor {
        fields: HashMap<String, String>,
    }

    impl Visit for EventFieldVisitor {
        fn record_str(&mut self, field: &Field, value: &str) {
            self.fields
                .insert(field.name().to_string(), value.to_string());
        }

        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            self.fields
                .insert(field.name().to_string(), format!("{value:?}"));
        }
    }

    #[derive(Clone)]
    struct EventCaptureLayer {
        events: Arc<Mutex<Vec<HashMap<String, String>>>>,
    }

    impl<S> Layer<S> for EventCaptureLayer
    where
        S: Subscriber + for<'lookup> LookupSpan<'lookup>,
    {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut visitor = EventFieldVisitor::default();
            event.record(&mut visitor);
            self.events.lock().unwrap().push(visitor.fields);
        }
    }

    #[test]
    fn test_parse_cidr_valid_v4() {
        let net = parse_cidr("100.64.0.0/10").expect("valid CIDR");
        assert_eq!(net.prefix_len(), 10);
        assert!(net.contains(&"100.64.0.1".parse::<IpAddr>().unwrap()));
    }

    #[test]
    fn test_parse_cidr_valid_v6() {
        let net = parse_cidr("fc00::/7").expect("valid CIDR");
        assert!(net.contains(&"fd12:3456::1".parse::<IpAddr>().unwrap()));
    }

    #[test]
    fn test_parse_cidr_trims_whitespace() {
        assert!(parse_cidr("  192.0.2.0/24  ").is_some());
    }

    #[test]
    fn test_parse_cidr_rejects_malformed() {
        assert!(parse_cidr("not-a-cidr").is_none());
        assert!(parse_cidr("10.0.0.0/33").is_none());
        assert!(parse_cidr("10.0.0.0").is_none(), "bare address has no prefix");
        assert!(parse_cidr("").is_none());
        assert!(parse_cidr("300.0.0.0/8").is_none());
    }

    #[test]
    fn test_parse_deny_list_mixed_separators() {
        let nets = parse_deny_list("100.64.0.0/10, 198.18.0.0/15\n fc00::/7");
        assert_eq!(nets.len(), 3);
    }

    #[test]
    fn test_parse_deny_list_drops_bad_entries() {
        let nets = parse_deny_list("100.64.0.0/10 garbage 198.18.0.0/15");
        assert_eq!(nets.len(), 2);
    }

    #[test]
    fn test_parse_deny_list_warns_on_dropped_entry() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry()
            .with(tracing_subscriber::filter::LevelFilter::DEBUG)
            .with(EventCaptureLayer {
                events: Arc::clone(&events),
            });

        tracing::subscriber::with_default(subscriber, || {
            // Refresh interest cache so our subscriber's interests take
            // precedence over any callsite registrations that parallel
            // tests may have made with the noop dispatcher.
            tracing::callsite::rebuild_interest_cache();

            let nets = parse_deny_list("100.64.0.0/10 not-a-cidr");
            assert_eq!(nets.len(), 1);
        });

        let events = events.lock().unwrap();
        let warned = events.iter().any(|fields| {
            fields
                .get("entry")
                .is_some_and(|value| value.contains("not-a-cidr"))
        });
        assert!(warned, "dropped entry should be logged: {events:?}");
    }

    #[test]
    fn test_parse_deny_list_empty_input() {
        assert!(parse_deny_list("").is_empty());
        assert!(parse_deny_list("  ,  ").is_empty());
    }

    #[test]
    fn test_ip_in_list_membership() {
        let nets = parse_deny_list("100.64.0.0/10 198.18.0.0/15");
        assert!(ip_in_list("100.64.0.1".parse().unwrap(), &nets));
        assert!(ip_in_list("100.127.255.255".parse().unwrap(), &nets));
        assert!(ip_in_list("198.18.0.1".parse().unwrap(), &nets));
        assert!(ip_in_list("198.19.255.255".parse().unwrap(), &nets));
        // Just outside both ranges
        assert!(!ip_in_list("100.128.0.0".parse().unwrap(), &nets));
        assert!(!ip_in_list("198.20.0.0".parse().unwrap(), &nets));
        assert!(!ip_in_list("93.184.216.34".parse().unwrap(), &nets));
    }

    #[test]
    fn test_ip_in_list_family_mismatch_never_matches() {
        let nets = parse_deny_list("10.0.0.0/8");
        assert!(!ip_in_list("fc00::1".parse().unwrap(), &nets));
    }

    #[test]
    fn test_ip_in_list_empty_list() {
        assert!(!ip_in_list("127.0.0.1".parse().unwrap(), &[]));
    }
}
