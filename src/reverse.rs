//! Reverse-zone arithmetic.
//!
//! Maps PTR record names inside `in-addr.arpa.` / `ip6.arpa.` zones back to
//! concrete addresses and decides whether a record belongs in the zone it is
//! being written to. Inputs here are user-supplied, so every conversion or
//! parse fault is reported as the same [`InvalidRequest`] rejection rather
//! than propagating; the HTTP layer relies on that to answer 400, not 500.

use hickory_proto::rr::RecordType;
use ipnet::Ipv4Net;
use once_cell::sync::Lazy;
use regex::Regex;
use std::net::{Ipv4Addr, Ipv6Addr};
use thiserror::Error;

use crate::zone::Zone;

/// Full 128-bit address spelled as dot-separated nibbles under `ip6.arpa.`.
static IPV6_PTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^([0-9a-f]\.){32}ip6\.arpa\.$").unwrap());

/// Rejection of a record that does not name an address inside its zone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InvalidRequest(pub String);

fn does_not_specify(record_name: &str, zone: &Zone) -> InvalidRequest {
    InvalidRequest(format!(
        "RecordSet {} does not specify a valid IP address in zone {}",
        record_name, zone.name
    ))
}

/// Strips an ASCII suffix case-insensitively.
fn strip_suffix_ci<'a>(name: &'a str, suffix: &str) -> Option<&'a str> {
    if name.to_ascii_lowercase().ends_with(suffix) {
        Some(&name[..name.len() - suffix.len()])
    } else {
        None
    }
}

/// The zone's high-order octets in network order: strip the suffix, split,
/// drop empties, reverse.
fn ipv4_zone_octets(zone: &Zone) -> Option<Vec<String>> {
    let prefix = strip_suffix_ci(&zone.name, "in-addr.arpa.")?;
    Some(
        prefix
            .split('.')
            .filter(|s| !s.is_empty())
            .rev()
            .map(str::to_string)
            .collect(),
    )
}

/// Reconstructs the full dotted-quad IPv4 address a PTR record names.
///
/// The zone name carries the high-order octets (reversed), the record name
/// the low-order ones. A classless-delegation zone keeps its `/prefix`
/// suffix on the first label; that label is positional only and is dropped
/// before concatenation.
pub fn convert_ptr_to_ipv4(zone: &Zone, record_name: &str) -> Result<Ipv4Addr, InvalidRequest> {
    let mut octets = ipv4_zone_octets(zone).ok_or_else(|| does_not_specify(record_name, zone))?;

    if zone.name.contains('/') {
        octets.pop();
    }

    octets.extend(
        record_name
            .split('.')
            .filter(|s| !s.is_empty())
            .rev()
            .map(str::to_string),
    );

    octets
        .join(".")
        .parse()
        .map_err(|_| does_not_specify(record_name, zone))
}

/// Derives the CIDR block an IPv4 reverse zone covers.
///
/// A classless zone (`0/26.2.0.192.in-addr.arpa.`) contributes its explicit
/// prefix with the delegation octet's base value right-padded to four
/// octets. A classful zone with 1-3 octets pads with `.0` and takes /8, /16
/// or /24; anything else does not encode a block.
pub fn zone_as_ipv4_cidr(zone: &Zone) -> Result<Ipv4Net, InvalidRequest> {
    let mut octets = ipv4_zone_octets(zone).ok_or_else(|| does_not_specify(&zone.name, zone))?;

    let prefix_len = match octets.last().cloned() {
        Some(last) if last.contains('/') => {
            let (base, prefix) = last
                .split_once('/')
                .ok_or_else(|| does_not_specify(&zone.name, zone))?;
            let last_index = octets.len() - 1;
            octets[last_index] = base.to_string();
            prefix
                .parse::<u8>()
                .map_err(|_| does_not_specify(&zone.name, zone))?
        }
        _ => match octets.len() {
            1 => 8,
            2 => 16,
            3 => 24,
            _ => return Err(does_not_specify(&zone.name, zone)),
        },
    };

    while octets.len() < 4 {
        octets.push("0".to_string());
    }

    format!("{}/{}", octets.join("."), prefix_len)
        .parse()
        .map_err(|_| does_not_specify(&zone.name, zone))
}

/// Reconstructs the IPv6 address a PTR record in an `ip6.arpa.` zone names.
///
/// Zone and record names are nibble sequences in reversed order; reversing
/// each yields high then low nibbles, which regroup into eight 4-nibble
/// blocks.
pub fn convert_ptr_to_ipv6(zone: &Zone, record_name: &str) -> Result<Ipv6Addr, InvalidRequest> {
    let prefix = strip_suffix_ci(&zone.name, "ip6.arpa.")
        .ok_or_else(|| does_not_specify(record_name, zone))?;

    let mut nibbles: Vec<&str> = prefix.split('.').filter(|s| !s.is_empty()).rev().collect();
    nibbles.extend(record_name.split('.').filter(|s| !s.is_empty()).rev());

    let hex: String = nibbles.concat();
    if hex.len() != 32 {
        return Err(does_not_specify(record_name, zone));
    }

    let grouped: Vec<&str> = (0..8).map(|i| &hex[i * 4..i * 4 + 4]).collect();
    grouped
        .join(":")
        .parse()
        .map_err(|_| does_not_specify(record_name, zone))
}

/// True if the record name completes a full 32-nibble PTR within the zone.
pub fn valid_ipv6_ptr(zone: &Zone, record_name: &str) -> bool {
    IPV6_PTR_RE.is_match(&format!("{}.{}", record_name, zone.name))
}

/// Decides whether a record belongs in the zone it is being written to.
///
/// Non-PTR records always do. A PTR in an IPv4 reverse zone must
/// reconstruct to an address inside the zone's CIDR block; a PTR in an IPv6
/// reverse zone must complete the 32-nibble form. Everything else,
/// including any conversion fault along the way, is the standard rejection.
pub fn ptr_is_in_zone(
    zone: &Zone,
    record_name: &str,
    record_type: RecordType,
) -> Result<(), InvalidRequest> {
    if record_type != RecordType::PTR {
        return Ok(());
    }

    let result = if zone.is_ipv4() {
        zone_as_ipv4_cidr(zone)
            .and_then(|cidr| {
                let ip = convert_ptr_to_ipv4(zone, record_name)?;
                if cidr.contains(&ip) {
                    Ok(())
                } else {
                    Err(does_not_specify(record_name, zone))
                }
            })
            .map_err(|_| does_not_specify(record_name, zone))
    } else if zone.is_ipv6() {
        if valid_ipv6_ptr(zone, record_name) {
            Ok(())
        } else {
            Err(does_not_specify(record_name, zone))
        }
    } else {
        Err(does_not_specify(record_name, zone))
    };

    crate::metrics::record_ptr_check(result.is_ok());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::{Zone, ZoneRequest};

    fn make_zone(name: &str) -> Zone {
        Zone::build(ZoneRequest {
            name: name.to_string(),
            email: "test@test.com".to_string(),
            admin_group_id: "admin-group-id".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_convert_ptr_to_ipv4_classful() {
        let zone = make_zone("2.0.192.in-addr.arpa.");
        let ip = convert_ptr_to_ipv4(&zone, "25").unwrap();
        assert_eq!(ip.to_string(), "192.0.2.25");
    }

    #[test]
    fn test_convert_ptr_to_ipv4_two_octet_zone() {
        let zone = make_zone("0.192.in-addr.arpa.");
        let ip = convert_ptr_to_ipv4(&zone, "25.2").unwrap();
        assert_eq!(ip.to_string(), "192.0.2.25");
    }

    #[test]
    fn test_convert_ptr_to_ipv4_classless_delegation() {
        let zone = make_zone("0/26.2.0.192.in-addr.arpa.");
        let ip = convert_ptr_to_ipv4(&zone, "25").unwrap();
        assert_eq!(ip.to_string(), "192.0.2.25");
    }

    #[test]
    fn test_convert_ptr_to_ipv4_too_many_octets() {
        let zone = make_zone("2.0.192.in-addr.arpa.");
        assert!(convert_ptr_to_ipv4(&zone, "25.3").is_err());
    }

    #[test]
    fn test_zone_as_cidr_classful() {
        assert_eq!(
            zone_as_ipv4_cidr(&make_zone("192.in-addr.arpa."))
                .unwrap()
                .to_string(),
            "192.0.0.0/8"
        );
        assert_eq!(
            zone_as_ipv4_cidr(&make_zone("0.192.in-addr.arpa."))
                .unwrap()
                .to_string(),
            "192.0.0.0/16"
        );
        assert_eq!(
            zone_as_ipv4_cidr(&make_zone("2.0.192.in-addr.arpa."))
                .unwrap()
                .to_string(),
            "192.0.2.0/24"
        );
    }

    #[test]
    fn test_zone_as_cidr_classless() {
        let cidr = zone_as_ipv4_cidr(&make_zone("0/26.2.0.192.in-addr.arpa.")).unwrap();
        assert_eq!(cidr.to_string(), "192.0.2.0/26");
    }

    #[test]
    fn test_zone_as_cidr_rejects_bare_and_overlong_zones() {
        assert!(zone_as_ipv4_cidr(&make_zone("in-addr.arpa.")).is_err());
        assert!(zone_as_ipv4_cidr(&make_zone("4.3.2.0.192.in-addr.arpa.")).is_err());
    }

    #[test]
    fn test_ptr_in_classless_zone() {
        let zone = make_zone("0/26.2.0.192.in-addr.arpa.");
        assert!(ptr_is_in_zone(&zone, "25", RecordType::PTR).is_ok());
        // 192.0.2.64 falls outside 192.0.2.0/26
        assert!(ptr_is_in_zone(&zone, "64", RecordType::PTR).is_err());
    }

    #[test]
    fn test_ptr_outside_zone_reports_invalid_request() {
        let zone = make_zone("2.0.192.in-addr.arpa.");
        let err = ptr_is_in_zone(&zone, "25.3", RecordType::PTR).unwrap_err();
        assert_eq!(
            err.to_string(),
            "RecordSet 25.3 does not specify a valid IP address in zone 2.0.192.in-addr.arpa."
        );
    }

    #[test]
    fn test_non_ptr_records_always_pass() {
        let zone = make_zone("2.0.192.in-addr.arpa.");
        assert!(ptr_is_in_zone(&zone, "anything at all", RecordType::TXT).is_ok());
        assert!(ptr_is_in_zone(&zone, "25", RecordType::CNAME).is_ok());
    }

    #[test]
    fn test_ptr_in_forward_zone_is_invalid() {
        let zone = make_zone("example.com.");
        assert!(ptr_is_in_zone(&zone, "25", RecordType::PTR).is_err());
    }

    #[test]
    fn test_ipv6_ptr_completing_32_nibbles() {
        let zone = make_zone("0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.8.b.d.0.1.0.0.2.ip6.arpa.");
        assert!(ptr_is_in_zone(&zone, "1.0.0.0.2.2.2.2", RecordType::PTR).is_ok());
        // Too few nibbles
        assert!(ptr_is_in_zone(&zone, "1.0.0.0", RecordType::PTR).is_err());
        // Non-hex nibble
        assert!(ptr_is_in_zone(&zone, "1.0.0.0.2.2.2.g", RecordType::PTR).is_err());
    }

    #[test]
    fn test_ipv6_ptr_is_case_insensitive() {
        let zone = make_zone("0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.8.B.D.0.1.0.0.2.ip6.arpa.");
        assert!(ptr_is_in_zone(&zone, "1.0.0.0.2.2.2.A", RecordType::PTR).is_ok());
    }

    #[test]
    fn test_convert_ptr_to_ipv6() {
        let zone = make_zone("0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.8.b.d.0.1.0.0.2.ip6.arpa.");
        let ip = convert_ptr_to_ipv6(&zone, "1.0.0.0.2.2.2.2").unwrap();
        assert_eq!(ip, "2001:db8::2222:1".parse::<Ipv6Addr>().unwrap());
    }

    #[test]
    fn test_conversion_faults_never_panic() {
        let zone = make_zone("2.0.192.in-addr.arpa.");
        assert!(convert_ptr_to_ipv4(&zone, "not-an-octet").is_err());
        assert!(convert_ptr_to_ipv4(&zone, "999").is_err());
        assert!(ptr_is_in_zone(&zone, "", RecordType::PTR).is_err());

        let zone = make_zone("0/abc.2.0.192.in-addr.arpa.");
        assert!(zone_as_ipv4_cidr(&zone).is_err());
    }
}
