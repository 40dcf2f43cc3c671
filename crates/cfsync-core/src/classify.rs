//! Address family classification
//!
//! Validates text tokens as IPv4/IPv6 literals and reports which DNS
//! record type they map to. Classification is strict: a token is only
//! accepted if it parses as a complete IP literal, so near-misses that
//! survive permissive extraction (pure-digit colon junk like `12:34:56`,
//! truncated literals, surrounding text) are rejected here.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Address family, named after the DNS record type it maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Family {
    /// IPv4 (`A` record)
    A,
    /// IPv6 (`AAAA` record)
    Aaaa,
}

impl Family {
    /// The DNS record type string used on the provider wire
    pub fn record_type(&self) -> &'static str {
        match self {
            Family::A => "A",
            Family::Aaaa => "AAAA",
        }
    }

    /// The opposite family (A <-> AAAA)
    pub fn opposite(&self) -> Family {
        match self {
            Family::A => Family::Aaaa,
            Family::Aaaa => Family::A,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.record_type())
    }
}

/// A validated IP literal with a derived family
///
/// Invalid tokens never become addresses: the only way to construct one
/// is through [`Address::parse`], which requires a full, strict IP
/// literal. Immutable once classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address(IpAddr);

impl Address {
    /// Strictly parse a token as an IP literal
    ///
    /// Returns `None` on any parse failure: malformed literal, partial
    /// match, or non-IP text.
    pub fn parse(token: &str) -> Option<Address> {
        token.parse::<IpAddr>().ok().map(Address)
    }

    /// The underlying IP address
    pub fn ip(&self) -> IpAddr {
        self.0
    }

    /// The address family
    pub fn family(&self) -> Family {
        match self.0 {
            IpAddr::V4(_) => Family::A,
            IpAddr::V6(_) => Family::Aaaa,
        }
    }
}

impl From<IpAddr> for Address {
    fn from(ip: IpAddr) -> Self {
        Address(ip)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Classify a text token as an address family
///
/// Returns the family on success, `None` on any parse failure.
/// No side effects.
pub fn classify(token: &str) -> Option<Family> {
    Address::parse(token).map(|a| a.family())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_ipv4() {
        assert_eq!(classify("203.0.113.5"), Some(Family::A));
        assert_eq!(classify("1.1.1.1"), Some(Family::A));
    }

    #[test]
    fn classifies_ipv6() {
        assert_eq!(classify("2001:db8::1"), Some(Family::Aaaa));
        assert_eq!(classify("::1"), Some(Family::Aaaa));
        assert_eq!(classify("fe80::1:2:3:4"), Some(Family::Aaaa));
    }

    #[test]
    fn rejects_non_ip_tokens() {
        assert_eq!(classify("not-an-ip"), None);
        assert_eq!(classify(""), None);
        assert_eq!(classify("example.com"), None);
    }

    #[test]
    fn rejects_pure_digit_colon_junk() {
        // Timestamps and port-ish fragments that a permissive scan can
        // extract must not classify as IPv6.
        assert_eq!(classify("12:34:56"), None);
        assert_eq!(classify("10:20:30"), None);
    }

    #[test]
    fn rejects_partial_literals() {
        assert_eq!(classify("1.2.3"), None);
        assert_eq!(classify("256.1.1.1"), None);
        assert_eq!(classify("1.2.3.4.5"), None);
    }

    #[test]
    fn family_opposite_and_record_type() {
        assert_eq!(Family::A.opposite(), Family::Aaaa);
        assert_eq!(Family::Aaaa.opposite(), Family::A);
        assert_eq!(Family::A.record_type(), "A");
        assert_eq!(Family::Aaaa.record_type(), "AAAA");
    }

    #[test]
    fn address_display_round_trips() {
        let addr = Address::parse("2001:db8::1").unwrap();
        assert_eq!(Address::parse(&addr.to_string()), Some(addr));
    }
}
