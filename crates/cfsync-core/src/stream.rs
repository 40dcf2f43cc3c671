//! Discovery stream parsing
//!
//! The discovery subprocess prints free-form log lines of unknown
//! locale and layout. Lines announcing the current best candidate(s)
//! contain a "最佳"/"best" marker; those lines carry zero or more IP
//! literals as substrings. Extraction is two-phase: a permissive regex
//! scan pulls out anything address-shaped, then strict classification
//! drops the near-misses. This tolerates surrounding text we do not
//! control without ever accepting a malformed literal.

use regex::Regex;

use crate::classify::Address;

/// IPv4 literal scan, permissive (strict validation happens after)
const IPV4_PATTERN: &str = r"\b(?:\d{1,3}\.){3}\d{1,3}\b";

/// IPv6 literal scan; misses some compressed forms, which the
/// discovery process does not emit
const IPV6_PATTERN: &str = r"\b(?:[a-fA-F0-9]{1,4}:){2,7}[a-fA-F0-9]{1,4}\b";

/// Parser for the discovery subprocess's stdout lines
#[derive(Debug, Clone)]
pub struct StreamParser {
    ipv4: Regex,
    ipv6: Regex,
}

impl StreamParser {
    /// Build a parser with the candidate-extraction patterns compiled
    pub fn new() -> Self {
        Self {
            ipv4: Regex::new(IPV4_PATTERN).expect("ipv4 pattern is valid"),
            ipv6: Regex::new(IPV6_PATTERN).expect("ipv6 pattern is valid"),
        }
    }

    /// Whether a line is a candidate announcement
    ///
    /// The marker is matched in both the original locale ("最佳") and
    /// English ("best", case-insensitive).
    pub fn is_candidate(&self, line: &str) -> bool {
        line.contains("最佳") || line.to_lowercase().contains("best")
    }

    /// Extract validated addresses from one stream line
    ///
    /// Non-candidate lines yield nothing. On candidate lines, every
    /// extracted substring is passed through strict classification and
    /// non-matches are discarded.
    pub fn parse_line(&self, line: &str) -> Vec<Address> {
        if !self.is_candidate(line) {
            return Vec::new();
        }

        self.ipv4
            .find_iter(line)
            .chain(self.ipv6.find_iter(line))
            .filter_map(|m| Address::parse(m.as_str()))
            .collect()
    }
}

impl Default for StreamParser {
    fn default() -> Self {
        Self::new()
    }
}
