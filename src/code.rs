//! Dotted account codes ("1.02.01") as ordered integer segments
//!
//! The hierarchy of a chart of accounts is implicit in these codes: "1.02"
//! is a child of "1" and an ancestor of "1.02.01". Parsing happens once, at
//! construction; every comparison afterwards works on the segments.

use crate::error::CvmError;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A chart-of-accounts code, e.g. `1.02.01`.
///
/// Ordering is lexicographic over the segments, which matches the
/// regulator's presentation order: a code always sorts before any of its
/// descendants, and siblings sort by their trailing segment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountCode(Vec<u32>);

impl AccountCode {
    /// Number of segments ("1.02.01" has depth 3).
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn segments(&self) -> &[u32] {
        &self.0
    }

    /// The trailing segment, which orders a node among its siblings.
    pub fn last_segment(&self) -> u32 {
        self.0[self.0.len() - 1]
    }

    /// The code with the last segment removed, or `None` at depth 1.
    pub fn parent(&self) -> Option<AccountCode> {
        if self.0.len() > 1 {
            Some(AccountCode(self.0[..self.0.len() - 1].to_vec()))
        } else {
            None
        }
    }

    /// True iff `other` is exactly this code minus its last segment.
    pub fn is_child_of(&self, other: &AccountCode) -> bool {
        self.0.len() == other.0.len() + 1 && self.0.starts_with(&other.0)
    }

    /// True iff this code is a strict prefix of `other`, at any depth.
    pub fn is_ancestor_of(&self, other: &AccountCode) -> bool {
        other.0.len() > self.0.len() && other.0.starts_with(&self.0)
    }
}

impl FromStr for AccountCode {
    type Err = CvmError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text.is_empty() {
            return Err(CvmError::MalformedCode(text.to_string()));
        }

        let mut segments = Vec::new();

        for part in text.split('.') {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(CvmError::MalformedCode(text.to_string()));
            }

            let segment = part
                .parse::<u32>()
                .map_err(|_| CvmError::MalformedCode(text.to_string()))?;

            segments.push(segment);
        }

        Ok(AccountCode(segments))
    }
}

impl fmt::Display for AccountCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The regulator zero-pads every segment after the first to two
        // digits ("1.02.01").
        for (i, segment) in self.0.iter().enumerate() {
            if i == 0 {
                write!(f, "{}", segment)?;
            } else {
                write!(f, ".{:02}", segment)?;
            }
        }
        Ok(())
    }
}

impl Serialize for AccountCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AccountCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(text: &str) -> AccountCode {
        text.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(code("1").segments(), &[1]);
        assert_eq!(code("1.02.01").segments(), &[1, 2, 1]);
        assert_eq!(code("1.02.01").to_string(), "1.02.01");
        assert_eq!(code("3.99").depth(), 2);
    }

    #[test]
    fn test_malformed() {
        for bad in ["", "1..2", ".1", "1.", "1.x", "a", "1,02", "-1"] {
            assert!(matches!(
                bad.parse::<AccountCode>(),
                Err(CvmError::MalformedCode(_))
            ));
        }
    }

    #[test]
    fn test_ordering_matches_presentation_order() {
        let mut codes = vec![
            code("2"),
            code("1.02"),
            code("1"),
            code("1.10"),
            code("1.02.01"),
            code("1.9"),
        ];
        codes.sort();

        let rendered: Vec<String> = codes.iter().map(|c| c.to_string()).collect();
        assert_eq!(rendered, ["1", "1.02", "1.02.01", "1.09", "1.10", "2"]);
    }

    #[test]
    fn test_prefix_sorts_before_extensions() {
        assert!(code("1.02") < code("1.02.01"));
        assert!(code("1.02.99") < code("1.03"));
    }

    #[test]
    fn test_relationships() {
        assert!(code("1.02").is_child_of(&code("1")));
        assert!(!code("1.02.01").is_child_of(&code("1")));
        assert!(!code("2.01").is_child_of(&code("1")));

        assert!(code("1").is_ancestor_of(&code("1.02.01")));
        assert!(!code("1").is_ancestor_of(&code("1")));
        assert!(!code("1.02").is_ancestor_of(&code("1.03.01")));

        assert_eq!(code("1.02.01").parent(), Some(code("1.02")));
        assert_eq!(code("1").parent(), None);
        assert_eq!(code("1.02.07").last_segment(), 7);
    }
}
