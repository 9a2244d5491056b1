//! VersionNumber - the `major.minor` label of a history record
//!
//! `major` increments only on approval; `minor` increments on draft edits and
//! when a new draft is opened from a final version.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ItemStatus;
use crate::errors::LifecycleError;

/// A `major.minor` version label, ordered numerically.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionNumber {
    major: u32,
    minor: u32,
}

impl VersionNumber {
    /// The version every item starts at.
    pub const INITIAL: VersionNumber = VersionNumber { major: 0, minor: 1 };

    /// Creates a version number.
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Returns the major component.
    #[inline]
    pub fn major(&self) -> u32 {
        self.major
    }

    /// Returns the minor component.
    #[inline]
    pub fn minor(&self) -> u32 {
        self.minor
    }

    /// True while the item has never been approved.
    #[inline]
    pub fn is_unapproved(&self) -> bool {
        self.major == 0
    }

    /// Computes the version label produced by moving from `from` to `to`.
    ///
    /// - Draft → Draft: minor + 1
    /// - Draft → Final: (major + 1).0
    /// - Final | Retired → Draft: major.(minor + 1)
    /// - Final ↔ Retired: unchanged
    pub fn next_for(&self, from: ItemStatus, to: ItemStatus) -> Self {
        match (from, to) {
            (ItemStatus::Draft, ItemStatus::Draft) => Self::new(self.major, self.minor + 1),
            (ItemStatus::Draft, ItemStatus::Final) => Self::new(self.major + 1, 0),
            (ItemStatus::Final, ItemStatus::Draft) | (ItemStatus::Retired, ItemStatus::Draft) => {
                Self::new(self.major, self.minor + 1)
            }
            _ => *self,
        }
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for VersionNumber {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LifecycleError::InvalidInput(format!("invalid version '{}'", s));
        let (major, minor) = s.trim().split_once('.').ok_or_else(invalid)?;
        let major = major.parse::<u32>().map_err(|_| invalid())?;
        let minor = minor.parse::<u32>().map_err(|_| invalid())?;
        Ok(Self::new(major, minor))
    }
}

impl TryFrom<String> for VersionNumber {
    type Error = LifecycleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionNumber> for String {
    fn from(value: VersionNumber) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let v: VersionNumber = "1.12".parse().unwrap();
        assert_eq!(v.major(), 1);
        assert_eq!(v.minor(), 12);
        assert_eq!(v.to_string(), "1.12");
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in ["", "1", "1.", ".1", "a.b", "1.2.3", "-1.0"] {
            assert!(bad.parse::<VersionNumber>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_ordering_is_numeric_not_lexical() {
        let v1_9: VersionNumber = "1.9".parse().unwrap();
        let v1_10: VersionNumber = "1.10".parse().unwrap();
        assert!(v1_9 < v1_10);
        assert!(VersionNumber::new(2, 0) > v1_10);
    }

    #[test]
    fn test_next_for_transitions() {
        let draft = VersionNumber::INITIAL;
        assert_eq!(
            draft.next_for(ItemStatus::Draft, ItemStatus::Draft),
            VersionNumber::new(0, 2)
        );
        assert_eq!(
            draft.next_for(ItemStatus::Draft, ItemStatus::Final),
            VersionNumber::new(1, 0)
        );

        let fin = VersionNumber::new(1, 0);
        assert_eq!(
            fin.next_for(ItemStatus::Final, ItemStatus::Draft),
            VersionNumber::new(1, 1)
        );
        assert_eq!(fin.next_for(ItemStatus::Final, ItemStatus::Retired), fin);
        assert_eq!(fin.next_for(ItemStatus::Retired, ItemStatus::Final), fin);

        let second_draft = VersionNumber::new(1, 3);
        assert_eq!(
            second_draft.next_for(ItemStatus::Draft, ItemStatus::Final),
            VersionNumber::new(2, 0)
        );
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&VersionNumber::new(2, 1)).unwrap();
        assert_eq!(json, "\"2.1\"");
        let back: VersionNumber = serde_json::from_str(&json).unwrap();
        assert_eq!(back, VersionNumber::new(2, 1));
        assert!(serde_json::from_str::<VersionNumber>("\"x\"").is_err());
    }
}
