//! Per-database capabilities
//!
//! A capability set persists as a compact letter string (`"crd"`), one
//! letter per capability in canonical order.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{DbError, DbResult};

/// A grantable capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    Create,
    Read,
    Delete,
    Update,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::Create,
        Capability::Read,
        Capability::Delete,
        Capability::Update,
    ];

    pub fn letter(&self) -> char {
        match self {
            Capability::Create => 'c',
            Capability::Read => 'r',
            Capability::Delete => 'd',
            Capability::Update => 'u',
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Capability::Create => "create",
            Capability::Read => "read",
            Capability::Delete => "delete",
            Capability::Update => "update",
        }
    }

    fn from_letter(c: char) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|cap| cap.letter() == c.to_ascii_lowercase())
    }
}

impl FromStr for Capability {
    type Err = DbError;

    /// Accepts full names or single letters, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|cap| cap.name() == lower || (lower.len() == 1 && lower.starts_with(cap.letter())))
            .ok_or_else(|| DbError::UnknownCapability(s.to_string()))
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Set of capabilities held on one database
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every capability
    pub fn all() -> Self {
        Self(Capability::ALL.into_iter().collect())
    }

    pub fn contains(&self, cap: Capability) -> bool {
        self.0.contains(&cap)
    }

    /// Adds `cap`; returns false if it was already present.
    pub fn insert(&mut self, cap: Capability) -> bool {
        self.0.insert(cap)
    }

    /// Removes `cap`; returns false if it was not present.
    pub fn remove(&mut self, cap: Capability) -> bool {
        self.0.remove(&cap)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }

    /// Parses a letter string such as `"crd"`.
    pub fn parse_letters(s: &str) -> DbResult<Self> {
        s.chars()
            .map(|c| {
                Capability::from_letter(c).ok_or_else(|| DbError::UnknownCapability(c.to_string()))
            })
            .collect::<DbResult<BTreeSet<_>>>()
            .map(Self)
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for cap in &self.0 {
            write!(f, "{}", cap.letter())?;
        }
        Ok(())
    }
}

impl TryFrom<String> for CapabilitySet {
    type Error = DbError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse_letters(&s)
    }
}

impl From<CapabilitySet> for String {
    fn from(set: CapabilitySet) -> Self {
        set.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_capability() {
        assert_eq!("create".parse::<Capability>().unwrap(), Capability::Create);
        assert_eq!("READ".parse::<Capability>().unwrap(), Capability::Read);
        assert_eq!("d".parse::<Capability>().unwrap(), Capability::Delete);
        assert_eq!("U".parse::<Capability>().unwrap(), Capability::Update);
        assert_eq!(
            "drop".parse::<Capability>().unwrap_err(),
            DbError::UnknownCapability("drop".into())
        );
        assert!("cr".parse::<Capability>().is_err());
    }

    #[test]
    fn test_set_letters_canonical_order() {
        let set: CapabilitySet = [Capability::Delete, Capability::Create].into_iter().collect();
        assert_eq!(set.to_string(), "cd");
        assert_eq!(CapabilitySet::all().to_string(), "crdu");
        assert_eq!(CapabilitySet::parse_letters("rc").unwrap().to_string(), "cr");
    }

    #[test]
    fn test_insert_and_remove_are_idempotent() {
        let mut set = CapabilitySet::new();
        assert!(set.insert(Capability::Read));
        assert!(!set.insert(Capability::Read));
        assert!(set.remove(Capability::Read));
        assert!(!set.remove(Capability::Read));
        assert!(set.is_empty());
    }

    #[test]
    fn test_serde_as_string() {
        let set = CapabilitySet::parse_letters("cr").unwrap();
        assert_eq!(serde_json::to_string(&set).unwrap(), "\"cr\"");
        let back: CapabilitySet = serde_json::from_str("\"rc\"").unwrap();
        assert_eq!(back, set);
        assert!(serde_json::from_str::<CapabilitySet>("\"cx\"").is_err());
    }
}
