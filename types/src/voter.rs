//! Voter identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque voter identifier.
///
/// The agreement core never interprets the contents; it only compares voters
/// for equality and orders them inside an epoch's voter list.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VoterId(String);

impl VoterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for VoterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VoterId({})", self.0)
    }
}

impl fmt::Display for VoterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_and_order() {
        assert_eq!(VoterId::new("a"), VoterId::new("a"));
        assert!(VoterId::new("a") < VoterId::new("b"));
    }

    #[test]
    fn as_str_roundtrip() {
        assert_eq!(VoterId::new("node-3").as_str(), "node-3");
    }
}
