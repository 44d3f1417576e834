//! Strong type definitions for the Reel catalog.
//!
//! Identifiers are newtypes so a record id can't be mixed up with a year or
//! a timestamp at a call site.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned record identifier.
///
/// Ids are handed out by the store on insert and never change afterwards.
/// A record that has not been inserted yet carries [`RecordId::UNASSIGNED`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl RecordId {
    /// Sentinel for records that have not been inserted yet.
    pub const UNASSIGNED: Self = Self(0);

    /// Create a new RecordId from its raw value.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Get the raw value.
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Whether the store has assigned this id.
    pub const fn is_assigned(self) -> bool {
        self.0 != Self::UNASSIGNED.0
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RecordId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}
