use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Stored value of a relation row. Stored as a `smallint` column.
///
/// A row is never deleted once created, [`RelationState::Delete`]
/// stands for "no active relation".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum RelationState {
  Delete = 0,
  Follow = 1,
  Blacklist = 2,
}

/// Directed (actor, target) pair identifying one relation row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelationPair {
  pub actor: UserId,
  pub target: UserId,
}

impl RelationPair {
  #[must_use]
  pub const fn new(actor: UserId, target: UserId) -> Self {
    Self { actor, target }
  }

  #[must_use]
  pub fn is_self_relation(&self) -> bool {
    self.actor == self.target
  }
}

/// Predicate on the current state of a relation row used by
/// conditional updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateFilter {
  Is(RelationState),
  IsNot(RelationState),
}

impl StateFilter {
  #[must_use]
  pub fn matches(self, state: RelationState) -> bool {
    match self {
      Self::Is(expected) => state == expected,
      Self::IsNot(excluded) => state != excluded,
    }
  }
}

/// Adjustment applied to the cached following/fans counters after a
/// confirmed transition into or out of [`RelationState::Follow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterDelta {
  Increment,
  Decrement,
}

impl CounterDelta {
  #[must_use]
  pub const fn value(self) -> i64 {
    match self {
      Self::Increment => 1,
      Self::Decrement => -1,
    }
  }
}
