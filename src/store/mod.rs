//! Durable relation and attitude records.
//!
//! Both stores are external collaborators from the services' point
//! of view. [`PgStore`] is the production implementation and
//! [`MemoryStore`] keeps everything in process.
use async_trait::async_trait;
use error_stack::Result;
use thiserror::Error;

use crate::types::article::Attitude;
use crate::types::{ArticleId, RelationPair, RelationState, StateFilter, UserId};

mod memory;
mod postgres;

pub use self::memory::MemoryStore;
pub use self::postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("relation store is in read-only mode")]
  Readonly,
  #[error("relation store operation failed")]
  Failed,
}

/// One page of an actor's followed users, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Followings {
  pub total: u64,
  pub targets: Vec<UserId>,
}

#[async_trait]
pub trait RelationStore: Send + Sync {
  /// Creates the row of `pair` holding `state` unless the pair
  /// already has one. Returns whether a row was created.
  async fn insert_if_absent(
    &self,
    pair: RelationPair,
    state: RelationState,
  ) -> Result<bool, StoreError>;

  /// Sets the state of the row of `pair` to `state` only if its
  /// current state matches `filter`, as one atomic write. Returns
  /// the number of rows changed.
  async fn update_where(
    &self,
    pair: RelationPair,
    filter: StateFilter,
    state: RelationState,
  ) -> Result<u64, StoreError>;

  async fn state(&self, pair: RelationPair) -> Result<Option<RelationState>, StoreError>;

  async fn followings(
    &self,
    actor: UserId,
    offset: u64,
    limit: u32,
  ) -> Result<Followings, StoreError>;
}

#[async_trait]
pub trait AttitudeStore: Send + Sync {
  async fn attitude(
    &self,
    user: UserId,
    article: ArticleId,
  ) -> Result<Option<Attitude>, StoreError>;
}
