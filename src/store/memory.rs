use async_trait::async_trait;
use error_stack::{Report, Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{AttitudeStore, Followings, RelationStore, StoreError};
use crate::types::article::Attitude;
use crate::types::{ArticleId, RelationPair, RelationState, StateFilter, UserId};

#[derive(Debug, Clone, Copy)]
struct Row {
  state: RelationState,
  // bumped on every write, orders the following list
  seq: u64,
}

#[derive(Debug, Default)]
struct Relations {
  rows: HashMap<RelationPair, Row>,
  next_seq: u64,
}

impl Relations {
  fn bump(&mut self) -> u64 {
    self.next_seq += 1;
    self.next_seq
  }
}

/// In-process relation and attitude store.
///
/// Every operation takes the lock once and releases it before
/// returning, which makes insert and conditional update atomic the
/// same way a single SQL statement is.
#[derive(Debug, Default)]
pub struct MemoryStore {
  relations: Mutex<Relations>,
  attitudes: Mutex<HashMap<(UserId, ArticleId), Attitude>>,
}

impl MemoryStore {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  fn relations(&self) -> Result<MutexGuard<'_, Relations>, StoreError> {
    self
      .relations
      .lock()
      .map_err(|_| Report::new(StoreError::Failed).attach_printable("relation lock is poisoned"))
  }

  fn attitudes(
    &self,
  ) -> Result<MutexGuard<'_, HashMap<(UserId, ArticleId), Attitude>>, StoreError> {
    self
      .attitudes
      .lock()
      .map_err(|_| Report::new(StoreError::Failed).attach_printable("attitude lock is poisoned"))
  }

  /// Records `user`'s attitude toward `article`.
  pub fn set_attitude(
    &self,
    user: UserId,
    article: ArticleId,
    attitude: Attitude,
  ) -> Result<(), StoreError> {
    self.attitudes()?.insert((user, article), attitude);
    Ok(())
  }
}

#[async_trait]
impl RelationStore for MemoryStore {
  #[tracing::instrument(skip(self), name = "memory.relations.insert_if_absent")]
  async fn insert_if_absent(
    &self,
    pair: RelationPair,
    state: RelationState,
  ) -> Result<bool, StoreError> {
    let mut relations = self.relations()?;
    if relations.rows.contains_key(&pair) {
      return Ok(false);
    }
    let seq = relations.bump();
    relations.rows.insert(pair, Row { state, seq });
    Ok(true)
  }

  #[tracing::instrument(skip(self), name = "memory.relations.update_where")]
  async fn update_where(
    &self,
    pair: RelationPair,
    filter: StateFilter,
    state: RelationState,
  ) -> Result<u64, StoreError> {
    let mut guard = self.relations()?;
    let relations = &mut *guard;
    let seq = relations.next_seq + 1;
    match relations.rows.get_mut(&pair) {
      Some(row) if filter.matches(row.state) => {
        row.state = state;
        row.seq = seq;
        relations.next_seq = seq;
        Ok(1)
      }
      _ => Ok(0),
    }
  }

  #[tracing::instrument(skip(self), name = "memory.relations.state")]
  async fn state(&self, pair: RelationPair) -> Result<Option<RelationState>, StoreError> {
    Ok(self.relations()?.rows.get(&pair).map(|row| row.state))
  }

  #[tracing::instrument(skip(self), name = "memory.relations.followings")]
  async fn followings(
    &self,
    actor: UserId,
    offset: u64,
    limit: u32,
  ) -> Result<Followings, StoreError> {
    let relations = self.relations()?;
    let mut followed = relations
      .rows
      .iter()
      .filter(|(pair, row)| pair.actor == actor && row.state == RelationState::Follow)
      .map(|(pair, row)| (row.seq, pair.target))
      .collect::<Vec<_>>();
    drop(relations);

    followed.sort_unstable_by(|a, b| b.cmp(a));

    let total = followed.len() as u64;
    let targets = followed
      .into_iter()
      .skip(usize::try_from(offset).unwrap_or(usize::MAX))
      .take(limit as usize)
      .map(|(_, target)| target)
      .collect();

    Ok(Followings { total, targets })
  }
}

#[async_trait]
impl AttitudeStore for MemoryStore {
  #[tracing::instrument(skip(self), name = "memory.attitudes.find")]
  async fn attitude(
    &self,
    user: UserId,
    article: ArticleId,
  ) -> Result<Option<Attitude>, StoreError> {
    Ok(self.attitudes()?.get(&(user, article)).copied())
  }
}
