use std::sync::Arc;
use thiserror::Error;

use super::CounterSyncEngine;
use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::store::RelationStore;
use crate::types::{self, CounterDelta, RelationPair, RelationState, StateFilter, UserId};

#[derive(Debug, Error)]
#[error("user cannot {0} themselves")]
struct SelfRelation(&'static str);

/// Moves the relation of a (caller, target) pair between
/// [`RelationState`]s.
///
/// Every transition is an insert-if-absent followed by conditional
/// updates. A lost race shows up as zero changed rows, so no locks or
/// retries are needed and counters only move for the request whose
/// write actually changed the row.
#[derive(Clone)]
pub struct RelationStateMachine {
  store: Arc<dyn RelationStore>,
  counters: CounterSyncEngine,
}

impl RelationStateMachine {
  #[must_use]
  pub fn new(store: Arc<dyn RelationStore>, counters: CounterSyncEngine) -> Self {
    Self { store, counters }
  }

  #[tracing::instrument(skip(self), name = "services.relations.follow")]
  pub async fn follow(&self, ctx: &RequestContext, target: UserId) -> Result<UserId> {
    let pair = Self::pair(ctx, target, "follow")?;

    let changed = if self
      .store
      .insert_if_absent(pair, RelationState::Follow)
      .await?
    {
      true
    } else {
      let rows = self
        .store
        .update_where(
          pair,
          StateFilter::IsNot(RelationState::Follow),
          RelationState::Follow,
        )
        .await?;
      rows > 0
    };

    if changed {
      self
        .counters
        .apply(pair.actor, pair.target, CounterDelta::Increment)
        .await;
    }
    Ok(target)
  }

  #[tracing::instrument(skip(self), name = "services.relations.unfollow")]
  pub async fn unfollow(&self, ctx: &RequestContext, target: UserId) -> Result<()> {
    let pair = RelationPair::new(ctx.require_user()?, target);
    let rows = self
      .store
      .update_where(
        pair,
        StateFilter::Is(RelationState::Follow),
        RelationState::Delete,
      )
      .await?;

    if rows > 0 {
      self
        .counters
        .apply(pair.actor, pair.target, CounterDelta::Decrement)
        .await;
    }
    Ok(())
  }

  #[tracing::instrument(skip(self), name = "services.relations.blacklist")]
  pub async fn blacklist(&self, ctx: &RequestContext, target: UserId) -> Result<UserId> {
    let pair = Self::pair(ctx, target, "blacklist")?;
    if self
      .store
      .insert_if_absent(pair, RelationState::Blacklist)
      .await?
    {
      return Ok(target);
    }

    let rows = self
      .store
      .update_where(
        pair,
        StateFilter::Is(RelationState::Delete),
        RelationState::Blacklist,
      )
      .await?;
    if rows > 0 {
      return Ok(target);
    }

    let rows = self
      .store
      .update_where(
        pair,
        StateFilter::Is(RelationState::Follow),
        RelationState::Blacklist,
      )
      .await?;
    if rows > 0 {
      self
        .counters
        .apply(pair.actor, pair.target, CounterDelta::Decrement)
        .await;
    }
    Ok(target)
  }

  #[tracing::instrument(skip(self), name = "services.relations.unblacklist")]
  pub async fn unblacklist(&self, ctx: &RequestContext, target: UserId) -> Result<()> {
    let pair = RelationPair::new(ctx.require_user()?, target);
    self
      .store
      .update_where(
        pair,
        StateFilter::Is(RelationState::Blacklist),
        RelationState::Delete,
      )
      .await?;
    Ok(())
  }

  fn pair(ctx: &RequestContext, target: UserId, action: &'static str) -> Result<RelationPair> {
    let pair = RelationPair::new(ctx.require_user()?, target);
    if pair.is_self_relation() {
      return Err(Error::from_context(
        types::Error::InvalidRequest,
        SelfRelation(action),
      ));
    }
    Ok(pair)
  }
}

impl std::fmt::Debug for RelationStateMachine {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RelationStateMachine")
      .finish_non_exhaustive()
  }
}
