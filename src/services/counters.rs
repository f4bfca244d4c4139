use std::sync::Arc;

use crate::cache::{CounterCache, CounterKey};
use crate::types::{CounterDelta, UserId};

/// Propagates confirmed relation transitions into the cached
/// following and fans counters.
#[derive(Clone)]
pub struct CounterSyncEngine {
  counters: Arc<dyn CounterCache>,
}

impl CounterSyncEngine {
  #[must_use]
  pub fn new(counters: Arc<dyn CounterCache>) -> Self {
    Self { counters }
  }

  /// Adjusts `actor`'s following count and `target`'s fans count.
  ///
  /// Must only be called after the relation store committed the
  /// transition. Cache failures are logged and swallowed, the two
  /// counters may drift apart.
  #[tracing::instrument(skip(self), name = "services.counters.apply")]
  pub async fn apply(&self, actor: UserId, target: UserId, delta: CounterDelta) {
    let delta = delta.value();
    let (following, fans) = futures::join!(
      self.counters.incr(CounterKey::Following(actor), delta),
      self.counters.incr(CounterKey::Fans(target), delta),
    );

    if let Err(error) = following {
      tracing::warn!(?error, %actor, "failed to update following count");
    }
    if let Err(error) = fans {
      tracing::warn!(?error, %target, "failed to update fans count");
    }
  }
}

impl std::fmt::Debug for CounterSyncEngine {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CounterSyncEngine").finish_non_exhaustive()
  }
}
