use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::{CounterCache, CounterKey, UserCache};
use crate::config;
use crate::context::RequestContext;
use crate::error::Result;
use crate::store::RelationStore;
use crate::types::user::{FollowingPage, FollowingUser};
use crate::types::{Paging, UserId};

/// Lists the users the caller follows.
#[derive(Clone)]
pub struct FollowingList {
  relations: Arc<dyn RelationStore>,
  users: Arc<dyn UserCache>,
  counters: Arc<dyn CounterCache>,
  feed: config::Feed,
}

impl FollowingList {
  #[must_use]
  pub fn new(
    relations: Arc<dyn RelationStore>,
    users: Arc<dyn UserCache>,
    counters: Arc<dyn CounterCache>,
    feed: config::Feed,
  ) -> Self {
    Self {
      relations,
      users,
      counters,
      feed,
    }
  }

  /// Followed users of the caller, most recently followed first.
  /// Users without a cached profile are left out of the page.
  #[tracing::instrument(skip(self), name = "services.followings.list")]
  pub async fn list(
    &self,
    ctx: &RequestContext,
    page: Option<u32>,
    per_page: Option<u32>,
  ) -> Result<FollowingPage> {
    let user = ctx.require_user()?;
    let paging = Paging::resolve(page, per_page, self.feed.followings_per_page)?;

    let followings = self
      .relations
      .followings(user, paging.offset(), paging.per_page)
      .await?;

    let (profiles, fans) = futures::join!(
      join_all(followings.targets.iter().map(|id| self.users.profile(*id))),
      self.fans_counts(&followings.targets),
    );

    let results = followings
      .targets
      .iter()
      .zip(profiles)
      .filter_map(|(id, profile)| match profile {
        Ok(Some(profile)) => Some(FollowingUser {
          id: profile.id,
          name: profile.name,
          photo: profile.photo,
          fans_count: fans.get(id).copied().unwrap_or_default(),
        }),
        Ok(None) => None,
        Err(error) => {
          tracing::warn!(?error, %id, "could not load user profile");
          None
        }
      })
      .collect();

    Ok(FollowingPage {
      total_count: followings.total,
      page: paging.page,
      per_page: paging.per_page,
      results,
    })
  }

  async fn fans_counts(&self, users: &[UserId]) -> HashMap<UserId, i64> {
    let keys = users.iter().map(|id| CounterKey::Fans(*id)).collect::<Vec<_>>();
    match self.counters.get_multi(&keys).await {
      Ok(values) => values
        .into_iter()
        .filter_map(|(key, value)| match key {
          CounterKey::Fans(id) => Some((id, value)),
          _ => None,
        })
        .collect(),
      Err(error) => {
        tracing::warn!(?error, "could not load fans counts");
        HashMap::new()
      }
    }
  }
}

impl std::fmt::Debug for FollowingList {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("FollowingList").finish_non_exhaustive()
  }
}
