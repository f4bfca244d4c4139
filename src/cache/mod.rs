//! Cache tier holding counters and cached entity summaries.
//!
//! Everything in here is derived data and eventually consistent with
//! the relation store, so callers treat a [`CacheError`] as "value is
//! absent" instead of failing the request.
use async_trait::async_trait;
use error_stack::Result;
use std::collections::HashMap;
use std::fmt::Display;
use thiserror::Error;

use crate::types::article::ArticleSummary;
use crate::types::user::UserProfile;
use crate::types::{ArticleId, ChannelId, UserId};

mod memory;
pub use self::memory::MemoryCache;

#[derive(Debug, Error)]
#[error("cache is unavailable")]
pub struct CacheError;

/// Key of a cached counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterKey {
  /// How many users this user follows.
  Following(UserId),
  /// How many users follow this user.
  Fans(UserId),
  ArticleReads(ArticleId),
  /// Reads across all articles written by this user.
  AuthorReads(UserId),
}

impl Display for CounterKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Following(id) => write!(f, "user:{id}:following"),
      Self::Fans(id) => write!(f, "user:{id}:fans"),
      Self::ArticleReads(id) => write!(f, "article:{id}:read"),
      Self::AuthorReads(id) => write!(f, "user:{id}:read"),
    }
  }
}

/// One cached page of a user's published articles, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleIdPage {
  pub total: u64,
  pub ids: Vec<ArticleId>,
}

#[async_trait]
pub trait CounterCache: Send + Sync {
  /// Atomically adds `delta` to the counter and returns the new value.
  async fn incr(&self, key: CounterKey, delta: i64) -> Result<i64, CacheError>;

  /// Missing counters read as zero.
  async fn get(&self, key: CounterKey) -> Result<i64, CacheError>;

  async fn get_multi(&self, keys: &[CounterKey]) -> Result<HashMap<CounterKey, i64>, CacheError>;
}

#[async_trait]
pub trait ArticleCache: Send + Sync {
  async fn article_exists(&self, article: ArticleId) -> Result<bool, CacheError>;

  /// Cached summary of an article, which may be absent even if the
  /// article exists.
  async fn summary(&self, article: ArticleId) -> Result<Option<ArticleSummary>, CacheError>;

  /// Pinned "top" articles of a channel in display order.
  async fn channel_top_articles(&self, channel: ChannelId) -> Result<Vec<ArticleId>, CacheError>;
}

#[async_trait]
pub trait UserCache: Send + Sync {
  async fn user_exists(&self, user: UserId) -> Result<bool, CacheError>;

  async fn profile(&self, user: UserId) -> Result<Option<UserProfile>, CacheError>;

  async fn articles_page(
    &self,
    user: UserId,
    offset: u64,
    limit: u32,
  ) -> Result<ArticleIdPage, CacheError>;

  async fn push_read_history(&self, user: UserId, article: ArticleId) -> Result<(), CacheError>;
}
