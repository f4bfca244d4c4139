use async_trait::async_trait;
use error_stack::{Report, Result};
use moka::future::Cache;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use super::{ArticleCache, ArticleIdPage, CacheError, CounterCache, CounterKey, UserCache};
use crate::config;
use crate::types::article::ArticleSummary;
use crate::types::user::UserProfile;
use crate::types::{ArticleId, ChannelId, UserId};

type ReadHistory = Arc<Mutex<VecDeque<ArticleId>>>;

/// In-process cache tier built on [`moka`].
///
/// Counters are shared atomics so concurrent increments of the same
/// key never get lost. Their cache is unbounded: it holds the only
/// copy and must never evict or refuse an entry. Summaries and
/// profiles expire after the configured time to live.
#[derive(Clone)]
pub struct MemoryCache {
  counters: Cache<CounterKey, Arc<AtomicI64>>,
  articles: Cache<ArticleId, ArticleSummary>,
  top_articles: Cache<ChannelId, Arc<Vec<ArticleId>>>,
  users: Cache<UserId, UserProfile>,
  user_articles: Cache<UserId, Arc<Vec<ArticleId>>>,
  read_history: Cache<UserId, ReadHistory>,
}

impl MemoryCache {
  /// Most recent reads kept per user.
  pub const READ_HISTORY_LIMIT: usize = 100;

  #[must_use]
  pub fn new(cfg: &config::Cache) -> Self {
    let ttl = cfg.time_to_live();
    Self {
      counters: Cache::builder().build(),
      articles: Cache::builder()
        .max_capacity(cfg.max_capacity)
        .time_to_live(ttl)
        .build(),
      top_articles: Cache::builder().time_to_live(ttl).build(),
      users: Cache::builder()
        .max_capacity(cfg.max_capacity)
        .time_to_live(ttl)
        .build(),
      user_articles: Cache::builder()
        .max_capacity(cfg.max_capacity)
        .time_to_live(ttl)
        .build(),
      read_history: Cache::builder().max_capacity(cfg.max_capacity).build(),
    }
  }

  async fn counter(&self, key: CounterKey) -> Arc<AtomicI64> {
    self
      .counters
      .get_with(key, async { Arc::new(AtomicI64::new(0)) })
      .await
  }
}

impl MemoryCache {
  pub async fn set_counter(&self, key: CounterKey, value: i64) {
    self.counter(key).await.store(value, Ordering::SeqCst);
  }

  pub async fn put_article(&self, summary: ArticleSummary) {
    self.articles.insert(summary.art_id, summary).await;
  }

  pub async fn set_top_articles(&self, channel: ChannelId, ids: Vec<ArticleId>) {
    self.top_articles.insert(channel, Arc::new(ids)).await;
  }

  pub async fn put_user(&self, profile: UserProfile) {
    self.users.insert(profile.id, profile).await;
  }

  /// Replaces the published articles of `user`, newest first.
  pub async fn set_user_articles(&self, user: UserId, ids: Vec<ArticleId>) {
    self.user_articles.insert(user, Arc::new(ids)).await;
  }

  /// Most recently read articles of `user`, newest first.
  pub async fn read_history(&self, user: UserId) -> Result<Vec<ArticleId>, CacheError> {
    let Some(history) = self.read_history.get(&user).await else {
      return Ok(Vec::new());
    };
    let history = history.lock().map_err(|_| poisoned())?;
    Ok(history.iter().copied().collect())
  }
}

impl std::fmt::Debug for MemoryCache {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("MemoryCache")
      .field("counters", &self.counters.entry_count())
      .field("articles", &self.articles.entry_count())
      .field("users", &self.users.entry_count())
      .finish_non_exhaustive()
  }
}

fn poisoned() -> Report<CacheError> {
  Report::new(CacheError).attach_printable("read history lock is poisoned")
}

#[async_trait]
impl CounterCache for MemoryCache {
  #[tracing::instrument(skip(self), name = "cache.counters.incr")]
  async fn incr(&self, key: CounterKey, delta: i64) -> Result<i64, CacheError> {
    let counter = self.counter(key).await;
    Ok(counter.fetch_add(delta, Ordering::SeqCst) + delta)
  }

  #[tracing::instrument(skip(self), name = "cache.counters.get")]
  async fn get(&self, key: CounterKey) -> Result<i64, CacheError> {
    Ok(
      self
        .counters
        .get(&key)
        .await
        .map(|counter| counter.load(Ordering::SeqCst))
        .unwrap_or_default(),
    )
  }

  #[tracing::instrument(skip(self), name = "cache.counters.get_multi")]
  async fn get_multi(&self, keys: &[CounterKey]) -> Result<HashMap<CounterKey, i64>, CacheError> {
    let mut values = HashMap::with_capacity(keys.len());
    for key in keys {
      values.insert(*key, self.get(*key).await?);
    }
    Ok(values)
  }
}

#[async_trait]
impl ArticleCache for MemoryCache {
  #[tracing::instrument(skip(self), name = "cache.articles.exists")]
  async fn article_exists(&self, article: ArticleId) -> Result<bool, CacheError> {
    Ok(self.articles.contains_key(&article))
  }

  #[tracing::instrument(skip(self), name = "cache.articles.summary")]
  async fn summary(&self, article: ArticleId) -> Result<Option<ArticleSummary>, CacheError> {
    Ok(self.articles.get(&article).await)
  }

  #[tracing::instrument(skip(self), name = "cache.articles.top")]
  async fn channel_top_articles(&self, channel: ChannelId) -> Result<Vec<ArticleId>, CacheError> {
    Ok(
      self
        .top_articles
        .get(&channel)
        .await
        .map(|ids| ids.as_ref().clone())
        .unwrap_or_default(),
    )
  }
}

#[async_trait]
impl UserCache for MemoryCache {
  #[tracing::instrument(skip(self), name = "cache.users.exists")]
  async fn user_exists(&self, user: UserId) -> Result<bool, CacheError> {
    Ok(self.users.contains_key(&user))
  }

  #[tracing::instrument(skip(self), name = "cache.users.profile")]
  async fn profile(&self, user: UserId) -> Result<Option<UserProfile>, CacheError> {
    Ok(self.users.get(&user).await)
  }

  #[tracing::instrument(skip(self), name = "cache.users.articles")]
  async fn articles_page(
    &self,
    user: UserId,
    offset: u64,
    limit: u32,
  ) -> Result<ArticleIdPage, CacheError> {
    let Some(ids) = self.user_articles.get(&user).await else {
      return Ok(ArticleIdPage::default());
    };
    let offset = usize::try_from(offset).unwrap_or(usize::MAX);
    Ok(ArticleIdPage {
      total: ids.len() as u64,
      ids: ids.iter().skip(offset).take(limit as usize).copied().collect(),
    })
  }

  #[tracing::instrument(skip(self), name = "cache.users.push_read_history")]
  async fn push_read_history(&self, user: UserId, article: ArticleId) -> Result<(), CacheError> {
    let history = self
      .read_history
      .get_with(user, async { ReadHistory::default() })
      .await;

    let mut history = history.lock().map_err(|_| poisoned())?;
    history.retain(|id| *id != article);
    history.push_front(article);
    history.truncate(Self::READ_HISTORY_LIMIT);
    Ok(())
  }
}
