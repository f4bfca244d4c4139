use async_trait::async_trait;
use error_stack::{Report, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::cache::{ArticleCache, ArticleIdPage, CacheError, CounterCache, CounterKey, MemoryCache, UserCache};
use crate::config;
use crate::recommend::{FeedRecommendation, FeedRequest, RecommendError, Recommendation, Recommender};
use crate::store::{AttitudeStore, Followings, RelationStore, StoreError};
use crate::trace_log::TraceLog;
use crate::types::article::{ArticleCover, ArticleSummary, Attitude, CoverType};
use crate::types::user::UserProfile;
use crate::types::{ArticleId, ChannelId, RelationPair, RelationState, StateFilter, UserId};

pub fn memory_cache() -> Arc<MemoryCache> {
  Arc::new(MemoryCache::new(&config::Cache::default()))
}

pub fn article(id: u64, author: UserId) -> ArticleSummary {
  ArticleSummary {
    art_id: ArticleId::new(id),
    title: format!("article #{id}"),
    aut_id: author,
    aut_name: format!("user #{author}"),
    comm_count: 0,
    cover: ArticleCover {
      kind: CoverType::Single,
      images: vec![format!("http://img.local/{id}.png")],
    },
  }
}

pub fn user(id: u64) -> UserProfile {
  UserProfile {
    id: UserId::new(id),
    name: format!("user #{id}"),
    photo: None,
  }
}

/// Scriptable recommender which records every request it gets.
#[derive(Debug, Default)]
pub struct StubRecommender {
  feed: Mutex<Option<FeedRecommendation>>,
  similar: Mutex<Vec<ArticleId>>,
  failing: Mutex<bool>,
  feed_requests: Mutex<Vec<FeedRequest>>,
  similar_requests: Mutex<Vec<(ArticleId, u32)>>,
}

impl StubRecommender {
  pub fn set_feed(&self, exposure: &str, items: Vec<Recommendation>) {
    *self.feed.lock().unwrap() = Some(FeedRecommendation {
      exposure: exposure.to_string(),
      items,
    });
  }

  pub fn set_similar(&self, ids: Vec<ArticleId>) {
    *self.similar.lock().unwrap() = ids;
  }

  pub fn fail(&self) {
    *self.failing.lock().unwrap() = true;
  }

  pub fn feed_requests(&self) -> Vec<FeedRequest> {
    self.feed_requests.lock().unwrap().clone()
  }

  pub fn similar_requests(&self) -> Vec<(ArticleId, u32)> {
    self.similar_requests.lock().unwrap().clone()
  }
}

#[async_trait]
impl Recommender for StubRecommender {
  async fn user_recommend(
    &self,
    request: FeedRequest,
  ) -> Result<FeedRecommendation, RecommendError> {
    self.feed_requests.lock().unwrap().push(request);
    if *self.failing.lock().unwrap() {
      return Err(Report::new(RecommendError::Unavailable));
    }
    Ok(self.feed.lock().unwrap().clone().unwrap_or(FeedRecommendation {
      exposure: String::new(),
      items: Vec::new(),
    }))
  }

  async fn similar_articles(
    &self,
    article: ArticleId,
    count: u32,
  ) -> Result<Vec<ArticleId>, RecommendError> {
    self.similar_requests.lock().unwrap().push((article, count));
    if *self.failing.lock().unwrap() {
      return Err(Report::new(RecommendError::Timeout));
    }
    Ok(self.similar.lock().unwrap().clone())
  }
}

#[derive(Debug, Default)]
pub struct RecordingTraceLog {
  tokens: Mutex<Vec<String>>,
}

impl RecordingTraceLog {
  pub fn tokens(&self) -> Vec<String> {
    self.tokens.lock().unwrap().clone()
  }
}

impl TraceLog for RecordingTraceLog {
  fn write(&self, token: &str) {
    self.tokens.lock().unwrap().push(token.to_string());
  }
}

/// Cache tier that is always down.
#[derive(Debug, Clone, Copy)]
pub struct FailingCache;

#[async_trait]
impl CounterCache for FailingCache {
  async fn incr(&self, _key: CounterKey, _delta: i64) -> Result<i64, CacheError> {
    Err(Report::new(CacheError))
  }

  async fn get(&self, _key: CounterKey) -> Result<i64, CacheError> {
    Err(Report::new(CacheError))
  }

  async fn get_multi(&self, _keys: &[CounterKey]) -> Result<HashMap<CounterKey, i64>, CacheError> {
    Err(Report::new(CacheError))
  }
}

#[async_trait]
impl ArticleCache for FailingCache {
  async fn article_exists(&self, _article: ArticleId) -> Result<bool, CacheError> {
    Err(Report::new(CacheError))
  }

  async fn summary(&self, _article: ArticleId) -> Result<Option<ArticleSummary>, CacheError> {
    Err(Report::new(CacheError))
  }

  async fn channel_top_articles(&self, _channel: ChannelId) -> Result<Vec<ArticleId>, CacheError> {
    Err(Report::new(CacheError))
  }
}

#[async_trait]
impl UserCache for FailingCache {
  async fn user_exists(&self, _user: UserId) -> Result<bool, CacheError> {
    Err(Report::new(CacheError))
  }

  async fn profile(&self, _user: UserId) -> Result<Option<UserProfile>, CacheError> {
    Err(Report::new(CacheError))
  }

  async fn articles_page(
    &self,
    _user: UserId,
    _offset: u64,
    _limit: u32,
  ) -> Result<ArticleIdPage, CacheError> {
    Err(Report::new(CacheError))
  }

  async fn push_read_history(&self, _user: UserId, _article: ArticleId) -> Result<(), CacheError> {
    Err(Report::new(CacheError))
  }
}

/// Relation store stuck in read-only mode.
#[derive(Debug, Clone, Copy)]
pub struct ReadonlyStore;

#[async_trait]
impl RelationStore for ReadonlyStore {
  async fn insert_if_absent(
    &self,
    _pair: RelationPair,
    _state: RelationState,
  ) -> Result<bool, StoreError> {
    Err(Report::new(StoreError::Readonly))
  }

  async fn update_where(
    &self,
    _pair: RelationPair,
    _filter: StateFilter,
    _state: RelationState,
  ) -> Result<u64, StoreError> {
    Err(Report::new(StoreError::Readonly))
  }

  async fn state(&self, _pair: RelationPair) -> Result<Option<RelationState>, StoreError> {
    Ok(None)
  }

  async fn followings(
    &self,
    _actor: UserId,
    _offset: u64,
    _limit: u32,
  ) -> Result<Followings, StoreError> {
    Ok(Followings::default())
  }
}

#[async_trait]
impl AttitudeStore for ReadonlyStore {
  async fn attitude(
    &self,
    _user: UserId,
    _article: ArticleId,
  ) -> Result<Option<Attitude>, StoreError> {
    Ok(None)
  }
}
