use error_stack::{Result, ResultExt};
use std::sync::Arc;
use thiserror::Error;

use crate::cache::{ArticleCache, CounterCache, MemoryCache, UserCache};
use crate::recommend::{HttpRecommender, Recommender};
use crate::services::{
  CounterSyncEngine, FeedAssembler, FeedSources, FollowingList, RelationStateMachine, UserArticles,
};
use crate::store::{AttitudeStore, PgStore, RelationStore};
use crate::trace_log::{self, TraceLog};
use crate::{config, database};

/// External collaborators every service is built from.
#[derive(Clone)]
pub struct Backends {
  pub relations: Arc<dyn RelationStore>,
  pub attitudes: Arc<dyn AttitudeStore>,
  pub counters: Arc<dyn CounterCache>,
  pub articles: Arc<dyn ArticleCache>,
  pub users: Arc<dyn UserCache>,
  pub recommender: Arc<dyn Recommender>,
  pub trace_log: Arc<dyn TraceLog>,
}

#[derive(Clone)]
pub struct App {
  pub config: Arc<config::Server>,
  backends: Backends,
}

#[derive(Debug, Error)]
#[error("Failed to initialize App struct")]
pub struct AppError;

impl App {
  #[tracing::instrument(skip_all)]
  pub async fn new(cfg: config::Server) -> Result<Self, AppError> {
    let primary_db = database::Pool::new(&cfg.db, &cfg.db.primary)
      .await
      .change_context(AppError)?;

    let replica_db = if let Some(replica) = cfg.db.replica.as_ref() {
      Some(
        database::Pool::new(&cfg.db, replica)
          .await
          .change_context(AppError)?,
      )
    } else {
      None
    };

    let store = Arc::new(PgStore::new(primary_db, replica_db));
    let cache = Arc::new(MemoryCache::new(&cfg.cache));
    let recommender = HttpRecommender::new(&cfg.recommender).change_context(AppError)?;
    let trace_log = trace_log::from_config(&cfg.trace_log)
      .await
      .change_context(AppError)?;

    let backends = Backends {
      relations: store.clone(),
      attitudes: store,
      counters: cache.clone(),
      articles: cache.clone(),
      users: cache,
      recommender: Arc::new(recommender),
      trace_log,
    };

    Ok(Self::with_backends(cfg, backends))
  }

  #[must_use]
  pub fn with_backends(cfg: config::Server, backends: Backends) -> Self {
    Self {
      config: Arc::new(cfg),
      backends,
    }
  }
}

impl App {
  #[must_use]
  pub fn counters(&self) -> CounterSyncEngine {
    CounterSyncEngine::new(self.backends.counters.clone())
  }

  #[must_use]
  pub fn relations(&self) -> RelationStateMachine {
    RelationStateMachine::new(self.backends.relations.clone(), self.counters())
  }

  #[must_use]
  pub fn feed(&self) -> FeedAssembler {
    let sources = FeedSources {
      articles: self.backends.articles.clone(),
      counters: self.backends.counters.clone(),
      users: self.backends.users.clone(),
      relations: self.backends.relations.clone(),
      attitudes: self.backends.attitudes.clone(),
      recommender: self.backends.recommender.clone(),
      trace_log: self.backends.trace_log.clone(),
    };
    FeedAssembler::new(
      sources,
      self.config.feed.clone(),
      self.config.recommender.on_failure,
    )
  }

  #[must_use]
  pub fn followings(&self) -> FollowingList {
    FollowingList::new(
      self.backends.relations.clone(),
      self.backends.users.clone(),
      self.backends.counters.clone(),
      self.config.feed.clone(),
    )
  }

  #[must_use]
  pub fn articles(&self) -> UserArticles {
    UserArticles::new(
      self.backends.articles.clone(),
      self.backends.users.clone(),
      self.config.feed.clone(),
    )
  }
}

impl std::fmt::Debug for App {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("App")
      .field("config", &self.config)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::CounterKey;
  use crate::context::RequestContext;
  use crate::store::MemoryStore;
  use crate::test_utils::{self, RecordingTraceLog, StubRecommender};
  use crate::types::{ArticleId, ChannelId, RelationPair, RelationState, UserId};
  use figment::{providers::Serialized, Figment};
  use serde_json::json;

  fn config() -> config::Server {
    let figment = Figment::new().merge(Serialized::defaults(json!({
      "db": { "primary": { "url": "postgres://localhost/headline" } },
      "recommender": { "url": "http://reco.local", "on_failure": "degrade" },
      "feed": { "articles_per_page": { "min": 2, "max": 4 } },
    })));
    config::Server::from_figment(&figment).unwrap()
  }

  struct Harness {
    app: App,
    store: Arc<MemoryStore>,
    cache: Arc<MemoryCache>,
    recommender: Arc<StubRecommender>,
  }

  fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let cache = test_utils::memory_cache();
    let recommender = Arc::new(StubRecommender::default());
    let backends = Backends {
      relations: store.clone(),
      attitudes: store.clone(),
      counters: cache.clone(),
      articles: cache.clone(),
      users: cache.clone(),
      recommender: recommender.clone(),
      trace_log: Arc::new(RecordingTraceLog::default()),
    };
    Harness {
      app: App::with_backends(config(), backends),
      store,
      cache,
      recommender,
    }
  }

  #[tokio::test]
  async fn should_share_backends_between_services() {
    let h = harness();
    let (alice, bob) = (UserId::new(1), UserId::new(2));
    let ctx = RequestContext::user(alice);
    h.cache.put_user(test_utils::user(2)).await;
    h.cache.put_article(test_utils::article(10, bob)).await;

    h.app.relations().follow(&ctx, bob).await.unwrap();
    assert_eq!(
      Some(RelationState::Follow),
      h.store.state(RelationPair::new(alice, bob)).await.unwrap()
    );

    let followings = h.app.followings().list(&ctx, None, None).await.unwrap();
    assert_eq!(1, followings.results.len());
    assert_eq!(1, followings.results[0].fans_count);

    let detail = h
      .app
      .feed()
      .article_detail(&ctx, ArticleId::new(10), None)
      .await
      .unwrap();
    assert!(detail.is_followed);
    assert_eq!(
      1,
      h.cache
        .get(CounterKey::ArticleReads(ArticleId::new(10)))
        .await
        .unwrap()
    );
  }

  #[tokio::test]
  async fn should_apply_configured_feed_settings() {
    let h = harness();
    h.recommender.fail();

    // degrade is configured
    let page = h
      .app
      .feed()
      .list_page(&RequestContext::anonymous(), ChannelId::new(1), None, None)
      .await
      .unwrap();
    assert_eq!(2, page.per_page);
    assert!(page.results.is_empty());

    let error = h
      .app
      .articles()
      .by_user(UserId::new(1), None, Some(3))
      .await
      .unwrap_err();
    assert_eq!(&crate::types::Error::NotFound, error.as_type());
  }
}
