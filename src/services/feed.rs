use futures::future::join_all;
use std::sync::Arc;
use thiserror::Error;

use crate::cache::{ArticleCache, CounterCache, CounterKey, UserCache};
use crate::config::{self, FailurePolicy};
use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::recommend::{FeedRequest, RecommendError, Recommender};
use crate::store::{AttitudeStore, RelationStore};
use crate::trace_log::TraceLog;
use crate::types::article::{ArticleDetail, ArticleSummary, FeedItem, FeedPage, SimilarArticle};
use crate::types::{self, ArticleId, ChannelId, Paging, RelationPair, RelationState, UserId};

#[derive(Debug, Error)]
#[error("article does not exist")]
struct ArticleNotFound;

/// Collaborators of the [`FeedAssembler`].
#[derive(Clone)]
pub struct FeedSources {
  pub articles: Arc<dyn ArticleCache>,
  pub counters: Arc<dyn CounterCache>,
  pub users: Arc<dyn UserCache>,
  pub relations: Arc<dyn RelationStore>,
  pub attitudes: Arc<dyn AttitudeStore>,
  pub recommender: Arc<dyn Recommender>,
  pub trace_log: Arc<dyn TraceLog>,
}

/// Builds article listings and article details out of cached
/// summaries and recommender output.
///
/// Missing cache entries never fail a request, the affected article
/// is left out instead.
#[derive(Clone)]
pub struct FeedAssembler {
  sources: FeedSources,
  feed: config::Feed,
  on_failure: FailurePolicy,
}

impl FeedAssembler {
  #[must_use]
  pub fn new(sources: FeedSources, feed: config::Feed, on_failure: FailurePolicy) -> Self {
    Self {
      sources,
      feed,
      on_failure,
    }
  }

  /// One page of a channel's feed: the channel's top articles on the
  /// first page, then a fresh recommender batch of `per_page` items.
  ///
  /// Both parts are returned as they are, an article may show up in
  /// both of them.
  #[tracing::instrument(skip(self), name = "services.feed.list_page")]
  pub async fn list_page(
    &self,
    ctx: &RequestContext,
    channel: ChannelId,
    page: Option<u32>,
    per_page: Option<u32>,
  ) -> Result<FeedPage> {
    let paging = Paging::resolve(page, per_page, self.feed.articles_per_page)?;
    let request = FeedRequest {
      user_id: ctx.recommend_user_id(),
      channel_id: channel,
      count: paging.per_page,
    };

    let (top, recommended) = futures::join!(
      self.top_items(channel, paging),
      self.recommended_items(request)
    );

    let mut results = top;
    results.extend(recommended?);

    Ok(FeedPage {
      page: paging.page,
      per_page: paging.per_page,
      results,
    })
  }

  /// Full view of one article for the caller.
  ///
  /// `trace` is a client supplied trace token which is written to the
  /// trace log before anything else happens.
  #[tracing::instrument(skip(self), name = "services.feed.article_detail")]
  pub async fn article_detail(
    &self,
    ctx: &RequestContext,
    article: ArticleId,
    trace: Option<&str>,
  ) -> Result<ArticleDetail> {
    if let Some(token) = trace.filter(|v| !v.is_empty()) {
      self.sources.trace_log.write(token);
    }

    let exists = match self.sources.articles.article_exists(article).await {
      Ok(exists) => exists,
      Err(error) => {
        tracing::warn!(?error, %article, "could not check whether article exists");
        false
      }
    };
    if !exists {
      return Err(Error::from_context(types::Error::NotFound, ArticleNotFound));
    }

    let Some(summary) = self.summary(article).await else {
      return Err(
        Error::from_context(types::Error::NotFound, ArticleNotFound)
          .attach_printable("article summary is not cached"),
      );
    };

    let reader = async {
      match ctx.user {
        Some(user) => self.reader_state(user, &summary).await,
        None => Ok((false, None)),
      }
    };
    let (reader, similar, ()) = futures::join!(
      reader,
      self.similar_articles(article),
      self.count_read(article, summary.aut_id),
    );
    let (is_followed, attitude) = reader?;

    Ok(ArticleDetail {
      article: summary,
      is_followed,
      attitude,
      similar_articles: similar?,
    })
  }
}

impl FeedAssembler {
  async fn summary(&self, article: ArticleId) -> Option<ArticleSummary> {
    match self.sources.articles.summary(article).await {
      Ok(summary) => summary,
      Err(error) => {
        tracing::warn!(?error, %article, "could not load article summary");
        None
      }
    }
  }

  /// Resolves `ids` into summaries keeping their order and skipping
  /// every id without one.
  async fn summaries(&self, ids: &[ArticleId]) -> Vec<Option<ArticleSummary>> {
    join_all(ids.iter().map(|id| self.summary(*id))).await
  }

  async fn top_items(&self, channel: ChannelId, paging: Paging) -> Vec<FeedItem> {
    if !paging.is_first() {
      return Vec::new();
    }

    let ids = match self.sources.articles.channel_top_articles(channel).await {
      Ok(ids) => ids,
      Err(error) => {
        tracing::warn!(?error, %channel, "could not load top articles");
        return Vec::new();
      }
    };

    self
      .summaries(&ids)
      .await
      .into_iter()
      .flatten()
      .map(|article| FeedItem {
        article,
        trace: None,
      })
      .collect()
  }

  async fn recommended_items(&self, request: FeedRequest) -> Result<Vec<FeedItem>> {
    let batch = match self.sources.recommender.user_recommend(request).await {
      Ok(batch) => batch,
      Err(error) => return self.recover(error).map(|()| Vec::new()),
    };
    self.sources.trace_log.write(&batch.exposure);

    let ids = batch
      .items
      .iter()
      .map(|item| item.article_id)
      .collect::<Vec<_>>();

    let summaries = self.summaries(&ids).await;
    let items = batch
      .items
      .into_iter()
      .zip(summaries)
      .filter_map(|(item, summary)| {
        summary.map(|article| FeedItem {
          article,
          trace: Some(item.trace),
        })
      })
      .collect();

    Ok(items)
  }

  async fn similar_articles(&self, article: ArticleId) -> Result<Vec<SimilarArticle>> {
    let limit = self.feed.similar_articles_max.get();
    let mut ids = match self
      .sources
      .recommender
      .similar_articles(article, limit)
      .await
    {
      Ok(ids) => ids,
      Err(error) => return self.recover(error).map(|()| Vec::new()),
    };
    ids.truncate(limit as usize);

    let similar = self
      .summaries(&ids)
      .await
      .into_iter()
      .flatten()
      .map(|summary| SimilarArticle {
        art_id: summary.art_id,
        title: summary.title,
      })
      .collect();

    Ok(similar)
  }

  /// Follow status of the author and attitude toward the article of
  /// a logged-in reader. Also records the read in their history.
  async fn reader_state(
    &self,
    user: UserId,
    summary: &ArticleSummary,
  ) -> Result<(bool, Option<types::article::Attitude>)> {
    let history = async {
      if let Err(error) = self
        .sources
        .users
        .push_read_history(user, summary.art_id)
        .await
      {
        tracing::warn!(?error, %user, "could not save read history");
      }
    };

    let followed = async {
      let pair = RelationPair::new(user, summary.aut_id);
      match self.sources.relations.state(pair).await {
        Ok(state) => state == Some(RelationState::Follow),
        Err(error) => {
          tracing::warn!(?error, ?pair, "could not load relation");
          false
        }
      }
    };

    let (attitude, is_followed, ()) = futures::join!(
      self.sources.attitudes.attitude(user, summary.art_id),
      followed,
      history,
    );
    Ok((is_followed, attitude?))
  }

  async fn count_read(&self, article: ArticleId, author: UserId) {
    let (article_reads, author_reads) = futures::join!(
      self.sources.counters.incr(CounterKey::ArticleReads(article), 1),
      self.sources.counters.incr(CounterKey::AuthorReads(author), 1),
    );
    if let Err(error) = article_reads {
      tracing::warn!(?error, %article, "could not count article read");
    }
    if let Err(error) = author_reads {
      tracing::warn!(?error, %author, "could not count author read");
    }
  }

  fn recover(&self, error: error_stack::Report<RecommendError>) -> Result<()> {
    match self.on_failure {
      FailurePolicy::Fail => Err(error.into()),
      FailurePolicy::Degrade => {
        tracing::warn!(?error, "recommender failed, leaving out recommendations");
        Ok(())
      }
    }
  }
}

impl std::fmt::Debug for FeedAssembler {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("FeedAssembler")
      .field("feed", &self.feed)
      .field("on_failure", &self.on_failure)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::MemoryCache;
  use crate::recommend::Recommendation;
  use crate::store::MemoryStore;
  use crate::test_utils::{self, FailingCache, RecordingTraceLog, StubRecommender};
  use crate::types::article::{Attitude, TraceParams};

  const READER: UserId = UserId::new(100);
  const AUTHOR: UserId = UserId::new(1);
  const CHANNEL: ChannelId = ChannelId::new(7);

  struct Fixture {
    feed: FeedAssembler,
    cache: Arc<MemoryCache>,
    store: Arc<MemoryStore>,
    recommender: Arc<StubRecommender>,
    trace_log: Arc<RecordingTraceLog>,
  }

  impl Fixture {
    fn new(on_failure: FailurePolicy) -> Self {
      let cache = test_utils::memory_cache();
      let store = Arc::new(MemoryStore::new());
      let recommender = Arc::new(StubRecommender::default());
      let trace_log = Arc::new(RecordingTraceLog::default());
      let sources = FeedSources {
        articles: cache.clone(),
        counters: cache.clone(),
        users: cache.clone(),
        relations: store.clone(),
        attitudes: store.clone(),
        recommender: recommender.clone(),
        trace_log: trace_log.clone(),
      };
      Self {
        feed: FeedAssembler::new(sources, config::Feed::default(), on_failure),
        cache,
        store,
        recommender,
        trace_log,
      }
    }

    async fn articles(&self, ids: impl IntoIterator<Item = u64>) {
      for id in ids {
        self.cache.put_article(test_utils::article(id, AUTHOR)).await;
      }
    }
  }

  fn recommendation(id: u64) -> Recommendation {
    Recommendation {
      article_id: ArticleId::new(id),
      trace: TraceParams {
        click: format!("click-{id}"),
        collect: format!("collect-{id}"),
        share: format!("share-{id}"),
        read: format!("read-{id}"),
      },
    }
  }

  fn ids(page: &FeedPage) -> Vec<u64> {
    page.results.iter().map(|v| v.article.art_id.get()).collect()
  }

  #[tokio::test]
  async fn should_only_return_recommendations_with_empty_top_list() {
    let fx = Fixture::new(FailurePolicy::Fail);
    fx.articles([1, 2, 3]).await;
    fx.recommender
      .set_feed("exp-1", vec![recommendation(3), recommendation(1), recommendation(2)]);

    let page = fx
      .feed
      .list_page(&RequestContext::anonymous(), CHANNEL, None, None)
      .await
      .unwrap();

    assert_eq!(1, page.page);
    assert_eq!(10, page.per_page);
    assert_eq!(vec![3, 1, 2], ids(&page));
    for item in &page.results {
      let trace = item.trace.as_ref().unwrap();
      assert_eq!(format!("click-{}", item.article.art_id), trace.click);
    }
    assert_eq!(vec!["exp-1".to_string()], fx.trace_log.tokens());
  }

  #[tokio::test]
  async fn should_prepend_top_list_on_first_page_only() {
    let fx = Fixture::new(FailurePolicy::Fail);
    fx.articles([1, 2, 3, 4]).await;
    fx.cache
      .set_top_articles(CHANNEL, vec![ArticleId::new(4), ArticleId::new(1)])
      .await;
    fx.recommender
      .set_feed("exp-1", vec![recommendation(1), recommendation(2)]);

    let ctx = RequestContext::user(READER);
    let first = fx
      .feed
      .list_page(&ctx, CHANNEL, Some(1), Some(10))
      .await
      .unwrap();
    // no dedup between the top list and recommendations
    assert_eq!(vec![4, 1, 1, 2], ids(&first));
    assert!(first.results[0].trace.is_none());
    assert!(first.results[1].trace.is_none());
    assert!(first.results[2].trace.is_some());

    let second = fx
      .feed
      .list_page(&ctx, CHANNEL, Some(2), Some(10))
      .await
      .unwrap();
    assert_eq!(2, second.page);
    assert_eq!(vec![1, 2], ids(&second));
    assert!(second.results.iter().all(|v| v.trace.is_some()));
  }

  #[tokio::test]
  async fn should_ask_recommender_for_the_caller() {
    let fx = Fixture::new(FailurePolicy::Fail);
    fx.recommender.set_feed("exp-1", Vec::new());

    fx.feed
      .list_page(&RequestContext::user(READER), CHANNEL, None, Some(12))
      .await
      .unwrap();
    fx.feed
      .list_page(&RequestContext::with_anonymous_id("anon-9"), CHANNEL, None, None)
      .await
      .unwrap();

    let requests = fx.recommender.feed_requests();
    assert_eq!("100", requests[0].user_id);
    assert_eq!(12, requests[0].count);
    assert_eq!(CHANNEL, requests[0].channel_id);
    assert_eq!("anon-9", requests[1].user_id);
    assert_eq!(10, requests[1].count);
  }

  #[tokio::test]
  async fn should_skip_unresolvable_articles() {
    let fx = Fixture::new(FailurePolicy::Fail);
    fx.articles([2]).await;
    fx.cache
      .set_top_articles(CHANNEL, vec![ArticleId::new(9), ArticleId::new(2)])
      .await;
    fx.recommender
      .set_feed("exp-1", vec![recommendation(8), recommendation(2)]);

    let page = fx
      .feed
      .list_page(&RequestContext::anonymous(), CHANNEL, None, None)
      .await
      .unwrap();
    assert_eq!(vec![2, 2], ids(&page));
  }

  #[tokio::test]
  async fn should_reject_invalid_paging() {
    let fx = Fixture::new(FailurePolicy::Fail);
    let ctx = RequestContext::anonymous();

    let error = fx
      .feed
      .list_page(&ctx, CHANNEL, Some(0), None)
      .await
      .unwrap_err();
    assert_eq!(&types::Error::InvalidRequest, error.as_type());

    let error = fx
      .feed
      .list_page(&ctx, CHANNEL, None, Some(51))
      .await
      .unwrap_err();
    assert_eq!(&types::Error::InvalidRequest, error.as_type());
    assert!(fx.recommender.feed_requests().is_empty());
  }

  #[tokio::test]
  async fn should_fail_or_degrade_on_recommender_outage() {
    let fx = Fixture::new(FailurePolicy::Fail);
    fx.articles([1]).await;
    fx.cache.set_top_articles(CHANNEL, vec![ArticleId::new(1)]).await;
    fx.recommender.fail();

    let error = fx
      .feed
      .list_page(&RequestContext::anonymous(), CHANNEL, None, None)
      .await
      .unwrap_err();
    assert_eq!(&types::Error::Outage, error.as_type());

    let fx = Fixture::new(FailurePolicy::Degrade);
    fx.articles([1]).await;
    fx.cache.set_top_articles(CHANNEL, vec![ArticleId::new(1)]).await;
    fx.recommender.fail();

    let ctx = RequestContext::anonymous();
    let page = fx.feed.list_page(&ctx, CHANNEL, None, None).await.unwrap();
    assert_eq!(vec![1], ids(&page));
    let page = fx.feed.list_page(&ctx, CHANNEL, Some(2), None).await.unwrap();
    assert!(page.results.is_empty());
    assert!(fx.trace_log.tokens().is_empty());
  }

  #[tokio::test]
  async fn should_tolerate_unavailable_cache() {
    let recommender = Arc::new(StubRecommender::default());
    recommender.set_feed("exp-1", vec![recommendation(1)]);
    let store = Arc::new(MemoryStore::new());
    let sources = FeedSources {
      articles: Arc::new(FailingCache),
      counters: Arc::new(FailingCache),
      users: Arc::new(FailingCache),
      relations: store.clone(),
      attitudes: store,
      recommender,
      trace_log: Arc::new(RecordingTraceLog::default()),
    };
    let feed = FeedAssembler::new(sources, config::Feed::default(), FailurePolicy::Fail);

    let page = feed
      .list_page(&RequestContext::anonymous(), CHANNEL, None, None)
      .await
      .unwrap();
    assert!(page.results.is_empty());
  }

  #[tokio::test]
  async fn should_return_not_found_without_touching_counters() {
    let fx = Fixture::new(FailurePolicy::Fail);
    let article = ArticleId::new(404);

    let error = fx
      .feed
      .article_detail(&RequestContext::user(READER), article, Some("trace-1"))
      .await
      .unwrap_err();
    assert_eq!(&types::Error::NotFound, error.as_type());

    assert_eq!(
      0,
      fx.cache.get(CounterKey::ArticleReads(article)).await.unwrap()
    );
    assert!(fx.cache.read_history(READER).await.unwrap().is_empty());
    assert!(fx.recommender.similar_requests().is_empty());
    assert_eq!(vec!["trace-1".to_string()], fx.trace_log.tokens());
  }

  #[tokio::test]
  async fn should_assemble_detail_for_anonymous_reader() {
    let fx = Fixture::new(FailurePolicy::Fail);
    fx.articles([1, 2, 3]).await;
    fx.recommender
      .set_similar(vec![ArticleId::new(2), ArticleId::new(99), ArticleId::new(3)]);

    let detail = fx
      .feed
      .article_detail(&RequestContext::anonymous(), ArticleId::new(1), None)
      .await
      .unwrap();

    assert_eq!(ArticleId::new(1), detail.article.art_id);
    assert!(!detail.is_followed);
    assert_eq!(None, detail.attitude);
    let similar = detail
      .similar_articles
      .iter()
      .map(|v| (v.art_id.get(), v.title.as_str()))
      .collect::<Vec<_>>();
    assert_eq!(vec![(2, "article #2"), (3, "article #3")], similar);

    assert_eq!(
      1,
      fx.cache
        .get(CounterKey::ArticleReads(ArticleId::new(1)))
        .await
        .unwrap()
    );
    assert_eq!(1, fx.cache.get(CounterKey::AuthorReads(AUTHOR)).await.unwrap());
    assert_eq!(
      vec![(ArticleId::new(1), 5)],
      fx.recommender.similar_requests()
    );
    assert!(fx.trace_log.tokens().is_empty());
  }

  #[tokio::test]
  async fn should_assemble_detail_for_logged_in_reader() {
    let fx = Fixture::new(FailurePolicy::Fail);
    fx.articles([1]).await;
    fx.store
      .insert_if_absent(RelationPair::new(READER, AUTHOR), RelationState::Follow)
      .await
      .unwrap();
    fx.store
      .set_attitude(READER, ArticleId::new(1), Attitude::Liking)
      .unwrap();

    let detail = fx
      .feed
      .article_detail(&RequestContext::user(READER), ArticleId::new(1), None)
      .await
      .unwrap();

    assert!(detail.is_followed);
    assert_eq!(Some(Attitude::Liking), detail.attitude);
    assert!(detail.similar_articles.is_empty());
    assert_eq!(
      vec![ArticleId::new(1)],
      fx.cache.read_history(READER).await.unwrap()
    );
  }

  #[tokio::test]
  async fn should_not_report_blacklisted_author_as_followed() {
    let fx = Fixture::new(FailurePolicy::Fail);
    fx.articles([1]).await;
    fx.store
      .insert_if_absent(RelationPair::new(READER, AUTHOR), RelationState::Blacklist)
      .await
      .unwrap();

    let detail = fx
      .feed
      .article_detail(&RequestContext::user(READER), ArticleId::new(1), None)
      .await
      .unwrap();
    assert!(!detail.is_followed);
  }

  #[tokio::test]
  async fn should_cap_similar_articles() {
    let fx = Fixture::new(FailurePolicy::Fail);
    fx.articles(1..=10).await;
    fx.recommender
      .set_similar((2..=10).map(ArticleId::new).collect());

    let detail = fx
      .feed
      .article_detail(&RequestContext::anonymous(), ArticleId::new(1), None)
      .await
      .unwrap();
    assert_eq!(5, detail.similar_articles.len());
  }

  #[tokio::test]
  async fn should_degrade_similar_articles_on_outage() {
    let fx = Fixture::new(FailurePolicy::Degrade);
    fx.articles([1]).await;
    fx.recommender.fail();

    let detail = fx
      .feed
      .article_detail(&RequestContext::anonymous(), ArticleId::new(1), None)
      .await
      .unwrap();
    assert!(detail.similar_articles.is_empty());

    let fx = Fixture::new(FailurePolicy::Fail);
    fx.articles([1]).await;
    fx.recommender.fail();
    let error = fx
      .feed
      .article_detail(&RequestContext::anonymous(), ArticleId::new(1), None)
      .await
      .unwrap_err();
    assert_eq!(&types::Error::Outage, error.as_type());
  }
}
