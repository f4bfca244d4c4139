use futures::future::join_all;
use std::sync::Arc;
use thiserror::Error;

use crate::cache::{ArticleCache, UserCache};
use crate::config;
use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::types::article::ArticlePage;
use crate::types::{self, Paging, UserId};

#[derive(Debug, Error)]
#[error("user does not exist")]
struct UserNotFound;

/// Lists articles published by a user.
#[derive(Clone)]
pub struct UserArticles {
  articles: Arc<dyn ArticleCache>,
  users: Arc<dyn UserCache>,
  feed: config::Feed,
}

impl UserArticles {
  #[must_use]
  pub fn new(articles: Arc<dyn ArticleCache>, users: Arc<dyn UserCache>, feed: config::Feed) -> Self {
    Self {
      articles,
      users,
      feed,
    }
  }

  #[tracing::instrument(skip(self), name = "services.articles.by_user")]
  pub async fn by_user(
    &self,
    user: UserId,
    page: Option<u32>,
    per_page: Option<u32>,
  ) -> Result<ArticlePage> {
    let exists = match self.users.user_exists(user).await {
      Ok(exists) => exists,
      Err(error) => {
        tracing::warn!(?error, %user, "could not check whether user exists");
        false
      }
    };
    if !exists {
      return Err(Error::from_context(types::Error::NotFound, UserNotFound));
    }
    self.page(user, page, per_page).await
  }

  /// Same as [`UserArticles::by_user`] for the logged-in caller.
  #[tracing::instrument(skip(self), name = "services.articles.by_current_user")]
  pub async fn by_current_user(
    &self,
    ctx: &RequestContext,
    page: Option<u32>,
    per_page: Option<u32>,
  ) -> Result<ArticlePage> {
    let user = ctx.require_user()?;
    self.page(user, page, per_page).await
  }

  async fn page(
    &self,
    user: UserId,
    page: Option<u32>,
    per_page: Option<u32>,
  ) -> Result<ArticlePage> {
    let paging = Paging::resolve(page, per_page, self.feed.articles_per_page)?;
    let ids = match self
      .users
      .articles_page(user, paging.offset(), paging.per_page)
      .await
    {
      Ok(ids) => ids,
      Err(error) => {
        tracing::warn!(?error, %user, "could not load user articles");
        Default::default()
      }
    };

    let summaries = join_all(ids.ids.iter().map(|id| self.articles.summary(*id))).await;
    let results = summaries
      .into_iter()
      .filter_map(|summary| {
        summary
          .map_err(|error| tracing::warn!(?error, "could not load article summary"))
          .ok()
          .flatten()
      })
      .collect();

    Ok(ArticlePage {
      total_count: ids.total,
      page: paging.page,
      per_page: paging.per_page,
      results,
    })
  }
}

impl std::fmt::Debug for UserArticles {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("UserArticles").finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::MemoryCache;
  use crate::test_utils;
  use crate::types::ArticleId;

  const AUTHOR: UserId = UserId::new(3);

  async fn fixture() -> (UserArticles, Arc<MemoryCache>) {
    let cache = test_utils::memory_cache();
    cache.put_user(test_utils::user(AUTHOR.get())).await;
    for id in 1..=12 {
      cache.put_article(test_utils::article(id, AUTHOR)).await;
    }
    // no summary for article 13
    cache
      .set_user_articles(AUTHOR, (1..=13).rev().map(ArticleId::new).collect())
      .await;

    let service = UserArticles::new(cache.clone(), cache.clone(), config::Feed::default());
    (service, cache)
  }

  #[tokio::test]
  async fn should_list_user_articles() {
    let (service, _) = fixture().await;
    let page = service.by_user(AUTHOR, None, None).await.unwrap();

    assert_eq!(13, page.total_count);
    assert_eq!(1, page.page);
    assert_eq!(10, page.per_page);
    let ids = page.results.iter().map(|v| v.art_id.get()).collect::<Vec<_>>();
    assert_eq!(vec![12, 11, 10, 9, 8, 7, 6, 5, 4], ids);

    let page = service.by_user(AUTHOR, Some(2), None).await.unwrap();
    let ids = page.results.iter().map(|v| v.art_id.get()).collect::<Vec<_>>();
    assert_eq!(vec![3, 2, 1], ids);
  }

  #[tokio::test]
  async fn should_reject_unknown_user() {
    let (service, _) = fixture().await;
    let error = service
      .by_user(UserId::new(99), None, None)
      .await
      .unwrap_err();
    assert_eq!(&types::Error::NotFound, error.as_type());
  }

  #[tokio::test]
  async fn should_list_current_user_articles() {
    let (service, _) = fixture().await;
    let page = service
      .by_current_user(&RequestContext::user(AUTHOR), Some(2), Some(10))
      .await
      .unwrap();
    assert_eq!(3, page.results.len());

    let error = service
      .by_current_user(&RequestContext::anonymous(), None, None)
      .await
      .unwrap_err();
    assert_eq!(&types::Error::Unauthorized, error.as_type());
  }
}
