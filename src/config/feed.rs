use serde::Deserialize;
use std::num::{NonZeroU32, NonZeroU64};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::types::PagingBounds;

/// Listing limits of the article and following resources.
#[derive(Debug, Clone, Deserialize)]
pub struct Feed {
  /// **Environment variables**:
  /// - `HEADLINE_FEED_ARTICLES_PER_PAGE_MIN`
  /// - `HEADLINE_FEED_ARTICLES_PER_PAGE_MAX`
  #[serde(default = "Feed::default_per_page")]
  pub articles_per_page: PagingBounds,
  /// **Environment variables**:
  /// - `HEADLINE_FEED_FOLLOWINGS_PER_PAGE_MIN`
  /// - `HEADLINE_FEED_FOLLOWINGS_PER_PAGE_MAX`
  #[serde(default = "Feed::default_per_page")]
  pub followings_per_page: PagingBounds,
  /// Upper bound of similar articles attached to an article detail.
  ///
  /// **Environment variables**:
  /// - `HEADLINE_FEED_SIMILAR_ARTICLES_MAX`
  #[serde(default = "Feed::default_similar_articles_max")]
  pub similar_articles_max: NonZeroU32,
}

impl Feed {
  const DEFAULT_PER_PAGE_MIN: u32 = 10;
  const DEFAULT_PER_PAGE_MAX: u32 = 50;
  const DEFAULT_SIMILAR_ARTICLES_MAX: u32 = 5;

  const fn default_per_page() -> PagingBounds {
    PagingBounds {
      min: Self::DEFAULT_PER_PAGE_MIN,
      max: Self::DEFAULT_PER_PAGE_MAX,
    }
  }

  const fn default_similar_articles_max() -> NonZeroU32 {
    match NonZeroU32::new(Self::DEFAULT_SIMILAR_ARTICLES_MAX) {
      Some(n) => n,
      None => panic!("DEFAULT_SIMILAR_ARTICLES_MAX is accidentally set to 0"),
    }
  }
}

impl Default for Feed {
  fn default() -> Self {
    Self {
      articles_per_page: Self::default_per_page(),
      followings_per_page: Self::default_per_page(),
      similar_articles_max: Self::default_similar_articles_max(),
    }
  }
}

/// What to do with a request when the recommender fails.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
  /// The whole request fails.
  #[default]
  Fail,
  /// Recommender-sourced parts of the response are left out.
  Degrade,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Recommender {
  /// Base URL of the recommendation service.
  ///
  /// **Environment variables**:
  /// - `HEADLINE_RECOMMENDER_URL` or `RECOMMENDER_URL`
  pub url: Url,
  /// **Environment variables**:
  /// - `HEADLINE_RECOMMENDER_TIMEOUT_MS`
  #[serde(default = "Recommender::default_timeout_ms")]
  pub timeout_ms: NonZeroU64,
  /// **Environment variables**:
  /// - `HEADLINE_RECOMMENDER_ON_FAILURE`
  #[serde(default)]
  pub on_failure: FailurePolicy,
}

impl Recommender {
  const DEFAULT_TIMEOUT_MS: u64 = 1000;

  const fn default_timeout_ms() -> NonZeroU64 {
    match NonZeroU64::new(Self::DEFAULT_TIMEOUT_MS) {
      Some(n) => n,
      None => panic!("DEFAULT_TIMEOUT_MS is accidentally set to 0"),
    }
  }

  #[must_use]
  pub fn timeout(&self) -> Duration {
    Duration::from_millis(self.timeout_ms.get())
  }
}

/// In-process cache tier.
#[derive(Debug, Clone, Deserialize)]
pub struct Cache {
  /// Upper bound of entries per cached table. Counters are not
  /// bounded by it.
  ///
  /// **Environment variables**:
  /// - `HEADLINE_CACHE_MAX_CAPACITY`
  #[serde(default = "Cache::default_max_capacity")]
  pub max_capacity: u64,
  /// How long cached summaries and profiles live. Counters
  /// never expire.
  ///
  /// **Environment variables**:
  /// - `HEADLINE_CACHE_TIME_TO_LIVE_SECS`
  #[serde(default = "Cache::default_time_to_live_secs")]
  pub time_to_live_secs: NonZeroU64,
}

impl Cache {
  const DEFAULT_MAX_CAPACITY: u64 = 100_000;
  const DEFAULT_TIME_TO_LIVE_SECS: u64 = 60 * 60;

  const fn default_max_capacity() -> u64 {
    Self::DEFAULT_MAX_CAPACITY
  }

  const fn default_time_to_live_secs() -> NonZeroU64 {
    match NonZeroU64::new(Self::DEFAULT_TIME_TO_LIVE_SECS) {
      Some(n) => n,
      None => panic!("DEFAULT_TIME_TO_LIVE_SECS is accidentally set to 0"),
    }
  }

  #[must_use]
  pub fn time_to_live(&self) -> Duration {
    Duration::from_secs(self.time_to_live_secs.get())
  }
}

impl Default for Cache {
  fn default() -> Self {
    Self {
      max_capacity: Self::default_max_capacity(),
      time_to_live_secs: Self::default_time_to_live_secs(),
    }
  }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TraceLog {
  /// File receiving one trace token per line. Tokens are emitted
  /// as `headline::trace` events if not set.
  ///
  /// **Environment variables**:
  /// - `HEADLINE_TRACE_LOG_PATH`
  pub path: Option<PathBuf>,
}
