use error_stack::{Report, Result, ResultExt};
use serde::Deserialize;

use super::{InvalidConfig, ParseError};
use crate::util::{
  figment::FigmentErrorAttachable,
  validation::{is_valid_http_url, is_valid_paging_bounds, is_valid_postgres_url, Violations},
};

#[derive(Debug, Deserialize)]
pub struct Server {
  pub db: super::Database,
  #[serde(default)]
  pub feed: super::Feed,
  pub recommender: super::Recommender,
  #[serde(default)]
  pub cache: super::Cache,
  #[serde(default)]
  pub trace_log: super::TraceLog,
  #[serde(default)]
  pub logging: super::Logging,
}

impl Server {
  pub fn load() -> Result<Self, ParseError> {
    dotenvy::dotenv().ok();
    Self::from_figment(&Self::figment())
  }

  pub(crate) fn from_figment(figment: &figment::Figment) -> Result<Self, ParseError> {
    let config = figment
      .extract::<Self>()
      .map_err(|e| Report::new(ParseError).attach_figment_error(e))?;

    config.validate().change_context(ParseError)?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), InvalidConfig> {
    let mut violations = Violations::new();
    violations.check(
      is_valid_postgres_url(self.db.primary.url.as_str()),
      "db.primary.url",
      "Invalid Postgres connection URL",
    );
    if let Some(replica) = self.db.replica.as_ref() {
      violations.check(
        is_valid_postgres_url(replica.url.as_str()),
        "db.replica.url",
        "Invalid Postgres connection URL",
      );
    }
    violations.check(
      is_valid_paging_bounds(&self.feed.articles_per_page),
      "feed.articles_per_page",
      "min must be positive and must not exceed max",
    );
    violations.check(
      is_valid_paging_bounds(&self.feed.followings_per_page),
      "feed.followings_per_page",
      "min must be positive and must not exceed max",
    );
    violations.check(
      is_valid_http_url(&self.recommender.url),
      "recommender.url",
      "Invalid recommender URL",
    );
    violations.into_result(InvalidConfig)
  }
}

impl Server {
  const DEFAULT_CONFIG_FILE: &'static str = "headline.toml";

  /// Creates a default [`Figment`] object to load server
  /// configuration. This function is there for implementing
  /// [`Server::load`] and testing.
  ///
  /// [`Figment`]: figment::Figment
  pub(crate) fn figment() -> figment::Figment {
    use figment::{
      providers::{Env, Format, Toml},
      Figment,
    };

    Figment::new()
      .merge(Toml::file(Self::DEFAULT_CONFIG_FILE))
      // One big con about figment (env provider to be specific) especially
      // these fields with underscore in it.
      .merge(Env::prefixed("HEADLINE_").map(|v| {
        match v.as_str().to_ascii_uppercase().as_str() {
          "DB_PRIMARY_MIN_IDLE" => "db.primary.min_idle".into(),
          "DB_PRIMARY_POOL_SIZE" => "db.primary.pool_size".into(),

          "DB_REPLICA_MIN_IDLE" => "db.replica.min_idle".into(),
          "DB_REPLICA_POOL_SIZE" => "db.replica.pool_size".into(),

          "DB_ENFORCE_TLS" => "db.enforce_tls".into(),
          "DB_TIMEOUT_SECS" => "db.timeout_secs".into(),

          "FEED_ARTICLES_PER_PAGE_MIN" => "feed.articles_per_page.min".into(),
          "FEED_ARTICLES_PER_PAGE_MAX" => "feed.articles_per_page.max".into(),
          "FEED_FOLLOWINGS_PER_PAGE_MIN" => "feed.followings_per_page.min".into(),
          "FEED_FOLLOWINGS_PER_PAGE_MAX" => "feed.followings_per_page.max".into(),
          "FEED_SIMILAR_ARTICLES_MAX" => "feed.similar_articles_max".into(),

          "RECOMMENDER_TIMEOUT_MS" => "recommender.timeout_ms".into(),
          "RECOMMENDER_ON_FAILURE" => "recommender.on_failure".into(),

          "CACHE_MAX_CAPACITY" => "cache.max_capacity".into(),
          "CACHE_TIME_TO_LIVE_SECS" => "cache.time_to_live_secs".into(),

          "TRACE_LOG_PATH" => "trace_log.path".into(),

          _ => v.as_str().replace('_', ".").into(),
        }
      }))
      // Environment variable aliases
      .merge(
        Env::raw()
          .only(&["DATABASE_URL", "RECOMMENDER_URL"])
          .map(|v| match v.as_str().to_ascii_uppercase().as_str() {
            "DATABASE_URL" => "db.primary.url".into(),
            _ => "recommender.url".into(),
          }),
      )
  }
}
