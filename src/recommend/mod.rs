//! Client side of the external recommendation service.
use async_trait::async_trait;
use error_stack::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::article::TraceParams;
use crate::types::{ArticleId, ChannelId};

mod http;
pub use self::http::HttpRecommender;

#[derive(Debug, Error)]
pub enum RecommendError {
  #[error("recommender did not respond in time")]
  Timeout,
  #[error("recommender is unavailable")]
  Unavailable,
  #[error("recommender sent an invalid response")]
  InvalidResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedRequest {
  /// User id, anonymous id or an empty string.
  pub user_id: String,
  pub channel_id: ChannelId,
  #[serde(rename = "article_num")]
  pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Recommendation {
  pub article_id: ArticleId,
  #[serde(rename = "params")]
  pub trace: TraceParams,
}

/// One served batch of recommendations, in the recommender's order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedRecommendation {
  /// Correlates this batch with later trace events.
  pub exposure: String,
  #[serde(rename = "recommends", default)]
  pub items: Vec<Recommendation>,
}

#[async_trait]
pub trait Recommender: Send + Sync {
  async fn user_recommend(&self, request: FeedRequest)
    -> Result<FeedRecommendation, RecommendError>;

  /// Articles similar to `article`, most similar first.
  async fn similar_articles(
    &self,
    article: ArticleId,
    count: u32,
  ) -> Result<Vec<ArticleId>, RecommendError>;
}
