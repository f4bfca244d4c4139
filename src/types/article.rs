use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::{ArticleId, UserId};

/// Layout of an article's cover images.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CoverType {
  #[default]
  Unset,
  Single,
  Triple,
}

#[derive(Debug, Error)]
#[error("unknown cover type {0}")]
pub struct UnknownCoverType(u8);

impl TryFrom<u8> for CoverType {
  type Error = UnknownCoverType;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    match value {
      0 => Ok(Self::Unset),
      1 => Ok(Self::Single),
      3 => Ok(Self::Triple),
      n => Err(UnknownCoverType(n)),
    }
  }
}

impl From<CoverType> for u8 {
  fn from(value: CoverType) -> Self {
    match value {
      CoverType::Unset => 0,
      CoverType::Single => 1,
      CoverType::Triple => 3,
    }
  }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArticleCover {
  #[serde(rename = "type")]
  pub kind: CoverType,
  pub images: Vec<String>,
}

/// Cached article metadata used by every article listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArticleSummary {
  pub art_id: ArticleId,
  pub title: String,
  pub aut_id: UserId,
  pub aut_name: String,
  pub comm_count: u64,
  pub cover: ArticleCover,
}

/// Per-item trace identifiers handed out by the recommender.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TraceParams {
  pub click: String,
  pub collect: String,
  pub share: String,
  pub read: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedItem {
  #[serde(flatten)]
  pub article: ArticleSummary,
  /// Only present on recommender-sourced items.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub trace: Option<TraceParams>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedPage {
  pub page: u32,
  pub per_page: u32,
  pub results: Vec<FeedItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticlePage {
  pub total_count: u64,
  pub page: u32,
  pub per_page: u32,
  pub results: Vec<ArticleSummary>,
}

/// Reader's recorded attitude toward an article. Stored as a
/// `smallint` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum Attitude {
  Dislike = 0,
  Liking = 1,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimilarArticle {
  pub art_id: ArticleId,
  pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleDetail {
  #[serde(flatten)]
  pub article: ArticleSummary,
  pub is_followed: bool,
  pub attitude: Option<Attitude>,
  pub similar_articles: Vec<SimilarArticle>,
}
