use async_trait::async_trait;
use error_stack::{Report, Result, ResultExt};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

use super::{FeedRecommendation, FeedRequest, RecommendError, Recommender};
use crate::config;
use crate::types::ArticleId;

/// [`Recommender`] speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRecommender {
  client: reqwest::Client,
  base: Url,
}

#[derive(Debug, Serialize)]
struct SimilarRequest {
  article_id: ArticleId,
  article_num: u32,
}

#[derive(Debug, Deserialize)]
struct SimilarResponse {
  #[serde(default)]
  article_id: Vec<ArticleId>,
}

impl HttpRecommender {
  pub fn new(cfg: &config::Recommender) -> Result<Self, RecommendError> {
    let client = reqwest::Client::builder()
      .timeout(cfg.timeout())
      .build()
      .change_context(RecommendError::Unavailable)
      .attach_printable("could not build HTTP client")?;

    Ok(Self {
      client,
      base: cfg.url.clone(),
    })
  }

  fn endpoint(&self, name: &str) -> Result<Url, RecommendError> {
    let mut url = self.base.clone();
    url
      .path_segments_mut()
      .map_err(|()| Report::new(RecommendError::Unavailable))
      .attach_printable_lazy(|| format!("cannot use {} as a base url", self.base))?
      .pop_if_empty()
      .push(name);
    Ok(url)
  }

  async fn call<B, T>(&self, name: &str, body: &B) -> Result<T, RecommendError>
  where
    B: Serialize + Sync,
    T: DeserializeOwned,
  {
    let url = self.endpoint(name)?;
    let response = self
      .client
      .post(url)
      .json(body)
      .send()
      .await
      .and_then(reqwest::Response::error_for_status)
      .map_err(classify)?;

    response
      .json::<T>()
      .await
      .change_context(RecommendError::InvalidResponse)
  }
}

fn classify(error: reqwest::Error) -> Report<RecommendError> {
  let context = if error.is_timeout() {
    RecommendError::Timeout
  } else {
    RecommendError::Unavailable
  };
  Report::new(error).change_context(context)
}

#[async_trait]
impl Recommender for HttpRecommender {
  #[tracing::instrument(skip(self), name = "recommender.user_recommend")]
  async fn user_recommend(
    &self,
    request: FeedRequest,
  ) -> Result<FeedRecommendation, RecommendError> {
    self.call("user_recommend", &request).await
  }

  #[tracing::instrument(skip(self), name = "recommender.article_recommend")]
  async fn similar_articles(
    &self,
    article: ArticleId,
    count: u32,
  ) -> Result<Vec<ArticleId>, RecommendError> {
    let request = SimilarRequest {
      article_id: article,
      article_num: count,
    };
    let response: SimilarResponse = self.call("article_recommend", &request).await?;
    Ok(response.article_id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::FailurePolicy;
  use crate::types::ChannelId;
  use serde_json::json;
  use std::num::NonZeroU64;
  use std::time::Duration;
  use wiremock::matchers::{body_json, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn recommender(server: &MockServer, timeout_ms: u64) -> HttpRecommender {
    HttpRecommender::new(&config::Recommender {
      url: Url::parse(&server.uri()).unwrap(),
      timeout_ms: NonZeroU64::new(timeout_ms).unwrap(),
      on_failure: FailurePolicy::Fail,
    })
    .unwrap()
  }

  #[tokio::test]
  async fn test_user_recommend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/user_recommend"))
      .and(body_json(json!({ "user_id": "7", "channel_id": 2, "article_num": 2 })))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "exposure": "exp-7",
        "recommends": [
          { "article_id": 11, "params": { "click": "c1", "collect": "o1", "share": "s1", "read": "r1" } },
          { "article_id": 10, "params": { "click": "c2", "collect": "o2", "share": "s2", "read": "r2" } }
        ]
      })))
      .expect(1)
      .mount(&server)
      .await;

    let batch = recommender(&server, 1000)
      .user_recommend(FeedRequest {
        user_id: "7".into(),
        channel_id: ChannelId::new(2),
        count: 2,
      })
      .await
      .unwrap();

    assert_eq!("exp-7", batch.exposure);
    let ids = batch.items.iter().map(|v| v.article_id).collect::<Vec<_>>();
    assert_eq!(vec![ArticleId::new(11), ArticleId::new(10)], ids);
    assert_eq!("r2", batch.items[1].trace.read);
  }

  #[tokio::test]
  async fn test_similar_articles() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/article_recommend"))
      .and(body_json(json!({ "article_id": 4, "article_num": 5 })))
      .respond_with(
        ResponseTemplate::new(200).set_body_json(json!({ "article_id": [9, 8] })),
      )
      .mount(&server)
      .await;

    let ids = recommender(&server, 1000)
      .similar_articles(ArticleId::new(4), 5)
      .await
      .unwrap();
    assert_eq!(vec![ArticleId::new(9), ArticleId::new(8)], ids);
  }

  #[tokio::test]
  async fn test_error_classification() {
    let server = MockServer::start().await;
    Mock::given(path("/user_recommend"))
      .respond_with(ResponseTemplate::new(503))
      .mount(&server)
      .await;
    Mock::given(path("/article_recommend"))
      .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
      .mount(&server)
      .await;

    let client = recommender(&server, 1000);
    let error = client
      .user_recommend(FeedRequest {
        user_id: String::new(),
        channel_id: ChannelId::new(1),
        count: 1,
      })
      .await
      .unwrap_err();
    assert!(matches!(
      error.current_context(),
      RecommendError::Unavailable
    ));

    let error = client
      .similar_articles(ArticleId::new(1), 1)
      .await
      .unwrap_err();
    assert!(matches!(
      error.current_context(),
      RecommendError::InvalidResponse
    ));
  }

  #[tokio::test]
  async fn test_timeout() {
    let server = MockServer::start().await;
    Mock::given(path("/article_recommend"))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_json(json!({ "article_id": [] }))
          .set_delay(Duration::from_millis(500)),
      )
      .mount(&server)
      .await;

    let error = recommender(&server, 50)
      .similar_articles(ArticleId::new(1), 1)
      .await
      .unwrap_err();
    assert!(matches!(error.current_context(), RecommendError::Timeout));
  }
}
