use thiserror::Error;

use crate::error::{Error, Result};
use crate::types::{self, UserId};

/// Identity of the caller, passed explicitly into every service call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
  pub user: Option<UserId>,
  pub anonymous_id: Option<String>,
}

impl RequestContext {
  #[must_use]
  pub fn anonymous() -> Self {
    Self::default()
  }

  #[must_use]
  pub fn with_anonymous_id(anonymous_id: impl Into<String>) -> Self {
    Self {
      user: None,
      anonymous_id: Some(anonymous_id.into()),
    }
  }

  #[must_use]
  pub fn user(user: UserId) -> Self {
    Self {
      user: Some(user),
      anonymous_id: None,
    }
  }

  /// Identifier the recommender knows this caller by: the user id,
  /// else the anonymous id, else an empty string.
  #[must_use]
  pub fn recommend_user_id(&self) -> String {
    match (self.user, self.anonymous_id.as_deref()) {
      (Some(user), _) => user.to_string(),
      (None, Some(anonymous_id)) => anonymous_id.to_string(),
      (None, None) => String::new(),
    }
  }

  pub fn require_user(&self) -> Result<UserId> {
    #[derive(Debug, Error)]
    #[error("Attempt to access user-only operation")]
    struct Unauthorized;

    self
      .user
      .ok_or_else(|| Error::from_context(types::Error::Unauthorized, Unauthorized))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_recommend_user_id() {
    assert_eq!("5", RequestContext::user(UserId::new(5)).recommend_user_id());
    assert_eq!(
      "anon-1",
      RequestContext::with_anonymous_id("anon-1").recommend_user_id()
    );
    assert_eq!("", RequestContext::anonymous().recommend_user_id());

    let both = RequestContext {
      user: Some(UserId::new(9)),
      anonymous_id: Some("anon-2".into()),
    };
    assert_eq!("9", both.recommend_user_id());
  }

  #[test]
  fn test_require_user() {
    assert_eq!(
      UserId::new(5),
      RequestContext::user(UserId::new(5)).require_user().unwrap()
    );

    let error = RequestContext::anonymous().require_user().unwrap_err();
    assert_eq!(&types::Error::Unauthorized, error.as_type());
  }
}
