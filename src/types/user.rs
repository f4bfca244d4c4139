use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Cached public profile of a user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserProfile {
  pub id: UserId,
  pub name: String,
  pub photo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowingUser {
  pub id: UserId,
  pub name: String,
  pub photo: Option<String>,
  pub fans_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowingPage {
  pub total_count: u64,
  pub page: u32,
  pub per_page: u32,
  pub results: Vec<FollowingUser>,
}
