use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Client-visible outcome of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Error {
  Internal,
  InvalidRequest,
  NotFound,
  Unauthorized,
  ReadonlyMode,
  Outage,
}

impl Display for Error {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Error::Internal => f.write_str("Failed to perform request"),
      Error::InvalidRequest => f.write_str("User performed an invalid request"),
      Error::NotFound => f.write_str("Requested resource does not exist"),
      Error::Unauthorized => f.write_str("User must be authorized"),
      Error::ReadonlyMode => f.write_str("Attempt to write read-only database"),
      Error::Outage => f.write_str("Upstream service is not available"),
    }
  }
}

impl std::error::Error for Error {}
