use serde::Deserialize;
use thiserror::Error;

/// Allowed `per_page` range of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PagingBounds {
  pub min: u32,
  pub max: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PagingError {
  #[error("page must be a positive number")]
  ZeroPage,
  #[error("per_page must be within {min} and {max}, got {got}")]
  PerPageOutOfRange { min: u32, max: u32, got: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
  pub page: u32,
  pub per_page: u32,
}

impl Paging {
  /// Missing `page` means the first page and missing `per_page`
  /// falls back to the lower bound.
  pub fn resolve(
    page: Option<u32>,
    per_page: Option<u32>,
    bounds: PagingBounds,
  ) -> Result<Self, PagingError> {
    let page = page.unwrap_or(1);
    if page == 0 {
      return Err(PagingError::ZeroPage);
    }

    let per_page = per_page.unwrap_or(bounds.min);
    if per_page < bounds.min || per_page > bounds.max {
      return Err(PagingError::PerPageOutOfRange {
        min: bounds.min,
        max: bounds.max,
        got: per_page,
      });
    }

    Ok(Self { page, per_page })
  }

  #[must_use]
  pub fn is_first(&self) -> bool {
    self.page == 1
  }

  #[must_use]
  pub fn offset(&self) -> u64 {
    u64::from(self.page - 1) * u64::from(self.per_page)
  }
}
