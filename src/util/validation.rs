use error_stack::{Context, Report};
use url::Url;

use crate::types::PagingBounds;

/// Collects `field: message` pairs of invalid values and turns
/// them into a single report, one attachment per violation.
#[derive(Debug, Default)]
pub struct Violations(Vec<String>);

impl Violations {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  pub fn check(&mut self, valid: bool, field: &str, message: &str) {
    if !valid {
      self.0.push(format!("{field}: {message}"));
    }
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn into_result<C: Context>(self, context: C) -> Result<(), Report<C>> {
    if self.0.is_empty() {
      return Ok(());
    }

    let mut report = Report::new(context);
    for violation in self.0 {
      report = report.attach_printable(violation);
    }
    Err(report)
  }
}

pub fn is_valid_paging_bounds(bounds: &PagingBounds) -> bool {
  bounds.min > 0 && bounds.min <= bounds.max
}

pub fn is_valid_postgres_url(url: &str) -> bool {
  Url::parse(url)
    .map(|v| matches!(v.scheme(), "postgres" | "postgresql"))
    .unwrap_or_default()
}

pub fn is_valid_http_url(url: &Url) -> bool {
  matches!(url.scheme(), "http" | "https") && url.has_host()
}
