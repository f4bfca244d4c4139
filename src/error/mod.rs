use crate::types;
use error_stack::{Context, Report};
use tracing_error::SpanTrace;

mod impls;

pub type Result<T> = std::result::Result<T, Error>;

/// Request-facing error.
///
/// The current context of its report is always the client-visible
/// [error type](types::Error); everything below it is the chain of
/// component errors that led to it.
pub struct Error {
  report: Report<types::Error>,
  trace: SpanTrace,
}

impl Error {
  #[must_use]
  #[track_caller]
  pub fn new(error_type: types::Error) -> Self {
    Self {
      report: Report::new(error_type),
      trace: SpanTrace::capture(),
    }
  }

  #[must_use]
  #[track_caller]
  pub fn from_context(error_type: types::Error, context: impl Context) -> Self {
    Self::from_report(error_type, Report::new(context))
  }

  #[must_use]
  #[track_caller]
  pub fn from_report<C: Context>(error_type: types::Error, report: Report<C>) -> Self {
    Self {
      report: report.change_context(error_type),
      trace: SpanTrace::capture(),
    }
  }
}

impl Error {
  #[must_use]
  pub fn as_type(&self) -> &types::Error {
    self.report.current_context()
  }

  #[must_use]
  #[track_caller]
  pub fn attach_printable<A>(mut self, attachment: A) -> Self
  where
    A: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
  {
    self.report = self.report.attach_printable(attachment);
    self
  }

  #[must_use]
  #[track_caller]
  pub fn change_type(mut self, error_type: types::Error) -> Self {
    self.report = self.report.change_context(error_type);
    self
  }

  #[must_use]
  pub fn downcast_ref<F: Context>(&self) -> Option<&F> {
    self.report.downcast_ref::<F>()
  }

  #[must_use]
  pub fn contains<F: Context>(&self) -> bool {
    self.report.contains::<F>()
  }
}

impl std::fmt::Debug for Error {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Error")
      .field("type", self.as_type())
      .field("report", &self.report)
      .field("trace", &self.trace)
      .finish()
  }
}

impl std::fmt::Display for Error {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}: ", self.as_type())?;
    writeln!(f, "{:?}", self.report)?;
    std::fmt::Display::fmt(&self.trace, f)
  }
}
