use error_stack::{Result, ResultExt};
use std::io::IsTerminal;
use thiserror::Error;
use tracing_error::ErrorLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config;

mod formatter;
pub use self::formatter::Formatter;

#[derive(Debug, Error)]
#[error("Failed to initialize logging")]
pub struct InitError;

/// Installs the global subscriber.
///
/// [`ErrorLayer`] is always installed so request errors carry
/// their span traces.
pub fn init(config: &config::Logging) -> Result<(), InitError> {
  let filter = EnvFilter::try_new(&config.targets)
    .change_context(InitError)
    .attach_printable_lazy(|| format!("invalid logging targets {:?}", config.targets))?;

  let registry = tracing_subscriber::registry()
    .with(filter)
    .with(ErrorLayer::default());

  let ansi = std::io::stderr().is_terminal();
  let result = if let Some(formatter) = Formatter::from_style(config.style, ansi) {
    registry
      .with(
        tracing_subscriber::fmt::layer()
          .event_format(formatter)
          .with_writer(std::io::stderr),
      )
      .try_init()
  } else {
    registry
      .with(
        tracing_subscriber::fmt::layer()
          .json()
          .with_writer(std::io::stderr),
      )
      .try_init()
  };

  result.change_context(InitError)
}
