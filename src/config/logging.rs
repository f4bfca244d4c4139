use serde::Deserialize;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoggingStyle {
  /// Compacts logs but it is readable enough
  #[default]
  Compact,
  /// Default formatter from [`tracing_subscriber`].
  Full,
  /// Makes logs pretty
  Pretty,
  /// Serializes logs into JSON data
  Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Logging {
  /// **Environment variable**: `HEADLINE_LOGGING_STYLE`
  #[serde(default)]
  pub style: LoggingStyle,
  /// This property filters logging events with the use of directives.
  /// By default, it will filter events that have `info` level.
  ///
  /// You may refer on how directives work and parse and its examples by going to:
  /// https://docs.rs/tracing-subscriber/0.3.18/tracing_subscriber/filter/struct.EnvFilter.html
  ///
  /// **Environment variable**: `HEADLINE_LOGGING_TARGETS`
  #[serde(default = "Logging::default_targets")]
  pub targets: String,
}

impl Logging {
  fn default_targets() -> String {
    "info".into()
  }
}

impl Default for Logging {
  fn default() -> Self {
    Self {
      style: LoggingStyle::default(),
      targets: Self::default_targets(),
    }
  }
}
