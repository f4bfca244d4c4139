//! Append-only sink for recommender exposure and client trace tokens.
use error_stack::{Result, ResultExt};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::config;

#[derive(Debug, Error)]
#[error("could not open trace log")]
pub struct TraceLogError;

/// Fire-and-forget writer of opaque trace tokens. Writing never fails
/// from the caller's point of view.
pub trait TraceLog: Send + Sync {
  fn write(&self, token: &str);
}

/// Opens the trace log described by the configuration.
pub async fn from_config(cfg: &config::TraceLog) -> Result<Arc<dyn TraceLog>, TraceLogError> {
  match cfg.path.as_deref() {
    Some(path) => Ok(Arc::new(FileTraceLog::open(path).await?)),
    None => Ok(Arc::new(TracingTraceLog)),
  }
}

/// Emits every token as an event on the `headline::trace` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTraceLog;

impl TraceLog for TracingTraceLog {
  fn write(&self, token: &str) {
    tracing::info!(target: "headline::trace", token);
  }
}

/// Appends one line per token to a file from a background task.
#[derive(Debug)]
pub struct FileTraceLog {
  sender: UnboundedSender<String>,
  task: JoinHandle<()>,
}

impl FileTraceLog {
  pub async fn open(path: &Path) -> Result<Self, TraceLogError> {
    let file = tokio::fs::OpenOptions::new()
      .create(true)
      .append(true)
      .open(path)
      .await
      .change_context(TraceLogError)
      .attach_printable_lazy(|| format!("path: {}", path.display()))?;

    let (sender, receiver) = unbounded_channel();
    let task = tokio::spawn(Self::run(file, receiver));
    Ok(Self { sender, task })
  }

  /// Stops accepting tokens and waits until every pending token
  /// is written.
  pub async fn close(self) {
    drop(self.sender);
    if let Err(error) = self.task.await {
      tracing::warn!(%error, "trace log writer stopped unexpectedly");
    }
  }

  async fn run(mut file: tokio::fs::File, mut receiver: UnboundedReceiver<String>) {
    while let Some(mut token) = receiver.recv().await {
      token.push('\n');
      if let Err(error) = file.write_all(token.as_bytes()).await {
        tracing::warn!(%error, "failed to write trace token");
        continue;
      }
      if let Err(error) = file.flush().await {
        tracing::warn!(%error, "failed to flush trace log");
      }
    }
  }
}

impl TraceLog for FileTraceLog {
  fn write(&self, token: &str) {
    if self.sender.send(token.to_string()).is_err() {
      tracing::warn!("trace log writer is gone, dropping token");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_file_trace_log_appends_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trace.log");
    std::fs::write(&path, "earlier\n").unwrap();

    let log = FileTraceLog::open(&path).await.unwrap();
    log.write("exp-1");
    log.write("click=2");
    log.close().await;

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!("earlier\nexp-1\nclick=2\n", contents);
  }

  #[tokio::test]
  async fn test_open_fails_on_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("trace.log");
    assert!(FileTraceLog::open(&path).await.is_err());
  }

  #[tokio::test]
  async fn test_from_config_defaults_to_tracing() {
    let log = from_config(&config::TraceLog::default()).await.unwrap();
    log.write("exp-1");
  }
}
