use thiserror::Error;

mod database;
mod feed;
mod logging;
mod server;

pub use database::{Database, DbPoolConfig};
pub use feed::{Cache, FailurePolicy, Feed, Recommender, TraceLog};
pub use logging::{Logging, LoggingStyle};
pub use server::Server;

#[derive(Debug, Error)]
#[error("Failed to load configuration")]
pub struct ParseError;

#[derive(Debug, Error)]
#[error("Invalid configuration")]
pub struct InvalidConfig;
