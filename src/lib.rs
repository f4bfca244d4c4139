//! Relation-state reconciliation and feed assembly for a content
//! feed backend.
//!
//! The two halves are [`services::RelationStateMachine`], which keeps
//! follow and blacklist relations consistent with the cached counters
//! under concurrent requests, and [`services::FeedAssembler`], which
//! merges cached top lists with recommender output.
pub mod app;
pub mod cache;
pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod logging;
pub mod recommend;
pub mod services;
pub mod store;
pub mod trace_log;
pub mod types;
pub mod util;

pub use app::App;
pub use context::RequestContext;

pub(crate) mod internal;

#[cfg(test)]
mod test_utils;
