//! Request-level operations. Every operation takes the caller's
//! [`RequestContext`](crate::context::RequestContext) explicitly.
mod articles;
mod counters;
mod feed;
mod followings;
mod relations;

pub use self::articles::UserArticles;
pub use self::counters::CounterSyncEngine;
pub use self::feed::{FeedAssembler, FeedSources};
pub use self::followings::FollowingList;
pub use self::relations::RelationStateMachine;
