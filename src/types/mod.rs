pub mod article;
pub mod error;
pub mod id;
pub mod paging;
pub mod relation;
pub mod user;

pub use error::Error;
pub use id::{ArticleId, ChannelId, UserId};
pub use paging::{Paging, PagingBounds};
pub use relation::{CounterDelta, RelationPair, RelationState, StateFilter};
