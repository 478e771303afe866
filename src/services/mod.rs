pub mod feed;
pub mod providers;
pub mod retry;

pub use feed::{FeedMerger, FeedSources};
