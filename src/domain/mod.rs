pub mod feed;
pub mod post;

pub use feed::FeedSource;
pub use post::Post;
