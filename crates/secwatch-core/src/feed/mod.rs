mod fetcher;
mod models;
mod parser;
mod reddit;
mod registry;

pub use fetcher::FeedFetcher;
pub use models::{sanitize_title, Article};
pub use parser::{parse_feed, FeedParser, SyndicationParser};
pub use reddit::{parse_listing, RedditParser};
pub use registry::ParserRegistry;
