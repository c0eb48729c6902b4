use std::collections::HashMap;
use std::sync::Arc;

use super::fetcher::FeedFetcher;
use super::parser::{FeedParser, SyndicationParser};
use super::reddit::RedditParser;
use crate::config::SourceType;

/// Maps each source type to the parser that handles it
#[derive(Clone, Default)]
pub struct ParserRegistry {
    parsers: HashMap<SourceType, Arc<dyn FeedParser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry covering every supported source type over one HTTP client
    pub fn standard(fetcher: Arc<FeedFetcher>) -> Self {
        let syndication: Arc<dyn FeedParser> = Arc::new(SyndicationParser::new(fetcher.clone()));
        Self::new()
            .with(SourceType::Rss, syndication.clone())
            .with(SourceType::Xml, syndication.clone())
            .with(SourceType::Atom, syndication.clone())
            .with(SourceType::Gmane, syndication)
            .with(SourceType::Reddit, Arc::new(RedditParser::new(fetcher)))
    }

    pub fn with(mut self, source_type: SourceType, parser: Arc<dyn FeedParser>) -> Self {
        self.parsers.insert(source_type, parser);
        self
    }

    pub fn get(&self, source_type: SourceType) -> Option<Arc<dyn FeedParser>> {
        self.parsers.get(&source_type).cloned()
    }
}
