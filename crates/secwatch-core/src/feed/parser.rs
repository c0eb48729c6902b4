use std::sync::Arc;

use async_trait::async_trait;
use feed_rs::model::Link;
use feed_rs::parser;

use super::fetcher::FeedFetcher;
use super::models::Article;
use crate::config::SourceConfig;
use crate::{Error, Result};

/// Turns one source's feed into candidate articles.
///
/// Implementations return every entry in feed order; keyword filtering,
/// sanitization and deduplication happen in the poll worker.
#[async_trait]
pub trait FeedParser: Send + Sync {
    async fn fetch_and_parse(&self, source: &SourceConfig) -> Result<Vec<Article>>;
}

/// RSS 0.9x/1.0/2.0 and Atom feeds
pub struct SyndicationParser {
    fetcher: Arc<FeedFetcher>,
}

impl SyndicationParser {
    pub fn new(fetcher: Arc<FeedFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl FeedParser for SyndicationParser {
    async fn fetch_and_parse(&self, source: &SourceConfig) -> Result<Vec<Article>> {
        let body = self.fetcher.fetch(&source.feed, source.identify).await?;
        parse_feed(&body, &source.name)
    }
}

/// Parse RSS/Atom content into articles attributed to `source_name`
pub fn parse_feed(content: &[u8], source_name: &str) -> Result<Vec<Article>> {
    let feed = parser::parse(content).map_err(|e| Error::article_parse(source_name, e))?;

    let articles = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let title = entry.title.map(|t| t.content);
            let link = preferred_link(&entry.links);
            match (title, link) {
                (Some(title), Some(link)) => Some(Article::new(source_name, title, link)),
                _ => {
                    tracing::debug!("Skipping incomplete entry '{}' in {}", entry.id, source_name);
                    None
                }
            }
        })
        .collect();

    Ok(articles)
}

/// The `alternate` link if the entry marks one, otherwise the first
fn preferred_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| l.rel.as_deref() == Some("alternate"))
        .or_else(|| links.first())
        .map(|l| l.href.trim().to_string())
}
