use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::fetcher::FeedFetcher;
use super::models::Article;
use super::parser::FeedParser;
use crate::config::SourceConfig;
use crate::{Error, Result};

const REDDIT_BASE_URL: &str = "https://www.reddit.com";

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<Submission>,
}

#[derive(Debug, Deserialize)]
struct Submission {
    data: SubmissionData,
}

#[derive(Debug, Deserialize)]
struct SubmissionData {
    title: String,
    permalink: String,
}

/// Subreddit JSON listings (`/r/<name>/new.json`)
pub struct RedditParser {
    fetcher: Arc<FeedFetcher>,
}

impl RedditParser {
    pub fn new(fetcher: Arc<FeedFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl FeedParser for RedditParser {
    async fn fetch_and_parse(&self, source: &SourceConfig) -> Result<Vec<Article>> {
        let body = self.fetcher.fetch(&source.feed, source.identify).await?;
        parse_listing(&body, &source.name)
    }
}

/// Parse a listing body; permalinks are made absolute
pub fn parse_listing(content: &[u8], source_name: &str) -> Result<Vec<Article>> {
    let listing: Listing =
        serde_json::from_slice(content).map_err(|e| Error::article_parse(source_name, e))?;

    Ok(listing
        .data
        .children
        .into_iter()
        .map(|submission| {
            let SubmissionData { title, permalink } = submission.data;
            Article::new(source_name, title, format!("{}{}", REDDIT_BASE_URL, permalink))
        })
        .collect())
}
