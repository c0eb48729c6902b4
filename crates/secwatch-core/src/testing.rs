//! Test doubles for parsers and sinks.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::config::{SourceConfig, SourceType};
use crate::feed::{Article, FeedParser};
use crate::notify::{Notification, NotificationSink};
use crate::{Error, Result};

pub fn source(name: &str, check_interval: u64, keywords: Option<&[&str]>) -> SourceConfig {
    SourceConfig {
        name: name.to_string(),
        feed: format!("https://example.org/{name}.rss"),
        source_type: SourceType::Rss,
        check_interval,
        keywords: keywords.map(|k| k.iter().map(|s| s.to_string()).collect()),
        identify: false,
    }
}

pub fn articles(source: &str, titles: &[&str]) -> Vec<Article> {
    titles
        .iter()
        .enumerate()
        .map(|(i, title)| Article::new(source, *title, format!("/{source}/{i}")))
        .collect()
}

#[derive(Debug, Clone)]
pub enum Poll {
    Articles(Vec<Article>),
    /// Articles returned after the fetch has taken this long
    Delayed(Duration, Vec<Article>),
    Fail(String),
}

#[derive(Debug, Clone)]
pub struct FetchRecord {
    pub source: String,
    pub at: Instant,
}

/// Parser returning scripted results per source, one entry per poll. The
/// last entry repeats once the script runs out.
#[derive(Default)]
pub struct ScriptedParser {
    scripts: Mutex<HashMap<String, VecDeque<Poll>>>,
    last: Mutex<HashMap<String, Poll>>,
    fetches: Mutex<Vec<FetchRecord>>,
}

impl ScriptedParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, source: &str, polls: Vec<Poll>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(source.to_string(), polls.into_iter().collect());
        self
    }

    pub fn fetches(&self) -> Vec<FetchRecord> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn fetch_count(&self, source: &str) -> usize {
        self.fetches().iter().filter(|f| f.source == source).count()
    }
}

#[async_trait]
impl FeedParser for ScriptedParser {
    async fn fetch_and_parse(&self, source: &SourceConfig) -> Result<Vec<Article>> {
        self.fetches.lock().unwrap().push(FetchRecord {
            source: source.name.clone(),
            at: Instant::now(),
        });

        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&source.name)
            .and_then(|script| script.pop_front());
        let poll = match next {
            Some(poll) => {
                self.last.lock().unwrap().insert(source.name.clone(), poll.clone());
                poll
            }
            None => self
                .last
                .lock()
                .unwrap()
                .get(&source.name)
                .cloned()
                .unwrap_or(Poll::Articles(Vec::new())),
        };

        match poll {
            Poll::Articles(articles) => Ok(articles),
            Poll::Delayed(latency, articles) => {
                tokio::time::sleep(latency).await;
                Ok(articles)
            }
            Poll::Fail(message) => Err(Error::article_parse(&source.name, message)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeliveryCall {
    pub notification: Notification,
    pub started: Instant,
    pub finished: Instant,
}

/// Sink that records every call, optionally slow or failing
#[derive(Default)]
pub struct RecordingSink {
    latency: Duration,
    fail: bool,
    calls: Mutex<Vec<DeliveryCall>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<DeliveryCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Article titles, assuming the default "{source}\n{title}\n{link}" template
    pub fn titles(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|c| c.notification.body.lines().next().unwrap_or_default().to_string())
            .collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        let started = Instant::now();
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.calls.lock().unwrap().push(DeliveryCall {
            notification: notification.clone(),
            started,
            finished: Instant::now(),
        });

        if self.fail {
            Err(Error::Notification("notification bus unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}
