use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, FROM, USER_AGENT};
use reqwest::Client;

use crate::config::HttpConfig;
use crate::{Error, Result};

const MAX_FEED_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_USER_AGENT: &str = concat!("secwatch/", env!("CARGO_PKG_VERSION"));

/// HTTP client shared by all parsers
pub struct FeedFetcher {
    client: Client,
    identity: HeaderMap,
}

impl FeedFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(DEFAULT_USER_AGENT)
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            client,
            identity: Self::build_identity(config)?,
        })
    }

    /// Headers sent by sources that ask to identify themselves
    fn build_identity(config: &HttpConfig) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| Error::Config(format!("invalid http.user_agent: {}", e)))?;
        headers.insert(USER_AGENT, user_agent);

        if let Some(ref from) = config.from {
            let from = HeaderValue::from_str(from)
                .map_err(|e| Error::Config(format!("invalid http.from: {}", e)))?;
            headers.insert(FROM, from);
        }
        Ok(headers)
    }

    /// Download a feed body
    pub async fn fetch(&self, url: &str, identify: bool) -> Result<Bytes> {
        tracing::info!("Loading feed: {}", url);

        let mut request = self.client.get(url).header(
            ACCEPT,
            "application/rss+xml,application/atom+xml,application/xml;q=0.9,application/json;q=0.9,*/*;q=0.8",
        );
        if identify {
            request = request.headers(self.identity.clone());
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("feed: {} | status: {} | headers: {:?}", url, status, response.headers());

        if !status.is_success() {
            return Err(Error::FeedFetch(format!("HTTP {} for URL: {}", status, url)));
        }
        if let Some(length) = response.content_length() {
            ensure_content_size(length as usize, url)?;
        }

        let body = response.bytes().await?;
        ensure_content_size(body.len(), url)?;
        Ok(body)
    }
}

fn ensure_content_size(size: usize, url: &str) -> Result<()> {
    if size > MAX_FEED_BYTES {
        return Err(Error::FeedFetch(format!(
            "Feed too large ({} bytes) for URL: {}",
            size,
            url
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_headers() {
        let config = HttpConfig {
            from: Some("sec@example.org".to_string()),
            user_agent: "watcher/1.0".to_string(),
            request_timeout_secs: 5,
        };
        let headers = FeedFetcher::build_identity(&config).unwrap();

        assert_eq!(headers.get(FROM).unwrap(), "sec@example.org");
        assert_eq!(headers.get(USER_AGENT).unwrap(), "watcher/1.0");
    }

    #[test]
    fn test_identity_without_from() {
        let headers = FeedFetcher::build_identity(&HttpConfig::default()).unwrap();
        assert!(headers.get(FROM).is_none());
        assert!(headers.get(USER_AGENT).is_some());
    }

    #[test]
    fn test_invalid_header_is_config_error() {
        let config = HttpConfig {
            from: Some("bad\nvalue".to_string()),
            ..HttpConfig::default()
        };
        assert!(matches!(FeedFetcher::build_identity(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_content_size_limit() {
        assert!(ensure_content_size(1024, "https://example.org").is_ok());
        assert!(ensure_content_size(MAX_FEED_BYTES + 1, "https://example.org").is_err());
    }
}
