use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed parsing articles from '{source_name}': {message}")]
    ArticleParse { source_name: String, message: String },

    #[error("Feed fetch error: {0}")]
    FeedFetch(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Notification error: {0}")]
    Notification(String),
}

impl Error {
    /// Build a parse error for the named source
    pub fn article_parse(source_name: &str, message: impl ToString) -> Self {
        Error::ArticleParse {
            source_name: source_name.to_string(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
