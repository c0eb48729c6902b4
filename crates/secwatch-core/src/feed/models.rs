use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// A post discovered in a feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Name of the configured source it came from
    pub source: String,
    pub title: String,
    pub link: String,
}

impl Article {
    pub fn new(source: impl Into<String>, title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            title: title.into(),
            link: link.into(),
        }
    }

    /// Same article with its title in canonical form, see [`sanitize_title`]
    pub fn sanitized(self) -> Self {
        Self {
            title: sanitize_title(&self.title),
            ..self
        }
    }
}

/// Canonical form of a title, used for both display and deduplication.
///
/// Tabs and form feeds become spaces, carriage returns and line feeds are
/// dropped, and the result is NFC normalized.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter_map(|c| match c {
            '\t' | '\u{0c}' => Some(' '),
            '\r' | '\n' => None,
            c => Some(c),
        })
        .nfc()
        .collect()
}
