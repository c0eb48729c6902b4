use std::fmt;

use crate::config::NotificationConfig;
use crate::feed::Article;

/// Action key and label attached to notifications that need acknowledgement
pub const ACKNOWLEDGE_ACTION: (&str, &str) = ("0", "Acknowledge");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Normal,
    Critical,
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Urgency::Normal => "normal",
            Urgency::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// A rendered notification, ready for a sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub app_name: String,
    pub icon: String,
    pub summary: String,
    pub body: String,
    pub urgency: Urgency,
    /// (key, label) pairs
    pub actions: Vec<(String, String)>,
    /// 0 leaves expiry to the notification server
    pub timeout_ms: u32,
}

/// Renders articles into notifications using the configured template
#[derive(Debug, Clone)]
pub struct NotificationBuilder {
    app_name: String,
    icon: String,
    template: String,
    timeout_ms: u32,
    ack_keywords: Vec<String>,
}

impl NotificationBuilder {
    pub fn new(config: &NotificationConfig) -> Self {
        Self {
            app_name: config.app_name.clone(),
            icon: config.app_icon.clone(),
            template: config.template.clone(),
            timeout_ms: config.timeout_ms,
            ack_keywords: config
                .ack_keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    fn requires_ack(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.ack_keywords.iter().any(|k| title.contains(k.as_str()))
    }

    pub fn build(&self, article: &Article) -> Notification {
        let message = self
            .template
            .replace("{source}", &article.source)
            .replace("{title}", &article.title)
            .replace("{link}", &article.link);

        let mut lines = message.lines();
        let summary = lines.next().unwrap_or_default().to_string();
        let body = lines.collect::<Vec<_>>().join("\n");

        let (urgency, actions) = if self.requires_ack(&article.title) {
            let (key, label) = ACKNOWLEDGE_ACTION;
            (Urgency::Critical, vec![(key.to_string(), label.to_string())])
        } else {
            (Urgency::Normal, Vec::new())
        };

        Notification {
            app_name: self.app_name.clone(),
            icon: self.icon.clone(),
            summary,
            body,
            urgency,
            actions,
            timeout_ms: self.timeout_ms,
        }
    }
}
