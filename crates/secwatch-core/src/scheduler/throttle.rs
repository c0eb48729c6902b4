use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::feed::Article;
use crate::notify::{NotificationBuilder, NotificationSink};

/// Serializes deliveries across all workers and keeps a minimum gap after
/// each successful one.
pub struct DeliveryThrottle {
    sink: Arc<dyn NotificationSink>,
    builder: NotificationBuilder,
    delay: Duration,
    gate: Mutex<()>,
}

impl DeliveryThrottle {
    pub fn new(sink: Arc<dyn NotificationSink>, builder: NotificationBuilder, delay: Duration) -> Self {
        Self {
            sink,
            builder,
            delay,
            gate: Mutex::new(()),
        }
    }

    /// Deliver one article. The caller must already have recorded it as
    /// seen; a failed delivery is logged and not retried.
    ///
    /// Returns whether the sink accepted the notification.
    pub async fn deliver(&self, article: &Article) -> bool {
        let _permit = self.gate.lock().await;
        let notification = self.builder.build(article);

        match self.sink.notify(&notification).await {
            Ok(()) => {
                tracing::debug!(
                    "Notified [{}] {} (urgency {}), holding for {:?}",
                    article.source,
                    article.title,
                    notification.urgency,
                    self.delay
                );
                tokio::time::sleep(self.delay).await;
                true
            }
            Err(e) => {
                tracing::error!("Failed sending notification for [{}] {}: {}", article.source, article.title, e);
                false
            }
        }
    }
}
