mod message;
mod sink;

pub use message::{Notification, NotificationBuilder, Urgency, ACKNOWLEDGE_ACTION};
pub use sink::{sink_from_config, CommandSink, LogSink, NotificationSink};
