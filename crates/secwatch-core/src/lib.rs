pub mod config;
pub mod error;
pub mod feed;
pub mod notify;
pub mod scheduler;

#[cfg(test)]
mod testing;

pub use config::{AppConfig, SourceConfig, SourceType};
pub use error::{Error, Result};
pub use scheduler::{ShutdownCoordinator, WatchService};
