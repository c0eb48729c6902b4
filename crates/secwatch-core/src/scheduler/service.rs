use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, error, info, Instrument};

use super::barrier::{FirstCycleBarrier, SteadyState};
use super::history::SharedHistory;
use super::shutdown::ShutdownCoordinator;
use super::throttle::DeliveryThrottle;
use super::worker::{PollWorker, WorkerContext, WorkerReport};
use crate::config::{AppConfig, SourceConfig};
use crate::feed::{FeedFetcher, FeedParser, ParserRegistry};
use crate::notify::{sink_from_config, NotificationBuilder, NotificationSink};
use crate::{Error, Result};

/// Runs one poll worker per configured source until shutdown
pub struct WatchService {
    config: Arc<AppConfig>,
    parsers: ParserRegistry,
    sink: Arc<dyn NotificationSink>,
}

impl WatchService {
    pub fn new(config: Arc<AppConfig>, parsers: ParserRegistry, sink: Arc<dyn NotificationSink>) -> Self {
        Self { config, parsers, sink }
    }

    /// Service with the HTTP parsers and the configured notification backend
    pub fn from_config(config: Arc<AppConfig>) -> Result<Self> {
        let fetcher = Arc::new(FeedFetcher::new(&config.http)?);
        let parsers = ParserRegistry::standard(fetcher);
        let sink = sink_from_config(&config.notification);
        Ok(Self::new(config, parsers, sink))
    }

    /// Pair every source with its parser. Fails before anything is spawned.
    fn bind_parsers(&self) -> Result<Vec<(Arc<SourceConfig>, Arc<dyn FeedParser>)>> {
        self.config
            .sources
            .iter()
            .map(|source| {
                let parser = self.parsers.get(source.source_type).ok_or_else(|| {
                    Error::Config(format!(
                        "no parser for type '{}' (source '{}')",
                        source.source_type, source.name
                    ))
                })?;
                Ok((Arc::new(source.clone()), parser))
            })
            .collect()
    }

    /// Spawn the workers, block until shutdown is requested, then wait for
    /// every worker to stop. Returns one report per source.
    pub async fn run(self, shutdown: ShutdownCoordinator) -> Result<Vec<WorkerReport>> {
        self.config.validate()?;
        let bindings = self.bind_parsers()?;

        let steady = SteadyState::new();
        let ctx = WorkerContext {
            history: SharedHistory::new(self.config.general.history_capacity),
            throttle: Arc::new(DeliveryThrottle::new(
                self.sink.clone(),
                NotificationBuilder::new(&self.config.notification),
                Duration::from_secs(self.config.notification.delay_secs),
            )),
            barrier: Arc::new(FirstCycleBarrier::new(bindings.len(), steady.clone())),
            steady,
        };

        let mut workers = JoinSet::new();
        for (source, parser) in bindings {
            info!(
                "Watching {} ({}, every {}s): {}",
                source.name, source.source_type, source.check_interval, source.feed
            );
            let span = tracing::info_span!("source", name = %source.name);
            let worker = PollWorker::new(source, parser, ctx.clone(), shutdown.subscribe());
            workers.spawn(worker.run().instrument(span));
        }
        debug!("Spawned {} workers", workers.len());

        shutdown.subscribe().cancelled().await;
        info!("Shutting down, waiting for {} workers", workers.len());

        let mut reports = Vec::with_capacity(workers.len());
        while let Some(result) = workers.join_next().await {
            match result {
                Ok(report) => {
                    debug!("Worker for {} joined", report.source);
                    reports.push(report);
                }
                Err(e) => error!("Worker task failed: {}", e),
            }
        }

        info!("All workers stopped");
        Ok(reports)
    }
}
