use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::barrier::{FirstCycleBarrier, SteadyState};
use super::history::SharedHistory;
use super::shutdown::ShutdownSignal;
use super::throttle::DeliveryThrottle;
use crate::config::SourceConfig;
use crate::feed::{Article, FeedParser};

/// State shared by every worker, built once by the watch service
#[derive(Clone)]
pub struct WorkerContext {
    pub history: SharedHistory,
    pub throttle: Arc<DeliveryThrottle>,
    pub barrier: Arc<FirstCycleBarrier>,
    pub steady: SteadyState,
}

/// What a worker did over its lifetime, returned when it stops
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub source: String,
    pub cycles: u64,
    pub failed_fetches: u64,
    pub new_articles: u64,
    pub delivered: u64,
}

/// Polls one source until shutdown:
/// fetch, filter new, notify (after the first cycle), wait.
pub struct PollWorker {
    source: Arc<SourceConfig>,
    parser: Arc<dyn FeedParser>,
    ctx: WorkerContext,
    shutdown: ShutdownSignal,
    report: WorkerReport,
}

impl PollWorker {
    pub fn new(
        source: Arc<SourceConfig>,
        parser: Arc<dyn FeedParser>,
        ctx: WorkerContext,
        shutdown: ShutdownSignal,
    ) -> Self {
        let report = WorkerReport {
            source: source.name.clone(),
            ..WorkerReport::default()
        };
        Self {
            source,
            parser,
            ctx,
            shutdown,
            report,
        }
    }

    pub async fn run(mut self) -> WorkerReport {
        let interval = Duration::from_secs(self.source.check_interval);
        let mut first_cycle = true;

        loop {
            let started = Instant::now();
            self.report.cycles += 1;

            let fresh = self.poll_once().await;
            self.dispatch(&fresh).await;

            if first_cycle {
                first_cycle = false;
                debug!("First run done for {}, waiting at barrier", self.source.name);
                match self.ctx.barrier.await_first_cycle(&mut self.shutdown).await {
                    Some(ordinal) => debug!("{} passed barrier (arrival {})", self.source.name, ordinal),
                    None => break,
                }
            }

            let Some(next_check) = started.checked_add(interval) else {
                warn!("{}: check interval out of range, idle until shutdown", self.source.name);
                self.shutdown.cancelled().await;
                break;
            };
            debug!("{}: next check at {}", self.source.name, wall_clock_label(next_check));

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep_until(next_check) => {}
            }
        }

        info!(
            "Stopped watching {} after {} cycles ({} delivered)",
            self.source.name, self.report.cycles, self.report.delivered
        );
        self.report
    }

    /// Fetch and keep the articles never seen before, recording them.
    /// Fetch errors yield no articles.
    async fn poll_once(&mut self) -> Vec<Article> {
        let candidates = match self.parser.fetch_and_parse(&self.source).await {
            Ok(articles) => articles,
            Err(e) => {
                self.report.failed_fetches += 1;
                error!("Failed fetching {}: {}", self.source.name, e);
                return Vec::new();
            }
        };

        if candidates.is_empty() {
            debug!("{}: feed returned no articles", self.source.name);
        }

        let fresh: Vec<Article> = candidates
            .into_iter()
            .map(Article::sanitized)
            .filter(|article| self.source.matches_keywords(&article.title))
            .filter(|article| self.ctx.history.check_and_record(&article.title))
            .collect();

        self.report.new_articles += fresh.len() as u64;
        fresh
    }

    async fn dispatch(&mut self, fresh: &[Article]) {
        let steady = self.ctx.steady.is_steady();

        for article in fresh {
            info!("NEW: [{}] | {} | {}", article.source, article.title.trim(), article.link.trim());

            if !steady {
                continue;
            }
            if self.shutdown.is_cancelled() {
                warn!("Shutdown requested, skipping remaining notifications for {}", self.source.name);
                break;
            }
            if self.ctx.throttle.deliver(article).await {
                self.report.delivered += 1;
            }
        }
    }
}

/// Local wall-clock time of a future instant, for logs
fn wall_clock_label(at: Instant) -> String {
    let remaining = at.saturating_duration_since(Instant::now());
    chrono::Duration::from_std(remaining)
        .ok()
        .and_then(|delta| chrono::Local::now().checked_add_signed(delta))
        .map(|time| time.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NotificationConfig;
    use crate::notify::NotificationBuilder;
    use crate::scheduler::ShutdownCoordinator;
    use crate::testing::{articles, source, Poll, RecordingSink, ScriptedParser};

    const DELAY: Duration = Duration::from_secs(1);

    fn context(parties: usize, sink: Arc<RecordingSink>) -> WorkerContext {
        let steady = SteadyState::new();
        WorkerContext {
            history: SharedHistory::new(1000),
            throttle: Arc::new(DeliveryThrottle::new(
                sink,
                NotificationBuilder::new(&NotificationConfig::default()),
                DELAY,
            )),
            barrier: Arc::new(FirstCycleBarrier::new(parties, steady.clone())),
            steady,
        }
    }

    fn spawn_worker(
        config: crate::config::SourceConfig,
        parser: Arc<ScriptedParser>,
        ctx: WorkerContext,
        coordinator: &ShutdownCoordinator,
    ) -> tokio::task::JoinHandle<WorkerReport> {
        let worker = PollWorker::new(Arc::new(config), parser, ctx, coordinator.subscribe());
        tokio::spawn(worker.run())
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_cycle_is_silent_then_notifies_new_only() {
        let parser = Arc::new(ScriptedParser::new().script(
            "feed",
            vec![
                Poll::Articles(articles("feed", &["old one", "old two"])),
                Poll::Articles(articles("feed", &["brand new", "old one", "old two"])),
            ],
        ));
        let sink = Arc::new(RecordingSink::new());
        let ctx = context(1, sink.clone());
        let coordinator = ShutdownCoordinator::new();

        let handle = spawn_worker(source("feed", 60, None), parser.clone(), ctx.clone(), &coordinator);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(parser.fetch_count("feed"), 1);
        assert!(sink.calls().is_empty());
        assert!(ctx.steady.is_steady());
        assert!(!ctx.history.is_new("old one"));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(parser.fetch_count("feed"), 2);
        assert_eq!(sink.titles(), vec!["brand new".to_string()]);

        coordinator.request_shutdown();
        let report = handle.await.unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(report.new_articles, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keyword_filtered_articles_not_recorded() {
        let parser = Arc::new(ScriptedParser::new().script(
            "Advisory-A",
            vec![
                Poll::Articles(Vec::new()),
                Poll::Articles(vec![
                    Article::new("x", "CVE-1 found", "/a"),
                    Article::new("y", "unrelated post", "/b"),
                ]),
            ],
        ));
        let sink = Arc::new(RecordingSink::new());
        let ctx = context(1, sink.clone());
        let coordinator = ShutdownCoordinator::new();

        let handle = spawn_worker(
            source("Advisory-A", 60, Some(&["CVE"])),
            parser,
            ctx.clone(),
            &coordinator,
        );

        tokio::time::sleep(Duration::from_secs(90)).await;
        coordinator.request_shutdown();
        handle.await.unwrap();

        assert_eq!(sink.titles(), vec!["CVE-1 found".to_string()]);
        // Filtered out, so it may still match on a later cycle
        assert!(ctx.history.is_new("unrelated post"));
        assert!(!ctx.history.is_new("CVE-1 found"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_keeps_worker_alive() {
        let parser = Arc::new(ScriptedParser::new().script(
            "flaky",
            vec![
                Poll::Articles(Vec::new()),
                Poll::Fail("connection reset".to_string()),
                Poll::Articles(articles("flaky", &["after outage"])),
            ],
        ));
        let sink = Arc::new(RecordingSink::new());
        let coordinator = ShutdownCoordinator::new();

        let handle = spawn_worker(source("flaky", 10, None), parser.clone(), context(1, sink.clone()), &coordinator);

        tokio::time::sleep(Duration::from_secs(25)).await;
        coordinator.request_shutdown();
        let report = handle.await.unwrap();

        assert_eq!(parser.fetch_count("flaky"), 3);
        assert_eq!(report.failed_fetches, 1);
        assert_eq!(sink.titles(), vec!["after outage".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_measured_from_cycle_start() {
        let parser = Arc::new(ScriptedParser::new().script(
            "busy",
            vec![
                Poll::Articles(Vec::new()),
                Poll::Articles(articles("busy", &["a", "b", "c"])),
                Poll::Articles(Vec::new()),
            ],
        ));
        let sink = Arc::new(RecordingSink::new());
        let coordinator = ShutdownCoordinator::new();

        let handle = spawn_worker(source("busy", 10, None), parser.clone(), context(1, sink.clone()), &coordinator);

        tokio::time::sleep(Duration::from_secs(25)).await;
        coordinator.request_shutdown();
        handle.await.unwrap();

        // Cycle 2 spends 3s in the throttle but cycle 3 still starts at t=20
        let fetches = parser.fetches();
        assert!(fetches.len() >= 3);
        assert_eq!(fetches[2].at - fetches[1].at, Duration::from_secs(10));
        assert_eq!(sink.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_wait() {
        let parser = Arc::new(ScriptedParser::new());
        let coordinator = ShutdownCoordinator::new();
        let handle = spawn_worker(
            source("slow", 3600, None),
            parser.clone(),
            context(1, Arc::new(RecordingSink::new())),
            &coordinator,
        );

        tokio::time::sleep(Duration::from_secs(5)).await;
        let requested = Instant::now();
        coordinator.request_shutdown();
        let report = handle.await.unwrap();

        assert!(Instant::now() - requested < Duration::from_secs(1));
        assert_eq!(report.cycles, 1);
        assert_eq!(parser.fetch_count("slow"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrepresentable_interval_waits_for_shutdown() {
        let parser = Arc::new(ScriptedParser::new());
        let coordinator = ShutdownCoordinator::new();
        let handle = spawn_worker(
            source("forever", i64::MAX as u64, None),
            parser.clone(),
            context(1, Arc::new(RecordingSink::new())),
            &coordinator,
        );

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!handle.is_finished());
        coordinator.request_shutdown();

        let report = handle.await.unwrap();
        assert_eq!(report.cycles, 1);
        assert_eq!(parser.fetch_count("forever"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_mid_delivery_finishes_delay_and_skips_rest() {
        let latency = Duration::from_secs(2);
        let parser = Arc::new(ScriptedParser::new().script(
            "burst",
            vec![
                Poll::Articles(Vec::new()),
                Poll::Articles(articles("burst", &["first", "second", "third"])),
            ],
        ));
        let sink = Arc::new(RecordingSink::with_latency(latency));
        let coordinator = ShutdownCoordinator::new();
        let handle = spawn_worker(source("burst", 10, None), parser, context(1, sink.clone()), &coordinator);

        // Second cycle starts at t=10, first delivery runs until t=12
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(coordinator.request_shutdown());

        let report = handle.await.unwrap();
        let stopped = Instant::now();

        let calls = sink.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(sink.titles(), vec!["first".to_string()]);
        assert!(stopped >= calls[0].finished + DELAY);
        assert!(stopped < calls[0].finished + DELAY + latency);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.new_articles, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_titles_sanitized_before_dedup() {
        let parser = Arc::new(ScriptedParser::new().script(
            "feed",
            vec![
                Poll::Articles(articles("feed", &["Caf\u{e9}\tbreach"])),
                Poll::Articles(articles("feed", &["Cafe\u{301} breach\n", "Other\r\nthing"])),
            ],
        ));
        let sink = Arc::new(RecordingSink::new());
        let coordinator = ShutdownCoordinator::new();
        let handle = spawn_worker(source("feed", 60, None), parser, context(1, sink.clone()), &coordinator);

        tokio::time::sleep(Duration::from_secs(90)).await;
        coordinator.request_shutdown();
        handle.await.unwrap();

        assert_eq!(sink.titles(), vec!["Otherthing".to_string()]);
    }
}
