use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use secwatch_core::{AppConfig, ShutdownCoordinator, WatchService};

/// SIGINT/SIGTERM listener, registered before the watcher starts
struct TerminationSignal {
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl TerminationSignal {
    fn install() -> std::io::Result<Self> {
        Ok(Self {
            #[cfg(unix)]
            terminate: tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?,
        })
    }

    /// Resolves on SIGINT or SIGTERM. If Ctrl+C cannot be watched the
    /// remaining signal is still honored.
    #[cfg(unix)]
    async fn recv(mut self) {
        let ctrl_c_error = tokio::select! {
            result = tokio::signal::ctrl_c() => result.err(),
            _ = self.terminate.recv() => None,
        };
        if let Some(e) = ctrl_c_error {
            warn!("Cannot listen for Ctrl+C, waiting for SIGTERM: {}", e);
            self.terminate.recv().await;
        }
    }

    #[cfg(not(unix))]
    async fn recv(self) {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl+C, stop the process externally: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

/// Watch until interrupted
pub async fn run(config: Arc<AppConfig>) -> Result<()> {
    let service = WatchService::from_config(config.clone())?;
    let shutdown = ShutdownCoordinator::new();

    let signal = TerminationSignal::install().context("Failed to register signal handlers")?;

    // Signal task only flips the flag; the service drains the workers
    let coordinator = shutdown.clone();
    tokio::spawn(async move {
        signal.recv().await;
        info!("Received shutdown signal");
        println!("secwatch shutting down..");
        coordinator.request_shutdown();
    });

    println!(
        "Watching {} sources (PID: {}). Press Ctrl+C to stop.",
        config.sources.len(),
        std::process::id()
    );

    let reports = service.run(shutdown).await?;
    let delivered: u64 = reports.iter().map(|r| r.delivered).sum();
    info!("Stopped: {} notifications delivered this session", delivered);

    Ok(())
}
