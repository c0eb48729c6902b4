use std::process::{Output, Stdio};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::oneshot;

use super::message::Notification;
use crate::config::{NotificationBackend, NotificationConfig};
use crate::{Error, Result};

/// Delivers notifications to the user. Best effort; errors are reported,
/// never retried.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Build the sink selected by `notification.backend`
pub fn sink_from_config(config: &NotificationConfig) -> Arc<dyn NotificationSink> {
    match config.backend {
        NotificationBackend::Command => Arc::new(CommandSink::new(&config.command)),
        NotificationBackend::Log => Arc::new(LogSink),
    }
}

/// How long an action notification may take to fail before it counts as shown
const ACTION_EXIT_GRACE: Duration = Duration::from_millis(500);

/// Desktop notifications through a notify-send compatible executable
pub struct CommandSink {
    program: String,
}

impl CommandSink {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    fn args(notification: &Notification) -> Vec<String> {
        let mut args = vec![
            format!("--app-name={}", notification.app_name),
            format!("--icon={}", notification.icon),
            format!("--urgency={}", notification.urgency),
        ];
        if notification.timeout_ms > 0 {
            args.push(format!("--expire-time={}", notification.timeout_ms));
        }
        for (key, label) in &notification.actions {
            args.push(format!("--action={}={}", key, label));
        }
        args.push(notification.summary.clone());
        if !notification.body.is_empty() {
            args.push(notification.body.clone());
        }
        args
    }
}

/// Exit status check shared by both delivery paths; returns trimmed stdout
fn check_output(program: &str, output: std::io::Result<Output>) -> Result<String> {
    let output = output.map_err(|e| Error::Notification(format!("Failed to wait for {}: {}", program, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Notification(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            stderr.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[async_trait]
impl NotificationSink for CommandSink {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        let child = Command::new(&self.program)
            .args(Self::args(notification))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Notification(format!("Failed to spawn {}: {}", self.program, e)))?;

        if notification.actions.is_empty() {
            return check_output(&self.program, child.wait_with_output().await).map(|_| ());
        }

        // With actions the command stays alive until the user responds.
        // Failures within the grace period are returned, later ones logged.
        let (tx, rx) = oneshot::channel();
        let program = self.program.clone();
        let summary = notification.summary.clone();
        tokio::spawn(async move {
            let outcome = check_output(&program, child.wait_with_output().await);
            if let Ok(action) = &outcome {
                if !action.is_empty() {
                    tracing::info!("Notification '{}' acknowledged (action {})", summary, action);
                }
            }
            if let Err(Err(e)) = tx.send(outcome) {
                tracing::error!("Notification '{}' failed: {}", summary, e);
            }
        });

        match tokio::time::timeout(ACTION_EXIT_GRACE, rx).await {
            Ok(Ok(outcome)) => outcome.map(|_| ()),
            Ok(Err(_)) => Err(Error::Notification(format!("{} task ended without a result", self.program))),
            Err(_) => Ok(()),
        }
    }
}

/// Writes notifications to the log only, for headless hosts
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        tracing::warn!(
            urgency = %notification.urgency,
            "{} | {}",
            notification.summary,
            notification.body.replace('\n', " | ")
        );
        Ok(())
    }
}
