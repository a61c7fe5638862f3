//! Alert dispatcher role.
//!
//! The [`AlertDispatcher`] (the set of delivery channels) is built once by the
//! process owner and passed into [`AlertDispatcherRole::new`]. The role reads the
//! alert store from the shared context and polls it for pending alerts.

use super::RunningTask;
use crate::config::AlertConfig;
use crate::context::SharedContext;
use crate::model::{Alert, AlertStatus, RoleKind};
use crate::store::AlertStore;
use async_trait::async_trait;
use role_framework::{Role, RoleError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{info, warn};

#[derive(Debug, Clone, thiserror::Error)]
#[error("channel {channel}: {message}")]
pub struct AlertError {
    pub channel: String,
    pub message: String,
}

/// A delivery channel for alerts.
#[async_trait]
pub trait AlertChannel: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, alert: &Alert) -> Result<(), AlertError>;
}

/// Delivers alerts as `tracing` events.
pub struct LogChannel;

#[async_trait]
impl AlertChannel for LogChannel {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, alert: &Alert) -> Result<(), AlertError> {
        warn!(alert_id = alert.id, title = %alert.title, content = %alert.content, "ALERT");
        Ok(())
    }
}

/// Fans each alert out to every configured channel.
pub struct AlertDispatcher {
    channels: Vec<Box<dyn AlertChannel>>,
}

impl Default for AlertDispatcher {
    fn default() -> Self {
        Self::new().with_channel(LogChannel)
    }
}

impl AlertDispatcher {
    /// A dispatcher with no channels.
    pub fn new() -> Self {
        Self {
            channels: Vec::new(),
        }
    }

    pub fn with_channel(mut self, channel: impl AlertChannel + 'static) -> Self {
        self.channels.push(Box::new(channel));
        self
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Send one alert through every channel. Every channel is tried even after a failure.
    pub async fn dispatch(&self, alert: &Alert) -> Result<(), AlertError> {
        let mut first_error = None;
        for channel in &self.channels {
            if let Err(e) = channel.send(alert).await {
                warn!(alert_id = alert.id, channel = channel.name(), error = %e, "Alert delivery failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Deliver every pending alert and record the outcome. Returns how many were sent.
    pub async fn dispatch_pending(&self, store: &dyn AlertStore) -> usize {
        let pending = match store.pending_alerts().await {
            Ok(pending) => pending,
            Err(e) => {
                warn!(error = %e, "Failed to load pending alerts");
                return 0;
            }
        };

        let mut sent = 0;
        for alert in pending {
            let status = match self.dispatch(&alert).await {
                Ok(()) => {
                    sent += 1;
                    AlertStatus::Sent
                }
                Err(_) => AlertStatus::Failed,
            };
            if let Err(e) = store.mark_alert(alert.id, status).await {
                warn!(alert_id = alert.id, error = %e, "Failed to record alert status");
            }
        }
        sent
    }
}

pub struct AlertDispatcherRole {
    config: AlertConfig,
    dispatcher: Arc<AlertDispatcher>,
    running: Option<RunningTask>,
}

impl AlertDispatcherRole {
    pub fn new(config: AlertConfig, dispatcher: Arc<AlertDispatcher>) -> Self {
        Self {
            config,
            dispatcher,
            running: None,
        }
    }
}

#[async_trait]
impl Role<SharedContext> for AlertDispatcherRole {
    fn name(&self) -> &str {
        RoleKind::AlertDispatcher.as_str()
    }

    async fn start(&mut self, ctx: &SharedContext) -> Result<(), RoleError> {
        if self.dispatcher.channel_count() == 0 {
            return Err(RoleError::Config("no alert channels configured".into()));
        }

        let store = ctx.alert_store();
        let dispatcher = Arc::clone(&self.dispatcher);
        let interval = Duration::from_millis(self.config.poll_interval_ms);
        self.running = Some(RunningTask::spawn(move |stop| {
            run(dispatcher, store, interval, stop)
        }));

        info!(
            channels = self.dispatcher.channel_count(),
            poll_interval_ms = self.config.poll_interval_ms,
            "Alert dispatcher started"
        );
        Ok(())
    }

    async fn stop(&mut self) {
        if let Some(task) = self.running.take() {
            task.stop(self.name()).await;
        }
    }
}

async fn run(
    dispatcher: Arc<AlertDispatcher>,
    store: Arc<dyn AlertStore>,
    interval: Duration,
    stop: Arc<Notify>,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = stop.notified() => break,
            _ = ticker.tick() => {
                let sent = dispatcher.dispatch_pending(store.as_ref()).await;
                if sent > 0 {
                    info!(sent, "Alerts delivered");
                }
            }
        }
    }
    info!("Alert dispatcher shutdown");
}
