//! Worker role: claims queued tasks and hands them to a [`TaskRunner`].
//!
//! Task execution is pluggable. The combined server defaults to [`NoopRunner`],
//! which completes every task immediately. A failed task is marked `Failed` and
//! raises an alert through the alert store.

use super::{answer_health, bind, RunningTask};
use crate::config::WorkerConfig;
use crate::context::SharedContext;
use crate::model::{RoleKind, TaskInstance, TaskState};
use crate::store::{AlertStore, ProcessStore};
use async_trait::async_trait;
use role_framework::{Role, RoleError};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct TaskError(pub String);

/// Executes a single claimed task.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn run(&self, task: &TaskInstance) -> Result<(), TaskError>;
}

/// Completes every task without doing anything.
pub struct NoopRunner;

#[async_trait]
impl TaskRunner for NoopRunner {
    async fn run(&self, task: &TaskInstance) -> Result<(), TaskError> {
        debug!(task_id = task.id, name = %task.name, "Noop run");
        Ok(())
    }
}

pub struct WorkerRole {
    config: WorkerConfig,
    runner: Arc<dyn TaskRunner>,
    running: Option<Running>,
}

struct Running {
    task: RunningTask,
    store: Arc<dyn ProcessStore>,
    server_id: u64,
    addr: SocketAddr,
}

struct Loop {
    listener: TcpListener,
    store: Arc<dyn ProcessStore>,
    alerts: Arc<dyn AlertStore>,
    runner: Arc<dyn TaskRunner>,
    server_id: u64,
    host: String,
    heartbeat: Duration,
    fetch: Duration,
}

impl WorkerRole {
    pub fn new(config: WorkerConfig, runner: Arc<dyn TaskRunner>) -> Self {
        Self {
            config,
            runner,
            running: None,
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.addr)
    }
}

#[async_trait]
impl Role<SharedContext> for WorkerRole {
    fn name(&self) -> &str {
        RoleKind::Worker.as_str()
    }

    async fn start(&mut self, ctx: &SharedContext) -> Result<(), RoleError> {
        let listener = bind(&self.config.listen_addr).await?;
        let addr = listener
            .local_addr()
            .map_err(|e| RoleError::Other(format!("local address unavailable: {e}")))?;

        let store = ctx.process_store();
        let server_id = store
            .register_server(RoleKind::Worker, addr)
            .await
            .map_err(|e| RoleError::Registration(e.to_string()))?;

        let worker_loop = Loop {
            listener,
            store: Arc::clone(&store),
            alerts: ctx.alert_store(),
            runner: Arc::clone(&self.runner),
            server_id,
            host: self.config.host.clone(),
            heartbeat: Duration::from_millis(self.config.heartbeat_interval_ms),
            fetch: Duration::from_millis(self.config.fetch_interval_ms),
        };
        let task = RunningTask::spawn(move |stop| worker_loop.run(stop));

        info!(%addr, server_id, host = %self.config.host, "Worker listening");
        self.running = Some(Running {
            task,
            store,
            server_id,
            addr,
        });
        Ok(())
    }

    async fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.task.stop(self.name()).await;
            if let Err(e) = running.store.deregister_server(running.server_id).await {
                warn!(error = %e, "Worker deregistration failed");
            }
        }
    }
}

impl Loop {
    async fn run(self, stop: Arc<Notify>) {
        let mut heartbeat = tokio::time::interval(self.heartbeat);
        let mut fetch = tokio::time::interval(self.fetch);
        loop {
            tokio::select! {
                _ = stop.notified() => break,
                _ = heartbeat.tick() => {
                    if let Err(e) = self.store.heartbeat(self.server_id).await {
                        warn!(error = %e, "Worker heartbeat failed");
                    }
                }
                _ = fetch.tick() => self.drain_queue().await,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "Worker health probe");
                        answer_health(stream);
                    }
                    Err(e) => warn!(error = %e, "Worker accept failed"),
                },
            }
        }
        info!("Worker shutdown");
    }

    async fn drain_queue(&self) {
        loop {
            match self.store.claim_task(&self.host).await {
                Ok(Some(task)) => self.execute(task).await,
                Ok(None) => return,
                Err(e) => {
                    warn!(error = %e, "Failed to claim task");
                    return;
                }
            }
        }
    }

    async fn execute(&self, task: TaskInstance) {
        let state = match self.runner.run(&task).await {
            Ok(()) => {
                info!(task_id = task.id, name = %task.name, "Task succeeded");
                TaskState::Succeeded
            }
            Err(e) => {
                warn!(task_id = task.id, name = %task.name, error = %e, "Task failed");
                let title = format!("Task {} failed", task.name);
                let content = format!("task {} of command {}: {e}", task.id, task.command_id);
                if let Err(e) = self.alerts.save_alert(title, content).await {
                    warn!(task_id = task.id, error = %e, "Failed to raise alert");
                }
                TaskState::Failed
            }
        };
        if let Err(e) = self.store.finish_task(task.id, state).await {
            warn!(task_id = task.id, error = %e, "Failed to record task state");
        }
    }
}
