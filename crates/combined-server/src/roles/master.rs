//! Master role: owns the server registry entry and turns commands into queued tasks.

use super::{answer_health, bind, RunningTask};
use crate::config::MasterConfig;
use crate::context::SharedContext;
use crate::model::{Command, RoleKind};
use crate::store::ProcessStore;
use async_trait::async_trait;
use role_framework::{Role, RoleError};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

pub struct MasterRole {
    config: MasterConfig,
    running: Option<Running>,
}

struct Running {
    task: RunningTask,
    store: Arc<dyn ProcessStore>,
    server_id: u64,
    addr: SocketAddr,
}

impl MasterRole {
    pub fn new(config: MasterConfig) -> Self {
        Self {
            config,
            running: None,
        }
    }

    /// Bound address once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.addr)
    }
}

#[async_trait]
impl Role<SharedContext> for MasterRole {
    fn name(&self) -> &str {
        RoleKind::Master.as_str()
    }

    async fn start(&mut self, ctx: &SharedContext) -> Result<(), RoleError> {
        let listener = bind(&self.config.listen_addr).await?;
        let addr = listener
            .local_addr()
            .map_err(|e| RoleError::Other(format!("local address unavailable: {e}")))?;

        let store = ctx.process_store();
        // The listener is dropped on this error path, releasing the port.
        let server_id = store
            .register_server(RoleKind::Master, addr)
            .await
            .map_err(|e| RoleError::Registration(e.to_string()))?;

        let interval = Duration::from_millis(self.config.heartbeat_interval_ms);
        let loop_store = Arc::clone(&store);
        let task = RunningTask::spawn(move |stop| run(listener, loop_store, server_id, interval, stop));

        info!(%addr, server_id, "Master listening");
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
                warn!(error = %e, "Master deregistration failed");
            }
        }
    }
}

async fn run(
    listener: TcpListener,
    store: Arc<dyn ProcessStore>,
    server_id: u64,
    interval: Duration,
    stop: Arc<Notify>,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = stop.notified() => break,
            _ = ticker.tick() => {
                if let Err(e) = store.heartbeat(server_id).await {
                    warn!(error = %e, "Master heartbeat failed");
                }
                match store.take_commands().await {
                    Ok(commands) => {
                        for command in commands {
                            dispatch(store.as_ref(), command).await;
                        }
                    }
                    Err(e) => warn!(error = %e, "Failed to load commands"),
                }
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "Master health probe");
                    answer_health(stream);
                }
                Err(e) => warn!(error = %e, "Master accept failed"),
            },
        }
    }
    info!("Master shutdown");
}

async fn dispatch(store: &dyn ProcessStore, command: Command) {
    let mut queued = 0usize;
    for name in command.tasks {
        match store.queue_task(command.id, name).await {
            Ok(_) => queued += 1,
            Err(e) => warn!(command_id = command.id, error = %e, "Failed to queue task"),
        }
    }
    info!(
        command_id = command.id,
        process = %command.process_name,
        queued,
        "Command dispatched"
    );
}
