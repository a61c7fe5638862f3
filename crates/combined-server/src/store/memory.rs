//! In-memory store backend.
//!
//! Each store guards its state with a single `tokio::sync::RwLock`. Records live in
//! `BTreeMap`s keyed by a monotonically increasing id, so iteration order is
//! insertion order.

use super::{AlertStore, ProcessStore, StoreError};
use crate::model::{Alert, AlertStatus, Command, RoleKind, ServerRecord, TaskInstance, TaskState};
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct ProcessState {
    next_id: u64,
    servers: BTreeMap<u64, ServerRecord>,
    commands: VecDeque<Command>,
    tasks: BTreeMap<u64, TaskInstance>,
}

impl ProcessState {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryProcessStore {
    state: RwLock<ProcessState>,
    closed: AtomicBool,
}

impl MemoryProcessStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call fail with [`StoreError::Unavailable`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("process store closed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ProcessStore for MemoryProcessStore {
    async fn register_server(&self, kind: RoleKind, addr: SocketAddr) -> Result<u64, StoreError> {
        self.ensure_open()?;
        let mut state = self.state.write().await;
        let id = state.allocate_id();
        let now = SystemTime::now();
        state.servers.insert(
            id,
            ServerRecord {
                id,
                kind,
                addr,
                started_at: now,
                last_heartbeat: now,
            },
        );
        debug!(%kind, %addr, id, "Registered server");
        Ok(id)
    }

    async fn heartbeat(&self, server_id: u64) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut state = self.state.write().await;
        let record = state
            .servers
            .get_mut(&server_id)
            .ok_or_else(|| StoreError::NotFound(format!("server {server_id}")))?;
        record.last_heartbeat = SystemTime::now();
        Ok(())
    }

    async fn deregister_server(&self, server_id: u64) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.state
            .write()
            .await
            .servers
            .remove(&server_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("server {server_id}")))
    }

    async fn servers(&self, kind: RoleKind) -> Result<Vec<ServerRecord>, StoreError> {
        self.ensure_open()?;
        let state = self.state.read().await;
        Ok(state
            .servers
            .values()
            .filter(|s| s.kind == kind)
            .cloned()
            .collect())
    }

    async fn submit_command(
        &self,
        process_name: String,
        tasks: Vec<String>,
    ) -> Result<u64, StoreError> {
        self.ensure_open()?;
        let mut state = self.state.write().await;
        let id = state.allocate_id();
        state.commands.push_back(Command {
            id,
            process_name,
            tasks,
        });
        Ok(id)
    }

    async fn take_commands(&self) -> Result<Vec<Command>, StoreError> {
        self.ensure_open()?;
        let mut state = self.state.write().await;
        Ok(state.commands.drain(..).collect())
    }

    async fn queue_task(&self, command_id: u64, name: String) -> Result<u64, StoreError> {
        self.ensure_open()?;
        let mut state = self.state.write().await;
        let id = state.allocate_id();
        state.tasks.insert(
            id,
            TaskInstance {
                id,
                command_id,
                name,
                state: TaskState::Queued,
                host: None,
            },
        );
        Ok(id)
    }

    async fn claim_task(&self, host: &str) -> Result<Option<TaskInstance>, StoreError> {
        self.ensure_open()?;
        let mut state = self.state.write().await;
        let claimed = state
            .tasks
            .values_mut()
            .find(|t| t.state == TaskState::Queued)
            .map(|task| {
                task.state = TaskState::Running;
                task.host = Some(host.to_string());
                task.clone()
            });
        Ok(claimed)
    }

    async fn finish_task(&self, task_id: u64, state: TaskState) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut guard = self.state.write().await;
        let task = guard
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| StoreError::NotFound(format!("task {task_id}")))?;
        task.state = state;
        Ok(())
    }

    async fn tasks_for_command(&self, command_id: u64) -> Result<Vec<TaskInstance>, StoreError> {
        self.ensure_open()?;
        let state = self.state.read().await;
        Ok(state
            .tasks
            .values()
            .filter(|t| t.command_id == command_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct AlertState {
    next_id: u64,
    alerts: BTreeMap<u64, Alert>,
}

#[derive(Default)]
pub struct MemoryAlertStore {
    state: RwLock<AlertState>,
}

impl MemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn save_alert(&self, title: String, content: String) -> Result<u64, StoreError> {
        let mut state = self.state.write().await;
        state.next_id += 1;
        let id = state.next_id;
        state.alerts.insert(
            id,
            Alert {
                id,
                title,
                content,
                status: AlertStatus::Pending,
            },
        );
        Ok(id)
    }

    async fn pending_alerts(&self) -> Result<Vec<Alert>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .alerts
            .values()
            .filter(|a| a.status == AlertStatus::Pending)
            .cloned()
            .collect())
    }

    async fn mark_alert(&self, alert_id: u64, status: AlertStatus) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let alert = state
            .alerts
            .get_mut(&alert_id)
            .ok_or_else(|| StoreError::NotFound(format!("alert {alert_id}")))?;
        alert.status = status;
        Ok(())
    }

    async fn alerts(&self) -> Result<Vec<Alert>, StoreError> {
        Ok(self.state.read().await.alerts.values().cloned().collect())
    }
}
