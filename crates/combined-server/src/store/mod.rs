//! # Persistence Handles
//!
//! The two stores every role reaches the persistence layer through. Schema and
//! query design are out of scope here. The traits expose exactly the operations the
//! roles use, and [`memory`] provides the backend the combined server ships with.

pub mod memory;

pub use memory::{MemoryAlertStore, MemoryProcessStore};

use crate::model::{Alert, AlertStatus, Command, RoleKind, ServerRecord, TaskInstance, TaskState};
use async_trait::async_trait;
use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Process and workflow state: server registry, commands, task instances.
#[async_trait]
pub trait ProcessStore: Send + Sync {
    async fn register_server(&self, kind: RoleKind, addr: SocketAddr) -> Result<u64, StoreError>;

    async fn heartbeat(&self, server_id: u64) -> Result<(), StoreError>;

    async fn deregister_server(&self, server_id: u64) -> Result<(), StoreError>;

    async fn servers(&self, kind: RoleKind) -> Result<Vec<ServerRecord>, StoreError>;

    async fn submit_command(
        &self,
        process_name: String,
        tasks: Vec<String>,
    ) -> Result<u64, StoreError>;

    /// Remove and return every pending command.
    async fn take_commands(&self) -> Result<Vec<Command>, StoreError>;

    async fn queue_task(&self, command_id: u64, name: String) -> Result<u64, StoreError>;

    /// Move the oldest queued task to `Running` on behalf of `host`.
    async fn claim_task(&self, host: &str) -> Result<Option<TaskInstance>, StoreError>;

    async fn finish_task(&self, task_id: u64, state: TaskState) -> Result<(), StoreError>;

    async fn tasks_for_command(&self, command_id: u64) -> Result<Vec<TaskInstance>, StoreError>;
}

/// Alert state read by the dispatcher and written by the worker.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn save_alert(&self, title: String, content: String) -> Result<u64, StoreError>;

    async fn pending_alerts(&self) -> Result<Vec<Alert>, StoreError>;

    async fn mark_alert(&self, alert_id: u64, status: AlertStatus) -> Result<(), StoreError>;

    async fn alerts(&self) -> Result<Vec<Alert>, StoreError>;
}
