//! Plain data records shared by the roles and the stores.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::time::SystemTime;

/// The four roles hosted by the combined server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleKind {
    Master,
    Worker,
    LogService,
    AlertDispatcher,
}

impl RoleKind {
    /// Fixed startup order. Master primes process state before Worker polls it.
    pub const STARTUP_ORDER: [RoleKind; 4] = [
        RoleKind::Master,
        RoleKind::Worker,
        RoleKind::LogService,
        RoleKind::AlertDispatcher,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleKind::Master => "Master",
            RoleKind::Worker => "Worker",
            RoleKind::LogService => "LogService",
            RoleKind::AlertDispatcher => "AlertDispatcher",
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry entry for a running Master or Worker.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerRecord {
    pub id: u64,
    pub kind: RoleKind,
    pub addr: SocketAddr,
    pub started_at: SystemTime,
    pub last_heartbeat: SystemTime,
}

/// A request to run a workflow, consumed by the Master.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub id: u64,
    pub process_name: String,
    pub tasks: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl TaskState {
    pub fn is_finished(&self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInstance {
    pub id: u64,
    pub command_id: u64,
    pub name: String,
    pub state: TaskState,
    /// Worker host that claimed the task.
    pub host: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertStatus {
    Pending,
    Sent,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub id: u64,
    pub title: String,
    pub content: String,
    pub status: AlertStatus,
}
