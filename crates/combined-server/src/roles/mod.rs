//! # Server Roles
//!
//! The four roles hosted by the combined server. Each one implements
//! [`Role<SharedContext>`](role_framework::Role) the same way:
//!
//! 1. `start` does all fallible initialization up front: validate, bind, register.
//!    If a step fails, everything acquired so far is dropped before the error is
//!    returned.
//! 2. On success, it spawns a single run loop and keeps a [`RunningTask`] for it.
//! 3. `stop` signals the loop and waits for it to finish.
//!
//! | Role | Needs | Run loop |
//! |------|-------|----------|
//! | [`MasterRole`] | process store | heartbeat, expand commands into tasks, health endpoint |
//! | [`WorkerRole`] | process + alert store | heartbeat, claim and run tasks, health endpoint |
//! | [`LogServiceRole`] | - | serve log files over TCP |
//! | [`AlertDispatcherRole`] | alert store, its own dispatcher | deliver pending alerts |

pub mod alert;
pub mod log_service;
pub mod master;
pub mod worker;

pub use alert::{AlertChannel, AlertDispatcher, AlertDispatcherRole, AlertError, LogChannel};
pub use log_service::LogServiceRole;
pub use master::MasterRole;
pub use worker::{NoopRunner, TaskError, TaskRunner, WorkerRole};

use role_framework::RoleError;
use std::future::Future;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Handle on a role's spawned run loop.
///
/// Dropping it detaches the loop. Only [`RunningTask::stop`] ends it.
pub(crate) struct RunningTask {
    stop: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl RunningTask {
    /// Spawn `body`, passing it the stop signal it must watch.
    pub(crate) fn spawn<F, Fut>(body: F) -> Self
    where
        F: FnOnce(Arc<Notify>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let stop = Arc::new(Notify::new());
        let handle = tokio::spawn(body(Arc::clone(&stop)));
        Self { stop, handle }
    }

    pub(crate) async fn stop(self, role: &str) {
        self.stop.notify_one();
        if let Err(e) = self.handle.await {
            error!(role, error = ?e, "Run loop failed");
        }
    }
}

pub(crate) async fn bind(addr: &str) -> Result<TcpListener, RoleError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| RoleError::Bind {
            addr: addr.to_string(),
            source,
        })
}

/// Answers a health probe with a single `ok` line.
pub(crate) fn answer_health(mut stream: TcpStream) {
    tokio::spawn(async move {
        if let Err(e) = stream.write_all(b"ok\n").await {
            debug!(error = %e, "Health probe closed early");
        }
        let _ = stream.shutdown().await;
    });
}
