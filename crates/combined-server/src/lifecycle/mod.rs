//! # Combined Server Lifecycle
//!
//! [`CombinedServer`] is the process lifetime owner for combined deployment mode. It
//! builds every role, wires in what each one needs, and starts them in dependency
//! order.
//!
//! ## Startup
//!
//! ```text
//! Config ──► StoreResolver ──► SharedContext (once)
//!                                   │
//!          Master ─► Worker ─► LogService ─► AlertDispatcher
//! ```
//!
//! 1. **Resolve** the two persistence handles. A misconfigured backend fails here,
//!    before any socket is bound.
//! 2. **Start** the roles one at a time, in [`RoleKind::STARTUP_ORDER`]. The first
//!    failure ends the sequence, and [`OnFailure`](crate::config::OnFailure) decides
//!    whether roles that already started are stopped or left to process exit.
//! 3. **Return** once everything is up. The roles run on their own tasks from then on.
//!
//! ## Shutdown
//!
//! [`CombinedServer::shutdown`] stops the roles in reverse start order.
//! AlertDispatcher goes first and Master goes last.

use crate::config::Config;
use crate::context::{SharedContext, StoreResolver};
use crate::model::RoleKind;
use crate::roles::{
    AlertDispatcher, AlertDispatcherRole, LogServiceRole, MasterRole, NoopRunner, TaskRunner,
    WorkerRole,
};
use role_framework::{launch_with_policy, ContextProvider, LaunchError, Launched, StartupSequence};
use std::sync::Arc;
use tracing::info;

/// Pluggable pieces the owner builds once and hands to the roles.
pub struct Components {
    pub task_runner: Arc<dyn TaskRunner>,
    pub alert_dispatcher: AlertDispatcher,
}

impl Default for Components {
    fn default() -> Self {
        Self {
            task_runner: Arc::new(NoopRunner),
            alert_dispatcher: AlertDispatcher::default(),
        }
    }
}

/// Build the fixed-order startup sequence for the four roles.
pub fn startup_sequence(config: &Config, components: Components) -> StartupSequence<SharedContext> {
    let sequence = StartupSequence::new()
        .with_role(MasterRole::new(config.master.clone()))
        .with_role(WorkerRole::new(config.worker.clone(), components.task_runner))
        .with_role(LogServiceRole::new(config.log_service.clone()))
        .with_role(AlertDispatcherRole::new(
            config.alert.clone(),
            Arc::new(components.alert_dispatcher),
        ));

    debug_assert_eq!(
        sequence.names(),
        RoleKind::STARTUP_ORDER.map(|k| k.to_string()).to_vec()
    );
    sequence
}

/// All four roles running in this process.
pub struct CombinedServer {
    launched: Launched<SharedContext>,
}

impl CombinedServer {
    /// Launch with the default task runner and alert channels.
    pub async fn launch(config: &Config) -> Result<Self, LaunchError> {
        Self::launch_with(config, Components::default()).await
    }

    pub async fn launch_with(config: &Config, components: Components) -> Result<Self, LaunchError> {
        let provider = ContextProvider::new(StoreResolver::new(config.persistence.clone()));
        let sequence = startup_sequence(config, components);

        let launched =
            launch_with_policy(&provider, sequence, config.startup.on_failure.into()).await?;
        info!(roles = ?launched.roles.names(), "Combined server started");
        Ok(Self { launched })
    }

    pub fn context(&self) -> &SharedContext {
        &self.launched.context
    }

    pub fn role_names(&self) -> Vec<String> {
        self.launched.roles.names()
    }

    /// Stop every role in reverse start order.
    pub async fn shutdown(self) {
        info!("Shutting down combined server...");
        self.launched.shutdown().await;
        info!("Combined server shutdown complete.");
    }
}
