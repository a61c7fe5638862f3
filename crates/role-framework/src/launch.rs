//! Process-level composition: resolve the context once, then run the sequence.

use crate::context::{ContextProvider, ContextResolver};
use crate::error::LaunchError;
use crate::sequence::{StartedRoles, StartupFailure, StartupSequence};
use std::sync::Arc;
use tracing::{info, warn};

/// What to do with already-started roles when a later role fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Leave them alone. Process exit reclaims them.
    #[default]
    Exit,
    /// Stop them in reverse start order before reporting the failure.
    StopStarted,
}

/// A successfully launched process: the shared context and its running roles.
pub struct Launched<C> {
    pub context: Arc<C>,
    pub roles: StartedRoles<C>,
}

impl<C: Send + Sync> Launched<C> {
    pub async fn shutdown(self) {
        self.roles.stop_all().await;
        info!("All roles stopped");
    }
}

/// Resolve the shared context and start every role, using [`FailurePolicy::Exit`].
pub async fn launch<R: ContextResolver>(
    provider: &ContextProvider<R>,
    sequence: StartupSequence<R::Context>,
) -> Result<Launched<R::Context>, LaunchError> {
    launch_with_policy(provider, sequence, FailurePolicy::Exit).await
}

/// Resolve the shared context and start every role.
///
/// A resolution failure returns before any role is invoked.
pub async fn launch_with_policy<R: ContextResolver>(
    provider: &ContextProvider<R>,
    sequence: StartupSequence<R::Context>,
    policy: FailurePolicy,
) -> Result<Launched<R::Context>, LaunchError> {
    let context = provider.resolve().await?;

    match sequence.start_reporting(&context).await {
        Ok(roles) => Ok(Launched { context, roles }),
        Err(StartupFailure { error, started }) => {
            match policy {
                FailurePolicy::Exit => {
                    if !started.is_empty() {
                        warn!(
                            started = ?started.names(),
                            "Leaving started roles to be reclaimed by process exit"
                        );
                    }
                }
                FailurePolicy::StopStarted => started.stop_all().await,
            }
            Err(error.into())
        }
    }
}
