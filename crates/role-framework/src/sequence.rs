//! # Startup Sequencer
//!
//! [`StartupSequence`] is the ordered, fail-fast invoker of every role's `start`.
//!
//! ## Algorithm
//!
//! 1. Walk the roles in insertion order.
//! 2. Await `start(ctx)` on each one before touching the next. Initialization side
//!    effects (binds, registrations) are therefore totally ordered, and any failure
//!    belongs to exactly one role.
//! 3. On the first `Err`, stop. Later roles are never invoked, and roles that already
//!    started are left running. Rollback is not the sequencer's business.
//! 4. When every role succeeded, return right away. The roles keep themselves alive.
//!
//! There is no timeout around `start`. A role that never returns holds up the whole
//! sequence.

use crate::error::{RoleError, StartupError};
use crate::role::Role;
use std::fmt;
use std::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};

/// Ordered list of roles waiting to be started.
pub struct StartupSequence<C> {
    roles: Vec<Box<dyn Role<C>>>,
}

/// Roles that completed `start`, in start order.
pub struct StartedRoles<C> {
    roles: Vec<Box<dyn Role<C>>>,
}

/// A failed sequence: the error plus whatever had already started before it.
pub struct StartupFailure<C> {
    pub error: StartupError,
    pub started: StartedRoles<C>,
}

impl<C: Send + Sync> Default for StartupSequence<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Send + Sync> StartupSequence<C> {
    pub fn new() -> Self {
        Self { roles: Vec::new() }
    }

    /// Append a role. Position in the sequence is the order of these calls.
    pub fn with_role(mut self, role: impl Role<C> + 'static) -> Self {
        self.roles.push(Box::new(role));
        self
    }

    pub fn push(&mut self, role: Box<dyn Role<C>>) {
        self.roles.push(role);
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.name().to_string()).collect()
    }

    /// Start every role in order, stopping at the first failure.
    pub async fn start_all(self, ctx: &C) -> Result<StartedRoles<C>, StartupError> {
        self.start_reporting(ctx).await.map_err(|failure| failure.error)
    }

    /// Like [`start_all`](Self::start_all), but a failure also hands back the roles
    /// that had already started so the caller can decide what to do with them.
    pub async fn start_reporting(self, ctx: &C) -> Result<StartedRoles<C>, StartupFailure<C>> {
        let total = self.roles.len();
        let span = info_span!("startup", roles = total);

        async move {
            let mut started = StartedRoles {
                roles: Vec::with_capacity(total),
            };

            for (position, mut role) in self.roles.into_iter().enumerate() {
                let name = role.name().to_string();
                info!(role = %name, position, "Starting role");
                let began = Instant::now();

                match role.start(ctx).await {
                    Ok(()) => {
                        let elapsed_ms = began.elapsed().as_millis() as u64;
                        info!(role = %name, elapsed_ms, "Role started");
                        started.roles.push(role);
                    }
                    Err(source) => {
                        error!(role = %name, position, error = %source, "Role failed to start");
                        let skipped = total - position - 1;
                        if skipped > 0 {
                            warn!(skipped, "Remaining roles will not be started");
                        }
                        return Err(StartupFailure {
                            error: StartupError::new(name, source),
                            started,
                        });
                    }
                }
            }

            info!(started = started.len(), "All roles started");
            Ok(started)
        }
        .instrument(span)
        .await
    }
}

impl<C: Send + Sync> StartedRoles<C> {
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.name().to_string()).collect()
    }

    /// Stop every role, last started first.
    pub async fn stop_all(self) {
        for mut role in self.roles.into_iter().rev() {
            info!(role = %role.name(), "Stopping role");
            role.stop().await;
        }
    }
}

impl<C: Send + Sync> fmt::Debug for StartedRoles<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl<C: Send + Sync> fmt::Debug for StartupFailure<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartupFailure")
            .field("error", &self.error)
            .field("started", &self.started)
            .finish()
    }
}

impl<C> StartupFailure<C> {
    pub fn role(&self) -> &str {
        &self.error.role
    }

    pub fn cause(&self) -> &RoleError {
        &self.error.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{CallLog, MockRole};

    #[tokio::test]
    async fn empty_sequence_succeeds() {
        let started = StartupSequence::<()>::new().start_all(&()).await.unwrap();
        assert!(started.is_empty());
    }

    #[tokio::test]
    async fn failure_reports_roles_started_before_it() {
        let log = CallLog::new();
        let mut a = MockRole::with_log("A", log.clone());
        let mut b = MockRole::with_log("B", log.clone());
        let mut c = MockRole::with_log("C", log.clone());
        a.expect_start().return_ok();
        b.expect_start().return_err("boom".into());

        let failure = StartupSequence::<()>::new()
            .with_role(a.role())
            .with_role(b.role())
            .with_role(c.role())
            .start_reporting(&())
            .await
            .unwrap_err();

        assert_eq!(failure.role(), "B");
        assert_eq!(failure.cause().to_string(), "boom");
        assert_eq!(failure.started.names(), vec!["A".to_string()]);
        assert_eq!(log.entries(), vec!["start:A", "start:B"]);

        a.verify();
        b.verify();
        c.verify();
    }

    #[tokio::test]
    async fn stop_all_runs_in_reverse_order() {
        let log = CallLog::new();
        let mut a = MockRole::with_log("A", log.clone());
        let mut b = MockRole::with_log("B", log.clone());
        a.expect_start().return_ok();
        b.expect_start().return_ok();

        let started = StartupSequence::<()>::new()
            .with_role(a.role())
            .with_role(b.role())
            .start_all(&())
            .await
            .unwrap();
        started.stop_all().await;

        assert_eq!(log.entries(), vec!["start:A", "start:B", "stop:B", "stop:A"]);
    }
}
