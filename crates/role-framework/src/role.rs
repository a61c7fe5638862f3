//! # Role Trait
//!
//! The `Role` trait is the one capability every server role exposes to the
//! orchestrator. It says nothing about how a role runs once it is up: one role may
//! spawn a single accept loop, another a handful of timers. The orchestrator only
//! ever sees `start`.
//!
//! # Contract
//!
//! - `Ok(())` from [`Role::start`] means initialization is complete (sockets bound,
//!   registrations written) and the role now runs on its own tasks.
//! - `Err(_)` means the role has already released whatever it acquired during the
//!   failed attempt. Nothing it bound may outlive the error.
//! - `start` is called at most once per role instance.
//!
//! # Context
//!
//! `C` is the shared context type. It is passed by reference so that no role can
//! take ownership of it. Roles that need a handle beyond `start` clone the handle out.

use crate::error::RoleError;
use async_trait::async_trait;

#[async_trait]
pub trait Role<C: Send + Sync>: Send {
    /// Identity used in logs and in [`StartupError`](crate::StartupError).
    fn name(&self) -> &str;

    /// Initialize and hand the role over to its own run loop.
    async fn start(&mut self, ctx: &C) -> Result<(), RoleError>;

    /// Stop a started role. The default does nothing.
    ///
    /// The sequencer never calls this. Only a process owner that chose to stop
    /// started roles does.
    async fn stop(&mut self) {}
}
