//! # Role Framework
//!
//! Building blocks for running several independent server roles inside a single
//! process. The crate owns the *orchestration*: building shared dependencies once,
//! starting roles in a fixed order, and surfacing the first failure. What each role
//! does once it is running is left to the role.
//!
//! ## Architecture Overview
//!
//! 1. **Context Layer** ([`ContextResolver`], [`ContextProvider`]): produces the
//!    shared context exactly once.
//! 2. **Role Layer** ([`Role`]): the one capability every role exposes, `start(&ctx)`.
//! 3. **Sequencing Layer** ([`StartupSequence`]): starts roles one by one and stops at
//!    the first failure.
//! 4. **Process Layer** ([`launch`], [`launch_with_policy`]): ties the three together
//!    and yields a [`LaunchError`] the entry point maps to an exit code.
//!
//! ## Example
//!
//! ```rust
//! use role_framework::{launch, ContextProvider, Role, RoleError, StartupSequence};
//! use role_framework::mock::MockResolver;
//! use async_trait::async_trait;
//!
//! #[derive(Clone)]
//! struct Ctx { port: u16 }
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl Role<Ctx> for Echo {
//!     fn name(&self) -> &str { "Echo" }
//!     async fn start(&mut self, ctx: &Ctx) -> Result<(), RoleError> {
//!         if ctx.port == 0 {
//!             return Err(RoleError::Config("port must be set".into()));
//!         }
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let provider = ContextProvider::new(MockResolver::ok(Ctx { port: 0 }));
//!     let sequence = StartupSequence::new().with_role(Echo);
//!
//!     let err = launch(&provider, sequence).await.err().unwrap();
//!     assert_eq!(err.failed_role(), Some("Echo"));
//!     assert_eq!(err.exit_code(), 1);
//! }
//! ```
//!
//! ## Concurrency Model
//!
//! - Nothing in this crate runs concurrently. Resolution and sequencing are awaited
//!   strictly in order.
//! - A role's `start` is awaited to completion before the next role is polled.
//! - After `start` returns, the role's own tasks are invisible to the framework.
//!
//! ## Testing
//!
//! The [`mock`] module provides [`MockRole`](mock::MockRole) and
//! [`MockResolver`](mock::MockResolver) for verifying ordering and call counts
//! without spawning any real servers.

pub mod context;
pub mod error;
pub mod launch;
pub mod mock;
pub mod role;
pub mod sequence;
pub mod tracing;

// Re-export core types for convenience
pub use context::{ContextProvider, ContextResolver};
pub use error::{ContextResolutionError, LaunchError, RoleError, StartupError};
pub use launch::{launch, launch_with_policy, FailurePolicy, Launched};
pub use role::Role;
pub use sequence::{StartedRoles, StartupFailure, StartupSequence};
