//! # Combined Server
//!
//! Runs a whole workflow-scheduling cluster inside one process: a scheduling
//! **Master**, a task **Worker**, a **LogService** that serves task logs, and an
//! **AlertDispatcher**, all sharing one set of persistence handles.
//!
//! ## Core Components
//!
//! - **[lifecycle]**: [`CombinedServer`](lifecycle::CombinedServer), the process owner
//!   that resolves the shared context once and starts the roles in order.
//! - **[roles]**: the four [`Role`](role_framework::Role) implementations.
//! - **[context]**: [`SharedContext`](context::SharedContext) and the resolver that builds it.
//! - **[store]**: the persistence traits and the in-memory backend.
//! - **[config]**: layered TOML + environment configuration.
//! - **[model]**: plain records the stores hold.
//!
//! ## Running
//!
//! ```bash
//! RUST_LOG=info combined-server --config combined.toml
//! ```

pub mod config;
pub mod context;
pub mod lifecycle;
pub mod model;
pub mod roles;
pub mod store;
