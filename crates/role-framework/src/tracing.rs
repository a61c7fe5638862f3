//! # Observability & Tracing
//!
//! [`setup_tracing`] installs the process-wide subscriber. `RUST_LOG` wins when it
//! is set. Otherwise the caller's default filter applies, which usually comes from
//! configuration.
//!
//! ```bash
//! # Startup sequence only
//! RUST_LOG=role_framework=info combined-server
//!
//! # Everything, including per-role loops
//! RUST_LOG=debug combined-server
//! ```
//!
//! The sequencer runs inside a `startup` span, so every per-role line reads like:
//!
//! ```text
//! INFO startup: Starting role role=Master position=0
//! INFO startup: Role started role=Master elapsed_ms=1
//! ERROR startup: Role failed to start role=Worker position=1 error=bind failed
//! ```

use tracing_subscriber::EnvFilter;

/// Initializes the tracing subscriber. Call once, early in `main`.
pub fn setup_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false) // Role names are carried as fields
        .compact()
        .init();
}
