//! # Framework Errors
//!
//! Every failure the orchestrator can observe is defined here. Keeping the
//! taxonomy in one place means the process owner can map each variant to an
//! exit code without knowing anything about the roles themselves.
//!
//! - [`ContextResolutionError`] happens before any role is touched.
//! - [`RoleError`] is what a role's `start` returns.
//! - [`StartupError`] pairs a [`RoleError`] with the identity of the role that produced it.
//! - [`LaunchError`] is the union surfaced to the process entry point.

/// Errors raised while a role initializes itself.
#[derive(Debug, thiserror::Error)]
pub enum RoleError {
    #[error("bind {addr} failed: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("registration failed: {0}")]
    Registration(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("{0}")]
    Other(String),
}

impl From<String> for RoleError {
    fn from(msg: String) -> Self {
        RoleError::Other(msg)
    }
}

impl From<&str> for RoleError {
    fn from(msg: &str) -> Self {
        RoleError::Other(msg.to_string())
    }
}

/// A role failed to start. Terminal for the whole sequence.
#[derive(Debug, thiserror::Error)]
#[error("role {role}: {source}")]
pub struct StartupError {
    /// Name of the role whose `start` failed.
    pub role: String,
    /// The role's own failure.
    #[source]
    pub source: RoleError,
}

impl StartupError {
    pub fn new(role: impl Into<String>, source: RoleError) -> Self {
        Self {
            role: role.into(),
            source,
        }
    }
}

/// The shared context could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextResolutionError {
    #[error("misconfigured: {0}")]
    Misconfigured(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("shared context already resolved")]
    AlreadyResolved,
}

/// Everything [`launch`](crate::launch) can fail with.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("context resolution failed: {0}")]
    Context(#[from] ContextResolutionError),
    #[error("startup failed: {0}")]
    Startup(#[from] StartupError),
}

impl LaunchError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            LaunchError::Context(_) => 2,
            LaunchError::Startup(_) => 1,
        }
    }

    /// The failing role, if the failure came from a role.
    pub fn failed_role(&self) -> Option<&str> {
        match self {
            LaunchError::Context(_) => None,
            LaunchError::Startup(e) => Some(&e.role),
        }
    }
}
