//! # Shared Context Resolution
//!
//! A [`ContextResolver`] knows how to produce the shared context. A
//! [`ContextProvider`] wraps it so the context is produced exactly once: the first
//! call delegates, every later call fails with
//! [`ContextResolutionError::AlreadyResolved`] without touching the resolver.

use crate::error::ContextResolutionError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Produces the shared context. Must have no side effects beyond acquiring handles.
#[async_trait]
pub trait ContextResolver: Send + Sync {
    type Context: Send + Sync + 'static;

    async fn resolve(&self) -> Result<Self::Context, ContextResolutionError>;
}

/// Single-shot wrapper around a [`ContextResolver`].
pub struct ContextProvider<R> {
    resolver: R,
    resolved: AtomicBool,
}

impl<R: ContextResolver> ContextProvider<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            resolved: AtomicBool::new(false),
        }
    }

    /// Resolve the context. Only the first call reaches the resolver, even if it failed.
    pub async fn resolve(&self) -> Result<Arc<R::Context>, ContextResolutionError> {
        if self.resolved.swap(true, Ordering::SeqCst) {
            warn!("Shared context resolution requested twice");
            return Err(ContextResolutionError::AlreadyResolved);
        }

        debug!("Resolving shared context");
        match self.resolver.resolve().await {
            Ok(context) => {
                info!("Shared context resolved");
                Ok(Arc::new(context))
            }
            Err(e) => {
                warn!(error = %e, "Shared context resolution failed");
                Err(e)
            }
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::SeqCst)
    }
}
