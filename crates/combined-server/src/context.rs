//! The shared context handed to every role, and the resolver that builds it.

use crate::config::PersistenceConfig;
use crate::store::{AlertStore, MemoryAlertStore, MemoryProcessStore, ProcessStore};
use async_trait::async_trait;
use role_framework::{ContextResolutionError, ContextResolver};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// One process-state handle and one alert-state handle. Immutable once built.
#[derive(Clone)]
pub struct SharedContext {
    process_store: Arc<dyn ProcessStore>,
    alert_store: Arc<dyn AlertStore>,
}

impl SharedContext {
    pub fn new(process_store: Arc<dyn ProcessStore>, alert_store: Arc<dyn AlertStore>) -> Self {
        Self {
            process_store,
            alert_store,
        }
    }

    pub fn process_store(&self) -> Arc<dyn ProcessStore> {
        Arc::clone(&self.process_store)
    }

    pub fn alert_store(&self) -> Arc<dyn AlertStore> {
        Arc::clone(&self.alert_store)
    }
}

impl fmt::Debug for SharedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedContext").finish_non_exhaustive()
    }
}

/// Builds [`SharedContext`] from the persistence section of the config.
pub struct StoreResolver {
    config: PersistenceConfig,
}

impl StoreResolver {
    pub fn new(config: PersistenceConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ContextResolver for StoreResolver {
    type Context = SharedContext;

    async fn resolve(&self) -> Result<SharedContext, ContextResolutionError> {
        let process_store: Arc<dyn ProcessStore> = match self.config.backend.as_str() {
            "memory" => Arc::new(MemoryProcessStore::new()),
            "" => {
                return Err(ContextResolutionError::Misconfigured(
                    "persistence.backend is empty".into(),
                ))
            }
            other => {
                return Err(ContextResolutionError::Misconfigured(format!(
                    "unsupported process store backend: {other}"
                )))
            }
        };

        let alert_store: Arc<dyn AlertStore> = match self.config.alert_backend.as_str() {
            "memory" => Arc::new(MemoryAlertStore::new()),
            "" => {
                return Err(ContextResolutionError::Misconfigured(
                    "persistence.alert_backend is empty".into(),
                ))
            }
            other => {
                return Err(ContextResolutionError::Misconfigured(format!(
                    "unsupported alert store backend: {other}"
                )))
            }
        };

        info!(
            backend = %self.config.backend,
            alert_backend = %self.config.alert_backend,
            "Persistence handles acquired"
        );
        Ok(SharedContext::new(process_store, alert_store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backends_resolve() {
        let ctx = StoreResolver::new(PersistenceConfig::default())
            .resolve()
            .await
            .unwrap();
        assert!(ctx.alert_store().alerts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_backend_is_misconfigured() {
        let config = PersistenceConfig {
            backend: "mysql".into(),
            ..PersistenceConfig::default()
        };
        let err = StoreResolver::new(config).resolve().await.unwrap_err();
        assert_eq!(
            err,
            ContextResolutionError::Misconfigured("unsupported process store backend: mysql".into())
        );
    }

    #[tokio::test]
    async fn empty_alert_backend_is_misconfigured() {
        let config = PersistenceConfig {
            alert_backend: String::new(),
            ..PersistenceConfig::default()
        };
        assert!(matches!(
            StoreResolver::new(config).resolve().await,
            Err(ContextResolutionError::Misconfigured(_))
        ));
    }
}
