//! Backend Registry
//!
//! Maps the `backend` name from the configuration to a factory that builds
//! the adapter. The registry is injected into the coordinator, so tests and
//! applications decide which backends exist.

use crate::backend::error::{BackendError, BackendResult};
use crate::backend::events::BackendEvents;
use crate::backend::mock::MockBackend;
use crate::backend::traits::Backend;
use std::collections::HashMap;
use std::sync::Arc;

/// Factory building a backend from its opaque `backendConfig` table
pub type BackendFactory =
    Arc<dyn Fn(&toml::Table, BackendEvents) -> BackendResult<Arc<dyn Backend>> + Send + Sync>;

/// Registry of named backend factories
#[derive(Clone, Default)]
pub struct BackendRegistry {
    factories: HashMap<String, BackendFactory>,
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.names())
            .finish()
    }
}

impl BackendRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry with the backends that ship with this crate
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry
            .factories
            .insert("mock".to_string(), Arc::new(create_mock_backend));
        registry
    }

    /// Register a factory under a backend name
    pub fn register<F>(&mut self, name: &str, factory: F) -> BackendResult<()>
    where
        F: Fn(&toml::Table, BackendEvents) -> BackendResult<Arc<dyn Backend>> + Send + Sync + 'static,
    {
        if self.factories.contains_key(name) {
            return Err(BackendError::AlreadyRegistered {
                name: name.to_string(),
            });
        }

        self.factories.insert(name.to_string(), Arc::new(factory));
        Ok(())
    }

    /// Check if a backend name is known
    pub fn has_backend(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Sorted list of registered backend names
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Build the named backend
    pub fn create(
        &self,
        name: &str,
        config: &toml::Table,
        events: BackendEvents,
    ) -> BackendResult<Arc<dyn Backend>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| BackendError::UnknownBackend {
                name: name.to_string(),
            })?;

        log::debug!("Creating '{}' backend", name);
        factory(config, events)
    }
}

fn create_mock_backend(
    config: &toml::Table,
    events: BackendEvents,
) -> BackendResult<Arc<dyn Backend>> {
    Ok(Arc::new(MockBackend::from_config(config, events)?))
}
