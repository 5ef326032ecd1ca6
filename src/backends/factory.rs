use std::collections::BTreeMap;
use std::sync::Arc;

use crate::backends::command::CommandBackend;
use crate::errors::DispatchError;
use crate::traits::Backend;

type Constructor = Arc<dyn Fn() -> Arc<dyn Backend> + Send + Sync>;

/// Registration table mapping backend names to constructors.
///
/// Construction is cheap and side-effect free; the registry decides when a
/// backend is built and calls its `initialize` hook once.
#[derive(Clone, Default)]
pub struct BackendFactory {
    constructors: BTreeMap<String, Constructor>,
}

impl BackendFactory {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// A table holding the backends shipped with the crate.
    pub fn with_builtin() -> Self {
        let mut factory = Self::new();
        factory.register(CommandBackend::NAME, || Arc::new(CommandBackend::new()));
        factory
    }

    /// Register (or replace) the constructor for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn() -> Arc<dyn Backend> + Send + Sync + 'static,
    {
        self.constructors.insert(name.into(), Arc::new(constructor));
    }

    pub fn create(&self, name: &str) -> Result<Arc<dyn Backend>, DispatchError> {
        self.constructors
            .get(name)
            .map(|constructor| constructor())
            .ok_or_else(|| DispatchError::UnknownBackend(name.to_string()))
    }

    /// Get list of available backend names
    pub fn list_available_backends(&self) -> Vec<String> {
        self.constructors.keys().cloned().collect()
    }

    /// Check if a backend is available
    pub fn is_backend_available(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }
}
