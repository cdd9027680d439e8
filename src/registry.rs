//! Transport registry.
//!
//! An explicit lookup table from transport name to factory closure,
//! constructed once per session by the caller and passed where it is
//! needed. This replaces the pattern of a process-global, dynamically
//! populated module table: nothing here is implicitly shared, and no
//! reflection is involved.

use std::collections::HashMap;
use std::sync::Arc;

use crate::transport::Transport;

/// Factory producing a fresh transport for one device connection.
pub type TransportFactory = Arc<dyn Fn() -> Box<dyn Transport> + Send + Sync>;

/// Registry for looking up transport factories by name.
#[derive(Default)]
pub struct TransportRegistry {
    factories: HashMap<String, TransportFactory>,
}

impl TransportRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transport factory under a name (e.g. "ios", "fortios").
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Transport> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    /// Build a transport by name, if registered.
    pub fn create(&self, name: &str) -> Option<Box<dyn Transport>> {
        self.factories.get(name).map(|f| f())
    }

    /// Check if a transport name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// All registered transport names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for TransportRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportRegistry")
            .field("names", &self.names())
            .finish()
    }
}
