//! Bus backend registry.
//!
//! Maps backend names to the factories that register a component on them.
//! Built at startup and used by value; there is no global registry.

use crate::memory::MemoryBus;
use hal_common::bus::{BusError, BusFactory, PinBus};
use hal_shared_memory::ShmComponent;
use std::collections::HashMap;

/// Registry of available pin bus backends.
pub struct BusRegistry {
    factories: HashMap<&'static str, BusFactory>,
}

impl BusRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with the built-in backends: `shm` and `memory`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("shm", ShmComponent::create);
        registry.register("memory", MemoryBus::create);
        registry
    }

    /// Register a backend factory.
    ///
    /// # Panics
    /// Panics if a backend with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: BusFactory) {
        if self.factories.contains_key(name) {
            panic!("Backend '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a backend factory by name.
    pub fn get_factory(&self, name: &str) -> Option<BusFactory> {
        self.factories.get(name).copied()
    }

    /// Register `component` on the named backend.
    ///
    /// # Errors
    /// Returns `BusError::BackendNotFound` if no backend with the given name is registered,
    /// or whatever the backend reports while registering.
    pub fn create(&self, backend: &str, component: &str) -> Result<Box<dyn PinBus>, BusError> {
        let factory = self
            .get_factory(backend)
            .ok_or_else(|| BusError::BackendNotFound(backend.to_string()))?;
        factory(component)
    }

    /// Registered backend names, sorted.
    pub fn list_backends(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for BusRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hal_common::consts::KNOWN_BACKENDS;

    #[test]
    fn defaults_cover_known_backends() {
        let registry = BusRegistry::with_defaults();
        let mut known = KNOWN_BACKENDS.to_vec();
        known.sort_unstable();
        assert_eq!(registry.list_backends(), known);
    }

    #[test]
    fn create_memory_component() {
        let registry = BusRegistry::with_defaults();
        let bus = registry.create("memory", "reg-test").expect("should create");
        assert_eq!(bus.backend(), "memory");
        assert_eq!(bus.component_name(), "reg-test");
    }

    #[test]
    fn backend_not_found() {
        let registry = BusRegistry::with_defaults();
        assert!(matches!(
            registry.create("can-bus", "x"),
            Err(BusError::BackendNotFound(_))
        ));
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn duplicate_backend_panics() {
        let mut registry = BusRegistry::new();
        registry.register("dup", MemoryBus::create);
        registry.register("dup", MemoryBus::create);
    }
}
