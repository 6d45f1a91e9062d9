use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use crate::detect::backend::{DetectOptions, LocalizerBackend};
use crate::detect::result::Detection;

/// Thread-safe registry of localizer backends.
///
/// Backends are wrapped in `Mutex` because `LocalizerBackend::detect` takes
/// `&mut self`.
pub struct LocalizerRegistry {
    backends: HashMap<String, Arc<Mutex<dyn LocalizerBackend>>>,
    default_name: Option<String>,
}

impl LocalizerRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
            default_name: None,
        }
    }

    /// Register a backend. The first registered backend becomes the default.
    pub fn register<B: LocalizerBackend + 'static>(&mut self, backend: B) {
        let name = backend.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.backends.insert(name, Arc::new(Mutex::new(backend)));
    }

    /// Set default backend by name.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.backends.contains_key(name) {
            return Err(anyhow!("localizer backend '{}' not registered", name));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    /// Get backend by name.
    pub fn get(&self, name: &str) -> Option<Arc<Mutex<dyn LocalizerBackend>>> {
        self.backends.get(name).cloned()
    }

    /// Get default backend.
    pub fn default_backend(&self) -> Option<Arc<Mutex<dyn LocalizerBackend>>> {
        self.default_name.as_ref().and_then(|name| self.get(name))
    }

    /// List registered backends.
    pub fn list(&self) -> Vec<String> {
        self.backends.keys().cloned().collect()
    }

    /// Run detection using the default backend.
    pub fn detect(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        opts: &DetectOptions,
    ) -> Result<Vec<Detection>> {
        let backend = self
            .default_backend()
            .ok_or_else(|| anyhow!("no localizer backend registered"))?;
        let mut guard = backend
            .lock()
            .map_err(|_| anyhow!("localizer backend lock poisoned"))?;
        guard.detect(pixels, width, height, opts)
    }
}

impl Default for LocalizerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::backends::StubLocalizer;

    #[test]
    fn first_registered_is_default() {
        let mut registry = LocalizerRegistry::new();
        registry.register(StubLocalizer::with_detections(vec![Detection::new(
            0.0, 0.0, 5.0, 5.0, 0.8,
        )]));
        let out = registry
            .detect(&[], 10, 10, &DetectOptions::default())
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(registry.list(), vec!["stub".to_string()]);
    }

    #[test]
    fn set_default_rejects_unknown_name() {
        let mut registry = LocalizerRegistry::new();
        registry.register(StubLocalizer::empty());
        assert!(registry.set_default("tract").is_err());
        assert!(registry.set_default("stub").is_ok());
    }

    #[test]
    fn empty_registry_errors() {
        let registry = LocalizerRegistry::new();
        assert!(registry.detect(&[], 1, 1, &DetectOptions::default()).is_err());
    }
}
