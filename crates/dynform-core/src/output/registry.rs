//! Output factory registry

use indexmap::IndexMap;
use std::sync::Arc;

use super::OutputFactory;
use crate::error::{DynformError, Result};

/// Output factories keyed by the name they report
#[derive(Clone, Default)]
pub struct OutputRegistry {
    factories: IndexMap<String, Arc<dyn OutputFactory>>,
}

impl OutputRegistry {
    /// Build from `(registration key, factory)` pairs
    ///
    /// Fails when two factories report the same `name()`, listing every
    /// registration key involved.
    pub fn new(registrations: Vec<(String, Arc<dyn OutputFactory>)>) -> Result<Self> {
        let mut by_name: IndexMap<String, Vec<String>> = IndexMap::new();
        for (key, factory) in &registrations {
            by_name
                .entry(factory.name().to_string())
                .or_default()
                .push(key.clone());
        }

        if let Some((name, keys)) = by_name.into_iter().find(|(_, keys)| keys.len() > 1) {
            return Err(DynformError::DuplicateOutput { name, keys });
        }

        let factories = registrations
            .into_iter()
            .map(|(_, factory)| (factory.name().to_string(), factory))
            .collect();
        Ok(Self { factories })
    }

    pub fn builder() -> OutputRegistryBuilder {
        OutputRegistryBuilder::default()
    }

    pub fn resolve(&self, output_type: &str) -> Result<Arc<dyn OutputFactory>> {
        self.factories
            .get(output_type)
            .cloned()
            .ok_or_else(|| DynformError::UnknownOutput(output_type.to_string()))
    }

    /// Registered output names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

#[derive(Default)]
pub struct OutputRegistryBuilder {
    registrations: Vec<(String, Arc<dyn OutputFactory>)>,
}

impl OutputRegistryBuilder {
    pub fn register(mut self, key: impl Into<String>, factory: Arc<dyn OutputFactory>) -> Self {
        self.registrations.push((key.into(), factory));
        self
    }

    pub fn build(self) -> Result<OutputRegistry> {
        OutputRegistry::new(self.registrations)
    }
}
