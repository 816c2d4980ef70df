//! Choice providers
//!
//! A choice field may reference a provider by key instead of listing its
//! choices inline. Providers return `label -> value`.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{DynformError, Result};

pub trait ChoiceProvider: Send + Sync {
    fn choices(&self) -> IndexMap<String, String>;
}

impl<F> ChoiceProvider for F
where
    F: Fn() -> IndexMap<String, String> + Send + Sync,
{
    fn choices(&self) -> IndexMap<String, String> {
        self()
    }
}

/// Fixed list of choices
#[derive(Debug, Clone, Default)]
pub struct StaticChoiceProvider {
    choices: IndexMap<String, String>,
}

impl StaticChoiceProvider {
    pub fn new<I, L, V>(choices: I) -> Self
    where
        I: IntoIterator<Item = (L, V)>,
        L: Into<String>,
        V: Into<String>,
    {
        Self {
            choices: choices
                .into_iter()
                .map(|(label, value)| (label.into(), value.into()))
                .collect(),
        }
    }
}

impl ChoiceProvider for StaticChoiceProvider {
    fn choices(&self) -> IndexMap<String, String> {
        self.choices.clone()
    }
}

#[derive(Clone, Default)]
pub struct ChoiceProviderRegistry {
    providers: HashMap<String, Arc<dyn ChoiceProvider>>,
}

impl ChoiceProviderRegistry {
    pub fn register(&mut self, key: impl Into<String>, provider: Arc<dyn ChoiceProvider>) {
        self.providers.insert(key.into(), provider);
    }

    pub fn get(&self, key: &str) -> Result<Arc<dyn ChoiceProvider>> {
        self.providers
            .get(key)
            .cloned()
            .ok_or_else(|| DynformError::ItemNotFound {
                repository: "choice provider",
                key: key.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_provider() {
        let mut registry = ChoiceProviderRegistry::default();
        registry.register(
            "countries",
            Arc::new(StaticChoiceProvider::new([("Germany", "de"), ("France", "fr")])),
        );
        let choices = registry.get("countries").unwrap().choices();
        assert_eq!(choices.keys().collect::<Vec<_>>(), vec!["Germany", "France"]);
    }

    #[test]
    fn test_closure_provider() {
        let mut registry = ChoiceProviderRegistry::default();
        registry.register(
            "years",
            Arc::new(|| -> IndexMap<String, String> {
                (2020..2023).map(|y| (y.to_string(), y.to_string())).collect()
            }),
        );
        assert_eq!(registry.get("years").unwrap().choices().len(), 3);
    }

    #[test]
    fn test_missing_provider() {
        let registry = ChoiceProviderRegistry::default();
        assert!(matches!(
            registry.get("nope"),
            Err(DynformError::ItemNotFound { repository: "choice provider", .. })
        ));
    }
}
