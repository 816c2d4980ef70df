//! Constraint registry

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::ConstraintFactory;
use crate::error::{DynformError, Result};
use crate::form::constraints::{builtin_factories, CONSTRAINT_NAMESPACE};
use crate::form::Constraint;

#[derive(Clone, Default)]
pub struct ConstraintRegistry {
    factories: HashMap<String, ConstraintFactory>,
}

impl ConstraintRegistry {
    pub fn with_builtins() -> Self {
        let mut registry = Self::default();
        for (name, factory) in builtin_factories() {
            registry.register(format!("{CONSTRAINT_NAMESPACE}{name}"), factory);
        }
        registry
    }

    /// Register a constraint under its fully-qualified name
    pub fn register(&mut self, name: impl Into<String>, factory: ConstraintFactory) {
        self.factories.insert(name.into(), factory);
    }

    /// Instantiate a constraint from a short or fully-qualified name
    pub fn build(&self, name: &str, params: Value) -> Result<Arc<dyn Constraint>> {
        let qualified = if name.contains("::") {
            name.to_string()
        } else {
            format!("{CONSTRAINT_NAMESPACE}{name}")
        };
        let factory = self
            .factories
            .get(&qualified)
            .ok_or_else(|| DynformError::UnknownConstraint(name.to_string()))?;
        factory(params)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for ConstraintRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstraintRegistry")
            .field("constraints", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_builtin() {
        let registry = ConstraintRegistry::with_builtins();
        let length = registry.build("Length", json!({"min": 2})).unwrap();
        assert_eq!(length.type_name(), "dynform::constraints::Length");
        assert_eq!(length.config()["min"], 2);
        assert!(registry.build("dynform::constraints::NotBlank", Value::Null).is_ok());
    }

    #[test]
    fn test_unknown_constraint() {
        let registry = ConstraintRegistry::with_builtins();
        assert!(matches!(
            registry.build("Iban", Value::Null),
            Err(DynformError::UnknownConstraint(_))
        ));
    }

    #[test]
    fn test_bad_params() {
        let registry = ConstraintRegistry::with_builtins();
        assert!(matches!(
            registry.build("Length", json!({"minimum": 2})),
            Err(DynformError::ConstraintOptions { .. })
        ));
    }
}
