//! Initial data resolution from the current request

use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::FormDefinition;
use crate::error::{DynformError, Result};

/// What the core sees of an incoming request
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub query: IndexMap<String, String>,
}

impl RequestContext {
    pub fn with_query<I, K, V>(mut self, query: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(query.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }
}

pub struct InputContext<'a> {
    pub definition: &'a FormDefinition,
    pub request: &'a RequestContext,
}

/// Pre-populates a form before it is rendered
pub trait InputHandler: Send + Sync {
    fn initial_data(&self, ctx: &InputContext<'_>) -> Map<String, Value>;
}

/// Query parameters named like top-level fields
pub struct QueryStringInputHandler;

impl InputHandler for QueryStringInputHandler {
    fn initial_data(&self, ctx: &InputContext<'_>) -> Map<String, Value> {
        ctx.request
            .query
            .iter()
            .filter(|(name, _)| ctx.definition.fields.contains_key(name.as_str()))
            .map(|(name, value)| (name.clone(), Value::String(value.clone())))
            .collect()
    }
}

#[derive(Clone)]
pub struct InputHandlerRegistry {
    handlers: HashMap<String, Arc<dyn InputHandler>>,
}

impl InputHandlerRegistry {
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
        };
        registry.register("query_string", Arc::new(QueryStringInputHandler));
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn InputHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn InputHandler>> {
        self.handlers
            .get(name)
            .cloned()
            .ok_or_else(|| DynformError::UnknownInputHandler(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormsConfig;

    #[test]
    fn test_query_string_matches_fields() {
        let config = FormsConfig::from_yaml_str(
            "forms:\n  contact:\n    fields:\n      email: { type: EmailType }\n    outputs:\n      log: { type: log }\n",
        )
        .unwrap();
        let request = RequestContext::default().with_query([("email", "jane@example.com"), ("utm_source", "x")]);
        let ctx = InputContext {
            definition: &config.forms["contact"],
            request: &request,
        };
        let data = QueryStringInputHandler.initial_data(&ctx);
        assert_eq!(data.len(), 1);
        assert_eq!(data["email"], "jane@example.com");
    }

    #[test]
    fn test_unknown_handler() {
        assert!(matches!(
            InputHandlerRegistry::with_builtins().get("session"),
            Err(DynformError::UnknownInputHandler(_))
        ));
    }
}
