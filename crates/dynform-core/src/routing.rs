//! URL generator port

use indexmap::IndexMap;
use std::collections::HashMap;

use crate::error::{DynformError, Result};

/// Route that receives form submissions
pub const SUBMIT_ROUTE: &str = "dynform_submit";

/// URL generator port
pub trait UrlGenerator: Send + Sync {
    fn generate(&self, route: &str, params: &IndexMap<String, String>) -> Result<String>;
}

/// Route name → path pattern with `{param}` placeholders
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: HashMap<String, String>,
}

impl RouteTable {
    /// Table with the dynform routes mounted under `base_path`
    pub fn new(base_path: &str) -> Self {
        let base = base_path.trim_end_matches('/');
        let mut routes = HashMap::new();
        routes.insert(SUBMIT_ROUTE.to_string(), format!("{base}/api/forms/{{name}}"));
        Self { routes }
    }

    /// Add or replace a route
    pub fn insert(&mut self, route: impl Into<String>, pattern: impl Into<String>) {
        self.routes.insert(route.into(), pattern.into());
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new("")
    }
}

impl UrlGenerator for RouteTable {
    fn generate(&self, route: &str, params: &IndexMap<String, String>) -> Result<String> {
        let pattern = self.routes.get(route).ok_or_else(|| DynformError::ItemNotFound {
            repository: "route",
            key: route.to_string(),
        })?;

        let mut url = pattern.clone();
        let mut query = Vec::new();
        for (name, value) in params {
            let placeholder = format!("{{{name}}}");
            if url.contains(&placeholder) {
                url = url.replace(&placeholder, value);
            } else {
                query.push(format!("{name}={value}"));
            }
        }

        if !query.is_empty() {
            url.push('?');
            url.push_str(&query.join("&"));
        }
        Ok(url)
    }
}
