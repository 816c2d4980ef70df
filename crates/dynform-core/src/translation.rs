//! Translator port and an in-memory message catalogue

use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;

/// Translation parameters, keyed by the literal placeholder (`{{ limit }}`)
pub type Params = IndexMap<String, String>;

/// Default domain for labels and choice titles
pub const MESSAGES_DOMAIN: &str = "messages";

/// Domain for constraint violation messages
pub const VALIDATORS_DOMAIN: &str = "validators";

/// Translator port
pub trait Translator: Send + Sync {
    /// Translate `key`, substituting `params`
    fn trans(&self, key: &str, params: &Params, domain: Option<&str>) -> String;

    /// Translate a pluralized message (`"one|many"`) for `count`
    fn trans_choice(&self, key: &str, count: u64, params: &Params, domain: Option<&str>) -> String;
}

/// Message catalogue: `domain -> key -> message`
///
/// Keys missing from the catalogue translate to themselves, so an empty
/// catalogue behaves as an identity translator with parameter substitution.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageCatalogue {
    #[serde(flatten)]
    domains: HashMap<String, HashMap<String, String>>,
}

impl MessageCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a YAML catalogue (`{ messages: {..}, validators: {..} }`)
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Add one message
    pub fn insert(&mut self, domain: &str, key: impl Into<String>, message: impl Into<String>) {
        self.domains
            .entry(domain.to_string())
            .or_default()
            .insert(key.into(), message.into());
    }

    fn lookup<'a>(&'a self, key: &'a str, domain: Option<&str>) -> &'a str {
        self.domains
            .get(domain.unwrap_or(MESSAGES_DOMAIN))
            .and_then(|messages| messages.get(key))
            .map(String::as_str)
            .unwrap_or(key)
    }
}

impl Translator for MessageCatalogue {
    fn trans(&self, key: &str, params: &Params, domain: Option<&str>) -> String {
        substitute(self.lookup(key, domain), params)
    }

    fn trans_choice(&self, key: &str, count: u64, params: &Params, domain: Option<&str>) -> String {
        let message = select_plural(self.lookup(key, domain), count);
        let mut params = params.clone();
        params
            .entry("%count%".to_string())
            .or_insert_with(|| count.to_string());
        substitute(message, &params)
    }
}

/// Pick the variant of a `"singular|plural"` message
fn select_plural(message: &str, count: u64) -> &str {
    let variants: Vec<&str> = message.split('|').collect();
    match variants.len() {
        1 => variants[0],
        _ if count == 1 => variants[0],
        n => variants[n - 1],
    }
}

/// Replace every placeholder in `message`
pub fn substitute(message: &str, params: &Params) -> String {
    params
        .iter()
        .fold(message.to_string(), |acc, (placeholder, value)| {
            acc.replace(placeholder.as_str(), value)
        })
}
