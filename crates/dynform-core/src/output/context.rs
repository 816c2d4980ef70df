//! Per-dispatch shared context

use indexmap::IndexMap;
use serde_json::Value;

use super::OutputSummary;

/// State shared by the handlers of one dispatch
///
/// Artifacts exist only once their producer has run, so a handler looking up
/// a later sibling's artifact always gets `None`.
#[derive(Debug, Default)]
pub struct DispatchContext {
    siblings: Vec<OutputSummary>,
    artifacts: IndexMap<String, Value>,
    completed: Vec<String>,
}

impl DispatchContext {
    pub fn new(siblings: Vec<OutputSummary>) -> Self {
        Self {
            siblings,
            ..Self::default()
        }
    }

    /// Every output of this chain, in declaration order
    pub fn siblings(&self) -> &[OutputSummary] {
        &self.siblings
    }

    /// Publish an artifact under the producing output's key
    pub fn publish(&mut self, key: impl Into<String>, value: Value) {
        self.artifacts.insert(key.into(), value);
    }

    pub fn artifact(&self, key: &str) -> Option<&Value> {
        self.artifacts.get(key)
    }

    /// Whether the output with this key has already handled the submission
    pub fn has_run(&self, key: &str) -> bool {
        self.completed.iter().any(|k| k == key)
    }

    pub(crate) fn mark_completed(&mut self, key: &str) {
        self.completed.push(key.to_string());
    }
}
