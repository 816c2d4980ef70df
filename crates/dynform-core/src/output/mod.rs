//! Output handler chain
//!
//! A valid submission is handed to every configured output in declaration
//! order. Each handler performs one side effect (send a mail, call a
//! webhook, store a record) and reports exactly one status and one message
//! on the shared [`OutputResponse`].

pub mod context;
pub mod dispatcher;
pub mod registry;
pub mod response;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::Options;
use crate::error::{DynformError, Result};
use crate::form::Form;

pub use context::DispatchContext;
pub use dispatcher::OutputDispatcher;
pub use registry::{OutputRegistry, OutputRegistryBuilder};
pub use response::{Message, MessageType, OutputResponse};

/// Read-only view of a valid submission
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubmittedForm {
    pub name: String,
    /// Submitted data, without the CSRF token and buttons
    pub data: Map<String, Value>,
    /// `field -> label`, label falling back to the field name
    pub labels: IndexMap<String, String>,
}

impl SubmittedForm {
    pub fn from_form(form: &Form) -> Self {
        let data = form.data();
        let labels = form
            .root()
            .children()
            .iter()
            .filter(|(name, _)| data.contains_key(name.as_str()))
            .map(|(name, field)| {
                let label = field.options().label.clone().unwrap_or_else(|| name.clone());
                (name.clone(), label)
            })
            .collect();
        Self {
            name: form.name().to_string(),
            data,
            labels,
        }
    }

    pub fn value(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }
}

/// Key and type of one output in a chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputSummary {
    pub key: String,
    pub output_type: String,
}

/// One side effect run for a valid submission
///
/// Ordinary failures (unreachable mail server, webhook returning 500) are
/// reported as a `false` status plus an error message. `Err` is reserved
/// for a malformed handler configuration and aborts the submission.
#[async_trait]
pub trait OutputHandler: Send + Sync {
    /// Bind the handler to its output key, the submission and its options
    fn initialize(&mut self, key: &str, form: &SubmittedForm, options: &Options) -> Result<()>;

    /// Every output of the chain, including this one
    fn set_output_handlers(&mut self, _handlers: &[OutputSummary]) {}

    async fn handle(
        &mut self,
        ctx: &mut DispatchContext,
        response: OutputResponse,
    ) -> Result<OutputResponse>;
}

/// Creates fresh handlers of one output type
pub trait OutputFactory: Send + Sync {
    /// Name referenced by `outputs.<key>.type`
    fn name(&self) -> &str;

    /// Options that must be present and non-null
    fn required_options(&self) -> &[&'static str] {
        &[]
    }

    fn create(&self) -> Box<dyn OutputHandler>;
}

/// User-facing success and error texts of a handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeMessages {
    pub success: String,
    pub error: String,
}

impl OutcomeMessages {
    /// Defaults, overridden by `success_message` / `error_message`
    pub fn from_options(output: &str, options: &Options, success: &str, error: &str) -> Result<Self> {
        Ok(Self {
            success: string_option(output, options, "success_message")?
                .unwrap_or_else(|| success.to_string()),
            error: string_option(output, options, "error_message")?
                .unwrap_or_else(|| error.to_string()),
        })
    }

    /// Record the outcome: one status, one message
    pub fn report(&self, response: &mut OutputResponse, key: &str, ok: bool) {
        let message = if ok {
            Message::success(&self.success)
        } else {
            Message::error(&self.error)
        };
        response.add_status(ok);
        response.add_message(message.with_source(key));
    }
}

/// Optional string option; scalars are stringified, anything else rejected
pub fn string_option(output: &str, options: &Options, name: &str) -> Result<Option<String>> {
    match options.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(v.to_string())),
        Some(other) => Err(DynformError::OutputConfig {
            output: output.to_string(),
            reason: format!("option \"{name}\" must be a string, got {other}"),
        }),
    }
}

/// Required string option
pub fn required_string(output: &str, options: &Options, name: &str) -> Result<String> {
    string_option(output, options, name)?.ok_or_else(|| DynformError::OutputConfig {
        output: output.to_string(),
        reason: format!("option \"{name}\" is required"),
    })
}

/// Optional list of strings; a single string counts as a one-item list
pub fn string_list_option(output: &str, options: &Options, name: &str) -> Result<Vec<String>> {
    match options.get(name) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s.clone()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| DynformError::OutputConfig {
                    output: output.to_string(),
                    reason: format!("option \"{name}\" must only contain strings"),
                })
            })
            .collect(),
        Some(other) => Err(DynformError::OutputConfig {
            output: output.to_string(),
            reason: format!("option \"{name}\" must be a list of strings, got {other}"),
        }),
    }
}
