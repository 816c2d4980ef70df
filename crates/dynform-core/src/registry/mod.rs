//! Name-keyed registries consulted when definitions are validated and forms
//! are assembled.
//!
//! Registration happens while the service is built; afterwards every
//! registry is read-only and shared behind an `Arc`.

pub mod choices;
pub mod constraints;
pub mod field_types;

use serde_json::Value;
use std::sync::Arc;

use crate::error::Result;
use crate::form::Constraint;
use crate::input::InputHandlerRegistry;
use crate::output::OutputRegistry;
use crate::redirect::RedirectHandlerRegistry;

pub use choices::{ChoiceProvider, ChoiceProviderRegistry, StaticChoiceProvider};
pub use constraints::ConstraintRegistry;
pub use field_types::{FieldType, FieldTypeRegistry, TYPE_NAMESPACE};

/// Builds a constraint from its config params
pub type ConstraintFactory = Arc<dyn Fn(Value) -> Result<Arc<dyn Constraint>> + Send + Sync>;

/// Every registry a form definition refers to
pub struct FormRegistries {
    pub field_types: FieldTypeRegistry,
    pub constraints: ConstraintRegistry,
    pub choice_providers: ChoiceProviderRegistry,
    pub outputs: OutputRegistry,
    pub redirect_handlers: RedirectHandlerRegistry,
    pub input_handlers: InputHandlerRegistry,
}

impl FormRegistries {
    /// Built-in types, constraints and handlers around the given outputs
    pub fn new(outputs: OutputRegistry) -> Self {
        Self {
            field_types: FieldTypeRegistry::with_builtins(),
            constraints: ConstraintRegistry::with_builtins(),
            choice_providers: ChoiceProviderRegistry::default(),
            outputs,
            redirect_handlers: RedirectHandlerRegistry::with_builtins(),
            input_handlers: InputHandlerRegistry::with_builtins(),
        }
    }
}

impl Default for FormRegistries {
    fn default() -> Self {
        Self::new(OutputRegistry::default())
    }
}
