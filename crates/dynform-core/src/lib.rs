//! dynform core - configuration-driven forms
//!
//! Operators declare forms in YAML; this crate turns each declaration into a
//! validated form tree, describes it to client-side renderers as a
//! JSON-Schema-like document, and dispatches valid submissions to a chain of
//! output handlers.
//!
//! ## Pipeline
//! - [`config`]: load and validate the forms configuration (fail fast)
//! - [`assembler`]: definition → form tree
//! - [`schema`]: form tree → schema
//! - [`normalize`]: rejected form → flat error list
//! - [`output`]: valid submission → ordered output handler chain
//!
//! [`service::FormService`] ties the pipeline together for the API boundary.

#![warn(clippy::all)]

pub mod assembler;
pub mod config;
pub mod csrf;
pub mod error;
pub mod form;
pub mod input;
pub mod normalize;
pub mod output;
pub mod redirect;
pub mod registry;
pub mod routing;
pub mod schema;
pub mod service;
pub mod translation;

pub use config::{FieldDefinition, FormDefinition, FormsConfig, HttpMethod, OutputDefinition};
pub use error::{DynformError, Result};
pub use form::{Form, FormBuilder, FormField};
pub use output::{
    DispatchContext, Message, MessageType, OutputFactory, OutputHandler, OutputRegistry, OutputResponse,
    SubmittedForm,
};
pub use registry::FormRegistries;
pub use schema::SchemaNode;
pub use service::{FormService, SubmissionOutcome};
