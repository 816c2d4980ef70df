//! Error types for dynform

use thiserror::Error;

/// dynform error type
///
/// Everything here is a definition-time or programming error. Invalid user
/// input is reported as data (see [`crate::normalize::ErrorEntry`]) and
/// output side-effect failures are reported through
/// [`crate::output::OutputResponse`]; neither ever becomes a `DynformError`.
#[derive(Error, Debug)]
pub enum DynformError {
    /// Structurally invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error inside a named form definition
    #[error("form \"{form}\": {source}")]
    Definition {
        form: String,
        #[source]
        source: Box<DynformError>,
    },

    /// Field type name did not resolve
    #[error("unknown field type \"{0}\"")]
    UnknownFieldType(String),

    /// Constraint name did not resolve
    #[error("unknown constraint \"{0}\"")]
    UnknownConstraint(String),

    /// Constraint resolved but its parameters were rejected
    #[error("invalid options for constraint \"{constraint}\": {reason}")]
    ConstraintOptions { constraint: String, reason: String },

    /// Output type is not registered
    #[error("unknown output type \"{0}\"")]
    UnknownOutput(String),

    /// Two registered output factories report the same name
    #[error("output name \"{name}\" is registered more than once: [{}]", .keys.join(", "))]
    DuplicateOutput { name: String, keys: Vec<String> },

    /// Required output option is missing
    #[error("output \"{output}\" of type \"{output_type}\" requires option \"{option}\"")]
    MissingOutputOption {
        output: String,
        output_type: String,
        option: String,
    },

    /// Output handler configuration is malformed
    #[error("output \"{output}\" is misconfigured: {reason}")]
    OutputConfig { output: String, reason: String },

    /// Redirect handler is not registered
    #[error("unknown redirect handler \"{0}\"")]
    UnknownRedirectHandler(String),

    /// Input handler is not registered
    #[error("unknown input handler \"{0}\"")]
    UnknownInputHandler(String),

    /// Named item missing from a repository (choice providers, routes)
    #[error("{repository} \"{key}\" not found")]
    ItemNotFound {
        repository: &'static str,
        key: String,
    },

    /// No form with this name is configured
    #[error("form \"{0}\" not found")]
    FormNotFound(String),

    /// Template rendering failed
    #[error("template error: {0}")]
    Template(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DynformError {
    /// Attach the owning form name to a definition-time error.
    pub fn in_form(self, form: impl Into<String>) -> Self {
        match self {
            err @ Self::Definition { .. } => err,
            err => Self::Definition {
                form: form.into(),
                source: Box::new(err),
            },
        }
    }

    /// Innermost error, skipping form context wrappers.
    pub fn root_cause(&self) -> &DynformError {
        match self {
            Self::Definition { source, .. } => source.root_cause(),
            err => err,
        }
    }
}

/// Result type for dynform
pub type Result<T> = std::result::Result<T, DynformError>;
