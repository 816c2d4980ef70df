//! Forms configuration model
//!
//! The configuration tree operators author directly:
//!
//! ```yaml
//! forms:
//!   contact:
//!     method: POST
//!     fields:
//!       email: { type: EmailType, constraints: [NotBlank, Email] }
//!     outputs:
//!       mail: { type: email, options: { to: team@example.com, document: contact } }
//! ```
//!
//! Maps are [`IndexMap`]s so that field and output declaration order is kept
//! all the way to the schema and the handler chain.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::error::{DynformError, Result};
use crate::registry::FormRegistries;

/// Free-form option mapping for fields and outputs
pub type Options = IndexMap<String, Value>;

/// Every configured form, keyed by name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormsConfig {
    #[serde(default)]
    pub forms: IndexMap<String, FormDefinition>,
}

impl FormsConfig {
    /// Parse a YAML document.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let mut config: FormsConfig = serde_yaml::from_str(content)?;
        for (name, definition) in config.forms.iter_mut() {
            definition.name = name.clone();
        }
        Ok(config)
    }

    /// Load from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Look up a form by name
    pub fn get(&self, name: &str) -> Option<&FormDefinition> {
        self.forms.get(name)
    }

    /// Configured form names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.forms.keys().map(String::as_str)
    }

    /// Check every form against the registries.
    ///
    /// Runs once at startup; any error here means the application must not
    /// serve requests.
    pub fn validate(&self, registries: &FormRegistries) -> Result<()> {
        for (name, definition) in &self.forms {
            definition
                .validate(registries)
                .map_err(|e| e.in_form(name.clone()))?;
        }
        tracing::info!("Validated {} form definition(s)", self.forms.len());
        Ok(())
    }
}

/// HTTP method used to submit a form
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[serde(alias = "get")]
    Get,
    #[default]
    #[serde(alias = "post")]
    Post,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// Translation switches of a form
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TranslateSettings {
    #[serde(default)]
    pub field_labels: bool,
    #[serde(default)]
    pub inline_choices: bool,
}

/// One named form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormDefinition {
    #[serde(skip)]
    pub name: String,
    #[serde(default = "default_csrf")]
    pub csrf: bool,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub translate: TranslateSettings,
    #[serde(default)]
    pub api_error_message_template: Option<String>,
    #[serde(default)]
    pub redirect_handler: Option<String>,
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub input_handler: Option<String>,
    #[serde(default)]
    pub fields: IndexMap<String, FieldDefinition>,
    #[serde(default)]
    pub outputs: IndexMap<String, OutputDefinition>,
}

fn default_csrf() -> bool {
    true
}

impl FormDefinition {
    /// Validate this definition against the registries
    pub fn validate(&self, registries: &FormRegistries) -> Result<()> {
        if self.fields.is_empty() {
            return Err(DynformError::InvalidConfig(
                "at least one field is required".into(),
            ));
        }
        if self.outputs.is_empty() {
            return Err(DynformError::InvalidConfig(
                "at least one output is required".into(),
            ));
        }

        for (name, field) in &self.fields {
            field.validate(name, registries)?;
        }

        for (key, output) in &self.outputs {
            output.validate(key, registries)?;
        }

        registries.redirect_handlers.for_definition(self)?.validate(self)?;
        if let Some(handler) = &self.input_handler {
            registries.input_handlers.get(handler)?;
        }

        Ok(())
    }
}

/// One configured field
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDefinition {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub options: Options,
    #[serde(default)]
    pub constraints: Vec<ConstraintEntry>,
}

impl FieldDefinition {
    /// Build a definition in code
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            options: Options::new(),
            constraints: Vec::new(),
        }
    }

    /// Set one option
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Append a constraint
    pub fn with_constraint(mut self, entry: ConstraintEntry) -> Self {
        self.constraints.push(entry);
        self
    }

    /// Child definitions of a compound field (`options.fields`)
    pub fn children(&self) -> Result<Option<IndexMap<String, FieldDefinition>>> {
        match self.options.get("fields") {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| DynformError::InvalidConfig(format!("invalid nested fields: {e}"))),
        }
    }

    /// Entry definition of a collection field (`entry_type` + `entry_options`)
    pub fn entry(&self) -> Result<FieldDefinition> {
        let type_name = match self.options.get("entry_type") {
            None | Some(Value::Null) => "TextType".to_string(),
            Some(Value::String(name)) => name.clone(),
            Some(other) => {
                return Err(DynformError::InvalidConfig(format!(
                    "entry_type must be a string, got {other}"
                )))
            }
        };
        let options = match self.options.get("entry_options") {
            None | Some(Value::Null) => Options::new(),
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                DynformError::InvalidConfig(format!("invalid entry_options: {e}"))
            })?,
        };
        Ok(FieldDefinition {
            type_name,
            options,
            constraints: Vec::new(),
        })
    }

    /// Choice provider key, when choices come from a provider
    pub fn choice_provider(&self) -> Option<&str> {
        match (self.options.get("choices"), self.options.get("provider")) {
            (Some(Value::String(key)), _) => Some(key),
            (_, Some(Value::String(key))) => Some(key),
            _ => None,
        }
    }

    fn validate(&self, name: &str, registries: &FormRegistries) -> Result<()> {
        let resolved = registries.field_types.resolve(&self.type_name)?;

        for entry in &self.constraints {
            let (constraint, params) = entry.parts()?;
            registries.constraints.build(constraint, params)?;
        }

        if let Some(provider) = self.choice_provider() {
            registries.choice_providers.get(provider)?;
        }

        if resolved.kind.is_compound() {
            let children = self.children()?.ok_or_else(|| {
                DynformError::InvalidConfig(format!("compound field \"{name}\" has no fields"))
            })?;
            for (child_name, child) in &children {
                child.validate(child_name, registries)?;
            }
        }

        if resolved.kind.is_collection() {
            self.entry()?.validate(name, registries)?;
        }

        Ok(())
    }
}

/// A constraint entry: a bare name or a one-entry `name -> params` map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstraintEntry {
    Name(String),
    Configured(IndexMap<String, Value>),
}

impl ConstraintEntry {
    /// Constraint name and parameters (`Null` for a bare name)
    pub fn parts(&self) -> Result<(&str, Value)> {
        match self {
            Self::Name(name) => Ok((name.as_str(), Value::Null)),
            Self::Configured(map) if map.len() == 1 => {
                let (name, params) = map.iter().next().ok_or_else(|| {
                    DynformError::InvalidConfig("empty constraint entry".into())
                })?;
                Ok((name.as_str(), params.clone()))
            }
            Self::Configured(map) => Err(DynformError::InvalidConfig(format!(
                "constraint entry must have exactly one key, got [{}]",
                map.keys().cloned().collect::<Vec<_>>().join(", ")
            ))),
        }
    }
}

/// One configured output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputDefinition {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub options: Options,
}

impl OutputDefinition {
    fn validate(&self, key: &str, registries: &FormRegistries) -> Result<()> {
        let factory = registries.outputs.resolve(&self.type_name)?;
        for option in factory.required_options() {
            let present = matches!(self.options.get(*option), Some(v) if !v.is_null());
            if !present {
                return Err(DynformError::MissingOutputOption {
                    output: key.to_string(),
                    output_type: self.type_name.clone(),
                    option: option.to_string(),
                });
            }
        }
        Ok(())
    }
}
