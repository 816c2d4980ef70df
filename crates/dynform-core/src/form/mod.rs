//! Form tree, data binding and validation
//!
//! The slice of a form framework the adapter needs: a tree of typed fields,
//! JSON submission binding with per-kind coercion, CSRF checking and
//! constraint validation in declaration order.

pub mod constraints;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::config::HttpMethod;
use crate::csrf::{CsrfTokenManager, CSRF_FIELD};

pub use constraints::{Constraint, Violation};

const INVALID_VALUE: &str = "This value is not valid.";
const INVALID_CHOICE: &str = "The selected choice is invalid.";
const INVALID_CHOICES: &str = "The selected choices are invalid.";
const INVALID_INTEGER: &str = "Please enter an integer.";
const INVALID_NUMBER: &str = "Please enter a number.";
const INVALID_CSRF: &str = "The CSRF token is invalid. Please try to resubmit the form.";
const EXTRA_FIELDS: &str = "This form should not contain extra fields.";

/// Concrete behaviour of a field type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Textarea,
    Email,
    Password,
    Url,
    Tel,
    Date,
    Number,
    Integer,
    Checkbox,
    Choice,
    File,
    Hidden,
    Submit,
    Button,
    Compound,
    Collection,
    /// Registered custom type, bound like text
    Custom(String),
}

impl FieldKind {
    pub fn is_button(&self) -> bool {
        matches!(self, Self::Submit | Self::Button)
    }

    pub fn is_compound(&self) -> bool {
        matches!(self, Self::Compound)
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Collection)
    }

    /// Front-end widget token; `None` for custom types
    pub fn token(&self) -> Option<&'static str> {
        Some(match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Email => "email",
            Self::Password => "password",
            Self::Url => "url",
            Self::Tel => "tel",
            Self::Date => "date",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Checkbox => "checkbox",
            Self::Choice => "choice",
            Self::File => "file",
            Self::Hidden => "hidden",
            Self::Submit => "submit",
            Self::Button => "button",
            Self::Compound => "form",
            Self::Collection => "collection",
            Self::Custom(_) => return None,
        })
    }
}

/// Resolved field options
#[derive(Debug, Clone)]
pub struct FieldOptions {
    pub label: Option<String>,
    /// `label` already went through the translator
    pub label_translated: bool,
    pub required: bool,
    pub attr: Map<String, Value>,
    /// Configured static data (initial value, hidden value)
    pub data: Option<Value>,
    /// `label -> value`
    pub choices: IndexMap<String, String>,
    /// `value -> attributes`
    pub choice_attr: IndexMap<String, Map<String, Value>>,
    pub multiple: bool,
    pub expanded: bool,
    /// Options without dedicated handling
    pub extra: Map<String, Value>,
}

impl Default for FieldOptions {
    fn default() -> Self {
        Self {
            label: None,
            label_translated: false,
            required: true,
            attr: Map::new(),
            data: None,
            choices: IndexMap::new(),
            choice_attr: IndexMap::new(),
            multiple: false,
            expanded: false,
            extra: Map::new(),
        }
    }
}

/// One node of the form tree
#[derive(Debug, Clone)]
pub struct FormField {
    name: String,
    type_name: String,
    kind: FieldKind,
    options: FieldOptions,
    constraints: Vec<Arc<dyn Constraint>>,
    children: IndexMap<String, FormField>,
    prototype: Option<Box<FormField>>,
    data: Value,
    errors: Vec<Violation>,
    submitted: bool,
}

impl FormField {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            kind,
            options: FieldOptions::default(),
            constraints: Vec::new(),
            children: IndexMap::new(),
            prototype: None,
            data: Value::Null,
            errors: Vec::new(),
            submitted: false,
        }
    }

    pub fn with_options(mut self, options: FieldOptions) -> Self {
        self.data = options.data.clone().unwrap_or(Value::Null);
        self.options = options;
        self
    }

    pub fn with_constraint(mut self, constraint: Arc<dyn Constraint>) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_child(mut self, child: FormField) -> Self {
        self.children.insert(child.name.clone(), child);
        self
    }

    pub fn with_prototype(mut self, prototype: FormField) -> Self {
        self.prototype = Some(Box::new(prototype));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fully-qualified type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn options(&self) -> &FieldOptions {
        &self.options
    }

    pub fn constraints(&self) -> &[Arc<dyn Constraint>] {
        &self.constraints
    }

    pub fn children(&self) -> &IndexMap<String, FormField> {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&FormField> {
        self.children.get(name)
    }

    /// Entry prototype of a collection
    pub fn prototype(&self) -> Option<&FormField> {
        self.prototype.as_deref()
    }

    /// Current bound value
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Violations attached directly to this field
    pub fn errors(&self) -> &[Violation] {
        &self.errors
    }

    pub fn is_required(&self) -> bool {
        self.options.required
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// True when neither this field nor any descendant has violations
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty() && self.children.values().all(FormField::is_valid)
    }

    pub(crate) fn add_error(&mut self, violation: Violation) {
        self.errors.push(violation);
    }

    /// Pre-populate without validating
    pub fn set_data(&mut self, value: &Value) {
        match (&self.kind, value) {
            (FieldKind::Compound, Value::Object(map)) => {
                for (name, child) in self.children.iter_mut() {
                    if let Some(v) = map.get(name) {
                        child.set_data(v);
                    }
                }
            }
            (kind, _) if kind.is_button() => {}
            _ => self.data = value.clone(),
        }
    }

    /// Bind a submitted value, then validate
    pub fn submit(&mut self, value: Option<&Value>) {
        self.submitted = true;
        self.errors.clear();
        let value = value.unwrap_or(&Value::Null);

        match self.kind {
            FieldKind::Submit | FieldKind::Button => {
                self.data = Value::Null;
                return;
            }
            FieldKind::Compound => self.bind_compound(value),
            FieldKind::Collection => self.bind_collection(value),
            _ => match self.coerce(value) {
                Ok(bound) => self.data = bound,
                Err(violation) => {
                    self.data = Value::Null;
                    self.errors.push(violation);
                    return;
                }
            },
        }

        let bound = self.data.clone();
        for constraint in &self.constraints {
            if let Some(violation) = constraint.validate(&bound) {
                self.errors.push(violation);
            }
        }
    }

    fn bind_compound(&mut self, value: &Value) {
        let empty = Map::new();
        let map = match value {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => {
                self.errors.push(Violation::new(INVALID_VALUE));
                &empty
            }
        };

        for (name, child) in self.children.iter_mut() {
            child.submit(map.get(name));
        }
        self.data = Value::Object(self.collect_children());
    }

    fn bind_collection(&mut self, value: &Value) {
        self.children.clear();
        let items: &[Value] = match value {
            Value::Array(items) => items.as_slice(),
            Value::Null => &[],
            _ => {
                self.errors.push(Violation::new(INVALID_VALUE));
                &[]
            }
        };

        if let Some(prototype) = self.prototype.as_deref() {
            for (index, item) in items.iter().enumerate() {
                let mut entry = prototype.clone();
                entry.name = index.to_string();
                entry.submit(Some(item));
                self.children.insert(entry.name.clone(), entry);
            }
        }
        self.data = Value::Array(self.children.values().map(|c| c.data.clone()).collect());
    }

    fn collect_children(&self) -> Map<String, Value> {
        self.children
            .values()
            .filter(|c| !c.kind.is_button() && c.name != CSRF_FIELD)
            .map(|c| (c.name.clone(), c.data.clone()))
            .collect()
    }

    fn coerce(&self, value: &Value) -> Result<Value, Violation> {
        match self.kind {
            FieldKind::Checkbox => Ok(Value::Bool(match value {
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_f64().map(|n| n != 0.0).unwrap_or(false),
                Value::String(s) => !s.is_empty() && s != "0" && s != "false",
                _ => false,
            })),
            FieldKind::Integer => match scalar_string(value)? {
                None => Ok(Value::Null),
                Some(s) => s
                    .parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| Violation::new(INVALID_INTEGER)),
            },
            FieldKind::Number => match value {
                Value::Number(_) => Ok(value.clone()),
                _ => match scalar_string(value)? {
                    None => Ok(Value::Null),
                    Some(s) => s
                        .parse::<f64>()
                        .ok()
                        .and_then(serde_json::Number::from_f64)
                        .map(Value::Number)
                        .ok_or_else(|| Violation::new(INVALID_NUMBER)),
                },
            },
            FieldKind::Choice => self.coerce_choice(value),
            _ => Ok(scalar_string(value)?.map(Value::String).unwrap_or(Value::Null)),
        }
    }

    fn coerce_choice(&self, value: &Value) -> Result<Value, Violation> {
        let allowed = |v: &str| self.options.choices.values().any(|c| c == v);

        if self.options.multiple {
            let items = match value {
                Value::Null => return Ok(Value::Array(Vec::new())),
                Value::Array(items) => items,
                _ => return Err(Violation::new(INVALID_CHOICES)),
            };
            let mut selected = Vec::with_capacity(items.len());
            for item in items {
                match scalar_string(item) {
                    Ok(Some(s)) if allowed(&s) => selected.push(Value::String(s)),
                    _ => return Err(Violation::new(INVALID_CHOICES)),
                }
            }
            return Ok(Value::Array(selected));
        }

        match scalar_string(value) {
            Ok(None) => Ok(Value::Null),
            Ok(Some(s)) if allowed(&s) => Ok(Value::String(s)),
            _ => Err(Violation::new(INVALID_CHOICE)),
        }
    }
}

/// Scalar submitted value as a trimmed string; empty becomes `None`
fn scalar_string(value: &Value) -> Result<Option<String>, Violation> {
    let s = match value {
        Value::Null => return Ok(None),
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => if *b { "1".to_string() } else { String::new() },
        Value::Array(_) | Value::Object(_) => return Err(Violation::new(INVALID_VALUE)),
    };
    Ok((!s.is_empty()).then_some(s))
}

/// An assembled form
#[derive(Debug, Clone)]
pub struct Form {
    root: FormField,
    action: String,
    method: HttpMethod,
    csrf_protection: bool,
}

impl Form {
    pub fn name(&self) -> &str {
        self.root.name()
    }

    /// Submission URL
    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn csrf_protection(&self) -> bool {
        self.csrf_protection
    }

    /// Root compound field
    pub fn root(&self) -> &FormField {
        &self.root
    }

    pub fn get(&self, name: &str) -> Option<&FormField> {
        self.root.child(name)
    }

    pub fn is_submitted(&self) -> bool {
        self.root.is_submitted()
    }

    /// Submitted and free of violations
    pub fn is_valid(&self) -> bool {
        self.root.is_submitted() && self.root.is_valid()
    }

    /// Pre-populate from request input
    pub fn set_data(&mut self, data: &Map<String, Value>) {
        self.root.set_data(&Value::Object(data.clone()));
    }

    /// Bind and validate a submission
    pub fn submit(&mut self, payload: &Value, csrf: &dyn CsrfTokenManager) {
        self.root.submit(Some(payload));

        if let Value::Object(map) = payload {
            let extra: Vec<&String> = map
                .keys()
                .filter(|k| k.as_str() != CSRF_FIELD && !self.root.children.contains_key(k.as_str()))
                .collect();
            if !extra.is_empty() {
                let names = extra.iter().map(|k| format!("\"{k}\"")).collect::<Vec<_>>();
                self.root.add_error(
                    Violation::new(EXTRA_FIELDS).with_parameter("{{ extra_fields }}", names.join(", ")),
                );
            }
        }

        if self.csrf_protection {
            let token = payload.get(CSRF_FIELD).and_then(Value::as_str).unwrap_or_default();
            if !csrf.is_valid(self.name(), token) {
                tracing::debug!("Rejected CSRF token for form {}", self.name());
                self.root.add_error(Violation::new(INVALID_CSRF).with_cause("Csrf"));
            }
        }
    }

    /// Submitted data without the CSRF token and buttons
    pub fn data(&self) -> Map<String, Value> {
        self.root.collect_children()
    }
}

/// Incrementally configured form
#[derive(Debug, Clone)]
pub struct FormBuilder {
    name: String,
    action: String,
    method: HttpMethod,
    csrf_protection: bool,
    fields: IndexMap<String, FormField>,
}

impl FormBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action: String::new(),
            method: HttpMethod::Post,
            csrf_protection: true,
            fields: IndexMap::new(),
        }
    }

    pub fn set_action(&mut self, action: impl Into<String>) -> &mut Self {
        self.action = action.into();
        self
    }

    pub fn set_method(&mut self, method: HttpMethod) -> &mut Self {
        self.method = method;
        self
    }

    pub fn set_csrf_protection(&mut self, enabled: bool) -> &mut Self {
        self.csrf_protection = enabled;
        self
    }

    pub fn add(&mut self, field: FormField) -> &mut Self {
        self.fields.insert(field.name().to_string(), field);
        self
    }

    pub fn has(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get_form(self) -> Form {
        let root = self
            .fields
            .into_values()
            .fold(FormField::new(&self.name, "dynform::types::FormType", FieldKind::Compound), |root, child| {
                root.with_child(child)
            });
        Form {
            root,
            action: self.action,
            method: self.method,
            csrf_protection: self.csrf_protection,
        }
    }
}
