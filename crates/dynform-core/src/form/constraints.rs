//! Validation constraints
//!
//! Each constraint is a plain struct whose public fields are its
//! configuration: they are deserialized from the config entry params and
//! serialized back out as the schema's `constraints[].config`. Null values
//! are skipped by every constraint except `NotNull` and `NotBlank`, so
//! optional fields only fail the constraints that demand presence.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::error::{DynformError, Result};
use crate::registry::ConstraintFactory;
use crate::translation::{substitute, Params};

/// Namespace short constraint names expand against
pub const CONSTRAINT_NAMESPACE: &str = "dynform::constraints::";

/// A failed constraint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    /// Untranslated message template
    pub message_template: String,
    /// Placeholder values
    pub parameters: Params,
    /// Count for pluralized messages
    pub plural: Option<u64>,
    /// Short name of the failing constraint, if any
    pub cause: Option<String>,
}

impl Violation {
    pub fn new(message_template: impl Into<String>) -> Self {
        Self {
            message_template: message_template.into(),
            parameters: Params::new(),
            plural: None,
            cause: None,
        }
    }

    pub fn with_parameter(mut self, placeholder: &str, value: impl ToString) -> Self {
        self.parameters.insert(placeholder.to_string(), value.to_string());
        self
    }

    pub fn with_plural(mut self, count: u64) -> Self {
        self.plural = Some(count);
        self
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Message with parameters substituted, untranslated
    pub fn message(&self) -> String {
        substitute(&self.message_template, &self.parameters)
    }
}

/// Validation constraint
pub trait Constraint: fmt::Debug + Send + Sync {
    /// Fully-qualified constraint name
    fn type_name(&self) -> &str;

    /// Public configuration as exposed in schemas
    fn config(&self) -> Value;

    /// Check a bound value
    fn validate(&self, value: &Value) -> Option<Violation>;

    /// Name without namespace
    fn short_name(&self) -> &str {
        self.type_name().rsplit("::").next().unwrap_or_default()
    }
}

/// Deserialize a constraint from its config params (`Null` → all defaults)
pub fn from_params<C>(name: &str, params: Value) -> Result<Arc<dyn Constraint>>
where
    C: Constraint + DeserializeOwned + 'static,
{
    let params = if params.is_null() { json!({}) } else { params };
    serde_json::from_value::<C>(params)
        .map(|c| Arc::new(c) as Arc<dyn Constraint>)
        .map_err(|e| DynformError::ConstraintOptions {
            constraint: name.to_string(),
            reason: e.to_string(),
        })
}

fn to_config<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn is_empty_string(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.is_empty())
}

fn violation(constraint: &dyn Constraint, message: &str) -> Violation {
    Violation::new(message).with_cause(constraint.short_name())
}

fn value_label(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{s}\""),
        other => other.to_string(),
    }
}

// =============================================================================
// Presence
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct NotBlank {
    pub message: String,
    pub allow_null: bool,
}

impl Default for NotBlank {
    fn default() -> Self {
        Self {
            message: "This value should not be blank.".into(),
            allow_null: false,
        }
    }
}

impl Constraint for NotBlank {
    fn type_name(&self) -> &str {
        "dynform::constraints::NotBlank"
    }

    fn config(&self) -> Value {
        to_config(self)
    }

    fn validate(&self, value: &Value) -> Option<Violation> {
        let blank = match value {
            Value::Null => !self.allow_null,
            Value::String(s) => s.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Bool(b) => !b,
            _ => false,
        };
        blank.then(|| violation(self, &self.message).with_parameter("{{ value }}", value_label(value)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct NotNull {
    pub message: String,
}

impl Default for NotNull {
    fn default() -> Self {
        Self {
            message: "This value should not be null.".into(),
        }
    }
}

impl Constraint for NotNull {
    fn type_name(&self) -> &str {
        "dynform::constraints::NotNull"
    }

    fn config(&self) -> Value {
        to_config(self)
    }

    fn validate(&self, value: &Value) -> Option<Violation> {
        value.is_null().then(|| violation(self, &self.message))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct IsTrue {
    pub message: String,
}

impl Default for IsTrue {
    fn default() -> Self {
        Self {
            message: "This value should be true.".into(),
        }
    }
}

impl Constraint for IsTrue {
    fn type_name(&self) -> &str {
        "dynform::constraints::IsTrue"
    }

    fn config(&self) -> Value {
        to_config(self)
    }

    fn validate(&self, value: &Value) -> Option<Violation> {
        match value {
            Value::Null | Value::Bool(true) => None,
            Value::String(s) if s == "1" || s == "true" => None,
            Value::Number(n) if n.as_i64() == Some(1) => None,
            _ => Some(violation(self, &self.message)),
        }
    }
}

// =============================================================================
// Format
// =============================================================================

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$")
            .expect("email pattern is valid")
    })
}

fn url_pattern() -> &'static Regex {
    static URL: OnceLock<Regex> = OnceLock::new();
    URL.get_or_init(|| {
        Regex::new(r"^(?P<scheme>[a-zA-Z][a-zA-Z0-9+.-]*)://[^\s/?#]+[^\s]*$").expect("url pattern is valid")
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Email {
    pub message: String,
}

impl Default for Email {
    fn default() -> Self {
        Self {
            message: "This value is not a valid email address.".into(),
        }
    }
}

impl Constraint for Email {
    fn type_name(&self) -> &str {
        "dynform::constraints::Email"
    }

    fn config(&self) -> Value {
        to_config(self)
    }

    fn validate(&self, value: &Value) -> Option<Violation> {
        match value {
            Value::Null => None,
            Value::String(s) if s.is_empty() || email_pattern().is_match(s) => None,
            other => Some(violation(self, &self.message).with_parameter("{{ value }}", value_label(other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Url {
    pub message: String,
    pub protocols: Vec<String>,
}

impl Default for Url {
    fn default() -> Self {
        Self {
            message: "This value is not a valid URL.".into(),
            protocols: vec!["http".into(), "https".into()],
        }
    }
}

impl Constraint for Url {
    fn type_name(&self) -> &str {
        "dynform::constraints::Url"
    }

    fn config(&self) -> Value {
        to_config(self)
    }

    fn validate(&self, value: &Value) -> Option<Violation> {
        let s = match value {
            Value::Null => return None,
            Value::String(s) if s.is_empty() => return None,
            Value::String(s) => s,
            other => return Some(violation(self, &self.message).with_parameter("{{ value }}", value_label(other))),
        };
        let valid = url_pattern()
            .captures(s)
            .and_then(|c| c.name("scheme"))
            .map(|scheme| {
                self.protocols
                    .iter()
                    .any(|p| p.eq_ignore_ascii_case(scheme.as_str()))
            })
            .unwrap_or(false);
        (!valid).then(|| violation(self, &self.message).with_parameter("{{ value }}", value_label(value)))
    }
}

/// Pattern match, compiled when the constraint is built
#[derive(Debug, Clone)]
pub struct RegexConstraint {
    pub pattern: String,
    pub matches: bool,
    pub message: String,
    compiled: Regex,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RegexParams {
    pattern: String,
    #[serde(default = "default_true", rename = "match")]
    matches: bool,
    #[serde(default = "default_regex_message")]
    message: String,
}

fn default_true() -> bool {
    true
}

fn default_regex_message() -> String {
    "This value is not valid.".into()
}

impl RegexConstraint {
    pub fn new(pattern: &str) -> Result<Self> {
        Self::from_parts(pattern.to_string(), true, default_regex_message())
    }

    fn from_parts(pattern: String, matches: bool, message: String) -> Result<Self> {
        let compiled = Regex::new(&pattern).map_err(|e| DynformError::ConstraintOptions {
            constraint: "Regex".into(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            pattern,
            matches,
            message,
            compiled,
        })
    }

    /// Factory for the constraint registry (a bare string is the pattern)
    pub fn from_params(params: Value) -> Result<Arc<dyn Constraint>> {
        let params = match params {
            Value::String(pattern) => json!({ "pattern": pattern }),
            other => other,
        };
        let parsed: RegexParams =
            serde_json::from_value(params).map_err(|e| DynformError::ConstraintOptions {
                constraint: "Regex".into(),
                reason: e.to_string(),
            })?;
        let constraint = Self::from_parts(parsed.pattern, parsed.matches, parsed.message)?;
        Ok(Arc::new(constraint))
    }
}

impl Constraint for RegexConstraint {
    fn type_name(&self) -> &str {
        "dynform::constraints::Regex"
    }

    fn config(&self) -> Value {
        json!({
            "pattern": self.pattern,
            "match": self.matches,
            "message": self.message,
        })
    }

    fn validate(&self, value: &Value) -> Option<Violation> {
        let s = match value {
            Value::Null => return None,
            v if is_empty_string(v) => return None,
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        (self.compiled.is_match(&s) != self.matches)
            .then(|| violation(self, &self.message).with_parameter("{{ value }}", value_label(value)))
    }
}

// =============================================================================
// Size
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Length {
    pub min: Option<u64>,
    pub max: Option<u64>,
    pub min_message: String,
    pub max_message: String,
}

impl Default for Length {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
            min_message: "This value is too short. It should have {{ limit }} character or more.|This value is too short. It should have {{ limit }} characters or more.".into(),
            max_message: "This value is too long. It should have {{ limit }} character or less.|This value is too long. It should have {{ limit }} characters or less.".into(),
        }
    }
}

impl Constraint for Length {
    fn type_name(&self) -> &str {
        "dynform::constraints::Length"
    }

    fn config(&self) -> Value {
        to_config(self)
    }

    fn validate(&self, value: &Value) -> Option<Violation> {
        let length = match value {
            Value::Null => return None,
            Value::String(s) if s.is_empty() => return None,
            Value::String(s) => s.chars().count() as u64,
            other => other.to_string().chars().count() as u64,
        };
        let (limit, message) = match (self.min, self.max) {
            (Some(min), _) if length < min => (min, &self.min_message),
            (_, Some(max)) if length > max => (max, &self.max_message),
            _ => return None,
        };
        Some(
            violation(self, message)
                .with_parameter("{{ limit }}", limit)
                .with_parameter("{{ value }}", value_label(value))
                .with_plural(limit),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Count {
    pub min: Option<u64>,
    pub max: Option<u64>,
    pub min_message: String,
    pub max_message: String,
}

impl Default for Count {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
            min_message: "This collection should contain {{ limit }} element or more.|This collection should contain {{ limit }} elements or more.".into(),
            max_message: "This collection should contain {{ limit }} element or less.|This collection should contain {{ limit }} elements or less.".into(),
        }
    }
}

impl Constraint for Count {
    fn type_name(&self) -> &str {
        "dynform::constraints::Count"
    }

    fn config(&self) -> Value {
        to_config(self)
    }

    fn validate(&self, value: &Value) -> Option<Violation> {
        let count = match value {
            Value::Null => 0,
            Value::Array(items) => items.len() as u64,
            _ => 1,
        };
        let (limit, message) = match (self.min, self.max) {
            (Some(min), _) if count < min => (min, &self.min_message),
            (_, Some(max)) if count > max => (max, &self.max_message),
            _ => return None,
        };
        Some(
            violation(self, message)
                .with_parameter("{{ limit }}", limit)
                .with_parameter("{{ count }}", count)
                .with_plural(limit),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Range {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub min_message: String,
    pub max_message: String,
    pub invalid_message: String,
}

impl Default for Range {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
            min_message: "This value should be {{ limit }} or more.".into(),
            max_message: "This value should be {{ limit }} or less.".into(),
            invalid_message: "This value should be a valid number.".into(),
        }
    }
}

impl Constraint for Range {
    fn type_name(&self) -> &str {
        "dynform::constraints::Range"
    }

    fn config(&self) -> Value {
        to_config(self)
    }

    fn validate(&self, value: &Value) -> Option<Violation> {
        let number = match value {
            Value::Null => return None,
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        let Some(number) = number else {
            return Some(violation(self, &self.invalid_message).with_parameter("{{ value }}", value_label(value)));
        };
        let (limit, message) = match (self.min, self.max) {
            (Some(min), _) if number < min => (min, &self.min_message),
            (_, Some(max)) if number > max => (max, &self.max_message),
            _ => return None,
        };
        Some(
            violation(self, message)
                .with_parameter("{{ limit }}", limit)
                .with_parameter("{{ value }}", value_label(value)),
        )
    }
}

// =============================================================================
// Membership
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Choice {
    pub choices: Vec<Value>,
    pub multiple: bool,
    pub message: String,
    pub multiple_message: String,
}

impl Default for Choice {
    fn default() -> Self {
        Self {
            choices: Vec::new(),
            multiple: false,
            message: "The value you selected is not a valid choice.".into(),
            multiple_message: "One or more of the given values is invalid.".into(),
        }
    }
}

impl Constraint for Choice {
    fn type_name(&self) -> &str {
        "dynform::constraints::Choice"
    }

    fn config(&self) -> Value {
        to_config(self)
    }

    fn validate(&self, value: &Value) -> Option<Violation> {
        match value {
            Value::Null => None,
            Value::Array(items) if self.multiple => items
                .iter()
                .find(|item| !self.choices.contains(item))
                .map(|item| {
                    violation(self, &self.multiple_message).with_parameter("{{ value }}", value_label(item))
                }),
            single if !self.choices.contains(single) => {
                Some(violation(self, &self.message).with_parameter("{{ value }}", value_label(single)))
            }
            _ => None,
        }
    }
}

fn factory<C>(name: &'static str) -> ConstraintFactory
where
    C: Constraint + DeserializeOwned + 'static,
{
    Arc::new(move |params| from_params::<C>(name, params))
}

/// Built-in constraints by short name
pub(crate) fn builtin_factories() -> Vec<(&'static str, ConstraintFactory)> {
    vec![
        ("NotBlank", factory::<NotBlank>("NotBlank")),
        ("NotNull", factory::<NotNull>("NotNull")),
        ("IsTrue", factory::<IsTrue>("IsTrue")),
        ("Email", factory::<Email>("Email")),
        ("Url", factory::<Url>("Url")),
        ("Regex", Arc::new(RegexConstraint::from_params) as ConstraintFactory),
        ("Length", factory::<Length>("Length")),
        ("Count", factory::<Count>("Count")),
        ("Range", factory::<Range>("Range")),
        ("Choice", factory::<Choice>("Choice")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_blank() {
        let c = NotBlank::default();
        assert!(c.validate(&Value::Null).is_some());
        assert!(c.validate(&json!("")).is_some());
        assert!(c.validate(&json!([])).is_some());
        assert!(c.validate(&json!("x")).is_none());
        assert_eq!(
            c.validate(&json!("")).unwrap().cause.as_deref(),
            Some("NotBlank")
        );
    }

    #[test]
    fn test_email() {
        let c = Email::default();
        assert!(c.validate(&json!("invalid-email")).is_some());
        assert!(c.validate(&json!("jane@example.com")).is_none());
        assert!(c.validate(&Value::Null).is_none());
    }

    #[test]
    fn test_length_pluralizes_on_limit() {
        let c: Arc<dyn Constraint> = from_params::<Length>("Length", json!({"min": 3})).unwrap();
        let v = c.validate(&json!("ab")).unwrap();
        assert_eq!(v.plural, Some(3));
        assert_eq!(v.parameters["{{ limit }}"], "3");
        assert!(c.validate(&json!("abc")).is_none());
    }

    #[test]
    fn test_unknown_params_rejected() {
        assert!(matches!(
            from_params::<Length>("Length", json!({"minimum": 3})),
            Err(DynformError::ConstraintOptions { .. })
        ));
    }

    #[test]
    fn test_regex() {
        let c = RegexConstraint::from_params(json!("^[0-9]{5}$")).unwrap();
        assert!(c.validate(&json!("12345")).is_none());
        assert!(c.validate(&json!("1234")).is_some());
        assert_eq!(c.config()["match"], true);
        assert!(RegexConstraint::from_params(json!({"pattern": "("})).is_err());
    }

    #[test]
    fn test_range_and_url() {
        let range = Range { min: Some(18.0), ..Range::default() };
        assert!(range.validate(&json!(17)).is_some());
        assert!(range.validate(&json!("21")).is_none());
        assert!(range.validate(&json!("abc")).is_some());

        let url = Url::default();
        assert!(url.validate(&json!("https://example.com/a")).is_none());
        assert!(url.validate(&json!("ftp://example.com")).is_some());
    }

    #[test]
    fn test_choice_multiple() {
        let c = Choice {
            choices: vec![json!("de"), json!("fr")],
            multiple: true,
            ..Choice::default()
        };
        assert!(c.validate(&json!(["de", "fr"])).is_none());
        assert!(c.validate(&json!(["de", "it"])).is_some());
    }

    #[test]
    fn test_short_name_strips_namespace() {
        assert_eq!(NotBlank::default().short_name(), "NotBlank");
        assert_eq!(IsTrue::default().config()["message"], "This value should be true.");
    }
}
