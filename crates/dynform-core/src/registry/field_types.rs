//! Field type registry

use std::collections::HashMap;

use crate::error::{DynformError, Result};
use crate::form::FieldKind;

/// Namespace short type names expand against
pub const TYPE_NAMESPACE: &str = "dynform::types::";

/// A resolved field type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldType {
    /// Fully-qualified name
    pub type_name: String,
    pub kind: FieldKind,
}

/// Maps fully-qualified type names to their behaviour
#[derive(Debug, Clone, Default)]
pub struct FieldTypeRegistry {
    types: HashMap<String, FieldKind>,
}

impl FieldTypeRegistry {
    pub fn with_builtins() -> Self {
        let mut registry = Self::default();
        for (name, kind) in [
            ("TextType", FieldKind::Text),
            ("TextareaType", FieldKind::Textarea),
            ("EmailType", FieldKind::Email),
            ("PasswordType", FieldKind::Password),
            ("UrlType", FieldKind::Url),
            ("TelType", FieldKind::Tel),
            ("DateType", FieldKind::Date),
            ("NumberType", FieldKind::Number),
            ("IntegerType", FieldKind::Integer),
            ("CheckboxType", FieldKind::Checkbox),
            ("ChoiceType", FieldKind::Choice),
            ("FileType", FieldKind::File),
            ("HiddenType", FieldKind::Hidden),
            ("SubmitType", FieldKind::Submit),
            ("ButtonType", FieldKind::Button),
            ("FormType", FieldKind::Compound),
            ("CollectionType", FieldKind::Collection),
        ] {
            registry.register(format!("{TYPE_NAMESPACE}{name}"), kind);
        }
        registry
    }

    pub fn register(&mut self, type_name: impl Into<String>, kind: FieldKind) {
        self.types.insert(type_name.into(), kind);
    }

    /// Register an application type bound like text
    pub fn register_custom(&mut self, type_name: impl Into<String>) {
        let type_name = type_name.into();
        self.types
            .insert(type_name.clone(), FieldKind::Custom(type_name));
    }

    /// Expand a short name against the built-in namespace
    pub fn expand(name: &str) -> String {
        if name.contains("::") {
            name.to_string()
        } else {
            format!("{TYPE_NAMESPACE}{name}")
        }
    }

    pub fn resolve(&self, name: &str) -> Result<FieldType> {
        let type_name = Self::expand(name);
        match self.types.get(&type_name) {
            Some(kind) => Ok(FieldType {
                kind: kind.clone(),
                type_name,
            }),
            None => Err(DynformError::UnknownFieldType(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_and_qualified_names() {
        let registry = FieldTypeRegistry::with_builtins();
        let short = registry.resolve("EmailType").unwrap();
        assert_eq!(short.type_name, "dynform::types::EmailType");
        assert_eq!(short.kind, FieldKind::Email);
        assert_eq!(registry.resolve("dynform::types::EmailType").unwrap(), short);
    }

    #[test]
    fn test_unknown_type() {
        let registry = FieldTypeRegistry::with_builtins();
        assert!(matches!(
            registry.resolve("ColorType"),
            Err(DynformError::UnknownFieldType(name)) if name == "ColorType"
        ));
    }

    #[test]
    fn test_custom_type() {
        let mut registry = FieldTypeRegistry::with_builtins();
        registry.register_custom("app::types::RatingType");
        let resolved = registry.resolve("app::types::RatingType").unwrap();
        assert_eq!(resolved.kind, FieldKind::Custom("app::types::RatingType".into()));
        assert_eq!(resolved.kind.token(), None);
    }
}
