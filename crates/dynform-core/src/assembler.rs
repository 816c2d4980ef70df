//! Form assembly from configuration

use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::config::{FieldDefinition, FormDefinition, TranslateSettings};
use crate::csrf::{CsrfTokenManager, CSRF_FIELD};
use crate::error::{DynformError, Result};
use crate::form::{FieldKind, FieldOptions, FormBuilder, FormField};
use crate::registry::{FieldTypeRegistry, FormRegistries};
use crate::routing::{UrlGenerator, SUBMIT_ROUTE};
use crate::translation::{Params, Translator, MESSAGES_DOMAIN};

/// Name given to a collection's entry prototype
pub const PROTOTYPE_NAME: &str = "__name__";

/// Options consumed by the assembler itself
const STRUCTURAL_OPTIONS: &[&str] = &[
    "label",
    "required",
    "attr",
    "data",
    "choices",
    "choice_attr",
    "provider",
    "multiple",
    "expanded",
    "fields",
    "entry_type",
    "entry_options",
];

/// Turns form definitions into form builders
pub struct FormAssembler {
    registries: Arc<FormRegistries>,
    translator: Arc<dyn Translator>,
    urls: Arc<dyn UrlGenerator>,
    csrf: Arc<dyn CsrfTokenManager>,
}

impl FormAssembler {
    pub fn new(
        registries: Arc<FormRegistries>,
        translator: Arc<dyn Translator>,
        urls: Arc<dyn UrlGenerator>,
        csrf: Arc<dyn CsrfTokenManager>,
    ) -> Self {
        Self {
            registries,
            translator,
            urls,
            csrf,
        }
    }

    pub fn assemble(&self, name: &str, definition: &FormDefinition) -> Result<FormBuilder> {
        let mut route_params = IndexMap::new();
        route_params.insert("name".to_string(), name.to_string());
        let action = self.urls.generate(SUBMIT_ROUTE, &route_params)?;

        let mut builder = FormBuilder::new(name);
        builder
            .set_action(action)
            .set_method(definition.method)
            .set_csrf_protection(definition.csrf);

        for (field_name, field) in &definition.fields {
            builder.add(self.build_field(field_name, field, &definition.translate)?);
        }

        if definition.csrf {
            let token = FormField::new(
                CSRF_FIELD,
                FieldTypeRegistry::expand("HiddenType"),
                FieldKind::Hidden,
            )
            .with_options(FieldOptions {
                data: Some(Value::String(self.csrf.token(name))),
                ..FieldOptions::default()
            });
            builder.add(token);
        }

        tracing::debug!(
            "Assembled form {} with {} field(s)",
            name,
            definition.fields.len()
        );
        Ok(builder)
    }

    fn build_field(
        &self,
        name: &str,
        definition: &FieldDefinition,
        translate: &TranslateSettings,
    ) -> Result<FormField> {
        let resolved = self.registries.field_types.resolve(&definition.type_name)?;
        let options = self.field_options(definition, translate)?;

        let mut field = FormField::new(name, resolved.type_name, resolved.kind.clone()).with_options(options);

        for entry in &definition.constraints {
            let (constraint, params) = entry.parts()?;
            field = field.with_constraint(self.registries.constraints.build(constraint, params)?);
        }

        match resolved.kind {
            FieldKind::Compound => {
                let children = definition.children()?.ok_or_else(|| {
                    DynformError::InvalidConfig(format!("compound field \"{name}\" has no fields"))
                })?;
                for (child_name, child) in &children {
                    field = field.with_child(self.build_field(child_name, child, translate)?);
                }
            }
            FieldKind::Collection => {
                let entry = definition.entry()?;
                field = field.with_prototype(self.build_field(PROTOTYPE_NAME, &entry, translate)?);
            }
            _ => {}
        }

        Ok(field)
    }

    fn field_options(&self, definition: &FieldDefinition, translate: &TranslateSettings) -> Result<FieldOptions> {
        let raw = &definition.options;
        let mut options = FieldOptions::default();

        options.label = match raw.get("label") {
            Some(Value::String(label)) if translate.field_labels => {
                Some(self.translator.trans(label, &Params::new(), Some(MESSAGES_DOMAIN)))
            }
            Some(Value::String(label)) => Some(label.clone()),
            _ => None,
        };
        options.label_translated = options.label.is_some() && translate.field_labels;
        if let Some(required) = raw.get("required").and_then(Value::as_bool) {
            options.required = required;
        }
        if let Some(Value::Object(attr)) = raw.get("attr") {
            options.attr = attr.clone();
        }
        options.data = raw.get("data").filter(|v| !v.is_null()).cloned();
        options.multiple = raw.get("multiple").and_then(Value::as_bool).unwrap_or(false);
        options.expanded = raw.get("expanded").and_then(Value::as_bool).unwrap_or(false);

        options.choices = match definition.choice_provider() {
            Some(key) => self.registries.choice_providers.get(key)?.choices(),
            None => inline_choices(raw.get("choices"))?
                .into_iter()
                .map(|(label, value)| {
                    let label = if translate.inline_choices {
                        self.translator.trans(&label, &Params::new(), Some(MESSAGES_DOMAIN))
                    } else {
                        label
                    };
                    (label, value)
                })
                .collect(),
        };

        if let Some(Value::Object(choice_attr)) = raw.get("choice_attr") {
            for (value, attr) in choice_attr {
                if let Value::Object(attr) = attr {
                    options.choice_attr.insert(value.clone(), attr.clone());
                }
            }
        }

        options.extra = raw
            .iter()
            .filter(|(key, _)| !STRUCTURAL_OPTIONS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect::<Map<String, Value>>();

        Ok(options)
    }
}

/// Inline `label -> value` choices; a plain list uses each value as its label
fn inline_choices(raw: Option<&Value>) -> Result<Vec<(String, String)>> {
    let scalar = |value: &Value| match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(_) | Value::Bool(_) => Ok(value.to_string()),
        other => Err(DynformError::InvalidConfig(format!("invalid choice value {other}"))),
    };

    match raw {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(label, value)| Ok((label.clone(), scalar(value)?)))
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|value| {
                let value = scalar(value)?;
                Ok((value.clone(), value))
            })
            .collect(),
        Some(other) => Err(DynformError::InvalidConfig(format!(
            "choices must be a mapping, a list or a provider key, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FormsConfig, HttpMethod};
    use crate::csrf::HmacCsrfTokenManager;
    use crate::output::testing;
    use crate::registry::StaticChoiceProvider;
    use crate::routing::RouteTable;
    use crate::translation::MessageCatalogue;
    use serde_json::json;

    const FORMS: &str = r#"
forms:
  contact:
    translate: { field_labels: true, inline_choices: true }
    fields:
      name:
        type: TextType
        options: { label: Name, attr: { data-value: x } }
        constraints: [NotBlank, { Length: { min: 2 } }]
      country:
        type: ChoiceType
        options: { choices: { Germany: de, France: fr } }
      region:
        type: ChoiceType
        options: { choices: regions, required: false }
      address:
        type: FormType
        options:
          fields:
            city: { type: TextType }
      tags:
        type: CollectionType
        options: { entry_type: EmailType }
    outputs:
      log: { type: ok }
"#;

    fn assembler() -> FormAssembler {
        let mut registries = FormRegistries::new(testing::registry());
        registries.choice_providers.register(
            "regions",
            Arc::new(StaticChoiceProvider::new([("North", "n"), ("South", "s")])),
        );
        let mut catalogue = MessageCatalogue::new();
        catalogue.insert(MESSAGES_DOMAIN, "Name", "Nom");
        catalogue.insert(MESSAGES_DOMAIN, "Germany", "Allemagne");
        FormAssembler::new(
            Arc::new(registries),
            Arc::new(catalogue),
            Arc::new(RouteTable::new("/site")),
            Arc::new(HmacCsrfTokenManager::new("secret")),
        )
    }

    fn contact() -> FormDefinition {
        FormsConfig::from_yaml_str(FORMS).unwrap().forms["contact"].clone()
    }

    #[test]
    fn test_form_settings() {
        let form = assembler().assemble("contact", &contact()).unwrap().get_form();
        assert_eq!(form.action(), "/site/api/forms/contact");
        assert!(form.csrf_protection());
        let token = form.get(CSRF_FIELD).unwrap();
        assert_eq!(
            token.data(),
            &json!(HmacCsrfTokenManager::new("secret").token("contact"))
        );
    }

    #[test]
    fn test_fields_in_declaration_order() {
        let form = assembler().assemble("contact", &contact()).unwrap().get_form();
        let names: Vec<_> = form.root().children().keys().cloned().collect();
        assert_eq!(names, vec!["name", "country", "region", "address", "tags", CSRF_FIELD]);
    }

    #[test]
    fn test_constraints_in_declaration_order() {
        let form = assembler().assemble("contact", &contact()).unwrap().get_form();
        let names: Vec<_> = form
            .get("name")
            .unwrap()
            .constraints()
            .iter()
            .map(|c| c.short_name().to_string())
            .collect();
        assert_eq!(names, vec!["NotBlank", "Length"]);
    }

    #[test]
    fn test_labels_and_choices_translated() {
        let form = assembler().assemble("contact", &contact()).unwrap().get_form();
        assert_eq!(form.get("name").unwrap().options().label.as_deref(), Some("Nom"));
        let country = form.get("country").unwrap().options();
        assert_eq!(country.choices.get("Allemagne").map(String::as_str), Some("de"));
        assert!(form.get("country").unwrap().options().label.is_none());
    }

    #[test]
    fn test_form_method() {
        let mut definition = contact();
        assert_eq!(assembler().assemble("contact", &definition).unwrap().get_form().method(), HttpMethod::Post);
        definition.method = HttpMethod::Get;
        assert_eq!(assembler().assemble("contact", &definition).unwrap().get_form().method(), HttpMethod::Get);
    }

    #[test]
    fn test_provider_choices() {
        let form = assembler().assemble("contact", &contact()).unwrap().get_form();
        let region = form.get("region").unwrap();
        assert!(!region.is_required());
        assert_eq!(region.options().choices.len(), 2);
    }

    #[test]
    fn test_nested_and_collection() {
        let form = assembler().assemble("contact", &contact()).unwrap().get_form();
        assert!(form.get("address").unwrap().child("city").is_some());
        let prototype = form.get("tags").unwrap().prototype().unwrap();
        assert_eq!(prototype.name(), PROTOTYPE_NAME);
        assert_eq!(prototype.kind(), &FieldKind::Email);
    }

    #[test]
    fn test_missing_provider() {
        let mut definition = contact();
        definition.fields["region"]
            .options
            .insert("choices".into(), json!("planets"));
        let err = assembler().assemble("contact", &definition).err().unwrap();
        assert!(matches!(err, DynformError::ItemNotFound { key, .. } if key == "planets"));
    }

    #[test]
    fn test_unknown_type() {
        let mut definition = contact();
        definition.fields["name"].type_name = "ColorType".into();
        assert!(matches!(
            assembler().assemble("contact", &definition),
            Err(DynformError::UnknownFieldType(_))
        ));
    }
}
