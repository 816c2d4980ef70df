//! Form tree to JSON-Schema-like description
//!
//! The output drives client-side renderers: every node carries its JSON
//! type plus rendering hints (`title`, `attr`, `formType`, `widget`) and the
//! constraints the client may check before submitting.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::form::{FieldKind, Form, FormField};
use crate::translation::{Params, Translator, MESSAGES_DOMAIN};

/// One node of a form schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaNode {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_titles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_attr: Option<Vec<Map<String, Value>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, SchemaNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget: Option<String>,
    #[serde(rename = "uniqueItems", default, skip_serializing_if = "Option::is_none")]
    pub unique_items: Option<bool>,
    #[serde(rename = "minItems", default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "submitUrl", default, skip_serializing_if = "Option::is_none")]
    pub submit_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Vec<ConstraintSchema>>,
    #[serde(rename = "formType", default, skip_serializing_if = "Option::is_none")]
    pub form_type: Option<String>,
}

impl SchemaNode {
    fn typed(schema_type: &str) -> Self {
        Self {
            schema_type: schema_type.to_string(),
            ..Self::default()
        }
    }
}

/// A constraint as exposed to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSchema {
    #[serde(rename = "type")]
    pub constraint_type: String,
    pub config: Value,
}

pub struct SchemaTransformer<'a> {
    translator: &'a dyn Translator,
}

impl<'a> SchemaTransformer<'a> {
    pub fn new(translator: &'a dyn Translator) -> Self {
        Self { translator }
    }

    pub fn transform(&self, form: &Form) -> SchemaNode {
        let mut schema = self.transform_field(form.root());
        schema.submit_url = Some(form.action().to_string());
        schema
    }

    fn transform_field(&self, field: &FormField) -> SchemaNode {
        let mut schema = match field.kind() {
            FieldKind::Compound => self.object(field),
            FieldKind::Collection => {
                let mut schema = SchemaNode::typed("array");
                let items = field
                    .prototype()
                    .map(|prototype| self.transform_field(prototype))
                    .unwrap_or_else(|| SchemaNode::typed("string"));
                schema.items = Some(Box::new(items));
                schema
            }
            FieldKind::Choice => self.choice(field),
            kind if kind.is_button() => SchemaNode::typed("string"),
            kind => {
                let mut schema = SchemaNode::typed(leaf_type(kind));
                schema.data = Some(field.data().clone());
                if *kind == FieldKind::Hidden {
                    schema.value = Some(field.options().data.clone().unwrap_or(Value::Null));
                }
                schema
            }
        };

        if !field.kind().is_button() {
            schema.title = Some(self.title(field));
            if !field.options().attr.is_empty() {
                schema.attr = Some(camel_case_keys(&field.options().attr));
            }
        }

        schema.name = Some(field.name().to_string());
        if !field.constraints().is_empty() {
            schema.constraints = Some(
                field
                    .constraints()
                    .iter()
                    .map(|c| ConstraintSchema {
                        constraint_type: c.short_name().to_string(),
                        config: c.config(),
                    })
                    .collect(),
            );
        }
        schema.form_type = Some(form_type(field));
        schema
    }

    fn object(&self, field: &FormField) -> SchemaNode {
        let mut schema = SchemaNode::typed("object");
        let mut properties = IndexMap::new();
        let mut required = Vec::new();
        for (name, child) in field.children() {
            properties.insert(name.clone(), self.transform_field(child));
            if child.is_required() && !child.kind().is_button() {
                required.push(name.clone());
            }
        }
        schema.properties = Some(properties);
        schema.required = Some(required);
        schema
    }

    fn choice(&self, field: &FormField) -> SchemaNode {
        let options = field.options();
        let values: Vec<String> = options.choices.values().cloned().collect();
        let titles: Vec<String> = options.choices.keys().cloned().collect();
        let attrs: Vec<Map<String, Value>> = values
            .iter()
            .map(|value| {
                options
                    .choice_attr
                    .get(value)
                    .map(camel_case_keys)
                    .unwrap_or_default()
            })
            .collect();
        let has_attrs = attrs.iter().any(|a| !a.is_empty());

        let mut choices = SchemaNode::typed("string");
        choices.enum_values = Some(values);
        choices.enum_titles = Some(titles);
        choices.enum_attr = has_attrs.then_some(attrs);

        let mut schema = if options.multiple {
            let mut schema = SchemaNode::typed("array");
            schema.items = Some(Box::new(choices));
            schema.unique_items = Some(true);
            schema.min_items = Some(if field.is_required() { 1 } else { 0 });
            schema
        } else {
            choices
        };

        if options.expanded {
            schema.widget = Some(
                if options.multiple {
                    "choice-multiple-expanded"
                } else {
                    "choice-expanded"
                }
                .to_string(),
            );
        }
        schema.data = Some(field.data().clone());
        schema
    }

    /// Label, or the field name used as a translation key
    fn title(&self, field: &FormField) -> String {
        match &field.options().label {
            Some(label) => label.clone(),
            None => self
                .translator
                .trans(field.name(), &Params::new(), Some(MESSAGES_DOMAIN)),
        }
    }
}

fn leaf_type(kind: &FieldKind) -> &'static str {
    match kind {
        FieldKind::Number => "number",
        FieldKind::Integer => "integer",
        FieldKind::Checkbox => "boolean",
        _ => "string",
    }
}

/// Widget hint for the front end
fn form_type(field: &FormField) -> String {
    let options = field.options();
    match field.kind() {
        FieldKind::Choice => match (options.expanded, options.multiple) {
            (true, true) => "checkboxes",
            (true, false) => "radio",
            (false, true) => "select.multiple",
            (false, false) => "select.single",
        }
        .to_string(),
        FieldKind::Custom(type_name) => type_name.clone(),
        kind => kind.token().unwrap_or_default().to_string(),
    }
}

/// `data-value` → `dataValue`
pub fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

pub fn camel_case_keys(attr: &Map<String, Value>) -> Map<String, Value> {
    attr.iter()
        .map(|(key, value)| (camel_case(key), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::constraints::{Length, NotBlank};
    use crate::form::{FieldOptions, FormBuilder};
    use crate::translation::MessageCatalogue;
    use proptest::prelude::*;
    use serde_json::json;
    use std::sync::Arc;

    fn country(multiple: bool, expanded: bool, required: bool) -> FormField {
        let mut options = FieldOptions {
            multiple,
            expanded,
            required,
            ..FieldOptions::default()
        };
        options.choices.insert("Germany".into(), "de".into());
        options.choices.insert("France".into(), "fr".into());
        FormField::new("country", "dynform::types::ChoiceType", FieldKind::Choice).with_options(options)
    }

    fn schema_of(fields: Vec<FormField>) -> SchemaNode {
        let mut builder = FormBuilder::new("contact");
        builder.set_action("/api/forms/contact").set_csrf_protection(false);
        for field in fields {
            builder.add(field);
        }
        let catalogue = MessageCatalogue::new();
        SchemaTransformer::new(&catalogue).transform(&builder.get_form())
    }

    fn property<'s>(schema: &'s SchemaNode, name: &str) -> &'s SchemaNode {
        &schema.properties.as_ref().unwrap()[name]
    }

    #[test]
    fn test_single_choice() {
        let schema = schema_of(vec![country(false, false, true)]);
        let node = property(&schema, "country");
        assert_eq!(node.schema_type, "string");
        assert_eq!(node.enum_values.as_ref().unwrap(), &vec!["de", "fr"]);
        assert_eq!(node.enum_titles.as_ref().unwrap(), &vec!["Germany", "France"]);
        assert_eq!(node.form_type.as_deref(), Some("select.single"));
        assert!(node.widget.is_none());
    }

    #[test]
    fn test_multiple_choice() {
        let schema = schema_of(vec![country(true, false, true)]);
        let node = property(&schema, "country");
        assert_eq!(node.schema_type, "array");
        assert_eq!(node.items.as_ref().unwrap().schema_type, "string");
        assert_eq!(node.unique_items, Some(true));
        assert_eq!(node.min_items, Some(1));

        let optional = schema_of(vec![country(true, true, false)]);
        let node = property(&optional, "country");
        assert_eq!(node.min_items, Some(0));
        assert_eq!(node.widget.as_deref(), Some("choice-multiple-expanded"));
        assert_eq!(node.form_type.as_deref(), Some("checkboxes"));
    }

    #[test]
    fn test_expanded_single_choice() {
        let schema = schema_of(vec![country(false, true, true)]);
        let node = property(&schema, "country");
        assert_eq!(node.widget.as_deref(), Some("choice-expanded"));
        assert_eq!(node.form_type.as_deref(), Some("radio"));
    }

    #[test]
    fn test_required_list() {
        let optional = FieldOptions {
            required: false,
            ..FieldOptions::default()
        };
        let schema = schema_of(vec![
            FormField::new("name", "dynform::types::TextType", FieldKind::Text),
            FormField::new("email", "dynform::types::EmailType", FieldKind::Email),
            FormField::new("age", "dynform::types::IntegerType", FieldKind::Integer).with_options(optional),
        ]);
        assert_eq!(schema.schema_type, "object");
        assert_eq!(schema.required.as_ref().unwrap(), &vec!["name", "email"]);
        let keys: Vec<_> = schema.properties.as_ref().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["name", "email", "age"]);
        assert_eq!(property(&schema, "age").schema_type, "integer");
        assert_eq!(schema.submit_url.as_deref(), Some("/api/forms/contact"));
    }

    #[test]
    fn test_leaf_node() {
        let mut options = FieldOptions {
            label: Some("Your name".into()),
            ..FieldOptions::default()
        };
        options.attr.insert("data-value".into(), json!("x"));
        options.attr.insert("custom-attr".into(), json!("y"));
        let field = FormField::new("name", "dynform::types::TextType", FieldKind::Text)
            .with_options(options)
            .with_constraint(Arc::new(NotBlank::default()))
            .with_constraint(Arc::new(Length { min: Some(2), ..Length::default() }));

        let schema = schema_of(vec![field]);
        let node = serde_json::to_value(property(&schema, "name")).unwrap();
        assert_eq!(node["type"], "string");
        assert_eq!(node["title"], "Your name");
        assert_eq!(node["attr"], json!({"dataValue": "x", "customAttr": "y"}));
        assert_eq!(node["data"], Value::Null);
        assert_eq!(node["name"], "name");
        assert_eq!(node["formType"], "text");
        assert_eq!(node["constraints"][0]["type"], "NotBlank");
        assert_eq!(node["constraints"][1]["type"], "Length");
        assert_eq!(node["constraints"][1]["config"]["min"], 2);
    }

    #[test]
    fn test_title_falls_back_to_translated_name() {
        let mut catalogue = MessageCatalogue::new();
        catalogue.insert(MESSAGES_DOMAIN, "email", "E-mail address");
        let mut builder = FormBuilder::new("contact");
        builder
            .set_csrf_protection(false)
            .add(FormField::new("email", "dynform::types::EmailType", FieldKind::Email));
        let schema = SchemaTransformer::new(&catalogue).transform(&builder.get_form());
        assert_eq!(property(&schema, "email").title.as_deref(), Some("E-mail address"));
    }

    #[test]
    fn test_hidden_button_file_and_custom() {
        let hidden = FormField::new("source", "dynform::types::HiddenType", FieldKind::Hidden).with_options(
            FieldOptions {
                data: Some(json!("landing")),
                ..FieldOptions::default()
            },
        );
        let schema = schema_of(vec![
            hidden,
            FormField::new("send", "dynform::types::SubmitType", FieldKind::Submit),
            FormField::new("cv", "dynform::types::FileType", FieldKind::File),
            FormField::new(
                "rating",
                "app::types::RatingType",
                FieldKind::Custom("app::types::RatingType".into()),
            ),
        ]);

        let source = property(&schema, "source");
        assert_eq!(source.value, Some(json!("landing")));
        assert_eq!(source.form_type.as_deref(), Some("hidden"));

        let send = serde_json::to_value(property(&schema, "send")).unwrap();
        assert_eq!(send["type"], "string");
        assert!(send.get("title").is_none());
        assert!(!schema.required.as_ref().unwrap().contains(&"send".to_string()));

        let cv = property(&schema, "cv");
        assert_eq!(cv.schema_type, "string");
        assert_eq!(cv.form_type.as_deref(), Some("file"));

        assert_eq!(
            property(&schema, "rating").form_type.as_deref(),
            Some("app::types::RatingType")
        );
    }

    #[test]
    fn test_collection_items() {
        let tags = FormField::new("tags", "dynform::types::CollectionType", FieldKind::Collection)
            .with_prototype(FormField::new("__name__", "dynform::types::EmailType", FieldKind::Email));
        let schema = schema_of(vec![tags]);
        let node = property(&schema, "tags");
        assert_eq!(node.schema_type, "array");
        assert_eq!(node.items.as_ref().unwrap().form_type.as_deref(), Some("email"));
    }

    #[test]
    fn test_choice_attr_camel_cased() {
        let mut field = country(false, false, true);
        let mut options = field.options().clone();
        let mut attr = Map::new();
        attr.insert("data-flag".into(), json!("de.svg"));
        options.choice_attr.insert("de".into(), attr);
        field = field.with_options(options);

        let schema = schema_of(vec![field]);
        let enum_attr = property(&schema, "country").enum_attr.clone().unwrap();
        assert_eq!(enum_attr[0], json!({"dataFlag": "de.svg"}).as_object().unwrap().clone());
        assert!(enum_attr[1].is_empty());
    }

    proptest! {
        #[test]
        fn camel_case_removes_every_dash(parts in proptest::collection::vec("[a-z]{1,8}", 1..5)) {
            let key = parts.join("-");
            let camel = camel_case(&key);
            prop_assert!(!camel.contains('-'));
            prop_assert_eq!(camel.len(), key.len() - (parts.len() - 1));
            prop_assert!(camel.starts_with(parts[0].as_str()));
        }
    }
}
