//! `data_object` output: save the submission as a structured record

use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::sync::Arc;

use dynform_core::config::Options;
use dynform_core::output::{
    required_string, string_option, DispatchContext, OutcomeMessages, OutputFactory, OutputHandler,
    OutputResponse, SubmittedForm,
};
use dynform_core::{DynformError, Result};

use crate::storage::{Record, RecordStore};

pub const DATA_OBJECT_OUTPUT: &str = "data_object";

pub struct DataObjectOutputFactory {
    store: Arc<dyn RecordStore>,
}

impl DataObjectOutputFactory {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

impl OutputFactory for DataObjectOutputFactory {
    fn name(&self) -> &str {
        DATA_OBJECT_OUTPUT
    }

    fn required_options(&self) -> &[&'static str] {
        &["class", "path"]
    }

    fn create(&self) -> Box<dyn OutputHandler> {
        Box::new(DataObjectOutput {
            store: Arc::clone(&self.store),
            output: String::new(),
            class: String::new(),
            path: String::new(),
            key: String::new(),
            values: Map::new(),
            messages: None,
        })
    }
}

pub struct DataObjectOutput {
    store: Arc<dyn RecordStore>,
    output: String,
    class: String,
    path: String,
    /// Record key, from the `key_field` value or a generated id
    key: String,
    values: Map<String, Value>,
    messages: Option<OutcomeMessages>,
}

#[async_trait]
impl OutputHandler for DataObjectOutput {
    fn initialize(&mut self, key: &str, form: &SubmittedForm, options: &Options) -> Result<()> {
        self.output = key.to_string();
        self.class = required_string(key, options, "class")?;
        self.path = required_string(key, options, "path")?;

        // `mapping: { form_field: record_field }` renames and selects fields
        let mapping: Option<IndexMap<String, String>> = match options.get("mapping") {
            None | Some(Value::Null) => None,
            Some(value) => Some(serde_json::from_value(value.clone()).map_err(|e| {
                DynformError::OutputConfig {
                    output: key.to_string(),
                    reason: format!("option \"mapping\" must map field names to strings: {e}"),
                }
            })?),
        };
        self.values = match mapping {
            Some(mapping) => mapping
                .into_iter()
                .map(|(field, target)| (target, form.value(&field).cloned().unwrap_or(Value::Null)))
                .collect(),
            None => form.data.clone(),
        };

        self.key = match string_option(key, options, "key_field")? {
            Some(field) => match form.value(&field) {
                Some(Value::String(s)) if !s.is_empty() => s.clone(),
                Some(v) if !v.is_null() => v.to_string(),
                _ => uuid::Uuid::new_v4().to_string(),
            },
            None => uuid::Uuid::new_v4().to_string(),
        };

        self.messages = Some(OutcomeMessages::from_options(
            key,
            options,
            "Your submission has been saved.",
            "Your submission could not be saved. Please try again later.",
        )?);
        Ok(())
    }

    async fn handle(&mut self, ctx: &mut DispatchContext, mut response: OutputResponse) -> Result<OutputResponse> {
        let messages = self.messages.clone().ok_or_else(|| DynformError::OutputConfig {
            output: self.output.clone(),
            reason: "handler was not initialized".into(),
        })?;

        let record = Record {
            id: uuid::Uuid::new_v4().to_string(),
            class: self.class.clone(),
            path: self.path.clone(),
            key: self.key.clone(),
            values: self.values.clone(),
            created_at: Utc::now(),
        };

        match self.store.save(record).await {
            Ok(id) => {
                tracing::info!("Output {} saved {} record {}", self.output, self.class, id);
                ctx.publish(self.output.clone(), Value::String(id));
                messages.report(&mut response, &self.output, true);
            }
            Err(e) => {
                tracing::error!("Output {} failed to save record: {}", self.output, e);
                messages.report(&mut response, &self.output, false);
            }
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryRecordStore, JsonLinesRecordStore};
    use serde_json::json;

    fn form() -> SubmittedForm {
        let mut form = SubmittedForm {
            name: "contact".into(),
            ..SubmittedForm::default()
        };
        form.data.insert("name".into(), json!("Jane"));
        form.data.insert("email".into(), json!("jane@example.com"));
        form
    }

    fn options(value: Value) -> Options {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_saves_mapped_record() {
        let store = Arc::new(InMemoryRecordStore::new());
        let mut handler = DataObjectOutputFactory::new(Arc::clone(&store) as Arc<dyn RecordStore>).create();
        handler
            .initialize(
                "crm",
                &form(),
                &options(json!({
                    "class": "ContactRequest",
                    "path": "/contact",
                    "key_field": "email",
                    "mapping": {"name": "fullName"}
                })),
            )
            .unwrap();

        let mut ctx = DispatchContext::default();
        let response = handler.handle(&mut ctx, OutputResponse::new()).await.unwrap();
        assert!(response.overall_status());

        let id = ctx.artifact("crm").and_then(Value::as_str).unwrap();
        let record = store.get(id).unwrap();
        assert_eq!(record.class, "ContactRequest");
        assert_eq!(record.key, "jane@example.com");
        assert_eq!(Value::Object(record.values), json!({"fullName": "Jane"}));
    }

    #[tokio::test]
    async fn test_store_failure_reported() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for appending
        let store = Arc::new(JsonLinesRecordStore::new(dir.path()));
        let mut handler = DataObjectOutputFactory::new(store).create();
        handler
            .initialize("crm", &form(), &options(json!({"class": "ContactRequest", "path": "/contact"})))
            .unwrap();

        let response = handler
            .handle(&mut DispatchContext::default(), OutputResponse::new())
            .await
            .unwrap();
        assert!(!response.overall_status());
    }
}
