//! `asset` output: store selected fields as a JSON file

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use dynform_core::config::Options;
use dynform_core::output::{
    required_string, string_list_option, DispatchContext, OutcomeMessages, OutputFactory, OutputHandler,
    OutputResponse, SubmittedForm,
};
use dynform_core::{DynformError, Result};

use crate::storage::{check_relative_path, AssetStorage};

pub const ASSET_OUTPUT: &str = "asset";

pub struct AssetOutputFactory {
    storage: Arc<dyn AssetStorage>,
}

impl AssetOutputFactory {
    pub fn new(storage: Arc<dyn AssetStorage>) -> Self {
        Self { storage }
    }
}

impl OutputFactory for AssetOutputFactory {
    fn name(&self) -> &str {
        ASSET_OUTPUT
    }

    fn required_options(&self) -> &[&'static str] {
        &["path", "fields"]
    }

    fn create(&self) -> Box<dyn OutputHandler> {
        Box::new(AssetOutput {
            storage: Arc::clone(&self.storage),
            key: String::new(),
            form: String::new(),
            folder: String::new(),
            content: Map::new(),
            messages: None,
        })
    }
}

pub struct AssetOutput {
    storage: Arc<dyn AssetStorage>,
    key: String,
    form: String,
    folder: String,
    content: Map<String, Value>,
    messages: Option<OutcomeMessages>,
}

#[async_trait]
impl OutputHandler for AssetOutput {
    fn initialize(&mut self, key: &str, form: &SubmittedForm, options: &Options) -> Result<()> {
        self.key = key.to_string();
        self.form = form.name.clone();
        self.folder = required_string(key, options, "path")?.trim_matches('/').to_string();
        if !self.folder.is_empty() {
            check_relative_path(&self.folder).map_err(|e| DynformError::OutputConfig {
                output: key.to_string(),
                reason: format!("option \"path\": {e}"),
            })?;
        }

        let fields = string_list_option(key, options, "fields")?;
        if fields.is_empty() {
            return Err(DynformError::OutputConfig {
                output: key.to_string(),
                reason: "option \"fields\" must list at least one field".into(),
            });
        }
        // fields missing from the submission are stored as null
        self.content = fields
            .into_iter()
            .map(|name| {
                let value = form.value(&name).cloned().unwrap_or(Value::Null);
                (name, value)
            })
            .collect();

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
            output: self.key.clone(),
            reason: "handler was not initialized".into(),
        })?;

        let file_name = format!(
            "{}-{}-{}.json",
            self.form,
            Utc::now().format("%Y%m%d%H%M%S"),
            uuid::Uuid::new_v4().simple()
        );
        let path = if self.folder.is_empty() {
            file_name
        } else {
            format!("{}/{}", self.folder, file_name)
        };

        let document = json!({ "form": self.form, "fields": self.content });
        let result = match serde_json::to_vec_pretty(&document) {
            Ok(bytes) => self.storage.save(&path, &bytes).await,
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(location) => {
                tracing::info!("Output {} stored {}", self.key, location);
                ctx.publish(self.key.clone(), Value::String(location));
                messages.report(&mut response, &self.key, true);
            }
            Err(e) => {
                tracing::error!("Output {} failed to store asset: {}", self.key, e);
                messages.report(&mut response, &self.key, false);
            }
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FilesystemAssetStorage;

    fn form() -> SubmittedForm {
        let mut form = SubmittedForm {
            name: "contact".into(),
            ..SubmittedForm::default()
        };
        form.data.insert("name".into(), json!("Jane"));
        form.data.insert("email".into(), json!("jane@example.com"));
        form
    }

    #[tokio::test]
    async fn test_stores_selected_fields_and_publishes_location() {
        let dir = tempfile::tempdir().unwrap();
        let factory = AssetOutputFactory::new(Arc::new(FilesystemAssetStorage::new(dir.path())));
        let mut handler = factory.create();
        let options: Options = serde_json::from_value(json!({"path": "/uploads/contact/", "fields": ["name"]})).unwrap();
        handler.initialize("archive", &form(), &options).unwrap();

        let mut ctx = DispatchContext::default();
        let response = handler.handle(&mut ctx, OutputResponse::new()).await.unwrap();
        assert!(response.overall_status());

        let location = ctx.artifact("archive").and_then(Value::as_str).unwrap().to_string();
        assert!(location.starts_with("uploads/contact/contact-"));
        let stored: Value = serde_json::from_slice(&std::fs::read(dir.path().join(&location)).unwrap()).unwrap();
        assert_eq!(stored, json!({"form": "contact", "fields": {"name": "Jane"}}));
    }

    #[test]
    fn test_escaping_path_rejected_on_initialize() {
        let dir = tempfile::tempdir().unwrap();
        let factory = AssetOutputFactory::new(Arc::new(FilesystemAssetStorage::new(dir.path())));
        let mut handler = factory.create();
        let options: Options = serde_json::from_value(json!({"path": "../outside", "fields": ["name"]})).unwrap();
        assert!(matches!(
            handler.initialize("archive", &form(), &options),
            Err(DynformError::OutputConfig { output, .. }) if output == "archive"
        ));
    }

    #[tokio::test]
    async fn test_storage_failure_reported() {
        let file = tempfile::NamedTempFile::new().unwrap();
        // A regular file as root makes every directory creation fail
        let factory = AssetOutputFactory::new(Arc::new(FilesystemAssetStorage::new(file.path())));
        let mut handler = factory.create();
        let options: Options = serde_json::from_value(json!({"path": "contact", "fields": "name"})).unwrap();
        handler.initialize("archive", &form(), &options).unwrap();

        let mut ctx = DispatchContext::default();
        let response = handler.handle(&mut ctx, OutputResponse::new()).await.unwrap();
        assert!(!response.overall_status());
        assert!(ctx.artifact("archive").is_none());
    }
}
