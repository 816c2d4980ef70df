//! `email` output: render a document with the submission and mail it

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use dynform_core::config::Options;
use dynform_core::output::{
    required_string, string_list_option, string_option, DispatchContext, OutcomeMessages, OutputFactory,
    OutputHandler, OutputResponse, SubmittedForm,
};
use dynform_core::{DynformError, Result};

use crate::mailer::{Attachment, DocumentStore, MailMessage, Mailer};

pub const EMAIL_OUTPUT: &str = "email";

pub struct EmailOutputFactory {
    mailer: Arc<dyn Mailer>,
    documents: Arc<DocumentStore>,
}

impl EmailOutputFactory {
    pub fn new(mailer: Arc<dyn Mailer>, documents: Arc<DocumentStore>) -> Self {
        Self { mailer, documents }
    }
}

impl OutputFactory for EmailOutputFactory {
    fn name(&self) -> &str {
        EMAIL_OUTPUT
    }

    fn required_options(&self) -> &[&'static str] {
        &["to", "document"]
    }

    fn create(&self) -> Box<dyn OutputHandler> {
        Box::new(EmailOutput {
            mailer: Arc::clone(&self.mailer),
            documents: Arc::clone(&self.documents),
            key: String::new(),
            to: Vec::new(),
            from: None,
            subject: String::new(),
            document: String::new(),
            attach_from: None,
            context: Value::Null,
            messages: None,
        })
    }
}

pub struct EmailOutput {
    mailer: Arc<dyn Mailer>,
    documents: Arc<DocumentStore>,
    key: String,
    to: Vec<String>,
    from: Option<String>,
    subject: String,
    document: String,
    /// Sibling whose artifact is attached, when it has already run
    attach_from: Option<String>,
    context: Value,
    messages: Option<OutcomeMessages>,
}

#[async_trait]
impl OutputHandler for EmailOutput {
    fn initialize(&mut self, key: &str, form: &SubmittedForm, options: &Options) -> Result<()> {
        self.key = key.to_string();
        self.to = string_list_option(key, options, "to")?;
        if self.to.is_empty() {
            return Err(DynformError::OutputConfig {
                output: key.to_string(),
                reason: "option \"to\" needs at least one recipient".into(),
            });
        }
        self.document = required_string(key, options, "document")?;
        if !self.documents.contains(&self.document) {
            return Err(DynformError::OutputConfig {
                output: key.to_string(),
                reason: format!("document \"{}\" is not registered", self.document),
            });
        }
        self.from = string_option(key, options, "from")?;
        self.subject = string_option(key, options, "subject")?
            .unwrap_or_else(|| format!("New submission: {}", form.name));
        self.attach_from = string_option(key, options, "attach_from")?;
        self.context = json!({
            "form": form.name,
            "data": form.data,
            "labels": form.labels,
        });
        self.messages = Some(OutcomeMessages::from_options(
            key,
            options,
            "Your message has been sent.",
            "Your message could not be sent. Please try again later.",
        )?);
        Ok(())
    }

    async fn handle(&mut self, ctx: &mut DispatchContext, mut response: OutputResponse) -> Result<OutputResponse> {
        let messages = self.messages.clone().ok_or_else(|| DynformError::OutputConfig {
            output: self.key.clone(),
            reason: "handler was not initialized".into(),
        })?;

        let attachments = match &self.attach_from {
            Some(source) => match ctx.artifact(source) {
                Some(reference) => vec![Attachment {
                    source: source.clone(),
                    reference: reference.clone(),
                }],
                None => {
                    tracing::warn!(
                        "Output {} cannot attach {}: no artifact produced before it",
                        self.key,
                        source
                    );
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let result = match self.documents.render(&self.document, &self.context) {
            Ok(body) => {
                let mail = MailMessage {
                    to: self.to.clone(),
                    from: self.from.clone(),
                    subject: self.subject.clone(),
                    body,
                    attachments,
                };
                self.mailer.send(&mail).await
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(()) => tracing::info!("Output {} mailed {}", self.key, self.to.join(", ")),
            Err(e) => tracing::error!("Output {} failed to send mail: {}", self.key, e),
        }
        messages.report(&mut response, &self.key, result.is_ok());
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::testing::RecordingMailer;
    use dynform_core::config::OutputDefinition;
    use dynform_core::output::OutputDispatcher;
    use dynform_core::OutputRegistry;
    use indexmap::IndexMap;

    fn documents() -> Arc<DocumentStore> {
        let mut store = DocumentStore::new();
        store.register("contact", "{{labels.name}}: {{data.name}}").unwrap();
        Arc::new(store)
    }

    fn form() -> SubmittedForm {
        let mut form = SubmittedForm {
            name: "contact".into(),
            ..SubmittedForm::default()
        };
        form.data.insert("name".into(), json!("Jane"));
        form.labels.insert("name".into(), "Name".into());
        form
    }

    fn options(value: Value) -> Options {
        serde_json::from_value(value).unwrap()
    }

    async fn run(mailer: Arc<RecordingMailer>, options: Options) -> OutputResponse {
        let factory = EmailOutputFactory::new(mailer, documents());
        let mut handler = factory.create();
        handler.initialize("mail", &form(), &options).unwrap();
        handler
            .handle(&mut DispatchContext::default(), OutputResponse::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_sends_rendered_document() {
        let mailer = Arc::new(RecordingMailer::default());
        let response = run(
            Arc::clone(&mailer),
            options(json!({"to": "team@example.com", "document": "contact", "subject": "Hi"})),
        )
        .await;

        assert!(response.overall_status());
        let sent = mailer.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body, "Name: Jane");
        assert_eq!(sent[0].subject, "Hi");
        assert_eq!(sent[0].to, vec!["team@example.com"]);
    }

    #[tokio::test]
    async fn test_transport_failure_is_reported() {
        let mailer = Arc::new(RecordingMailer {
            fail: true,
            ..RecordingMailer::default()
        });
        let response = run(mailer, options(json!({"to": ["a@example.com"], "document": "contact"}))).await;
        assert!(!response.overall_status());
        let text = &response.messages()[0].text;
        assert_eq!(text, "Your message could not be sent. Please try again later.");
        assert!(!text.contains("connection refused"));
    }

    #[test]
    fn test_unknown_document_is_config_error() {
        let factory = EmailOutputFactory::new(Arc::new(RecordingMailer::default()), documents());
        let mut handler = factory.create();
        let err = handler
            .initialize("mail", &form(), &options(json!({"to": "a@example.com", "document": "nope"})))
            .err()
            .unwrap();
        assert!(matches!(err, DynformError::OutputConfig { .. }));
    }

    #[tokio::test]
    async fn test_attachment_only_from_earlier_sibling() {
        let mailer = Arc::new(RecordingMailer::default());
        let dir = tempfile::tempdir().unwrap();
        let registry = OutputRegistry::builder()
            .register(
                "email",
                Arc::new(EmailOutputFactory::new(Arc::clone(&mailer) as Arc<dyn Mailer>, documents())),
            )
            .register(
                "asset",
                Arc::new(crate::asset::AssetOutputFactory::new(Arc::new(
                    crate::storage::FilesystemAssetStorage::new(dir.path()),
                ))),
            )
            .build()
            .unwrap();

        let mail_options = options(json!({"to": "a@example.com", "document": "contact", "attach_from": "archive"}));
        let asset_options = options(json!({"path": "contact", "fields": ["name"]}));
        let mut outputs = IndexMap::new();
        outputs.insert(
            "early_mail".to_string(),
            OutputDefinition { type_name: "email".into(), options: mail_options.clone() },
        );
        outputs.insert(
            "archive".to_string(),
            OutputDefinition { type_name: "asset".into(), options: asset_options },
        );
        outputs.insert(
            "late_mail".to_string(),
            OutputDefinition { type_name: "email".into(), options: mail_options },
        );

        let response = OutputDispatcher::new(&registry).dispatch(&form(), &outputs).await.unwrap();
        assert!(response.overall_status());

        let sent = mailer.sent.lock();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].attachments.is_empty());
        assert_eq!(sent[1].attachments.len(), 1);
        assert_eq!(sent[1].attachments[0].source, "archive");
    }
}
