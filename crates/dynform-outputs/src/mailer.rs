//! Mail port and document templates

use async_trait::async_trait;
use handlebars::Handlebars;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

use crate::error::MailError;

/// Template file extension picked up by [`DocumentStore::load_dir`]
pub const DOCUMENT_EXTENSION: &str = "hbs";

/// An outbound mail
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MailMessage {
    pub to: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub subject: String,
    pub body: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

/// Reference to an artifact produced earlier in the chain
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    pub source: String,
    pub reference: Value,
}

/// Outbound mail port
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}

/// Posts each mail as JSON to a mail API
pub struct HttpMailer {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpMailer {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(message)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(MailError::Rejected(resp.status().as_u16()))
        }
    }
}

/// Writes mails to the log instead of sending them
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        tracing::info!(
            "Mail to {} subject \"{}\" ({} bytes, {} attachment(s))",
            message.to.join(", "),
            message.subject,
            message.body.len(),
            message.attachments.len()
        );
        Ok(())
    }
}

/// Named handlebars documents used as mail bodies
pub struct DocumentStore {
    registry: Handlebars<'static>,
}

impl DocumentStore {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        Self { registry }
    }

    /// Every `*.hbs` file in `dir`, named after its file stem
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, MailError> {
        let mut store = Self::new();
        let entries = std::fs::read_dir(dir.as_ref()).map_err(|e| MailError::Render(e.to_string()))?;
        for entry in entries {
            let path = entry.map_err(|e| MailError::Render(e.to_string()))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DOCUMENT_EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let template = std::fs::read_to_string(&path).map_err(|e| MailError::Render(e.to_string()))?;
            store.register(name, &template)?;
        }
        tracing::info!("Loaded {} mail document(s)", store.registry.get_templates().len());
        Ok(store)
    }

    pub fn register(&mut self, name: &str, template: &str) -> Result<(), MailError> {
        self.registry
            .register_template_string(name, template)
            .map_err(|e| MailError::Render(e.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registry.has_template(name)
    }

    pub fn render(&self, name: &str, data: &Value) -> Result<String, MailError> {
        if !self.contains(name) {
            return Err(MailError::DocumentNotFound(name.to_string()));
        }
        self.registry
            .render(name, data)
            .map_err(|e| MailError::Render(e.to_string()))
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;

    /// Keeps sent mails; fails every send when `fail` is set
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<MailMessage>>,
        pub fail: bool,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
            if self.fail {
                return Err(MailError::Transport("connection refused".into()));
            }
            self.sent.lock().push(message.clone());
            Ok(())
        }
    }
}
