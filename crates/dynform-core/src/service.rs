//! Form service
//!
//! Entry point for the API boundary: fetch a form's schema, accept a
//! submission. Holds the validated configuration and every collaborator.

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::assembler::FormAssembler;
use crate::config::{FormDefinition, FormsConfig};
use crate::csrf::{CsrfTokenManager, HmacCsrfTokenManager};
use crate::error::{DynformError, Result};
use crate::form::Form;
use crate::input::{InputContext, RequestContext};
use crate::normalize::{normalize_errors, ErrorEntry};
use crate::output::{Message, OutputDispatcher, SubmittedForm};
use crate::redirect::RedirectContext;
use crate::registry::FormRegistries;
use crate::routing::{RouteTable, UrlGenerator};
use crate::schema::{SchemaNode, SchemaTransformer};
use crate::translation::{MessageCatalogue, Translator};

/// Result of handling a submission
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// Rejected by validation; no output ran
    Invalid { errors: Vec<ErrorEntry> },
    /// Valid; every output ran
    Processed {
        success: bool,
        messages: Vec<Message>,
        data: Map<String, Value>,
        redirect_url: Option<String>,
    },
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Processed { success: true, .. })
    }
}

pub struct FormService {
    config: Arc<FormsConfig>,
    registries: Arc<FormRegistries>,
    translator: Arc<dyn Translator>,
    csrf: Arc<dyn CsrfTokenManager>,
    assembler: FormAssembler,
}

impl FormService {
    pub fn builder(config: FormsConfig, registries: FormRegistries) -> FormServiceBuilder {
        FormServiceBuilder {
            config,
            registries,
            translator: None,
            urls: None,
            csrf: None,
        }
    }

    pub fn config(&self) -> &FormsConfig {
        &self.config
    }

    pub fn definition(&self, name: &str) -> Result<&FormDefinition> {
        self.config
            .get(name)
            .ok_or_else(|| DynformError::FormNotFound(name.to_string()))
    }

    /// Assemble a form, pre-populated by its input handler
    pub fn build_form(&self, name: &str, request: &RequestContext) -> Result<Form> {
        let definition = self.definition(name)?;
        let mut form = self.assembler.assemble(name, definition)?.get_form();

        if let Some(handler) = &definition.input_handler {
            let handler = self.registries.input_handlers.get(handler)?;
            let data = handler.initial_data(&InputContext { definition, request });
            if !data.is_empty() {
                tracing::debug!("Pre-populating {} field(s) of form {}", data.len(), name);
                form.set_data(&data);
            }
        }
        Ok(form)
    }

    pub fn schema(&self, name: &str, request: &RequestContext) -> Result<SchemaNode> {
        let form = self.build_form(name, request)?;
        Ok(SchemaTransformer::new(self.translator.as_ref()).transform(&form))
    }

    /// Validate a submission and, when valid, run the form's outputs
    pub async fn submit(&self, name: &str, payload: &Value) -> Result<SubmissionOutcome> {
        let definition = self.definition(name)?;
        let mut form = self.assembler.assemble(name, definition)?.get_form();
        form.submit(payload, self.csrf.as_ref());

        if !form.is_valid() {
            let errors = normalize_errors(
                &form,
                self.translator.as_ref(),
                definition.api_error_message_template.as_deref(),
            );
            tracing::info!("Rejected submission of form {} with {} error(s)", name, errors.len());
            return Ok(SubmissionOutcome::Invalid { errors });
        }

        let submitted = SubmittedForm::from_form(&form);
        let response = OutputDispatcher::new(&self.registries.outputs)
            .dispatch(&submitted, &definition.outputs)
            .await?;
        let success = response.overall_status();

        let redirect_url = self
            .registries
            .redirect_handlers
            .for_definition(definition)?
            .redirect_url(&RedirectContext {
                form: &submitted,
                definition,
                success,
            })?;

        Ok(SubmissionOutcome::Processed {
            success,
            messages: response.into_messages(),
            data: submitted.data,
            redirect_url,
        })
    }
}

pub struct FormServiceBuilder {
    config: FormsConfig,
    registries: FormRegistries,
    translator: Option<Arc<dyn Translator>>,
    urls: Option<Arc<dyn UrlGenerator>>,
    csrf: Option<Arc<dyn CsrfTokenManager>>,
}

impl FormServiceBuilder {
    pub fn translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn url_generator(mut self, urls: Arc<dyn UrlGenerator>) -> Self {
        self.urls = Some(urls);
        self
    }

    pub fn csrf(mut self, csrf: Arc<dyn CsrfTokenManager>) -> Self {
        self.csrf = Some(csrf);
        self
    }

    /// Validate the configuration and build the service
    pub fn build(self) -> Result<FormService> {
        self.config.validate(&self.registries)?;

        let registries = Arc::new(self.registries);
        let translator = self
            .translator
            .unwrap_or_else(|| Arc::new(MessageCatalogue::new()) as Arc<dyn Translator>);
        let urls = self
            .urls
            .unwrap_or_else(|| Arc::new(RouteTable::default()) as Arc<dyn UrlGenerator>);
        let csrf: Arc<dyn CsrfTokenManager> = match self.csrf {
            Some(csrf) => csrf,
            None => {
                tracing::warn!("No CSRF secret configured, using an ephemeral one");
                Arc::new(HmacCsrfTokenManager::new(uuid::Uuid::new_v4().as_bytes()))
            }
        };

        let assembler = FormAssembler::new(
            Arc::clone(&registries),
            Arc::clone(&translator),
            urls,
            Arc::clone(&csrf),
        );

        Ok(FormService {
            config: Arc::new(self.config),
            registries,
            translator,
            csrf,
            assembler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::testing;
    use crate::output::MessageType;
    use serde_json::json;

    const FORMS: &str = r#"
forms:
  contact:
    csrf: false
    redirect_url: /thanks
    input_handler: query_string
    fields:
      name: { type: TextType, constraints: [NotBlank] }
      email: { type: EmailType, constraints: [NotBlank, Email] }
      age: { type: IntegerType, options: { required: false } }
    outputs:
      first: { type: ok }
      second: { type: ok }
  partial:
    csrf: false
    redirect_url: /thanks
    fields:
      name: { type: TextType }
    outputs:
      first: { type: ok }
      broken: { type: fail }
      last: { type: ok }
  protected:
    fields:
      name: { type: TextType }
    outputs:
      log: { type: ok }
"#;

    fn service() -> FormService {
        FormService::builder(
            FormsConfig::from_yaml_str(FORMS).unwrap(),
            FormRegistries::new(testing::registry()),
        )
        .csrf(Arc::new(HmacCsrfTokenManager::new("secret")))
        .build()
        .unwrap()
    }

    #[tokio::test]
    async fn test_invalid_submission() {
        let outcome = service()
            .submit("contact", &json!({"name": "", "email": "invalid-email"}))
            .await
            .unwrap();
        match outcome {
            SubmissionOutcome::Invalid { errors } => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["name", "email"]);
            }
            other => panic!("expected invalid outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_valid_submission() {
        let outcome = service()
            .submit(
                "contact",
                &json!({"name": "Jane", "email": "jane@example.com"}),
            )
            .await
            .unwrap();
        assert!(outcome.is_success());
        match outcome {
            SubmissionOutcome::Processed { messages, data, redirect_url, .. } => {
                assert_eq!(messages.len(), 2);
                assert_eq!(redirect_url.as_deref(), Some("/thanks"));
                assert_eq!(data["email"], "jane@example.com");
                assert_eq!(data["age"], Value::Null);
            }
            other => panic!("expected processed outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_partial_failure() {
        let outcome = service()
            .submit("partial", &json!({"name": "Jane"}))
            .await
            .unwrap();
        match outcome {
            SubmissionOutcome::Processed { success, messages, redirect_url, .. } => {
                assert!(!success);
                assert_eq!(messages.len(), 3);
                assert_eq!(messages[1].message_type, MessageType::Error);
                assert_eq!(redirect_url, None);
            }
            other => panic!("expected processed outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_csrf_round_trip() {
        let service = service();
        let schema = serde_json::to_value(service.schema("protected", &RequestContext::default()).unwrap()).unwrap();
        let token = schema["properties"]["_token"]["value"].as_str().unwrap().to_string();

        let ok = service
            .submit("protected", &json!({"name": "Jane", "_token": token}))
            .await
            .unwrap();
        assert!(ok.is_success());

        let forged = service
            .submit("protected", &json!({"name": "Jane", "_token": "00"}))
            .await
            .unwrap();
        assert!(matches!(forged, SubmissionOutcome::Invalid { errors } if errors[0].field == "protected"));
    }

    #[test]
    fn test_query_string_prefills_schema() {
        let request = RequestContext::default().with_query([("email", "jane@example.com")]);
        let schema = service().schema("contact", &request).unwrap();
        let properties = schema.properties.unwrap();
        let email = &properties["email"];
        assert_eq!(email.data, Some(json!("jane@example.com")));
    }

    #[test]
    fn test_unknown_form() {
        assert!(matches!(
            service().schema("nope", &RequestContext::default()),
            Err(DynformError::FormNotFound(_))
        ));
    }

    #[test]
    fn test_malformed_redirect_template_rejected_at_build() {
        let config = FormsConfig::from_yaml_str(
            "forms:\n  f:\n    redirect_handler: template\n    redirect_url: \"/thanks/{{#if name}}\"\n    fields:\n      name: { type: TextType }\n    outputs:\n      o: { type: ok }\n",
        )
        .unwrap();
        let err = FormService::builder(config, FormRegistries::new(testing::registry()))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err.root_cause(), DynformError::Template(_)));
    }

    #[test]
    fn test_invalid_config_rejected_at_build() {
        let config = FormsConfig::from_yaml_str(
            "forms:\n  f:\n    fields:\n      a: { type: TextType }\n    outputs:\n      x: { type: needs_url }\n",
        )
        .unwrap();
        let err = FormService::builder(config, FormRegistries::new(testing::registry()))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err.root_cause(), DynformError::MissingOutputOption { option, .. } if option == "url"));
        assert!(err.to_string().contains("form \"f\""));
    }
}
