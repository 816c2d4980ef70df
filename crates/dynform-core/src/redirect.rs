//! Post-submission redirect resolution

use handlebars::{Handlebars, Template};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::FormDefinition;
use crate::error::{DynformError, Result};
use crate::output::SubmittedForm;

/// Handler used when a form names none
pub const DEFAULT_REDIRECT_HANDLER: &str = "static";

pub struct RedirectContext<'a> {
    pub form: &'a SubmittedForm,
    pub definition: &'a FormDefinition,
    /// Overall status of the output chain
    pub success: bool,
}

/// Computes where the client goes after a submission
pub trait RedirectHandler: Send + Sync {
    /// Check the form's redirect settings when the configuration is loaded
    fn validate(&self, _definition: &FormDefinition) -> Result<()> {
        Ok(())
    }

    fn redirect_url(&self, ctx: &RedirectContext<'_>) -> Result<Option<String>>;
}

/// The configured `redirect_url`, on success only
pub struct StaticRedirectHandler;

impl RedirectHandler for StaticRedirectHandler {
    fn redirect_url(&self, ctx: &RedirectContext<'_>) -> Result<Option<String>> {
        Ok(ctx.success.then(|| ctx.definition.redirect_url.clone()).flatten())
    }
}

/// `redirect_url` rendered as a template over the submitted data
///
/// `/thanks?name={{name}}` becomes `/thanks?name=Jane`. Submitted values
/// are percent-encoded, so they cannot add query parameters or fragments.
pub struct TemplateRedirectHandler {
    renderer: Handlebars<'static>,
}

impl TemplateRedirectHandler {
    pub fn new() -> Self {
        let mut renderer = Handlebars::new();
        renderer.register_escape_fn(|value| urlencoding::encode(value).into_owned());
        Self { renderer }
    }
}

impl Default for TemplateRedirectHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl RedirectHandler for TemplateRedirectHandler {
    fn validate(&self, definition: &FormDefinition) -> Result<()> {
        if let Some(template) = &definition.redirect_url {
            Template::compile(template).map_err(|e| DynformError::Template(e.to_string()))?;
        }
        Ok(())
    }

    fn redirect_url(&self, ctx: &RedirectContext<'_>) -> Result<Option<String>> {
        let template = match (&ctx.definition.redirect_url, ctx.success) {
            (Some(template), true) => template,
            _ => return Ok(None),
        };
        let url = self
            .renderer
            .render_template(template, &ctx.form.data)
            .map_err(|e| DynformError::Template(e.to_string()))?;
        Ok(Some(url))
    }
}

#[derive(Clone)]
pub struct RedirectHandlerRegistry {
    handlers: HashMap<String, Arc<dyn RedirectHandler>>,
}

impl RedirectHandlerRegistry {
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
        };
        registry.register(DEFAULT_REDIRECT_HANDLER, Arc::new(StaticRedirectHandler));
        registry.register("template", Arc::new(TemplateRedirectHandler::new()));
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn RedirectHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn RedirectHandler>> {
        self.handlers
            .get(name)
            .cloned()
            .ok_or_else(|| DynformError::UnknownRedirectHandler(name.to_string()))
    }

    /// Handler for a form, falling back to the static one
    pub fn for_definition(&self, definition: &FormDefinition) -> Result<Arc<dyn RedirectHandler>> {
        self.get(
            definition
                .redirect_handler
                .as_deref()
                .unwrap_or(DEFAULT_REDIRECT_HANDLER),
        )
    }
}
