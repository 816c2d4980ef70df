//! Handlers used by unit tests

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use super::*;

/// Factory whose handlers always succeed or always fail
pub struct StaticOutputFactory {
    name: String,
    ok: bool,
    required: &'static [&'static str],
}

impl StaticOutputFactory {
    pub fn new(name: &str, ok: bool) -> Self {
        Self {
            name: name.to_string(),
            ok,
            required: &[],
        }
    }

    pub fn requiring(mut self, required: &'static [&'static str]) -> Self {
        self.required = required;
        self
    }
}

impl OutputFactory for StaticOutputFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_options(&self) -> &[&'static str] {
        self.required
    }

    fn create(&self) -> Box<dyn OutputHandler> {
        Box::new(StaticOutput {
            ok: self.ok,
            key: String::new(),
            siblings: Vec::new(),
        })
    }
}

/// Reports a fixed outcome, publishes its key and records the siblings it saw
pub struct StaticOutput {
    ok: bool,
    key: String,
    siblings: Vec<OutputSummary>,
}

#[async_trait]
impl OutputHandler for StaticOutput {
    fn initialize(&mut self, key: &str, _form: &SubmittedForm, _options: &Options) -> Result<()> {
        self.key = key.to_string();
        Ok(())
    }

    fn set_output_handlers(&mut self, handlers: &[OutputSummary]) {
        self.siblings = handlers.to_vec();
    }

    async fn handle(
        &mut self,
        ctx: &mut DispatchContext,
        mut response: OutputResponse,
    ) -> Result<OutputResponse> {
        ctx.publish(self.key.clone(), json!({ "siblings": self.siblings.len() }));
        let outcome = if self.ok { "done" } else { "failed" };
        let text = format!("{} {} ({} outputs)", self.key, outcome, self.siblings.len());
        let message = if self.ok {
            Message::success(text)
        } else {
            Message::error(text)
        };
        response.add_status(self.ok);
        response.add_message(message.with_source(&self.key));
        Ok(response)
    }
}

/// Handler breaking the one status / one message contract
pub struct SilentOutputFactory;

impl OutputFactory for SilentOutputFactory {
    fn name(&self) -> &str {
        "silent"
    }

    fn create(&self) -> Box<dyn OutputHandler> {
        Box::new(SilentOutput)
    }
}

pub struct SilentOutput;

#[async_trait]
impl OutputHandler for SilentOutput {
    fn initialize(&mut self, _key: &str, _form: &SubmittedForm, _options: &Options) -> Result<()> {
        Ok(())
    }

    async fn handle(
        &mut self,
        _ctx: &mut DispatchContext,
        response: OutputResponse,
    ) -> Result<OutputResponse> {
        Ok(response)
    }
}

pub fn registry() -> OutputRegistry {
    OutputRegistry::builder()
        .register("ok", Arc::new(StaticOutputFactory::new("ok", true)))
        .register("fail", Arc::new(StaticOutputFactory::new("fail", false)))
        .register("silent", Arc::new(SilentOutputFactory))
        .register(
            "needs_url",
            Arc::new(StaticOutputFactory::new("needs_url", true).requiring(&["url"])),
        )
        .build()
        .expect("test registry has unique names")
}
