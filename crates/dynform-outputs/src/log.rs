//! `log` output: write the submission to the application log

use async_trait::async_trait;
use serde_json::Value;

use dynform_core::config::Options;
use dynform_core::output::{
    string_option, DispatchContext, OutcomeMessages, OutputFactory, OutputHandler, OutputResponse, SubmittedForm,
};
use dynform_core::{DynformError, Result};

pub const LOG_OUTPUT: &str = "log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Debug,
    Info,
    Warn,
}

pub struct LogOutputFactory;

impl OutputFactory for LogOutputFactory {
    fn name(&self) -> &str {
        LOG_OUTPUT
    }

    fn create(&self) -> Box<dyn OutputHandler> {
        Box::new(LogOutput {
            key: String::new(),
            form: String::new(),
            level: Level::Info,
            data: Value::Null,
            messages: None,
        })
    }
}

pub struct LogOutput {
    key: String,
    form: String,
    level: Level,
    data: Value,
    messages: Option<OutcomeMessages>,
}

#[async_trait]
impl OutputHandler for LogOutput {
    fn initialize(&mut self, key: &str, form: &SubmittedForm, options: &Options) -> Result<()> {
        self.key = key.to_string();
        self.form = form.name.clone();
        self.level = match string_option(key, options, "level")?.as_deref() {
            None | Some("info") => Level::Info,
            Some("debug") => Level::Debug,
            Some("warn") | Some("warning") => Level::Warn,
            Some(other) => {
                return Err(DynformError::OutputConfig {
                    output: key.to_string(),
                    reason: format!("unknown log level \"{other}\", expected debug, info or warn"),
                })
            }
        };
        self.data = Value::Object(form.data.clone());
        self.messages = Some(OutcomeMessages::from_options(
            key,
            options,
            "Your submission has been received.",
            "Your submission could not be recorded.",
        )?);
        Ok(())
    }

    async fn handle(&mut self, _ctx: &mut DispatchContext, mut response: OutputResponse) -> Result<OutputResponse> {
        let messages = self.messages.clone().ok_or_else(|| DynformError::OutputConfig {
            output: self.key.clone(),
            reason: "handler was not initialized".into(),
        })?;

        match self.level {
            Level::Debug => tracing::debug!(output = %self.key, "Form {} submitted: {}", self.form, self.data),
            Level::Info => tracing::info!(output = %self.key, "Form {} submitted: {}", self.form, self.data),
            Level::Warn => tracing::warn!(output = %self.key, "Form {} submitted: {}", self.form, self.data),
        }
        messages.report(&mut response, &self.key, true);
        Ok(response)
    }
}
