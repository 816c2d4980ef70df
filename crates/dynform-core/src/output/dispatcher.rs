//! Sequential output dispatch

use indexmap::IndexMap;

use super::{DispatchContext, OutputHandler, OutputRegistry, OutputResponse, OutputSummary, SubmittedForm};
use crate::config::OutputDefinition;
use crate::error::Result;

/// Runs a form's outputs one after another
pub struct OutputDispatcher<'a> {
    registry: &'a OutputRegistry,
}

impl<'a> OutputDispatcher<'a> {
    pub fn new(registry: &'a OutputRegistry) -> Self {
        Self { registry }
    }

    /// Run every output in declaration order
    ///
    /// All types are resolved and every handler initialized before the
    /// first side effect, so a broken configuration aborts the submission
    /// without half of the outputs having run. After that a failing output
    /// never stops its siblings.
    pub async fn dispatch(
        &self,
        form: &SubmittedForm,
        outputs: &IndexMap<String, OutputDefinition>,
    ) -> Result<OutputResponse> {
        let siblings: Vec<OutputSummary> = outputs
            .iter()
            .map(|(key, output)| OutputSummary {
                key: key.clone(),
                output_type: output.type_name.clone(),
            })
            .collect();

        let mut handlers: Vec<(&str, Box<dyn OutputHandler>)> = Vec::with_capacity(outputs.len());
        for (key, output) in outputs {
            let factory = self.registry.resolve(&output.type_name)?;
            let mut handler = factory.create();
            handler.initialize(key, form, &output.options)?;
            handlers.push((key.as_str(), handler));
        }
        for (_, handler) in handlers.iter_mut() {
            handler.set_output_handlers(&siblings);
        }

        tracing::info!(
            "Dispatching form {} to {} output(s)",
            form.name,
            handlers.len()
        );

        let mut ctx = DispatchContext::new(siblings);
        let mut response = OutputResponse::new();
        for (key, mut handler) in handlers {
            let statuses = response.statuses().len();
            let messages = response.messages().len();

            response = handler.handle(&mut ctx, response).await?;
            ctx.mark_completed(key);

            let added_statuses = response.statuses().len().saturating_sub(statuses);
            let added_messages = response.messages().len().saturating_sub(messages);
            if added_statuses != 1 || added_messages != 1 {
                tracing::warn!(
                    "Output {} added {} status(es) and {} message(s), expected one of each",
                    key,
                    added_statuses,
                    added_messages
                );
            }
        }

        tracing::info!(
            "Form {} dispatched, overall status {}",
            form.name,
            response.overall_status()
        );
        Ok(response)
    }
}
