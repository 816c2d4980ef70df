//! `http` output: POST the submission to a webhook

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use indexmap::IndexMap;
use serde_json::{json, Value};
use sha2::Sha256;
use std::time::Duration;

use dynform_core::config::Options;
use dynform_core::output::{
    required_string, string_option, DispatchContext, OutcomeMessages, OutputFactory, OutputHandler,
    OutputResponse, SubmittedForm,
};
use dynform_core::{DynformError, Result};

pub const HTTP_OUTPUT: &str = "http";

/// Header carrying `sha256=<hex hmac of the body>`
pub const SIGNATURE_HEADER: &str = "X-Dynform-Signature";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

type HmacSha256 = Hmac<Sha256>;

pub struct HttpOutputFactory {
    client: reqwest::Client,
}

impl HttpOutputFactory {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpOutputFactory {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl OutputFactory for HttpOutputFactory {
    fn name(&self) -> &str {
        HTTP_OUTPUT
    }

    fn required_options(&self) -> &[&'static str] {
        &["url"]
    }

    fn create(&self) -> Box<dyn OutputHandler> {
        Box::new(HttpOutput {
            client: self.client.clone(),
            key: String::new(),
            url: String::new(),
            secret: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            headers: IndexMap::new(),
            payload: Value::Null,
            messages: None,
        })
    }
}

pub struct HttpOutput {
    client: reqwest::Client,
    key: String,
    url: String,
    secret: Option<String>,
    timeout: Duration,
    headers: IndexMap<String, String>,
    payload: Value,
    messages: Option<OutcomeMessages>,
}

impl HttpOutput {
    fn sign(secret: &str, body: &[u8]) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| DynformError::InvalidConfig(e.to_string()))?;
        mac.update(body);
        Ok(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
    }

    async fn deliver(&self, body: Vec<u8>) -> std::result::Result<(), String> {
        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .timeout(self.timeout);
        if let Some(secret) = &self.secret {
            let signature = Self::sign(secret, &body).map_err(|e| e.to_string())?;
            request = request.header(SIGNATURE_HEADER, signature);
        }
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let resp = request.body(body).send().await.map_err(|e| e.to_string())?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(format!("HTTP {}", resp.status()))
        }
    }
}

#[async_trait]
impl OutputHandler for HttpOutput {
    fn initialize(&mut self, key: &str, form: &SubmittedForm, options: &Options) -> Result<()> {
        self.key = key.to_string();
        self.url = required_string(key, options, "url")?;
        self.secret = string_option(key, options, "secret")?;
        if let Some(timeout) = options.get("timeout_secs").filter(|v| !v.is_null()) {
            let secs = timeout.as_u64().filter(|secs| *secs > 0).ok_or_else(|| DynformError::OutputConfig {
                output: key.to_string(),
                reason: format!("option \"timeout_secs\" must be a positive integer, got {timeout}"),
            })?;
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(headers) = options.get("headers").filter(|v| !v.is_null()) {
            self.headers = serde_json::from_value(headers.clone()).map_err(|e| DynformError::OutputConfig {
                output: key.to_string(),
                reason: format!("option \"headers\" must map names to strings: {e}"),
            })?;
        }
        self.payload = json!({ "form": form.name, "data": form.data });
        self.messages = Some(OutcomeMessages::from_options(
            key,
            options,
            "Your submission has been forwarded.",
            "Your submission could not be forwarded. Please try again later.",
        )?);
        Ok(())
    }

    async fn handle(&mut self, _ctx: &mut DispatchContext, mut response: OutputResponse) -> Result<OutputResponse> {
        let messages = self.messages.clone().ok_or_else(|| DynformError::OutputConfig {
            output: self.key.clone(),
            reason: "handler was not initialized".into(),
        })?;

        let body = serde_json::to_vec(&self.payload)?;
        let result = self.deliver(body).await;
        match &result {
            Ok(()) => tracing::info!("Output {} delivered to {}", self.key, self.url),
            Err(e) => tracing::error!("Output {} failed to deliver to {}: {}", self.key, self.url, e),
        }
        messages.report(&mut response, &self.key, result.is_ok());
        Ok(response)
    }
}
