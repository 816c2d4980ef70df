//! CLI Commands

pub mod config;
pub mod forms;
pub mod remote;

use serde::Serialize;
use serde_json::Value;

/// dynform API client
pub struct ApiClient {
    pub base_url: String,
    client: reqwest::Client,
}

/// Decoded response envelope
#[derive(Debug)]
pub struct Envelope {
    pub status: u16,
    pub success: bool,
    pub data: Option<Value>,
    pub messages: Vec<Value>,
    pub redirect_url: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn form_url(&self, name: &str) -> String {
        format!("{}/api/forms/{}", self.base_url, name)
    }

    pub async fn schema(&self, name: &str) -> Result<Envelope, String> {
        let resp = self
            .client
            .get(self.form_url(name))
            .send()
            .await
            .map_err(|e| e.to_string())?;
        Self::envelope(resp).await
    }

    pub async fn submit<B: Serialize>(&self, name: &str, body: &B) -> Result<Envelope, String> {
        let resp = self
            .client
            .post(self.form_url(name))
            .json(body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        Self::envelope(resp).await
    }

    async fn envelope(resp: reqwest::Response) -> Result<Envelope, String> {
        let status = resp.status().as_u16();
        let json: Value = resp
            .json()
            .await
            .map_err(|e| format!("Unexpected response (HTTP {}): {}", status, e))?;

        Ok(Envelope {
            status,
            success: json.get("success").and_then(Value::as_bool).unwrap_or(false),
            data: json.get("data").cloned(),
            messages: json
                .get("messages")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            redirect_url: json.get("redirectUrl").and_then(Value::as_str).map(String::from),
        })
    }
}

/// Split `key=value` pairs
pub fn parse_pairs(pairs: &[String]) -> Result<Vec<(String, String)>, String> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| format!("Expected key=value, got \"{}\"", pair))
        })
        .collect()
}
