//! Dispatch result model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Success,
    Error,
    Warning,
    Info,
}

/// A user-facing message
///
/// Serializes required attributes first (`type`, `text`), then whichever
/// optional attributes are set, always in the same order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl Message {
    pub fn new(message_type: MessageType, text: impl Into<String>) -> Self {
        Self {
            message_type,
            text: text.into(),
            expire: None,
            delay: None,
            source: None,
            field: None,
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(MessageType::Success, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(MessageType::Error, text)
    }

    pub fn with_expire(mut self, millis: u64) -> Self {
        self.expire = Some(millis);
        self
    }

    pub fn with_delay(mut self, millis: u64) -> Self {
        self.delay = Some(millis);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Attributes as an ordered map
    pub fn to_ordered_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("type".into(), serde_json::to_value(self.message_type).unwrap_or(Value::Null));
        map.insert("text".into(), Value::String(self.text.clone()));
        if let Some(expire) = self.expire {
            map.insert("expire".into(), expire.into());
        }
        if let Some(delay) = self.delay {
            map.insert("delay".into(), delay.into());
        }
        if let Some(source) = &self.source {
            map.insert("source".into(), Value::String(source.clone()));
        }
        if let Some(field) = &self.field {
            map.insert("field".into(), Value::String(field.clone()));
        }
        map
    }
}

/// Messages and statuses collected along the handler chain
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutputResponse {
    messages: Vec<Message>,
    statuses: Vec<bool>,
}

impl OutputResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn add_status(&mut self, status: bool) {
        self.statuses.push(status);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn statuses(&self) -> &[bool] {
        &self.statuses
    }

    /// AND of every status; true when nothing ran
    pub fn overall_status(&self) -> bool {
        self.statuses.iter().all(|s| *s)
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}
