//! Commands against a running dynform API

use serde_json::{Map, Value};

use super::{parse_pairs, ApiClient};
use crate::{output::format_message, output::OutputFormat, RemoteCommands};

pub async fn handle(action: RemoteCommands, client: &ApiClient, format: OutputFormat) -> Result<(), String> {
    match action {
        RemoteCommands::Schema { name } => {
            let envelope = client.schema(&name).await?;
            if !envelope.success {
                return Err(failure(envelope.status, &envelope.messages));
            }
            format.print(&envelope.data.unwrap_or(Value::Null));
        }
        RemoteCommands::Submit { name, data, field } => {
            let body = submission(data.as_deref(), &field)?;
            let envelope = client.submit(&name, &body).await?;
            for message in &envelope.messages {
                println!("{}", format_message(message));
            }
            if !envelope.success {
                return Err(format!("Submission rejected (HTTP {})", envelope.status));
            }
            if let Some(url) = envelope.redirect_url {
                println!("Redirect: {}", url);
            }
        }
    }
    Ok(())
}

/// Body from a JSON file, or from `key=value` fields
fn submission(data: Option<&str>, fields: &[String]) -> Result<Value, String> {
    if let Some(path) = data {
        let content = std::fs::read_to_string(path).map_err(|e| format!("{}: {}", path, e))?;
        return serde_json::from_str(&content).map_err(|e| format!("{}: {}", path, e));
    }
    let body: Map<String, Value> = parse_pairs(fields)?
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    Ok(Value::Object(body))
}

fn failure(status: u16, messages: &[Value]) -> String {
    let text: Vec<String> = messages.iter().map(format_message).collect();
    format!("HTTP {}: {}", status, text.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_submission_from_fields() {
        let body = submission(None, &["name=Jane".into(), "email=jane@example.com".into()]).unwrap();
        assert_eq!(body, json!({"name": "Jane", "email": "jane@example.com"}));
    }

    #[test]
    fn test_submission_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, r#"{"tags": ["a", "b"]}"#).unwrap();
        let body = submission(path.to_str(), &[]).unwrap();
        assert_eq!(body["tags"], json!(["a", "b"]));
    }
}
