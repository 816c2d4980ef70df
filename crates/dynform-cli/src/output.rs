//! Output formatting

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(value, true).ok()
    }

    /// Print structured data; tables fall back to pretty JSON
    pub fn print<T: Serialize>(&self, data: &T) {
        match self {
            OutputFormat::Yaml => {
                print!("{}", serde_yaml::to_string(data).unwrap_or_default());
            }
            OutputFormat::Json | OutputFormat::Table => {
                println!("{}", serde_json::to_string_pretty(data).unwrap_or_default());
            }
        }
    }
}

/// One message of an API envelope, coloured by its type
pub fn format_message(message: &Value) -> String {
    let text = message.get("message").or_else(|| message.get("text"));
    let text = text.and_then(Value::as_str).unwrap_or_default();
    let prefix = match message.get("field").and_then(Value::as_str) {
        Some(field) if !field.is_empty() => format!("{}: ", field),
        _ => String::new(),
    };
    let line = format!("{}{}", prefix, text);
    match message.get("type").and_then(Value::as_str) {
        Some("success") => format!("{} {}", "✓".green(), line),
        Some("error") => format!("{} {}", "✗".red(), line.red()),
        _ => format!("• {}", line),
    }
}
