//! Flat error list for rejected submissions

use serde::{Deserialize, Serialize};

use crate::form::{Form, FormField, Violation};
use crate::translation::{Params, Translator, MESSAGES_DOMAIN, VALIDATORS_DOMAIN};

/// One validation error as sent to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub message: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    /// Field name; the form name for root errors
    pub field: String,
    pub label: String,
}

/// Root violations first, then each direct child's, in field order
///
/// Grandchildren are not visited: a nested form reports through its own
/// root violations only.
pub fn normalize_errors(form: &Form, translator: &dyn Translator, template: Option<&str>) -> Vec<ErrorEntry> {
    let mut entries = Vec::new();
    collect(form.root(), translator, template, &mut entries);
    for child in form.root().children().values() {
        collect(child, translator, template, &mut entries);
    }
    entries
}

fn collect(field: &FormField, translator: &dyn Translator, template: Option<&str>, entries: &mut Vec<ErrorEntry>) {
    if field.errors().is_empty() {
        return;
    }

    let options = field.options();
    let label = match options.label.as_deref() {
        Some(label) if !label.is_empty() && options.label_translated => label.to_string(),
        Some(label) if !label.is_empty() => translator.trans(label, &Params::new(), Some(MESSAGES_DOMAIN)),
        _ => String::new(),
    };

    for violation in field.errors() {
        let message = translate_violation(violation, translator);
        let message = match template {
            Some(template) if !label.is_empty() => sprintf(template, &[&message, &label]),
            _ => message,
        };
        entries.push(ErrorEntry {
            message,
            entry_type: "error".to_string(),
            field: field.name().to_string(),
            label: label.clone(),
        });
    }
}

fn translate_violation(violation: &Violation, translator: &dyn Translator) -> String {
    match violation.plural {
        Some(count) => translator.trans_choice(
            &violation.message_template,
            count,
            &violation.parameters,
            Some(VALIDATORS_DOMAIN),
        ),
        None => translator.trans(&violation.message_template, &violation.parameters, Some(VALIDATORS_DOMAIN)),
    }
}

/// Minimal `sprintf`: `%s`, positional `%1$s` and `%%`
pub fn sprintf(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    let mut next = 0;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('%') => {
                chars.next();
                out.push('%');
            }
            Some('s') => {
                chars.next();
                out.push_str(args.get(next).copied().unwrap_or_default());
                next += 1;
            }
            Some(d) if d.is_ascii_digit() => {
                let mut lookahead = chars.clone();
                let mut digits = String::new();
                while let Some(d) = lookahead.peek().copied().filter(char::is_ascii_digit) {
                    digits.push(d);
                    lookahead.next();
                }
                if lookahead.next() == Some('$') && lookahead.next() == Some('s') {
                    let index = digits.parse::<usize>().unwrap_or(0);
                    out.push_str(index.checked_sub(1).and_then(|i| args.get(i)).copied().unwrap_or_default());
                    chars = lookahead;
                } else {
                    out.push('%');
                }
            }
            _ => out.push('%'),
        }
    }
    out
}
