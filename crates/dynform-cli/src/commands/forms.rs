//! Local form commands

use colored::Colorize;
use serde::Serialize;
use std::sync::Arc;
use tabled::{settings::Style, Table, Tabled};

use dynform_core::csrf::HmacCsrfTokenManager;
use dynform_core::input::RequestContext;
use dynform_core::{FormDefinition, FormRegistries, FormService, FormsConfig};
use dynform_outputs::{builtin_registry, OutputServices};

use super::parse_pairs;
use crate::{output::OutputFormat, FormCommands};

/// Secret for schema previews; tokens it signs are never submitted
const PREVIEW_CSRF_SECRET: &str = "dynform-cli-preview";

#[derive(Debug, Serialize, Tabled)]
pub struct FormRow {
    pub name: String,
    pub method: String,
    pub csrf: bool,
    pub fields: usize,
    pub outputs: String,
}

impl FormRow {
    fn from_definition(definition: &FormDefinition) -> Self {
        Self {
            name: definition.name.clone(),
            method: definition.method.to_string(),
            csrf: definition.csrf,
            fields: definition.fields.len(),
            outputs: definition
                .outputs
                .iter()
                .map(|(key, output)| format!("{} ({})", key, output.type_name))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
pub struct FieldRow {
    pub field: String,
    #[tabled(rename = "type")]
    pub type_name: String,
    pub constraints: String,
}

fn registries() -> Result<FormRegistries, String> {
    let services = OutputServices::local(std::env::temp_dir().join("dynform"));
    let outputs = builtin_registry(&services).map_err(|e| e.to_string())?;
    Ok(FormRegistries::new(outputs))
}

fn load_service(forms: &str) -> Result<FormService, String> {
    let config = FormsConfig::load(forms).map_err(|e| format!("{}: {}", forms, e))?;
    FormService::builder(config, registries()?)
        .csrf(Arc::new(HmacCsrfTokenManager::new(PREVIEW_CSRF_SECRET)))
        .build()
        .map_err(|e| e.to_string())
}

pub fn validate(forms: &str) -> Result<(), String> {
    let service = load_service(forms)?;
    println!(
        "{} {} form(s) in {} are valid",
        "✓".green(),
        service.config().forms.len(),
        forms
    );
    Ok(())
}

pub fn handle(action: FormCommands, forms: &str, format: OutputFormat) -> Result<(), String> {
    let service = load_service(forms)?;
    match action {
        FormCommands::List => {
            let rows: Vec<FormRow> = service
                .config()
                .forms
                .values()
                .map(FormRow::from_definition)
                .collect();
            match format {
                OutputFormat::Table => println!("{}", Table::new(&rows).with(Style::rounded())),
                _ => format.print(&rows),
            }
        }
        FormCommands::Get { name } => {
            let definition = service.definition(&name).map_err(|e| e.to_string())?;
            match format {
                OutputFormat::Table => {
                    let rows: Vec<FieldRow> = definition
                        .fields
                        .iter()
                        .map(|(field, def)| FieldRow {
                            field: field.clone(),
                            type_name: def.type_name.clone(),
                            constraints: def
                                .constraints
                                .iter()
                                .filter_map(|c| c.parts().ok().map(|(n, _)| n.to_string()))
                                .collect::<Vec<_>>()
                                .join(", "),
                        })
                        .collect();
                    println!("{}", Table::new(&rows).with(Style::rounded()));
                    println!("{}", Table::new([FormRow::from_definition(definition)]).with(Style::rounded()));
                }
                _ => format.print(definition),
            }
        }
    }
    Ok(())
}

pub fn schema(name: &str, query: &[String], forms: &str, format: OutputFormat) -> Result<(), String> {
    let service = load_service(forms)?;
    let request = RequestContext::default().with_query(parse_pairs(query)?);
    let schema = service.schema(name, &request).map_err(|e| e.to_string())?;
    format.print(&schema);
    Ok(())
}
