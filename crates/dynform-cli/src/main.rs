//! dynform CLI
//!
//! Check form definitions and inspect schemas locally, or talk to a running
//! dynform API.
//!
//! # Usage
//!
//! ```bash
//! dynform validate --forms forms.yaml
//! dynform forms list
//! dynform schema contact --query name=Jane --format yaml
//! dynform remote schema contact
//! dynform remote submit contact --field name=Jane --field email=jane@example.com
//! dynform config set api_url http://localhost:8080
//! ```

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod output;

#[derive(Parser)]
#[command(name = "dynform")]
#[command(version)]
#[command(about = "dynform command line interface", long_about = None)]
struct Cli {
    /// Form definitions file
    #[arg(long, env = "DYNFORM_FORMS")]
    forms: Option<String>,

    /// API base URL
    #[arg(long, env = "DYNFORM_API_URL")]
    api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    format: Option<output::OutputFormat>,

    /// Profile name from config file
    #[arg(long, short)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate the form definitions
    Validate,
    /// Inspect configured forms
    Forms {
        #[command(subcommand)]
        action: FormCommands,
    },
    /// Print a form's JSON schema
    Schema {
        name: String,
        /// Query parameters passed to the form's input handler (key=value)
        #[arg(long, short)]
        query: Vec<String>,
    },
    /// Use a running dynform API
    Remote {
        #[command(subcommand)]
        action: RemoteCommands,
    },
    /// Configure CLI
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum FormCommands {
    /// List all forms
    List,
    /// Show one form's fields and outputs
    Get { name: String },
}

#[derive(Subcommand)]
enum RemoteCommands {
    /// Fetch a form's schema
    Schema { name: String },
    /// Submit a form
    Submit {
        name: String,
        /// JSON file with the submission
        #[arg(short, long, conflicts_with = "field")]
        data: Option<String>,
        /// Field value (key=value), repeatable
        #[arg(long)]
        field: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Set configuration value
    Set { key: String, value: String },
    /// Get configuration value
    Get { key: String },
    /// List all configuration
    List,
    /// Initialize configuration
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = config::Config::load(cli.profile.as_deref()).unwrap_or_default();
    let forms = cli
        .forms
        .or(config.forms_path)
        .unwrap_or_else(|| config::DEFAULT_FORMS_PATH.to_string());
    let api_url = cli
        .api_url
        .or(config.api_url)
        .unwrap_or_else(|| config::DEFAULT_API_URL.to_string());
    let format = cli
        .format
        .or_else(|| config.default_format.as_deref().and_then(output::OutputFormat::parse))
        .unwrap_or(output::OutputFormat::Table);

    let result = match cli.command {
        Commands::Validate => commands::forms::validate(&forms),
        Commands::Forms { action } => commands::forms::handle(action, &forms, format),
        Commands::Schema { name, query } => commands::forms::schema(&name, &query, &forms, format),
        Commands::Remote { action } => {
            let client = commands::ApiClient::new(&api_url);
            commands::remote::handle(action, &client, format).await
        }
        Commands::Config { action } => commands::config::handle(action, cli.profile.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
