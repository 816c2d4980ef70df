//! Built-in dynform outputs
//!
//! | type          | side effect                               | required options |
//! |---------------|-------------------------------------------|------------------|
//! | `email`       | render a document, send it via a mailer   | `to`, `document` |
//! | `http`        | POST the submission to a webhook          | `url`            |
//! | `log`         | write the submission to the log           |                  |
//! | `asset`       | store selected fields as a JSON file      | `path`, `fields` |
//! | `data_object` | save a structured record                  | `class`, `path`  |
//!
//! Every output accepts `success_message` and `error_message` to override
//! the text shown to the user.

pub mod asset;
pub mod data_object;
pub mod email;
pub mod error;
pub mod http;
pub mod log;
pub mod mailer;
pub mod storage;

use std::sync::Arc;

use dynform_core::output::OutputRegistryBuilder;
use dynform_core::{OutputRegistry, Result};

pub use asset::AssetOutputFactory;
pub use data_object::DataObjectOutputFactory;
pub use email::EmailOutputFactory;
pub use error::{MailError, StorageError};
pub use http::HttpOutputFactory;
pub use log::LogOutputFactory;
pub use mailer::{DocumentStore, HttpMailer, LogMailer, MailMessage, Mailer};
pub use storage::{
    AssetStorage, FilesystemAssetStorage, InMemoryRecordStore, JsonLinesRecordStore, Record, RecordStore,
};

/// Collaborators the built-in outputs wrap
#[derive(Clone)]
pub struct OutputServices {
    pub mailer: Arc<dyn Mailer>,
    pub documents: Arc<DocumentStore>,
    pub assets: Arc<dyn AssetStorage>,
    pub records: Arc<dyn RecordStore>,
    pub http: reqwest::Client,
}

impl OutputServices {
    /// Log mailer, in-memory records, assets below `storage_root`
    pub fn local(storage_root: impl Into<std::path::PathBuf>) -> Self {
        Self {
            mailer: Arc::new(LogMailer),
            documents: Arc::new(DocumentStore::new()),
            assets: Arc::new(FilesystemAssetStorage::new(storage_root)),
            records: Arc::new(InMemoryRecordStore::new()),
            http: reqwest::Client::new(),
        }
    }
}

/// Add the built-in outputs to a registry builder
pub fn register_builtin_outputs(builder: OutputRegistryBuilder, services: &OutputServices) -> OutputRegistryBuilder {
    builder
        .register(
            "dynform.output.email",
            Arc::new(EmailOutputFactory::new(
                Arc::clone(&services.mailer),
                Arc::clone(&services.documents),
            )),
        )
        .register("dynform.output.http", Arc::new(HttpOutputFactory::new(services.http.clone())))
        .register("dynform.output.log", Arc::new(LogOutputFactory))
        .register(
            "dynform.output.asset",
            Arc::new(AssetOutputFactory::new(Arc::clone(&services.assets))),
        )
        .register(
            "dynform.output.data_object",
            Arc::new(DataObjectOutputFactory::new(Arc::clone(&services.records))),
        )
}

/// Registry with only the built-in outputs
pub fn builtin_registry(services: &OutputServices) -> Result<OutputRegistry> {
    register_builtin_outputs(OutputRegistry::builder(), services).build()
}
