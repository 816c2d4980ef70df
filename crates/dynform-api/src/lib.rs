//! dynform HTTP API
//!
//! ```text
//! GET  {base}/api/forms/{name}   form JSON schema
//! POST {base}/api/forms/{name}   submit; 200 when every output succeeded, 412 otherwise
//! GET  /health
//! GET  /docs                     Swagger UI
//! ```

pub mod models;
pub mod routes;
pub mod settings;

use anyhow::Context;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use dynform_core::csrf::HmacCsrfTokenManager;
use dynform_core::routing::RouteTable;
use dynform_core::translation::MessageCatalogue;
use dynform_core::{FormRegistries, FormService, FormsConfig};
use dynform_outputs::{
    builtin_registry, DocumentStore, HttpMailer, InMemoryRecordStore, JsonLinesRecordStore,
    LogMailer, Mailer, OutputServices, RecordStore,
};

pub use models::*;
pub use settings::Settings;

/// API state
pub struct ApiState {
    pub service: Arc<FormService>,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "dynform API",
        description = "Configuration-driven forms: JSON schemas and submissions",
        license(name = "Apache-2.0")
    ),
    paths(
        routes::health::health_check,
        routes::forms::get_form_schema,
        routes::forms::submit_form,
    ),
    components(schemas(ApiResponse, routes::health::HealthResponse)),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "forms", description = "Form schemas and submissions")
    )
)]
pub struct ApiDoc;

/// Build the API router
pub fn build_router(state: ApiState, base_path: &str) -> Router {
    let forms = Router::new().nest("/api/forms", routes::forms::router());
    let base = base_path.trim_end_matches('/');
    let forms = if base.is_empty() {
        forms
    } else {
        Router::new().nest(base, forms)
    };

    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(routes::health::health_check))
        .merge(forms)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Wire the form service from settings
pub fn build_service(settings: &Settings) -> anyhow::Result<FormService> {
    let config = FormsConfig::load(&settings.forms_path)
        .with_context(|| format!("loading forms from {}", settings.forms_path.display()))?;

    let mailer: Arc<dyn Mailer> = match &settings.mail_endpoint {
        Some(endpoint) => Arc::new(HttpMailer::new(endpoint)),
        None => {
            tracing::warn!("No mail endpoint configured, mails are only logged");
            Arc::new(LogMailer)
        }
    };
    let documents = match &settings.templates_dir {
        Some(dir) => DocumentStore::load_dir(dir).with_context(|| format!("loading documents from {}", dir.display()))?,
        None => DocumentStore::new(),
    };
    let records: Arc<dyn RecordStore> = match &settings.records_path {
        Some(path) => Arc::new(JsonLinesRecordStore::new(path)),
        None => Arc::new(InMemoryRecordStore::new()),
    };
    let services = OutputServices {
        mailer,
        documents: Arc::new(documents),
        records,
        ..OutputServices::local(&settings.storage_root)
    };

    let registries = FormRegistries::new(builtin_registry(&services)?);
    let translator = match &settings.translations_path {
        Some(path) => MessageCatalogue::load(path)
            .with_context(|| format!("loading translations from {}", path.display()))?,
        None => MessageCatalogue::new(),
    };

    let mut builder = FormService::builder(config, registries)
        .translator(Arc::new(translator))
        .url_generator(Arc::new(RouteTable::new(&settings.base_path)));
    if let Some(secret) = &settings.csrf_secret {
        builder = builder.csrf(Arc::new(HmacCsrfTokenManager::new(secret)));
    }
    let service = builder.build().context("invalid form configuration")?;

    tracing::info!("Loaded {} form(s)", service.config().forms.len());
    Ok(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{json, Value};

    const FORMS: &str = r#"
forms:
  contact:
    csrf: false
    redirect_url: /thanks
    input_handler: query_string
    fields:
      name: { type: TextType, constraints: [NotBlank] }
      email: { type: EmailType, constraints: [NotBlank, Email] }
      send: { type: SubmitType }
    outputs:
      audit: { type: log, options: { success_message: Thanks! } }
"#;

    fn server(base_path: &str) -> TestServer {
        let dir = tempfile::tempdir().unwrap();
        let registries = FormRegistries::new(builtin_registry(&OutputServices::local(dir.path())).unwrap());
        let service = FormService::builder(FormsConfig::from_yaml_str(FORMS).unwrap(), registries)
            .url_generator(Arc::new(RouteTable::new(base_path)))
            .build()
            .unwrap();
        let state = ApiState {
            service: Arc::new(service),
        };
        TestServer::new(build_router(state, base_path)).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = server("").get("/health").await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["forms"], 1);
    }

    #[tokio::test]
    async fn test_schema() {
        let response = server("").get("/api/forms/contact?name=Jane").await;
        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["type"], "object");
        assert_eq!(body["data"]["submitUrl"], "/api/forms/contact");
        assert_eq!(body["data"]["properties"]["name"]["data"], "Jane");
        assert_eq!(body["data"]["required"], json!(["name", "email"]));
    }

    #[tokio::test]
    async fn test_schema_under_base_path() {
        let server = server("/site");
        let response = server.get("/site/api/forms/contact").await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["data"]["submitUrl"], "/site/api/forms/contact");
        assert_eq!(server.get("/api/forms/contact").await.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_form() {
        let server = server("");
        let response = server.get("/api/forms/missing").await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(response.json::<Value>()["success"], false);

        let response = server.post("/api/forms/missing").json(&json!({})).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_submission() {
        let response = server("")
            .post("/api/forms/contact")
            .json(&json!({"name": "", "email": "invalid-email"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::PRECONDITION_FAILED);
        let body = response.json::<Value>();
        assert_eq!(body["success"], false);
        let fields: Vec<_> = body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["field"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(fields, vec!["name", "email"]);
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let response = server("").post("/api/forms/contact").text("{not json").await;
        assert_eq!(response.status_code(), StatusCode::PRECONDITION_FAILED);
        assert_eq!(response.json::<Value>()["success"], false);
    }

    #[tokio::test]
    async fn test_successful_submission() {
        let response = server("")
            .post("/api/forms/contact")
            .json(&json!({"name": "Jane", "email": "jane@example.com"}))
            .await;
        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["success"], true);
        assert_eq!(body["redirectUrl"], "/thanks");
        assert_eq!(body["data"], json!({"name": "Jane", "email": "jane@example.com"}));
        assert_eq!(body["messages"], json!([{"type": "success", "text": "Thanks!", "source": "audit"}]));
    }
}
