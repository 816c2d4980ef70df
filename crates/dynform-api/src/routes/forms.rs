//! Form schema and submission endpoints

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::Value;
use std::sync::Arc;

use dynform_core::input::RequestContext;

use crate::models::{ApiError, ApiResponse};
use crate::ApiState;

pub fn router() -> Router<Arc<ApiState>> {
    Router::new().route("/:name", get(get_form_schema).post(submit_form))
}

/// Get a form's JSON schema
#[utoipa::path(
    get,
    path = "/api/forms/{name}",
    params(("name" = String, Path, description = "Form name")),
    responses(
        (status = 200, description = "Form schema", body = ApiResponse),
        (status = 404, description = "Form not found", body = ApiResponse)
    ),
    tag = "forms"
)]
pub async fn get_form_schema(
    State(state): State<Arc<ApiState>>,
    Path(name): Path<String>,
    Query(query): Query<Vec<(String, String)>>,
) -> Result<Json<ApiResponse>, ApiError> {
    let request = RequestContext::default().with_query(query);
    let schema = state.service.schema(&name, &request)?;
    let data = serde_json::to_value(schema).map_err(|e| ApiError(e.into()))?;
    Ok(Json(ApiResponse::success(data)))
}

/// Submit a form
#[utoipa::path(
    post,
    path = "/api/forms/{name}",
    params(("name" = String, Path, description = "Form name")),
    request_body(content = Object, description = "Field values keyed by field name"),
    responses(
        (status = 200, description = "Submission processed", body = ApiResponse),
        (status = 404, description = "Form not found", body = ApiResponse),
        (status = 412, description = "Validation failed or an output failed", body = ApiResponse)
    ),
    tag = "forms"
)]
pub async fn submit_form(
    State(state): State<Arc<ApiState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    // Resolve the form first so an unknown name is a 404 whatever the body
    state.service.definition(&name)?;

    let payload: Value = if body.is_empty() {
        Value::Object(Default::default())
    } else {
        match serde_json::from_slice(&body) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!("Rejected submission for {}: {}", name, e);
                return Ok((
                    StatusCode::PRECONDITION_FAILED,
                    Json(ApiResponse::error("The submitted data is not valid JSON.")),
                ));
            }
        }
    };

    let outcome = state.service.submit(&name, &payload).await?;
    let (status, response) = ApiResponse::from_outcome(outcome);
    Ok((status, Json(response)))
}
