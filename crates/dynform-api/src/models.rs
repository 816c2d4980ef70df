//! API Models

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;

use dynform_core::{DynformError, Message, SubmissionOutcome};

/// Response envelope shared by every form endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse {
    pub success: bool,
    /// Form schema, or the submitted data after a successful submission
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub data: Option<Value>,
    /// Output messages or validation errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<Object>>)]
    pub messages: Option<Vec<Value>>,
    #[serde(rename = "redirectUrl", default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

impl ApiResponse {
    pub fn success(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            messages: None,
            redirect_url: None,
        }
    }

    /// Failure carrying one error message
    pub fn error(text: &str) -> Self {
        Self {
            success: false,
            data: None,
            messages: Some(vec![Value::Object(Message::error(text).to_ordered_map())]),
            redirect_url: None,
        }
    }

    /// Envelope and status code for a submission outcome
    pub fn from_outcome(outcome: SubmissionOutcome) -> (StatusCode, Self) {
        match outcome {
            SubmissionOutcome::Invalid { errors } => (
                StatusCode::PRECONDITION_FAILED,
                Self {
                    success: false,
                    data: None,
                    messages: Some(errors.iter().map(|e| json!(e)).collect()),
                    redirect_url: None,
                },
            ),
            SubmissionOutcome::Processed {
                success,
                messages,
                data,
                redirect_url,
            } => {
                let status = if success {
                    StatusCode::OK
                } else {
                    StatusCode::PRECONDITION_FAILED
                };
                (
                    status,
                    Self {
                        success,
                        data: success.then_some(Value::Object(data)),
                        messages: Some(
                            messages
                                .iter()
                                .map(|m| Value::Object(m.to_ordered_map()))
                                .collect(),
                        ),
                        redirect_url,
                    },
                )
            }
        }
    }
}

/// Core error rendered as an envelope
#[derive(Debug)]
pub struct ApiError(pub DynformError);

impl From<DynformError> for ApiError {
    fn from(err: DynformError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, text) = match self.0.root_cause() {
            DynformError::FormNotFound(name) => (StatusCode::NOT_FOUND, format!("Form \"{name}\" not found.")),
            err => {
                tracing::error!("Request failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "The form is misconfigured. Please contact the site administrator.".to_string(),
                )
            }
        };
        (status, Json(ApiResponse::error(&text))).into_response()
    }
}
