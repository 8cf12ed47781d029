//! Error taxonomy for the onboarding service.
//!
//! Three families, mapped to HTTP responses by the `IntoResponse` impl:
//! validation errors (per-field, 422), business-rule failures (409), and
//! broker/network errors (502). Handlers never let an error escape as a
//! panic — everything funnels through [`OnboardError`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// One inline field error, surfaced next to the offending form field.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    /// Dotted path of the field, e.g. `holders[0].firstName`.
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failures from the clearing-broker gateway.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("broker rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("broker response could not be decoded: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum OnboardError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error("signature does not match any account holder name")]
    SignatureMismatch,

    #[error("{0}")]
    BusinessRule(String),

    #[error("application not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl OnboardError {
    pub fn business_rule(msg: impl Into<String>) -> Self {
        OnboardError::BusinessRule(msg.into())
    }
}

impl IntoResponse for OnboardError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            OnboardError::Validation(fields) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": "validation failed", "fields": fields }),
            ),
            OnboardError::SignatureMismatch | OnboardError::BusinessRule(_) => {
                (StatusCode::CONFLICT, json!({ "error": self.to_string() }))
            }
            OnboardError::NotFound(_) => {
                (StatusCode::NOT_FOUND, json!({ "error": self.to_string() }))
            }
            OnboardError::Broker(e) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": e.to_string() }),
            ),
            OnboardError::Internal(e) => {
                tracing::error!("internal error: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_422() {
        let err = OnboardError::Validation(vec![FieldError::new("customer.email", "required")]);
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_signature_mismatch_maps_to_409() {
        let resp = OnboardError::SignatureMismatch.into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_broker_rejection_maps_to_502() {
        let err = OnboardError::Broker(BrokerError::Rejected {
            status: 400,
            message: "bad account".to_string(),
        });
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }
}
