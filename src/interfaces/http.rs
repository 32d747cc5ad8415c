//! HTTP surface: `POST /predict` and `GET /health`.

use crate::application::prediction::{HealthStatus, PredictionService};
use crate::domain::errors::{ServiceError, ValidationError};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info_span;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct FieldDetail {
    pub field: String,
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub detail: Vec<FieldDetail>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn router(service: Arc<PredictionService>) -> Router {
    Router::new()
        .route("/predict", post(predict_handler))
        .route("/health", get(health_handler))
        .with_state(service)
}

async fn predict_handler(
    State(service): State<Arc<PredictionService>>,
    Json(body): Json<Value>,
) -> Result<Json<PredictResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let _span = info_span!("predict", %request_id).entered();

    let outcome = service.predict(&body).map_err(error_response)?;
    Ok(Json(PredictResponse {
        prediction: outcome.label.as_str().to_string(),
    }))
}

async fn health_handler(State(service): State<Arc<PredictionService>>) -> Json<HealthStatus> {
    Json(service.health())
}

fn error_response(err: ServiceError) -> ApiError {
    let message = err.to_string();
    let (status, detail) = match err {
        ServiceError::Validation(ValidationError::Fields(violations)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            violations
                .into_iter()
                .map(|v| FieldDetail {
                    error: v.kind.to_string(),
                    field: v.field,
                })
                .collect(),
        ),
        ServiceError::Validation(ValidationError::NotAnObject { .. }) => {
            (StatusCode::BAD_REQUEST, Vec::new())
        }
        ServiceError::NotReady => (StatusCode::SERVICE_UNAVAILABLE, Vec::new()),
        ServiceError::Model(_) => (StatusCode::INTERNAL_SERVER_ERROR, Vec::new()),
    };

    (
        status,
        Json(ErrorResponse {
            error: message,
            detail,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{FieldViolation, PredictError, ViolationKind};

    #[test]
    fn test_validation_maps_to_unprocessable_with_fields() {
        let err = ServiceError::Validation(ValidationError::Fields(vec![FieldViolation {
            field: "debt_ratio".to_string(),
            kind: ViolationKind::Missing,
        }]));

        let (status, Json(body)) = error_response(err);
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body.detail,
            vec![FieldDetail {
                field: "debt_ratio".to_string(),
                error: "field required".to_string(),
            }]
        );
    }

    #[test]
    fn test_other_errors_map_to_status_codes() {
        let (status, _) = error_response(ServiceError::NotReady);
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, _) = error_response(ServiceError::Model(PredictError::EmptyOutput));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (status, _) = error_response(ServiceError::Validation(
            ValidationError::NotAnObject { found: "array" },
        ));
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
