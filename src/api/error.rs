use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::optimizer::OptimizerError;

/// API error types that can be returned from handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("No feasible schedule: {0}")]
    Infeasible(String),

    #[error("Solver timed out after {elapsed_ms} ms")]
    SolverTimeout { elapsed_ms: u64 },

    #[error("Optimization error: {0}")]
    OptimizationError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Error response that gets serialized to JSON
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Infeasible(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::SolverTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ApiError::OptimizationError(_) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::ValidationError(_) => "ValidationError",
            ApiError::Infeasible(_) => "Infeasible",
            ApiError::SolverTimeout { .. } => "SolverTimeout",
            ApiError::OptimizationError(_) => "OptimizationError",
            ApiError::InternalError(_) => "InternalServerError",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_type = self.error_type();

        let message = match &self {
            ApiError::OptimizationError(_) | ApiError::InternalError(_) => {
                tracing::error!(error = %self, "API error occurred");
                "An internal error occurred".to_string()
            }
            ApiError::Infeasible(_) | ApiError::SolverTimeout { .. } => {
                tracing::warn!(error = %self, "Optimization not solved");
                self.to_string()
            }
            ApiError::ValidationError(_) => {
                tracing::debug!(error = %self, "Client error");
                self.to_string()
            }
        };

        let error_response = ErrorResponse {
            error: error_type.to_string(),
            message,
            details: None,
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<OptimizerError> for ApiError {
    fn from(error: OptimizerError) -> Self {
        match error {
            OptimizerError::InvalidInput(msg) => ApiError::ValidationError(msg),
            OptimizerError::Infeasible(msg) => ApiError::Infeasible(msg),
            OptimizerError::SolverTimeout { elapsed } => ApiError::SolverTimeout {
                elapsed_ms: elapsed.as_millis() as u64,
            },
            other @ (OptimizerError::Solver(_) | OptimizerError::SolverContract(_)) => {
                ApiError::OptimizationError(other.to_string())
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        ApiError::InternalError(error.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(errors.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(error: tokio::task::JoinError) -> Self {
        ApiError::InternalError(format!("optimization task failed: {}", error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            ApiError::ValidationError("test".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Infeasible("test".to_string()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::SolverTimeout { elapsed_ms: 10 }.status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ApiError::InternalError("test".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_optimizer_error_mapping() {
        let err: ApiError = OptimizerError::InvalidInput("no appliances provided".into()).into();
        assert_eq!(err.error_type(), "ValidationError");

        let err: ApiError = OptimizerError::SolverTimeout {
            elapsed: Duration::from_millis(1500),
        }
        .into();
        assert!(matches!(err, ApiError::SolverTimeout { elapsed_ms: 1500 }));

        let err: ApiError = OptimizerError::SolverContract("bad assignment".into()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_display() {
        let error = ApiError::Infeasible("max_power_3 cannot be met".to_string());
        assert_eq!(error.to_string(), "No feasible schedule: max_power_3 cannot be met");
    }
}
