use crate::shared::AppError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// §6: every error response carries the same shape so a client can branch
/// on `code` rather than parsing `message`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Populated only for `ERR_VARIANCE_REASONS_REQUIRED`: the offending
    /// item ids, so the client can route the user straight to them (§4.5
    /// step 5, §7).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_ids: Option<Vec<String>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Authentication(_) | AppError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::MappingOverlap(_) => StatusCode::CONFLICT,
            AppError::PreconditionFailed(_) | AppError::SessionAlreadyClosed => {
                StatusCode::PRECONDITION_FAILED
            }
            AppError::VarianceReasonsRequired(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed with an internal error");
        }

        let item_ids = match &self {
            AppError::VarianceReasonsRequired(ids) => {
                Some(ids.iter().map(|id| id.to_string()).collect())
            }
            _ => None,
        };

        let (message, details) = match &self {
            AppError::Database(_) => ("Database error occurred".to_string(), None),
            AppError::Jwt(_) => ("Invalid or expired token".to_string(), None),
            AppError::Internal(_) => ("Internal server error".to_string(), None),
            AppError::Validation(msg)
            | AppError::Authentication(msg)
            | AppError::Authorization(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::PreconditionFailed(msg)
            | AppError::MappingOverlap(msg) => (self.to_string(), Some(msg.clone())),
            AppError::SessionAlreadyClosed | AppError::VarianceReasonsRequired(_) => {
                (self.to_string(), None)
            }
        };

        let body = ErrorResponse {
            code: self.code().to_string(),
            message,
            details,
            item_ids,
        };

        (status, Json(body)).into_response()
    }
}
