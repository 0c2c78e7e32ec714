use crate::shared::InventoryItemId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// §4.5 step 5: close was attempted while items exceeded the variance
    /// threshold without a matching reason entry.
    #[error("Variance reasons required for {} item(s)", .0.len())]
    VarianceReasonsRequired(Vec<InventoryItemId>),

    #[error("Session is already closed")]
    SessionAlreadyClosed,

    /// Invariant 4/5: a mapping or tap-assignment write would overlap an
    /// existing effective range.
    #[error("Overlapping effective range: {0}")]
    MappingOverlap(String),

    #[error("Internal server error")]
    Internal(String),

    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("JWT error")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// Machine-readable code matching spec §6's error code set exactly, so
    /// RPC callers can branch on `ERR_VARIANCE_REASONS_REQUIRED` etc.
    /// without string-matching the human message (§4.12).
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ERR_VALIDATION",
            Self::Authentication(_) => "ERR_UNAUTHENTICATED",
            Self::Authorization(_) => "ERR_FORBIDDEN",
            Self::NotFound(_) => "ERR_NOT_FOUND",
            Self::Conflict(_) => "ERR_CONFLICT",
            Self::PreconditionFailed(_) => "ERR_PRECONDITION_FAILED",
            Self::VarianceReasonsRequired(_) => "ERR_VARIANCE_REASONS_REQUIRED",
            Self::SessionAlreadyClosed => "ERR_SESSION_ALREADY_CLOSED",
            Self::MappingOverlap(_) => "ERR_MAPPING_OVERLAP",
            Self::Internal(_) => "ERR_INTERNAL",
            Self::Database(_) => "ERR_INTERNAL",
            Self::Jwt(_) => "ERR_UNAUTHENTICATED",
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    pub fn authorization(msg: impl Into<String>) -> Self {
        Self::Authorization(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn precondition_failed(msg: impl Into<String>) -> Self {
        Self::PreconditionFailed(msg.into())
    }

    pub fn mapping_overlap(msg: impl Into<String>) -> Self {
        Self::MappingOverlap(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

pub type AppResult<T> = Result<T, AppError>;
