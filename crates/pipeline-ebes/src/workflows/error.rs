use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::repository::RepositoryError;
use crate::domain::UserId;
use crate::error::ValidationError;

/// Tagged failure for every violated workflow precondition. None of these are transient, so
/// callers surface them instead of retrying.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },
    #[error("user '{actor}' may not {action}")]
    Forbidden { actor: UserId, action: &'static str },
    #[error("invalid state transition: {0}")]
    InvalidStateTransition(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("account manager '{account_manager}' already holds {limit} active roles")]
    CapacityExceeded {
        account_manager: UserId,
        limit: usize,
    },
    #[error(transparent)]
    Repository(RepositoryError),
}

impl WorkflowError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn forbidden(actor: &UserId, action: &'static str) -> Self {
        Self::Forbidden {
            actor: actor.clone(),
            action,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            WorkflowError::NotFound { .. } => StatusCode::NOT_FOUND,
            WorkflowError::Forbidden { .. } => StatusCode::FORBIDDEN,
            WorkflowError::InvalidStateTransition(_) => StatusCode::CONFLICT,
            WorkflowError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            WorkflowError::CapacityExceeded { .. } => StatusCode::CONFLICT,
            WorkflowError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            WorkflowError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            WorkflowError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A lost compare-and-swap is reported exactly like a transition rejected up front.
impl From<RepositoryError> for WorkflowError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::StaleState { expected } => Self::InvalidStateTransition(format!(
                "record changed concurrently, expected {expected}"
            )),
            other => Self::Repository(other),
        }
    }
}

impl IntoResponse for WorkflowError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
