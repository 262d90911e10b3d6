use crate::config::ConfigError;
use crate::domain::{RoleStatus, UnknownRoleStatus};
use crate::telemetry::TelemetryError;
use crate::workflows::WorkflowError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

/// Failure surfaced by the binary: startup problems, bad CLI input, or a workflow error that
/// escaped a command.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Workflow(WorkflowError),
    Input(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Workflow(err) => err.status_code(),
            AppError::Input(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "invalid configuration: {err}"),
            AppError::Telemetry(err) => write!(f, "logging setup failed: {err}"),
            AppError::Io(err) => write!(f, "i/o failure: {err}"),
            AppError::Server(err) => write!(f, "http server stopped: {err}"),
            AppError::Workflow(err) => write!(f, "{err}"),
            AppError::Input(detail) => write!(f, "rejected input: {detail}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Workflow(err) => Some(err),
            AppError::Input(_) => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Workflow(err) = self {
            return err.into_response();
        }
        let status = self.status_code();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

macro_rules! app_error_from {
    ($($source:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$source> for AppError {
                fn from(value: $source) -> Self {
                    Self::$variant(value)
                }
            }
        )+
    };
}

app_error_from! {
    ConfigError => Config,
    TelemetryError => Telemetry,
    std::io::Error => Io,
    axum::Error => Server,
    WorkflowError => Workflow,
}

/// Malformed input rejected before any repository is touched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("decision must be 'accept' or 'ignore', got '{0}'")]
    UnknownDecision(String),
    #[error(transparent)]
    UnknownRoleStatus(#[from] UnknownRoleStatus),
    #[error("status '{0}' can only be set by the dropout workflow")]
    ReservedStatus(RoleStatus),
    #[error("CV match percentage {0} must be between 0 and 100")]
    CvMatchOutOfRange(f64),
    #[error("CV match percentage {found} is below the {floor}% submission floor")]
    CvMatchBelowFloor { found: f64, floor: f64 },
    #[error("date range start {from} is after its end {to}")]
    InvertedDateRange { from: String, to: String },
    #[error("user '{0}' is not an account manager")]
    NotAnAccountManager(String),
}
