//! Generation error taxonomy
//!
//! Every failure the orchestration layer surfaces is a [`GenerationError`].
//! Provider failures are classified on conversion so retry decisions only
//! ever look at [`GenerationError::is_transient`].

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::VariationError;
use crate::providers::ProviderError;

/// Serializable classification of a [`GenerationError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Validation,
    TransientBackend,
    TerminalBackend,
    Timeout,
    Cancelled,
    NotFound,
    AllVariationsFailed,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Configuration => write!(f, "configuration"),
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::TransientBackend => write!(f, "transient_backend"),
            ErrorKind::TerminalBackend => write!(f, "terminal_backend"),
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Cancelled => write!(f, "cancelled"),
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::AllVariationsFailed => write!(f, "all_variations_failed"),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    /// Missing or rejected backend credentials
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// 5xx-class failures, rate limits, network timeouts
    #[error("Transient backend error{}: {message}", fmt_status(.status))]
    TransientBackend { status: Option<u16>, message: String },

    /// 4xx-class failures or an explicit backend refusal
    #[error("Backend error{}: {message}", fmt_status(.status))]
    TerminalBackend { status: Option<u16>, message: String },

    /// The job may still finish server-side
    #[error("Job {job_id} timed out after {polls} poll attempts")]
    Timeout { job_id: String, polls: u32 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    #[error("all {requested} variations failed: {}", summarize(.causes))]
    AllVariationsFailed {
        requested: u32,
        causes: Vec<VariationError>,
    },
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

fn summarize(causes: &[VariationError]) -> String {
    causes
        .iter()
        .map(|c| format!("#{} {}", c.variation_index, c.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl GenerationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerationError::Configuration(_) => ErrorKind::Configuration,
            GenerationError::Validation(_) => ErrorKind::Validation,
            GenerationError::TransientBackend { .. } => ErrorKind::TransientBackend,
            GenerationError::TerminalBackend { .. } => ErrorKind::TerminalBackend,
            GenerationError::Timeout { .. } => ErrorKind::Timeout,
            GenerationError::Cancelled => ErrorKind::Cancelled,
            GenerationError::JobNotFound(_) => ErrorKind::NotFound,
            GenerationError::AllVariationsFailed { .. } => ErrorKind::AllVariationsFailed,
        }
    }

    /// Only transient errors are eligible for retry
    pub fn is_transient(&self) -> bool {
        matches!(self, GenerationError::TransientBackend { .. })
    }

    pub fn transient(message: impl Into<String>) -> Self {
        GenerationError::TransientBackend { status: None, message: message.into() }
    }

    pub fn terminal(message: impl Into<String>) -> Self {
        GenerationError::TerminalBackend { status: None, message: message.into() }
    }

    fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Configuration => "BACKEND_NOT_CONFIGURED",
            ErrorKind::Validation => "INVALID_REQUEST",
            ErrorKind::TransientBackend => "BACKEND_UNAVAILABLE",
            ErrorKind::TerminalBackend => "BACKEND_REJECTED",
            ErrorKind::Timeout => "JOB_TIMED_OUT",
            ErrorKind::Cancelled => "CANCELLED",
            ErrorKind::NotFound => "JOB_NOT_FOUND",
            ErrorKind::AllVariationsFailed => "GENERATION_FAILED",
        }
    }
}

impl From<ProviderError> for GenerationError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Http(e) => {
                let status = e.status().map(|s| s.as_u16());
                match status {
                    Some(s) if (400..500).contains(&s) && s != 408 && s != 429 => {
                        GenerationError::TerminalBackend { status, message: e.to_string() }
                    }
                    _ => GenerationError::TransientBackend { status, message: e.to_string() },
                }
            }
            ProviderError::Timeout(message) => {
                GenerationError::TransientBackend { status: None, message }
            }
            ProviderError::RateLimited { retry_after_secs } => GenerationError::TransientBackend {
                status: Some(429),
                message: format!("rate limited, retry after {}s", retry_after_secs),
            },
            ProviderError::ApiError { status, message } => match status {
                401 | 403 => GenerationError::Configuration(format!(
                    "backend rejected credentials (HTTP {}): {}",
                    status, message
                )),
                408 | 429 => GenerationError::TransientBackend { status: Some(status), message },
                s if s >= 500 => GenerationError::TransientBackend { status: Some(s), message },
                s => GenerationError::TerminalBackend { status: Some(s), message },
            },
            ProviderError::AuthFailed(message) | ProviderError::NotConfigured(message) => {
                GenerationError::Configuration(message)
            }
            ProviderError::ParseError(message) => GenerationError::terminal(message),
            ProviderError::NotFound(what) => GenerationError::TerminalBackend {
                status: Some(404),
                message: format!("not found: {}", what),
            },
            ProviderError::Internal(message) => GenerationError::terminal(message),
        }
    }
}

/// Error response body
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ApiError,
}

#[derive(Serialize, ToSchema)]
pub struct ApiError {
    pub code: String,
    pub kind: ErrorKind,
    pub message: String,
    /// Per-variation causes for aggregate failures
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<VariationError>,
}

impl ResponseError for GenerationError {
    fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Configuration => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::Cancelled => StatusCode::CONFLICT,
            ErrorKind::TransientBackend
            | ErrorKind::TerminalBackend
            | ErrorKind::AllVariationsFailed => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let causes = match self {
            GenerationError::AllVariationsFailed { causes, .. } => causes.clone(),
            _ => Vec::new(),
        };
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            success: false,
            error: ApiError {
                code: self.code().to_string(),
                kind: self.kind(),
                message: self.to_string(),
                causes,
            },
        })
    }
}
