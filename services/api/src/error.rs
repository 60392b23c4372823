//! services/api/src/error.rs
//!
//! Defines the startup error type for the API service and the mapping of
//! workflow errors onto HTTP responses.

use axum::http::StatusCode;
use research_core::ports::PortError;
use research_core::{ExportError, GenerationError, ServiceError};

use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The `(status, message)` pair handlers return on failure.
pub type HttpError = (StatusCode, String);

fn generation_status(err: &GenerationError) -> StatusCode {
    match err {
        GenerationError::UnsupportedLanguage(_) => StatusCode::BAD_REQUEST,
        GenerationError::SectionNotFound(_) => StatusCode::NOT_FOUND,
        GenerationError::Collaborator(_) => StatusCode::BAD_GATEWAY,
    }
}

fn port_status(err: &PortError) -> StatusCode {
    match err {
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::Unauthorized => StatusCode::UNAUTHORIZED,
        PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn service_error(err: ServiceError) -> HttpError {
    let status = match &err {
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        ServiceError::Generation(e) => generation_status(e),
        ServiceError::Port(e) => port_status(e),
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "Request failed");
    }
    (status, err.to_string())
}

pub fn export_error(err: ExportError) -> HttpError {
    let status = match &err {
        ExportError::NotFound(_) => StatusCode::NOT_FOUND,
        ExportError::Render(_) | ExportError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "Export failed");
    }
    (status, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_errors_map_to_statuses() {
        assert_eq!(service_error(ServiceError::NotFound("Project".into())).0, StatusCode::NOT_FOUND);
        assert_eq!(
            service_error(ServiceError::InvalidRequest("x".into())).0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            service_error(GenerationError::Collaborator("quota".into()).into()).0,
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            export_error(ExportError::Render("font".into())).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
