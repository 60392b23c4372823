//! crates/research_core/src/error.rs
//!
//! Error types returned by the generators and the workflow services.

use crate::domain::UnsupportedLanguage;
use crate::ports::PortError;

/// Failure of an outline or content generation request.
///
/// Malformed model output is never an error; it is absorbed by the extractor.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),
    #[error("Section '{0}' not found in outline")]
    SectionNotFound(String),
    #[error("Text generation failed: {0}")]
    Collaborator(String),
}

impl From<UnsupportedLanguage> for GenerationError {
    fn from(err: UnsupportedLanguage) -> Self {
        GenerationError::UnsupportedLanguage(err.0)
    }
}

/// Errors surfaced by the project/outline/content workflow.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Port(PortError),
}

impl From<PortError> for ServiceError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(what) => ServiceError::NotFound(what),
            other => ServiceError::Port(other),
        }
    }
}

/// Errors surfaced by the export workflow.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Rendering failed: {0}")]
    Render(String),
    #[error("Export store error: {0}")]
    Store(String),
}

impl From<PortError> for ExportError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(what) => ExportError::NotFound(what),
            other => ExportError::Store(other.to_string()),
        }
    }
}
