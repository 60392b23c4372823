//! crates/research_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases, model
//! providers or the filesystem.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::assembly::AssembledDocument;
use crate::domain::{ContentSection, ContentUpsert, NewProject, Outline, Project, User};
use crate::outline::OutlineStructure;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Text Generation
//=========================================================================================

/// Sampling parameters passed through to the model provider.
/// `None` leaves the provider default in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOptions {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    pub max_output_tokens: Option<u32>,
}

impl GenerationOptions {
    /// The settings used for section prose.
    pub fn for_content() -> Self {
        Self {
            temperature: Some(0.7),
            top_p: Some(0.8),
            top_k: Some(40),
            max_output_tokens: Some(2048),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarmCategory {
    Harassment,
    HateSpeech,
    SexuallyExplicit,
    DangerousContent,
}

impl HarmCategory {
    pub const ALL: [HarmCategory; 4] = [
        HarmCategory::Harassment,
        HarmCategory::HateSpeech,
        HarmCategory::SexuallyExplicit,
        HarmCategory::DangerousContent,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockThreshold {
    BlockNone,
    BlockOnlyHigh,
    BlockMediumAndAbove,
    BlockLowAndAbove,
}

/// Content filters requested from the provider. Empty means provider defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SafetySettings {
    pub rules: Vec<(HarmCategory, BlockThreshold)>,
}

impl SafetySettings {
    pub fn block_medium_and_above() -> Self {
        Self {
            rules: HarmCategory::ALL
                .iter()
                .map(|category| (*category, BlockThreshold::BlockMediumAndAbove))
                .collect(),
        }
    }
}

#[async_trait]
pub trait TextGenerationService: Send + Sync {
    /// Sends a prompt to the model and returns its free-text reply.
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
        safety: &SafetySettings,
    ) -> PortResult<String>;
}

//=========================================================================================
// Persistence
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Auth ---
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn get_user(&self, user_id: Uuid) -> PortResult<User>;

    // --- Projects ---
    async fn create_project(&self, user_id: Uuid, project: &NewProject) -> PortResult<Project>;

    async fn get_project(&self, project_id: Uuid) -> PortResult<Project>;

    async fn list_projects_for_user(&self, user_id: Uuid) -> PortResult<Vec<Project>>;

    /// Deletes a project together with its outlines and content sections.
    async fn delete_project(&self, project_id: Uuid) -> PortResult<()>;

    // --- Outlines ---
    async fn create_outline(
        &self,
        project_id: Uuid,
        structure: &OutlineStructure,
        total_pages: u32,
    ) -> PortResult<Outline>;

    async fn get_outline(&self, outline_id: Uuid) -> PortResult<Outline>;

    /// Most recently created outline, approved or not.
    async fn latest_outline(&self, project_id: Uuid) -> PortResult<Option<Outline>>;

    async fn latest_approved_outline(&self, project_id: Uuid) -> PortResult<Option<Outline>>;

    async fn approve_outline(&self, outline_id: Uuid) -> PortResult<Outline>;

    async fn update_outline_structure(
        &self,
        outline_id: Uuid,
        structure: &OutlineStructure,
    ) -> PortResult<Outline>;

    // --- Content ---
    /// Creates the row for (project, outline, section title) or updates it in
    /// place, incrementing its version.
    async fn upsert_content_section(&self, upsert: &ContentUpsert) -> PortResult<ContentSection>;

    async fn list_content_sections(
        &self,
        project_id: Uuid,
        outline_id: Uuid,
    ) -> PortResult<Vec<ContentSection>>;

    async fn get_content_section(&self, content_id: Uuid) -> PortResult<ContentSection>;
}

//=========================================================================================
// Export Artifacts
//=========================================================================================

/// A file previously written to the export store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredExport {
    pub filename: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

#[async_trait]
pub trait ExportStore: Send + Sync {
    async fn write(&self, filename: &str, data: &[u8]) -> PortResult<StoredExport>;

    async fn list_by_prefix(&self, prefix: &str) -> PortResult<Vec<StoredExport>>;

    async fn read(&self, filename: &str) -> PortResult<Bytes>;
}

/// The output formats a document can be exported to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Docx,
    Markdown,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Docx => "docx",
            ExportFormat::Markdown => "md",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            ExportFormat::Markdown => "text/markdown; charset=utf-8",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "pdf" => Some(ExportFormat::Pdf),
            "docx" => Some(ExportFormat::Docx),
            "markdown" | "md" => Some(ExportFormat::Markdown),
            _ => None,
        }
    }

    /// Resolves the format of a stored file from its extension.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, extension) = filename.rsplit_once('.')?;
        Self::parse(extension)
    }
}

pub trait DocumentRenderer: Send + Sync {
    fn format(&self) -> ExportFormat;

    fn render(&self, document: &AssembledDocument) -> PortResult<Vec<u8>>;
}
