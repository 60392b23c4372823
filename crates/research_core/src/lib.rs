pub mod assembly;
pub mod content_generator;
pub mod domain;
pub mod error;
pub mod export;
pub mod extractor;
pub mod markdown;
pub mod outline;
pub mod outline_generator;
pub mod pagination;
pub mod ports;
pub mod prompts;
pub mod repair;
pub mod service;
pub mod testing;

pub use assembly::{AssembledDocument, AssembledSection};
pub use content_generator::{ContentGenerator, ContentRequest};
pub use domain::{
    Citation, Complexity, ContentRecord, ContentSection, ContentUpsert, Language, NewProject,
    Outline, Project, User,
};
pub use error::{ExportError, GenerationError, ServiceError};
pub use export::{ExportService, ExportedFile, MarkdownRenderer};
pub use outline::{OutlineStructure, PageRange, Section, Subsection};
pub use outline_generator::{OutlineGenerator, OutlineRequest};
pub use ports::{
    DatabaseService, DocumentRenderer, ExportFormat, ExportStore, GenerationOptions, PortError,
    PortResult, SafetySettings, StoredExport, TextGenerationService,
};
pub use service::ResearchService;
