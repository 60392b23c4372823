pub mod arabic;
pub mod db;
pub mod docx;
pub mod export_store;
pub mod gemini;
pub mod openai_text;
pub mod pdf;

pub use db::DbAdapter;
pub use docx::DocxRenderer;
pub use export_store::FsExportStore;
pub use gemini::GeminiTextAdapter;
pub use openai_text::OpenAiTextAdapter;
pub use pdf::{ArabicFonts, PdfRenderer};

/// Reported by text-generation adapters started without credentials.
pub const API_KEY_MISSING: &str = "API key not configured";
