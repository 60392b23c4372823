//! crates/research_core/src/domain.rs
//!
//! Defines the pure, core data structures for the research writer.
//! These structs are independent of any database or HTTP representation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::outline::{OutlineStructure, PageRange};

/// Number of words a single generated page is expected to hold.
pub const WORDS_PER_PAGE: u32 = 250;

/// Largest paper an outline may be requested for.
pub const MAX_TOTAL_PAGES: u32 = 500;

//=========================================================================================
// Language and Complexity
//=========================================================================================

/// The document languages the writer can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Ar,
}

/// Returned when a language code is not one of the supported ones.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported language: {0}")]
pub struct UnsupportedLanguage(pub String);

/// Fixed, translated strings used by prompts and renderers.
#[derive(Debug)]
pub struct Labels {
    pub table_of_contents: &'static str,
    pub title_page: &'static str,
    pub thesis_statement: &'static str,
    pub research_questions: &'static str,
    pub references: &'static str,
    pub introduction: &'static str,
    pub conclusion: &'static str,
    pub not_generated: &'static str,
}

static ENGLISH_LABELS: Labels = Labels {
    table_of_contents: "Table of Contents",
    title_page: "Title Page",
    thesis_statement: "Thesis Statement",
    research_questions: "Research Questions",
    references: "References",
    introduction: "Introduction",
    conclusion: "Conclusion",
    not_generated: "Content for this section has not been generated yet.",
};

static ARABIC_LABELS: Labels = Labels {
    table_of_contents: "فهرس المحتويات",
    title_page: "صفحة العنوان",
    thesis_statement: "بيان الأطروحة",
    research_questions: "أسئلة البحث",
    references: "المراجع",
    introduction: "المقدمة",
    conclusion: "الخاتمة",
    not_generated: "لم يتم إنشاء محتوى لهذا القسم بعد.",
};

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ar => "ar",
        }
    }

    pub fn is_rtl(&self) -> bool {
        matches!(self, Language::Ar)
    }

    pub fn labels(&self) -> &'static Labels {
        match self {
            Language::En => &ENGLISH_LABELS,
            Language::Ar => &ARABIC_LABELS,
        }
    }
}

impl FromStr for Language {
    type Err = UnsupportedLanguage;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "ar" => Ok(Language::Ar),
            _ => Err(UnsupportedLanguage(code.to_string())),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// How deep the requested outline should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Basic,
    #[default]
    Medium,
    Advanced,
}

impl Complexity {
    /// Parses a tier name; anything unrecognised is treated as `Medium`.
    pub fn from_tier(tier: &str) -> Self {
        match tier.trim().to_ascii_lowercase().as_str() {
            "basic" => Complexity::Basic,
            "advanced" => Complexity::Advanced,
            _ => Complexity::Medium,
        }
    }
}

//=========================================================================================
// Entities
//=========================================================================================

/// Represents a user account. Credentials are managed outside this crate.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// A research project owned by a user.
#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub language: Language,
    pub citation_style: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The fields a caller provides when creating a project.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub language: Language,
    #[serde(default = "default_citation_style")]
    pub citation_style: String,
}

fn default_citation_style() -> String {
    "APA".to_string()
}

/// A generated document plan attached to a project.
#[derive(Debug, Clone, Serialize)]
pub struct Outline {
    pub id: Uuid,
    pub project_id: Uuid,
    pub structure: OutlineStructure,
    pub is_approved: bool,
    pub total_pages: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Generated prose for one section of an outline.
#[derive(Debug, Clone, Serialize)]
pub struct ContentSection {
    pub id: Uuid,
    pub project_id: Uuid,
    pub outline_id: Uuid,
    pub section_title: String,
    pub content: String,
    pub citations: Vec<Citation>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The natural key and payload of a content upsert.
#[derive(Debug, Clone)]
pub struct ContentUpsert {
    pub project_id: Uuid,
    pub outline_id: Uuid,
    pub section_title: String,
    pub content: String,
    pub citations: Vec<Citation>,
}

//=========================================================================================
// Citations
//=========================================================================================

/// A reference entry. The id is assigned by the model and used for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Citation {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub source_type: String,
}

impl Citation {
    /// Identity used when merging citation lists.
    pub fn dedup_key(&self) -> &str {
        if self.id.trim().is_empty() {
            self.text.trim()
        } else {
            self.id.trim()
        }
    }

    /// Reads a citation out of loosely typed model output.
    /// Bare strings become the citation text; objects may carry numeric ids.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) if !text.trim().is_empty() => Some(Citation {
                id: String::new(),
                text: text.trim().to_string(),
                source_type: String::new(),
            }),
            Value::Object(map) => {
                let field = |key: &str| match map.get(key) {
                    Some(Value::String(s)) => s.trim().to_string(),
                    Some(Value::Number(n)) => n.to_string(),
                    _ => String::new(),
                };
                let citation = Citation {
                    id: field("id"),
                    text: field("text"),
                    source_type: field("source_type"),
                };
                if citation.id.is_empty() && citation.text.is_empty() {
                    None
                } else {
                    Some(citation)
                }
            }
            _ => None,
        }
    }
}

/// Appends `incoming` to `merged`, skipping entries whose key was already seen.
/// First-seen order is preserved.
pub fn merge_citations<I>(merged: &mut Vec<Citation>, incoming: I)
where
    I: IntoIterator<Item = Citation>,
{
    for citation in incoming {
        let key = citation.dedup_key().to_string();
        if merged.iter().any(|existing| existing.dedup_key() == key) {
            continue;
        }
        merged.push(citation);
    }
}

/// The typed result of generating one section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentRecord {
    pub section_title: String,
    pub content: String,
    pub citations: Vec<Citation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_range: Option<PageRange>,
}
