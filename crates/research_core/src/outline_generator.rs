//! crates/research_core/src/outline_generator.rs
//!
//! Turns a topic into an outline with one call to the text-generation service.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{error, info, warn};

use crate::domain::{Complexity, Language};
use crate::error::GenerationError;
use crate::extractor::{self, ResponseSchema};
use crate::outline::OutlineStructure;
use crate::ports::{GenerationOptions, SafetySettings, TextGenerationService};
use crate::prompts;

#[derive(Debug, Clone)]
pub struct OutlineRequest<'a> {
    pub topic: &'a str,
    pub complexity: Complexity,
    /// Language code, `en` or `ar`.
    pub language: &'a str,
    pub total_pages: u32,
}

pub struct OutlineGenerator {
    generator: Arc<dyn TextGenerationService>,
    options: GenerationOptions,
    safety: SafetySettings,
}

impl OutlineGenerator {
    pub fn new(generator: Arc<dyn TextGenerationService>) -> Self {
        Self {
            generator,
            options: GenerationOptions::default(),
            safety: SafetySettings::default(),
        }
    }

    pub async fn generate(
        &self,
        request: &OutlineRequest<'_>,
    ) -> Result<OutlineStructure, GenerationError> {
        let language: Language = request.language.parse()?;
        let prompt = prompts::outline_prompt(
            request.topic,
            request.complexity,
            language,
            request.total_pages,
        );

        info!(topic = request.topic, %language, total_pages = request.total_pages, "Generating outline");
        let raw = self
            .generator
            .generate(&prompt, &self.options, &self.safety)
            .await
            .map_err(|e| {
                error!(error = %e, "Outline generation call failed");
                GenerationError::Collaborator(e.to_string())
            })?;

        Ok(build_outline(&raw, request.topic, request.total_pages))
    }
}

/// Builds a usable outline from a raw model response. Never fails.
pub fn build_outline(raw: &str, topic: &str, total_pages: u32) -> OutlineStructure {
    let extraction = extractor::extract(raw, ResponseSchema::Outline { topic });
    if extraction.parse_failed() {
        warn!(topic, "Outline response could not be parsed; using placeholder outline");
    }

    let mut record = extraction.record;
    fill_missing_keys(&mut record, topic);

    let mut structure = OutlineStructure::from_value(&Value::Object(record));
    if structure.title.trim().is_empty() {
        structure.title = topic.to_string();
    }
    if structure.sections.is_empty() {
        structure.sections = OutlineStructure::from_value(&json!({
            "sections": [placeholder_section()]
        }))
        .sections;
    }

    structure.total_pages = Some(total_pages);
    structure.coerce_page_counts();
    structure.balance_pages(total_pages);
    if !structure.has_valid_page_ranges() {
        structure.recalculate_page_ranges(1);
    }
    structure
}

fn placeholder_section() -> Value {
    json!({
        "title": "Introduction",
        "pages": 1,
        "subsections": [{
            "title": "Background",
            "pages": 1,
            "key_points": ["Generated key point placeholder"],
        }],
    })
}

fn fill_missing_keys(record: &mut Map<String, Value>, topic: &str) {
    let placeholders = [
        ("title", json!(topic)),
        ("thesis_statement", json!("Generated thesis statement placeholder")),
        ("research_questions", json!(["Generated research question placeholder"])),
        ("sections", json!([placeholder_section()])),
    ];
    for (key, placeholder) in placeholders {
        let missing = match record.get(key) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(Value::Array(items)) => items.is_empty(),
            Some(_) => false,
        };
        if missing {
            record.insert(key.to_string(), placeholder);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_outline_gets_placeholders() {
        let outline = build_outline(r#"{"title": "Rivers"}"#, "Water", 5);
        assert_eq!(outline.title, "Rivers");
        assert_eq!(outline.thesis_statement, "Generated thesis statement placeholder");
        assert_eq!(outline.research_questions.len(), 1);
        assert_eq!(outline.sections[0].title, "Introduction");
        assert!(outline.has_valid_page_ranges());
    }

    #[test]
    fn model_ranges_are_kept_when_valid() {
        let raw = r#"{"title": "T", "thesis_statement": "S", "research_questions": ["Q"],
            "sections": [
                {"title": "A", "pages": 2, "page_range": {"start": 3, "end": 4}},
                {"title": "B", "pages": 3, "page_range": {"start": 5, "end": 7}}
            ]}"#;
        let outline = build_outline(raw, "T", 5);
        assert_eq!(outline.sections[0].page_range.map(|r| r.start), Some(3));
        assert_eq!(outline.total_pages, Some(5));
    }
}
