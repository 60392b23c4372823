//! crates/research_core/src/assembly.rs
//!
//! Gathers a project, its outline and the stored section bodies into the
//! document model every renderer consumes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{merge_citations, Citation, ContentSection, Language, Outline, Project};
use crate::markdown::{parse_blocks, Block};
use crate::pagination::{self, Page, TocEntry, DEFAULT_MAX_WORDS_PER_PAGE};

#[derive(Debug, Clone)]
pub struct AssembledSection {
    pub title: String,
    /// Markdown body, or the localized placeholder when nothing was generated.
    pub body: String,
    pub is_placeholder: bool,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone)]
pub struct AssembledDocument {
    pub project_id: Uuid,
    pub outline_id: Uuid,
    pub title: String,
    pub language: Language,
    pub citation_style: String,
    pub thesis_statement: String,
    pub research_questions: Vec<String>,
    pub sections: Vec<AssembledSection>,
    pub references: Vec<Citation>,
    pub pages: Vec<Page>,
    pub table_of_contents: Vec<TocEntry>,
    pub generated_at: DateTime<Utc>,
}

/// The sections of an outline in document order.
///
/// Stored introduction/conclusion pseudo-sections are placed first and last
/// when the outline does not list them itself.
pub fn document_order(outline: &Outline, language: Language, contents: &[ContentSection]) -> Vec<String> {
    let labels = language.labels();
    let mut order = outline.structure.ordered_section_titles();
    let stored = |title: &str| contents.iter().any(|c| c.section_title == title);

    if stored(labels.introduction) && !order.iter().any(|t| t == labels.introduction) {
        order.insert(0, labels.introduction.to_string());
    }
    if stored(labels.conclusion) && !order.iter().any(|t| t == labels.conclusion) {
        order.push(labels.conclusion.to_string());
    }
    order
}

pub fn assemble(project: &Project, outline: &Outline, contents: &[ContentSection]) -> AssembledDocument {
    let language = project.language;
    let order = document_order(outline, language, contents);
    let by_title: HashMap<String, ContentSection> = contents
        .iter()
        .map(|c| (c.section_title.clone(), c.clone()))
        .collect();

    let sections = order
        .iter()
        .map(|title| {
            let body = by_title
                .get(title)
                .map(|c| c.content.trim())
                .filter(|body| !body.is_empty());
            match body {
                Some(body) => AssembledSection {
                    title: title.clone(),
                    body: body.to_string(),
                    is_placeholder: false,
                    blocks: parse_blocks(body),
                },
                None => {
                    let placeholder = language.labels().not_generated;
                    AssembledSection {
                        title: title.clone(),
                        body: placeholder.to_string(),
                        is_placeholder: true,
                        blocks: vec![Block::Paragraph(placeholder.to_string())],
                    }
                }
            }
        })
        .collect();

    let mut references = Vec::new();
    for title in &order {
        if let Some(content) = by_title.get(title) {
            merge_citations(
                &mut references,
                content.citations.iter().filter(|c| !c.dedup_key().is_empty()).cloned(),
            );
        }
    }

    let pages = pagination::paginate(&by_title, &order, DEFAULT_MAX_WORDS_PER_PAGE);
    let table_of_contents = pagination::table_of_contents(&pages);

    let title = if project.title.trim().is_empty() {
        outline.structure.title.clone()
    } else {
        project.title.clone()
    };

    AssembledDocument {
        project_id: project.id,
        outline_id: outline.id,
        title,
        language,
        citation_style: project.citation_style.clone(),
        thesis_statement: outline.structure.thesis_statement.clone(),
        research_questions: outline.structure.research_questions.clone(),
        sections,
        references,
        pages,
        table_of_contents,
        generated_at: Utc::now(),
    }
}
