//! crates/research_core/src/content_generator.rs
//!
//! Generates the prose for one outline section, either in a single call or one
//! page at a time with continuation context.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::domain::{merge_citations, ContentRecord, Language, Project, WORDS_PER_PAGE};
use crate::error::GenerationError;
use crate::extractor::{self, ResponseSchema};
use crate::outline::{OutlineStructure, PageRange, Section};
use crate::ports::{GenerationOptions, SafetySettings, TextGenerationService};
use crate::prompts::{self, PagePosition, SectionBrief};

pub const DEFAULT_BATCH_PAUSE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ContentRequest<'a> {
    pub section_title: &'a str,
    pub subsection_titles: &'a [String],
    pub citation_style: &'a str,
    /// Language code, `en` or `ar`.
    pub language: &'a str,
    pub page_by_page: bool,
}

pub struct ContentGenerator {
    generator: Arc<dyn TextGenerationService>,
    options: GenerationOptions,
    safety: SafetySettings,
    batch_pause: Duration,
}

/// Pages per pacing batch for a section spanning `pages` pages.
pub fn batch_size(pages: u32) -> u32 {
    if pages > 5 {
        2
    } else {
        3
    }
}

/// The marker written in place of a page whose generation failed.
pub fn page_failure_marker(page: u32, reason: &str) -> String {
    format!("\n\n[Content generation for page {page} failed: {reason}]\n\n")
}

/// Finds `title` in the outline, falling back to a one-page section for the
/// language's introduction and conclusion.
pub fn resolve_section<'o>(
    outline: &'o OutlineStructure,
    title: &str,
    language: Language,
) -> Option<Cow<'o, Section>> {
    if let Some(section) = outline.find_section(title) {
        return Some(Cow::Borrowed(section));
    }
    let labels = language.labels();
    let title = title.trim();
    (title == labels.introduction || title == labels.conclusion)
        .then(|| Cow::Owned(Section::single_page(title)))
}

fn section_range(section: &Section) -> PageRange {
    match section.page_range {
        Some(range) if range.start >= 1 && !range.is_empty() => range,
        _ => {
            let pages = section.pages.round();
            let end = if pages.is_finite() && pages >= 1.0 { pages as u32 } else { 1 };
            PageRange { start: 1, end }
        }
    }
}

impl ContentGenerator {
    pub fn new(generator: Arc<dyn TextGenerationService>) -> Self {
        Self {
            generator,
            options: GenerationOptions::for_content(),
            safety: SafetySettings::block_medium_and_above(),
            batch_pause: DEFAULT_BATCH_PAUSE,
        }
    }

    /// Sets the pause inserted between page batches.
    pub fn with_batch_pause(mut self, pause: Duration) -> Self {
        self.batch_pause = pause;
        self
    }

    pub async fn generate(
        &self,
        project: &Project,
        outline: &OutlineStructure,
        request: &ContentRequest<'_>,
    ) -> Result<ContentRecord, GenerationError> {
        let language: Language = request.language.parse()?;
        let section = resolve_section(outline, request.section_title, language)
            .ok_or_else(|| GenerationError::SectionNotFound(request.section_title.to_string()))?;

        let brief = SectionBrief {
            paper_title: &project.title,
            thesis: &outline.thesis_statement,
            section_title: &section.title,
            subsections: &section.subsections,
            focus: request.subsection_titles,
            citation_style: request.citation_style,
            language,
        };
        let range = section_range(&section);

        let mut record = if request.page_by_page {
            self.generate_by_page(&brief, range).await
        } else {
            let target_words = (section.pages.max(0.0) * f64::from(WORDS_PER_PAGE)).round() as u32;
            let mut record = self.generate_whole(&brief, target_words).await?;
            record.page_range = Some(range);
            record
        };
        // Stored rows are keyed by the outline's own title.
        record.section_title = section.title.clone();
        Ok(record)
    }

    async fn call(&self, prompt: &str, section_title: &str) -> Result<ContentRecord, GenerationError> {
        let raw = self
            .generator
            .generate(prompt, &self.options, &self.safety)
            .await
            .map_err(|e| GenerationError::Collaborator(e.to_string()))?;
        let extraction = extractor::extract(&raw, ResponseSchema::Content { section_title });
        if extraction.parse_failed() {
            warn!(section = section_title, "Model response was not structured; keeping raw text");
        }
        Ok(extraction.into_content_record())
    }

    async fn generate_whole(
        &self,
        brief: &SectionBrief<'_>,
        target_words: u32,
    ) -> Result<ContentRecord, GenerationError> {
        info!(section = brief.section_title, target_words, "Generating section in a single call");
        let prompt = prompts::section_prompt(brief, target_words);
        let mut record = self.call(&prompt, brief.section_title).await.map_err(|e| {
            error!(section = brief.section_title, error = %e, "Section generation failed");
            e
        })?;
        record.section_title = brief.section_title.to_string();
        Ok(record)
    }

    async fn generate_by_page(&self, brief: &SectionBrief<'_>, range: PageRange) -> ContentRecord {
        let total = range.len();
        let batch = batch_size(total);
        let mut content = String::new();
        let mut citations = Vec::new();

        info!(section = brief.section_title, pages = total, batch, "Generating section page by page");

        let mut batch_start = range.start;
        while batch_start <= range.end {
            let batch_end = (batch_start + batch - 1).min(range.end);
            info!(batch_start, batch_end, "Generating page batch");

            for page in batch_start..=batch_end {
                let position = PagePosition {
                    page_in_section: page - range.start + 1,
                    pages_in_section: total,
                    document_page: page,
                };
                let prompt = prompts::page_prompt(brief, position, WORDS_PER_PAGE, &content);
                let started = Instant::now();

                match self.call(&prompt, brief.section_title).await {
                    Ok(record) => {
                        info!(page, elapsed_ms = started.elapsed().as_millis() as u64, "Page generated");
                        if page > range.start {
                            content.push_str("\n\n");
                        }
                        content.push_str(&record.content);
                        merge_citations(&mut citations, record.citations);
                    }
                    Err(e) => {
                        warn!(page, error = %e, "Page generation failed; continuing with next page");
                        content.push_str(&page_failure_marker(page, &e.to_string()));
                    }
                }
            }

            batch_start = batch_end + 1;
            if batch_start <= range.end && !self.batch_pause.is_zero() {
                tokio::time::sleep(self.batch_pause).await;
            }
        }

        ContentRecord {
            section_title: brief.section_title.to_string(),
            content,
            citations,
            page_range: Some(range),
        }
    }
}
