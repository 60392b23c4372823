//! services/api/src/adapters/docx.rs
//!
//! DOCX export built with `docx-rs`.

use std::io::Cursor;

use docx_rs::{AlignmentType, BreakType, Docx, Paragraph, Run, Style, StyleType};
use research_core::assembly::{AssembledDocument, AssembledSection};
use research_core::export::block_text;
use research_core::markdown::Block;
use research_core::ports::{DocumentRenderer, ExportFormat, PortError, PortResult};
use tracing::info;

/// First page number shown in the generated table of contents. Word processors
/// recompute real numbers; these only fix the order.
const FIRST_TOC_PAGE: usize = 1;

#[derive(Clone, Copy, Default)]
pub struct DocxRenderer;

impl DocumentRenderer for DocxRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Docx
    }

    fn render(&self, document: &AssembledDocument) -> PortResult<Vec<u8>> {
        let docx = DocxBuilder::new(document.language.is_rtl()).build(document);
        let mut buffer = Cursor::new(Vec::new());
        docx.build()
            .pack(&mut buffer)
            .map_err(|e| PortError::Unexpected(format!("DOCX rendering failed: {}", e)))?;
        let bytes = buffer.into_inner();
        info!(project_id = %document.project_id, bytes = bytes.len(), "DOCX rendered");
        Ok(bytes)
    }
}

struct DocxBuilder {
    paragraphs: Vec<Paragraph>,
    rtl: bool,
}

impl DocxBuilder {
    fn new(rtl: bool) -> Self {
        Self {
            paragraphs: Vec::new(),
            rtl,
        }
    }

    fn styled_docx() -> Docx {
        Docx::new()
            .add_style(Style::new("Title", StyleType::Paragraph).name("Title").size(48).bold())
            .add_style(
                Style::new("Heading1", StyleType::Paragraph)
                    .name("Heading 1")
                    .size(32)
                    .bold(),
            )
            .add_style(
                Style::new("Heading2", StyleType::Paragraph)
                    .name("Heading 2")
                    .size(26)
                    .bold(),
            )
    }

    fn aligned(&self, paragraph: Paragraph) -> Paragraph {
        if self.rtl {
            paragraph.align(AlignmentType::Right)
        } else {
            paragraph
        }
    }

    fn push(&mut self, paragraph: Paragraph) {
        let paragraph = self.aligned(paragraph);
        self.paragraphs.push(paragraph);
    }

    fn text(&mut self, text: &str, style: Option<&str>) {
        let mut paragraph = Paragraph::new().add_run(Run::new().add_text(text));
        if let Some(style) = style {
            paragraph = paragraph.style(style);
        }
        self.push(paragraph);
    }

    fn page_break(&mut self) {
        self.push(Paragraph::new().add_run(Run::new().add_break(BreakType::Page)));
    }

    fn build(mut self, document: &AssembledDocument) -> Docx {
        let labels = document.language.labels();

        self.text(&document.title, Some("Title"));

        let thesis = document.thesis_statement.trim();
        let questions: Vec<&str> = document
            .research_questions
            .iter()
            .map(|q| q.trim())
            .filter(|q| !q.is_empty())
            .collect();

        // Table of contents with static numbers, one page per entry.
        self.text(labels.table_of_contents, Some("Heading1"));
        let mut entries = Vec::new();
        if !thesis.is_empty() {
            entries.push(labels.thesis_statement.to_string());
        }
        if !questions.is_empty() {
            entries.push(labels.research_questions.to_string());
        }
        entries.extend(document.sections.iter().map(|section| section.title.clone()));
        entries.push(labels.references.to_string());
        for (i, title) in entries.iter().enumerate() {
            self.text(&format!("{} ..... {}", title, FIRST_TOC_PAGE + i), None);
        }
        self.page_break();

        if !thesis.is_empty() {
            self.text(labels.thesis_statement, Some("Heading1"));
            self.text(thesis, None);
            self.page_break();
        }

        if !questions.is_empty() {
            self.text(labels.research_questions, Some("Heading1"));
            for (i, question) in questions.iter().enumerate() {
                self.text(&format!("{}. {}", i + 1, question), None);
            }
            self.page_break();
        }

        for section in &document.sections {
            self.section(section);
            self.page_break();
        }

        self.text(labels.references, Some("Heading1"));
        for citation in &document.references {
            let text = if citation.text.is_empty() { &citation.id } else { &citation.text };
            self.text(text, None);
        }
        self.paragraphs
            .into_iter()
            .fold(Self::styled_docx(), |docx, paragraph| docx.add_paragraph(paragraph))
    }

    fn section(&mut self, section: &AssembledSection) {
        self.text(&section.title, Some("Heading1"));
        if section.is_placeholder {
            self.push(Paragraph::new().add_run(Run::new().add_text(&section.body).italic()));
            return;
        }
        for block in &section.blocks {
            match block {
                Block::Heading { .. } => self.text(&block_text(block), Some("Heading2")),
                Block::Code(code) => {
                    for line in code.lines() {
                        self.text(line, None);
                    }
                }
                Block::Rule => {}
                Block::Paragraph(_) | Block::ListItem { .. } => self.text(&block_text(block), None),
            }
        }
    }
}
