//! crates/research_core/src/export.rs
//!
//! Export orchestration: resolves the project and outline, assembles the
//! document, renders it and stores the artifact. Nothing is cached between
//! calls; every export reads the current rows.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::assembly::{assemble, AssembledDocument};
use crate::domain::{Outline, Project};
use crate::error::ExportError;
use crate::markdown::Block;
use crate::ports::{DatabaseService, DocumentRenderer, ExportFormat, ExportStore, PortResult, StoredExport};

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// A freshly written export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportedFile {
    pub filename: String,
    pub format: ExportFormat,
    pub size: u64,
}

/// `{project_id}_{YYYYmmdd_HHMMSS}.{ext}`
pub fn export_filename(project_id: Uuid, format: ExportFormat, at: chrono::DateTime<Utc>) -> String {
    format!("{}_{}.{}", project_id, at.format(TIMESTAMP_FORMAT), format.extension())
}

fn filename_timestamp(filename: &str) -> Option<NaiveDateTime> {
    let (_, rest) = filename.split_once('_')?;
    let (stamp, _) = rest.rsplit_once('.')?;
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()
}

pub struct ExportService {
    db: Arc<dyn DatabaseService>,
    store: Arc<dyn ExportStore>,
    renderers: HashMap<ExportFormat, Arc<dyn DocumentRenderer>>,
}

impl ExportService {
    /// Creates the service with the Markdown renderer registered.
    pub fn new(db: Arc<dyn DatabaseService>, store: Arc<dyn ExportStore>) -> Self {
        let mut renderers: HashMap<ExportFormat, Arc<dyn DocumentRenderer>> = HashMap::new();
        renderers.insert(ExportFormat::Markdown, Arc::new(MarkdownRenderer));
        Self { db, store, renderers }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn DocumentRenderer>) -> Self {
        self.renderers.insert(renderer.format(), renderer);
        self
    }

    async fn owned_project(&self, owner: Uuid, project_id: Uuid) -> Result<Project, ExportError> {
        let project = self.db.get_project(project_id).await?;
        if project.user_id != owner {
            return Err(ExportError::NotFound("Project".into()));
        }
        Ok(project)
    }

    async fn resolve_outline(
        &self,
        project: &Project,
        outline_id: Option<Uuid>,
    ) -> Result<Outline, ExportError> {
        match outline_id {
            Some(id) => {
                let outline = self.db.get_outline(id).await?;
                if outline.project_id != project.id {
                    return Err(ExportError::NotFound("Outline".into()));
                }
                Ok(outline)
            }
            None => self
                .db
                .latest_approved_outline(project.id)
                .await?
                .ok_or_else(|| ExportError::NotFound("Approved outline".into())),
        }
    }

    /// Builds the document for a project; `outline_id` defaults to the latest
    /// approved outline.
    pub async fn assemble(
        &self,
        owner: Uuid,
        project_id: Uuid,
        outline_id: Option<Uuid>,
    ) -> Result<AssembledDocument, ExportError> {
        let project = self.owned_project(owner, project_id).await?;
        let outline = self.resolve_outline(&project, outline_id).await?;
        let contents = self.db.list_content_sections(project.id, outline.id).await?;
        Ok(assemble(&project, &outline, &contents))
    }

    pub async fn export(
        &self,
        owner: Uuid,
        project_id: Uuid,
        outline_id: Option<Uuid>,
        format: ExportFormat,
    ) -> Result<ExportedFile, ExportError> {
        let renderer = self
            .renderers
            .get(&format)
            .cloned()
            .ok_or_else(|| ExportError::Render(format!("No renderer for {:?}", format)))?;

        let document = self.assemble(owner, project_id, outline_id).await?;
        info!(%project_id, ?format, sections = document.sections.len(), "Rendering export");

        let rendered = tokio::task::spawn_blocking(move || renderer.render(&document))
            .await
            .map_err(|e| ExportError::Render(e.to_string()))?
            .map_err(|e| {
                error!(%project_id, ?format, error = %e, "Rendering failed");
                ExportError::Render(e.to_string())
            })?;

        let filename = export_filename(project_id, format, Utc::now());
        let stored = self.store.write(&filename, &rendered).await?;
        info!(filename = %stored.filename, size = stored.size, "Export written");

        Ok(ExportedFile {
            filename: stored.filename,
            format,
            size: stored.size,
        })
    }

    /// Lists a project's stored exports, newest first.
    pub async fn previous_exports(
        &self,
        owner: Uuid,
        project_id: Uuid,
    ) -> Result<Vec<StoredExport>, ExportError> {
        let project = self.owned_project(owner, project_id).await?;
        let mut exports = self.store.list_by_prefix(&format!("{}_", project.id)).await?;
        exports.sort_by(|a, b| {
            let key = |e: &StoredExport| {
                filename_timestamp(&e.filename)
                    .map(|t| t.and_utc())
                    .unwrap_or(e.modified)
            };
            key(b).cmp(&key(a))
        });
        Ok(exports)
    }

    /// Reads back an export that belongs to one of `owner`'s projects.
    pub async fn download(
        &self,
        owner: Uuid,
        filename: &str,
    ) -> Result<(ExportFormat, Bytes), ExportError> {
        let not_found = || ExportError::NotFound(format!("Export '{}'", filename));
        if filename.contains(['/', '\\']) || filename.contains("..") {
            return Err(not_found());
        }
        let format = ExportFormat::from_filename(filename).ok_or_else(not_found)?;
        let project_id = filename
            .split_once('_')
            .and_then(|(id, _)| Uuid::parse_str(id).ok())
            .ok_or_else(not_found)?;

        self.owned_project(owner, project_id).await?;
        let data = self.store.read(filename).await?;
        Ok((format, data))
    }
}

//=========================================================================================
// Markdown Renderer
//=========================================================================================

/// Plain-text export: headings, the section bodies as written, and a reference list.
pub struct MarkdownRenderer;

impl DocumentRenderer for MarkdownRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Markdown
    }

    fn render(&self, document: &AssembledDocument) -> PortResult<Vec<u8>> {
        Ok(render_markdown(document).into_bytes())
    }
}

pub fn render_markdown(document: &AssembledDocument) -> String {
    let labels = document.language.labels();
    let mut out = format!("# {}\n\n", document.title);

    out.push_str(&format!("## {}\n\n", labels.table_of_contents));
    for entry in &document.table_of_contents {
        out.push_str(&format!("- {} ({})\n", entry.title, entry.page));
    }
    out.push('\n');

    if !document.thesis_statement.trim().is_empty() {
        out.push_str(&format!(
            "## {}\n\n{}\n\n",
            labels.thesis_statement,
            document.thesis_statement.trim()
        ));
    }

    if !document.research_questions.is_empty() {
        out.push_str(&format!("## {}\n\n", labels.research_questions));
        for (i, question) in document.research_questions.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, question));
        }
        out.push('\n');
    }

    for section in &document.sections {
        out.push_str(&format!("## {}\n\n", section.title));
        if section.is_placeholder {
            out.push_str(&format!("_{}_\n\n", section.body));
        } else {
            out.push_str(&demote_headings(&section.body));
            out.push_str("\n\n");
        }
    }

    out.push_str(&format!("## {}\n\n", labels.references));
    for citation in &document.references {
        let text = if citation.text.is_empty() { &citation.id } else { &citation.text };
        out.push_str(&format!("- {}\n", text));
    }
    out
}

/// Pushes body headings below the section heading level.
fn demote_headings(body: &str) -> String {
    body.lines()
        .map(|line| {
            let hashes = line.chars().take_while(|c| *c == '#').count();
            if (1..=4).contains(&hashes) && line[hashes..].starts_with(' ') {
                format!("##{}", line)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Plain text of a block, as renderers lay it out.
pub fn block_text(block: &Block) -> String {
    match block {
        Block::Heading { text, .. } | Block::Paragraph(text) | Block::Code(text) => text.clone(),
        Block::ListItem { number: Some(n), text } => format!("{}. {}", n, text),
        Block::ListItem { number: None, text } => format!("• {}", text),
        Block::Rule => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_carry_project_and_timestamp() {
        let id = Uuid::nil();
        let at = chrono::DateTime::parse_from_rfc3339("2024-03-05T07:08:09Z")
            .unwrap()
            .with_timezone(&Utc);
        let name = export_filename(id, ExportFormat::Docx, at);
        assert_eq!(name, "00000000-0000-0000-0000-000000000000_20240305_070809.docx");
        assert!(filename_timestamp(&name).is_some());
    }

    #[test]
    fn body_headings_are_demoted() {
        assert_eq!(demote_headings("# Top\ntext\n#hashtag"), "### Top\ntext\n#hashtag");
    }
}
