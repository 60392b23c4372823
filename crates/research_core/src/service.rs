//! crates/research_core/src/service.rs
//!
//! The project workflow: projects, outline generation and approval, section
//! content generation, progress and preview. Every operation is scoped to the
//! requesting user; rows owned by someone else are reported as not found.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::assembly::document_order;
use crate::content_generator::{ContentGenerator, ContentRequest};
use crate::domain::{
    Complexity, ContentSection, ContentUpsert, Language, NewProject, Outline, Project, MAX_TOTAL_PAGES,
    WORDS_PER_PAGE,
};
use crate::error::ServiceError;
use crate::markdown::count_words;
use crate::outline::IndexEntry;
use crate::outline_generator::{OutlineGenerator, OutlineRequest};
use crate::pagination::{self, Page, TocEntry, DEFAULT_MAX_WORDS_PER_PAGE};
use crate::ports::DatabaseService;

/// A project together with its most recent outline and the index derived from it.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectDetail {
    pub project: Project,
    pub outline: Option<Outline>,
    pub index: Vec<IndexEntry>,
}

/// Result of generating the next pending section.
#[derive(Debug, Clone, Serialize)]
pub struct NextSectionResult {
    /// The section generated by this call, if any was pending.
    pub generated: Option<ContentSection>,
    /// Sections that were pending before this call, in generation order.
    pub pending: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentStatus {
    pub total_sections: usize,
    pub completed_sections: usize,
    pub progress_percentage: f64,
    pub total_words: usize,
    pub target_words: u64,
    pub word_percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    pub pages: Vec<Page>,
    pub table_of_contents: Vec<TocEntry>,
}

pub struct ResearchService {
    db: Arc<dyn DatabaseService>,
    outlines: OutlineGenerator,
    contents: ContentGenerator,
}

impl ResearchService {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        outlines: OutlineGenerator,
        contents: ContentGenerator,
    ) -> Self {
        Self { db, outlines, contents }
    }

    //=====================================================================================
    // Projects
    //=====================================================================================

    pub async fn create_project(&self, owner: Uuid, project: NewProject) -> Result<Project, ServiceError> {
        if project.title.trim().is_empty() {
            return Err(ServiceError::InvalidRequest("Project title is required".into()));
        }
        let created = self.db.create_project(owner, &project).await?;
        info!(project_id = %created.id, "Project created");
        Ok(created)
    }

    pub async fn list_projects(&self, owner: Uuid) -> Result<Vec<Project>, ServiceError> {
        Ok(self.db.list_projects_for_user(owner).await?)
    }

    async fn owned_project(&self, owner: Uuid, project_id: Uuid) -> Result<Project, ServiceError> {
        let project = self.db.get_project(project_id).await?;
        if project.user_id != owner {
            return Err(ServiceError::NotFound("Project".into()));
        }
        Ok(project)
    }

    async fn owned_outline(&self, owner: Uuid, outline_id: Uuid) -> Result<Outline, ServiceError> {
        let outline = self.db.get_outline(outline_id).await?;
        self.owned_project(owner, outline.project_id)
            .await
            .map_err(|_| ServiceError::NotFound("Outline".into()))?;
        Ok(outline)
    }

    async fn approved_outline(&self, project: &Project) -> Result<Outline, ServiceError> {
        self.db
            .latest_approved_outline(project.id)
            .await?
            .ok_or_else(|| ServiceError::InvalidRequest("No approved outline found".into()))
    }

    pub async fn get_project(&self, owner: Uuid, project_id: Uuid) -> Result<ProjectDetail, ServiceError> {
        let project = self.owned_project(owner, project_id).await?;
        let outline = self.db.latest_outline(project.id).await?;
        let index = outline
            .as_ref()
            .map(|o| o.structure.index(project.language))
            .unwrap_or_default();
        Ok(ProjectDetail { project, outline, index })
    }

    pub async fn delete_project(&self, owner: Uuid, project_id: Uuid) -> Result<(), ServiceError> {
        let project = self.owned_project(owner, project_id).await?;
        self.db.delete_project(project.id).await?;
        info!(%project_id, "Project deleted");
        Ok(())
    }

    //=====================================================================================
    // Outlines
    //=====================================================================================

    pub async fn generate_outline(
        &self,
        owner: Uuid,
        project_id: Uuid,
        complexity: Complexity,
        total_pages: u32,
    ) -> Result<Outline, ServiceError> {
        if total_pages == 0 || total_pages > MAX_TOTAL_PAGES {
            return Err(ServiceError::InvalidRequest(format!(
                "Total pages must be between 1 and {}",
                MAX_TOTAL_PAGES
            )));
        }
        let project = self.owned_project(owner, project_id).await?;
        let structure = self
            .outlines
            .generate(&OutlineRequest {
                topic: &project.title,
                complexity,
                language: project.language.code(),
                total_pages,
            })
            .await?;

        let outline = self.db.create_outline(project.id, &structure, total_pages).await?;
        info!(outline_id = %outline.id, sections = structure.sections.len(), "Outline stored");
        Ok(outline)
    }

    pub async fn approve_outline(&self, owner: Uuid, outline_id: Uuid) -> Result<Outline, ServiceError> {
        let outline = self.owned_outline(owner, outline_id).await?;
        if outline.is_approved {
            return Ok(outline);
        }
        Ok(self.db.approve_outline(outline.id).await?)
    }

    /// Rebalances page counts and reassigns page ranges of an unapproved outline.
    pub async fn recalculate_outline_pages(&self, owner: Uuid, outline_id: Uuid) -> Result<Outline, ServiceError> {
        let outline = self.owned_outline(owner, outline_id).await?;
        if outline.is_approved {
            return Err(ServiceError::InvalidRequest(
                "Approved outlines cannot be changed".into(),
            ));
        }
        let mut structure = outline.structure.clone();
        structure.coerce_page_counts();
        structure.balance_pages(outline.total_pages);
        structure.recalculate_page_ranges(1);
        Ok(self.db.update_outline_structure(outline.id, &structure).await?)
    }

    //=====================================================================================
    // Content
    //=====================================================================================

    pub async fn generate_section(
        &self,
        owner: Uuid,
        project_id: Uuid,
        section_title: &str,
        subsection_titles: &[String],
        page_by_page: bool,
    ) -> Result<ContentSection, ServiceError> {
        let project = self.owned_project(owner, project_id).await?;
        let outline = self.approved_outline(&project).await?;
        self.generate_and_store(&project, &outline, section_title, subsection_titles, page_by_page)
            .await
    }

    async fn generate_and_store(
        &self,
        project: &Project,
        outline: &Outline,
        section_title: &str,
        subsection_titles: &[String],
        page_by_page: bool,
    ) -> Result<ContentSection, ServiceError> {
        let record = self
            .contents
            .generate(
                project,
                &outline.structure,
                &ContentRequest {
                    section_title,
                    subsection_titles,
                    citation_style: &project.citation_style,
                    language: project.language.code(),
                    page_by_page,
                },
            )
            .await?;

        let stored = self
            .db
            .upsert_content_section(&ContentUpsert {
                project_id: project.id,
                outline_id: outline.id,
                section_title: record.section_title,
                content: record.content,
                citations: record.citations,
            })
            .await?;
        info!(section = %stored.section_title, version = stored.version, "Section content stored");
        Ok(stored)
    }

    /// Introduction, outline sections and conclusion, without repeats.
    fn planned_sections(outline: &Outline, language: Language) -> Vec<String> {
        let labels = language.labels();
        let mut planned = vec![labels.introduction.to_string()];
        for title in outline.structure.ordered_section_titles() {
            if !planned.contains(&title) {
                planned.push(title);
            }
        }
        if !planned.iter().any(|t| t == labels.conclusion) {
            planned.push(labels.conclusion.to_string());
        }
        planned
    }

    /// Generates the first section that has no content yet.
    pub async fn generate_next_pending(&self, owner: Uuid, project_id: Uuid) -> Result<NextSectionResult, ServiceError> {
        let project = self.owned_project(owner, project_id).await?;
        let outline = self.approved_outline(&project).await?;
        let existing = self.db.list_content_sections(project.id, outline.id).await?;

        let pending: Vec<String> = Self::planned_sections(&outline, project.language)
            .into_iter()
            .filter(|title| !existing.iter().any(|c| &c.section_title == title))
            .collect();

        let generated = match pending.first() {
            Some(title) => Some(
                self.generate_and_store(&project, &outline, title, &[], true)
                    .await?,
            ),
            None => None,
        };
        Ok(NextSectionResult { generated, pending })
    }

    pub async fn content_status(&self, owner: Uuid, project_id: Uuid) -> Result<ContentStatus, ServiceError> {
        let project = self.owned_project(owner, project_id).await?;
        let outline = self.approved_outline(&project).await?;
        let existing = self.db.list_content_sections(project.id, outline.id).await?;

        let total_sections = Self::planned_sections(&outline, project.language).len();
        let completed_sections = existing.len();
        let total_words: usize = existing.iter().map(|c| count_words(&c.content)).sum();
        let target_words = u64::from(outline.total_pages) * u64::from(WORDS_PER_PAGE);

        let percentage = |part: f64, whole: f64| if whole > 0.0 { part / whole * 100.0 } else { 0.0 };
        Ok(ContentStatus {
            total_sections,
            completed_sections,
            progress_percentage: percentage(completed_sections as f64, total_sections as f64),
            total_words,
            target_words,
            word_percentage: percentage(total_words as f64, target_words as f64),
        })
    }

    /// Content of the latest approved outline, in document order.
    pub async fn list_content(&self, owner: Uuid, project_id: Uuid) -> Result<Vec<ContentSection>, ServiceError> {
        let project = self.owned_project(owner, project_id).await?;
        let Some(outline) = self.db.latest_approved_outline(project.id).await? else {
            return Ok(Vec::new());
        };
        let mut contents = self.db.list_content_sections(project.id, outline.id).await?;
        let order = document_order(&outline, project.language, &contents);
        contents.sort_by_key(|c| order.iter().position(|t| t == &c.section_title).unwrap_or(usize::MAX));
        Ok(contents)
    }

    pub async fn get_content(&self, owner: Uuid, content_id: Uuid) -> Result<ContentSection, ServiceError> {
        let content = self.db.get_content_section(content_id).await?;
        self.owned_project(owner, content.project_id)
            .await
            .map_err(|_| ServiceError::NotFound("Content".into()))?;
        Ok(content)
    }

    /// Paginated view of the approved outline's content with its table of contents.
    pub async fn preview(&self, owner: Uuid, project_id: Uuid) -> Result<Preview, ServiceError> {
        let project = self.owned_project(owner, project_id).await?;
        let outline = self.approved_outline(&project).await?;
        let contents = self.db.list_content_sections(project.id, outline.id).await?;

        let order = document_order(&outline, project.language, &contents);
        let by_title: HashMap<String, ContentSection> = contents
            .into_iter()
            .map(|c| (c.section_title.clone(), c))
            .collect();
        let pages = pagination::paginate(&by_title, &order, DEFAULT_MAX_WORDS_PER_PAGE);
        let table_of_contents = pagination::table_of_contents(&pages);
        Ok(Preview { pages, table_of_contents })
    }
}
