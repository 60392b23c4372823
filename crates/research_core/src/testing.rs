//! crates/research_core/src/testing.rs
//!
//! In-memory port implementations for tests and local experiments.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::{ContentSection, ContentUpsert, NewProject, Outline, Project, User};
use crate::outline::OutlineStructure;
use crate::ports::{
    DatabaseService, ExportStore, GenerationOptions, PortError, PortResult, SafetySettings,
    StoredExport, TextGenerationService,
};

fn poisoned<T>(_: T) -> PortError {
    PortError::Unexpected("lock poisoned".into())
}

//=========================================================================================
// Scripted text generation
//=========================================================================================

/// Replays queued replies in order. `Err` entries simulate provider failures.
/// When the queue runs dry every further call fails.
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Result<String, String>>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn push_reply(&self, reply: Result<String, String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    /// Every prompt received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerationService for ScriptedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
        _safety: &SafetySettings,
    ) -> PortResult<String> {
        self.prompts.lock().map_err(poisoned)?.push(prompt.to_string());
        let next = self.replies.lock().map_err(poisoned)?.pop_front();
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(PortError::Unexpected(message)),
            None => Err(PortError::Unexpected("no scripted reply left".into())),
        }
    }
}

//=========================================================================================
// In-memory database
//=========================================================================================

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    sessions: HashMap<String, Uuid>,
    projects: HashMap<Uuid, Project>,
    outlines: Vec<Outline>,
    contents: Vec<ContentSection>,
}

#[derive(Default)]
pub struct InMemoryDatabase {
    tables: Mutex<Tables>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a user with a valid session and returns the user id.
    pub fn add_user_with_session(&self, session_id: &str) -> Uuid {
        let id = Uuid::new_v4();
        if let Ok(mut tables) = self.tables.lock() {
            tables.users.insert(
                id,
                User {
                    id,
                    username: format!("user-{}", &id.to_string()[..8]),
                    email: format!("{}@example.com", id),
                    is_admin: false,
                    created_at: Utc::now(),
                },
            );
            tables.sessions.insert(session_id.to_string(), id);
        }
        id
    }
}

#[async_trait]
impl DatabaseService for InMemoryDatabase {
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let tables = self.tables.lock().map_err(poisoned)?;
        tables
            .sessions
            .get(session_id)
            .copied()
            .ok_or(PortError::Unauthorized)
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        let tables = self.tables.lock().map_err(poisoned)?;
        tables
            .users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {}", user_id)))
    }

    async fn create_project(&self, user_id: Uuid, project: &NewProject) -> PortResult<Project> {
        let now = Utc::now();
        let created = Project {
            id: Uuid::new_v4(),
            user_id,
            title: project.title.clone(),
            description: project.description.clone(),
            language: project.language,
            citation_style: project.citation_style.clone(),
            created_at: now,
            updated_at: now,
        };
        let mut tables = self.tables.lock().map_err(poisoned)?;
        tables.projects.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_project(&self, project_id: Uuid) -> PortResult<Project> {
        let tables = self.tables.lock().map_err(poisoned)?;
        tables
            .projects
            .get(&project_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Project {}", project_id)))
    }

    async fn list_projects_for_user(&self, user_id: Uuid) -> PortResult<Vec<Project>> {
        let tables = self.tables.lock().map_err(poisoned)?;
        let mut projects: Vec<Project> = tables
            .projects
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    async fn delete_project(&self, project_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables.lock().map_err(poisoned)?;
        if tables.projects.remove(&project_id).is_none() {
            return Err(PortError::NotFound(format!("Project {}", project_id)));
        }
        tables.outlines.retain(|o| o.project_id != project_id);
        tables.contents.retain(|c| c.project_id != project_id);
        Ok(())
    }

    async fn create_outline(
        &self,
        project_id: Uuid,
        structure: &OutlineStructure,
        total_pages: u32,
    ) -> PortResult<Outline> {
        let now = Utc::now();
        let outline = Outline {
            id: Uuid::new_v4(),
            project_id,
            structure: structure.clone(),
            is_approved: false,
            total_pages,
            created_at: now,
            updated_at: now,
        };
        let mut tables = self.tables.lock().map_err(poisoned)?;
        tables.outlines.push(outline.clone());
        Ok(outline)
    }

    async fn get_outline(&self, outline_id: Uuid) -> PortResult<Outline> {
        let tables = self.tables.lock().map_err(poisoned)?;
        tables
            .outlines
            .iter()
            .find(|o| o.id == outline_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Outline {}", outline_id)))
    }

    async fn latest_outline(&self, project_id: Uuid) -> PortResult<Option<Outline>> {
        let tables = self.tables.lock().map_err(poisoned)?;
        Ok(tables
            .outlines
            .iter()
            .rev()
            .find(|o| o.project_id == project_id)
            .cloned())
    }

    async fn latest_approved_outline(&self, project_id: Uuid) -> PortResult<Option<Outline>> {
        let tables = self.tables.lock().map_err(poisoned)?;
        Ok(tables
            .outlines
            .iter()
            .rev()
            .find(|o| o.project_id == project_id && o.is_approved)
            .cloned())
    }

    async fn approve_outline(&self, outline_id: Uuid) -> PortResult<Outline> {
        let mut tables = self.tables.lock().map_err(poisoned)?;
        let outline = tables
            .outlines
            .iter_mut()
            .find(|o| o.id == outline_id)
            .ok_or_else(|| PortError::NotFound(format!("Outline {}", outline_id)))?;
        outline.is_approved = true;
        outline.updated_at = Utc::now();
        Ok(outline.clone())
    }

    async fn update_outline_structure(
        &self,
        outline_id: Uuid,
        structure: &OutlineStructure,
    ) -> PortResult<Outline> {
        let mut tables = self.tables.lock().map_err(poisoned)?;
        let outline = tables
            .outlines
            .iter_mut()
            .find(|o| o.id == outline_id)
            .ok_or_else(|| PortError::NotFound(format!("Outline {}", outline_id)))?;
        outline.structure = structure.clone();
        outline.updated_at = Utc::now();
        Ok(outline.clone())
    }

    async fn upsert_content_section(&self, upsert: &ContentUpsert) -> PortResult<ContentSection> {
        let mut tables = self.tables.lock().map_err(poisoned)?;
        let now = Utc::now();
        let existing = tables.contents.iter_mut().find(|c| {
            c.project_id == upsert.project_id
                && c.outline_id == upsert.outline_id
                && c.section_title == upsert.section_title
        });
        if let Some(content) = existing {
            content.content = upsert.content.clone();
            content.citations = upsert.citations.clone();
            content.version += 1;
            content.updated_at = now;
            return Ok(content.clone());
        }

        let created = ContentSection {
            id: Uuid::new_v4(),
            project_id: upsert.project_id,
            outline_id: upsert.outline_id,
            section_title: upsert.section_title.clone(),
            content: upsert.content.clone(),
            citations: upsert.citations.clone(),
            version: 1,
            created_at: now,
            updated_at: now,
        };
        tables.contents.push(created.clone());
        Ok(created)
    }

    async fn list_content_sections(
        &self,
        project_id: Uuid,
        outline_id: Uuid,
    ) -> PortResult<Vec<ContentSection>> {
        let tables = self.tables.lock().map_err(poisoned)?;
        Ok(tables
            .contents
            .iter()
            .filter(|c| c.project_id == project_id && c.outline_id == outline_id)
            .cloned()
            .collect())
    }

    async fn get_content_section(&self, content_id: Uuid) -> PortResult<ContentSection> {
        let tables = self.tables.lock().map_err(poisoned)?;
        tables
            .contents
            .iter()
            .find(|c| c.id == content_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Content {}", content_id)))
    }
}

//=========================================================================================
// In-memory export store
//=========================================================================================

#[derive(Default)]
pub struct InMemoryExportStore {
    files: Mutex<HashMap<String, (Bytes, StoredExport)>>,
}

impl InMemoryExportStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExportStore for InMemoryExportStore {
    async fn write(&self, filename: &str, data: &[u8]) -> PortResult<StoredExport> {
        let stored = StoredExport {
            filename: filename.to_string(),
            size: data.len() as u64,
            modified: Utc::now(),
        };
        self.files
            .lock()
            .map_err(poisoned)?
            .insert(filename.to_string(), (Bytes::copy_from_slice(data), stored.clone()));
        Ok(stored)
    }

    async fn list_by_prefix(&self, prefix: &str) -> PortResult<Vec<StoredExport>> {
        let files = self.files.lock().map_err(poisoned)?;
        Ok(files
            .values()
            .filter(|(_, meta)| meta.filename.starts_with(prefix))
            .map(|(_, meta)| meta.clone())
            .collect())
    }

    async fn read(&self, filename: &str) -> PortResult<Bytes> {
        let files = self.files.lock().map_err(poisoned)?;
        files
            .get(filename)
            .map(|(data, _)| data.clone())
            .ok_or_else(|| PortError::NotFound(format!("Export {}", filename)))
    }
}
