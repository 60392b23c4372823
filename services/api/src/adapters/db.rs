//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the core crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use research_core::domain::{
    Citation, ContentSection, ContentUpsert, Language, NewProject, Outline, Project, User,
};
use research_core::outline::OutlineStructure;
use research_core::ports::{DatabaseService, PortError, PortResult};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::warn;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(what: String) -> impl FnOnce(sqlx::Error) -> PortError {
    move |e| match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what),
        other => PortError::Unexpected(other.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const PROJECT_COLUMNS: &str =
    "id, user_id, title, description, language, citation_style, created_at, updated_at";
const OUTLINE_COLUMNS: &str =
    "id, project_id, structure, is_approved, total_pages, created_at, updated_at";
const CONTENT_COLUMNS: &str = "id, project_id, outline_id, section_title, content, citations, \
     version, created_at, updated_at";

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    email: String,
    is_admin: bool,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            username: self.username,
            email: self.email,
            is_admin: self.is_admin,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ProjectRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    description: String,
    language: String,
    citation_style: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl ProjectRecord {
    fn to_domain(self) -> Project {
        let language = self.language.parse().unwrap_or_else(|_| {
            warn!(project_id = %self.id, language = %self.language, "Unknown stored language; using English");
            Language::En
        });
        Project {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
            language,
            citation_style: self.citation_style,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct OutlineRecord {
    id: Uuid,
    project_id: Uuid,
    structure: Json<Value>,
    is_approved: bool,
    total_pages: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl OutlineRecord {
    fn to_domain(self) -> Outline {
        Outline {
            id: self.id,
            project_id: self.project_id,
            structure: OutlineStructure::from_value(&self.structure.0),
            is_approved: self.is_approved,
            total_pages: u32::try_from(self.total_pages).unwrap_or(0),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct ContentRecord {
    id: Uuid,
    project_id: Uuid,
    outline_id: Uuid,
    section_title: String,
    content: String,
    citations: Json<Value>,
    version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl ContentRecord {
    fn to_domain(self) -> ContentSection {
        let citations = match &self.citations.0 {
            Value::Array(items) => items.iter().filter_map(Citation::from_value).collect(),
            _ => Vec::new(),
        };
        ContentSection {
            id: self.id,
            project_id: self.project_id,
            outline_id: self.outline_id,
            section_title: self.section_title,
            content: self.content,
            citations,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let user_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        user_id.ok_or(PortError::Unauthorized)
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, email, is_admin, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected(format!("User {}", user_id)))?;
        Ok(record.to_domain())
    }

    async fn create_project(&self, user_id: Uuid, project: &NewProject) -> PortResult<Project> {
        let sql = format!(
            "INSERT INTO projects (id, user_id, title, description, language, citation_style) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {PROJECT_COLUMNS}"
        );
        let record = sqlx::query_as::<_, ProjectRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(&project.title)
            .bind(&project.description)
            .bind(project.language.code())
            .bind(&project.citation_style)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_project(&self, project_id: Uuid) -> PortResult<Project> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1");
        let record = sqlx::query_as::<_, ProjectRecord>(&sql)
            .bind(project_id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found_or_unexpected(format!("Project {}", project_id)))?;
        Ok(record.to_domain())
    }

    async fn list_projects_for_user(&self, user_id: Uuid) -> PortResult<Vec<Project>> {
        let sql = format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let records = sqlx::query_as::<_, ProjectRecord>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn delete_project(&self, project_id: Uuid) -> PortResult<()> {
        // Outlines and content rows go with it through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(project_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Project {}", project_id)));
        }
        Ok(())
    }

    async fn create_outline(
        &self,
        project_id: Uuid,
        structure: &OutlineStructure,
        total_pages: u32,
    ) -> PortResult<Outline> {
        let total_pages = i32::try_from(total_pages)
            .map_err(|_| PortError::Unexpected("total_pages out of range".to_string()))?;
        let sql = format!(
            "INSERT INTO outlines (id, project_id, structure, total_pages) \
             VALUES ($1, $2, $3, $4) RETURNING {OUTLINE_COLUMNS}"
        );
        let record = sqlx::query_as::<_, OutlineRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(project_id)
            .bind(Json(structure.to_value()))
            .bind(total_pages)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_outline(&self, outline_id: Uuid) -> PortResult<Outline> {
        let sql = format!("SELECT {OUTLINE_COLUMNS} FROM outlines WHERE id = $1");
        let record = sqlx::query_as::<_, OutlineRecord>(&sql)
            .bind(outline_id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found_or_unexpected(format!("Outline {}", outline_id)))?;
        Ok(record.to_domain())
    }

    async fn latest_outline(&self, project_id: Uuid) -> PortResult<Option<Outline>> {
        let sql = format!(
            "SELECT {OUTLINE_COLUMNS} FROM outlines WHERE project_id = $1 \
             ORDER BY created_at DESC LIMIT 1"
        );
        let record = sqlx::query_as::<_, OutlineRecord>(&sql)
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(|r| r.to_domain()))
    }

    async fn latest_approved_outline(&self, project_id: Uuid) -> PortResult<Option<Outline>> {
        let sql = format!(
            "SELECT {OUTLINE_COLUMNS} FROM outlines WHERE project_id = $1 AND is_approved \
             ORDER BY created_at DESC LIMIT 1"
        );
        let record = sqlx::query_as::<_, OutlineRecord>(&sql)
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(|r| r.to_domain()))
    }

    async fn approve_outline(&self, outline_id: Uuid) -> PortResult<Outline> {
        let sql = format!(
            "UPDATE outlines SET is_approved = TRUE, updated_at = NOW() WHERE id = $1 \
             RETURNING {OUTLINE_COLUMNS}"
        );
        let record = sqlx::query_as::<_, OutlineRecord>(&sql)
            .bind(outline_id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found_or_unexpected(format!("Outline {}", outline_id)))?;
        Ok(record.to_domain())
    }

    async fn update_outline_structure(
        &self,
        outline_id: Uuid,
        structure: &OutlineStructure,
    ) -> PortResult<Outline> {
        let sql = format!(
            "UPDATE outlines SET structure = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {OUTLINE_COLUMNS}"
        );
        let record = sqlx::query_as::<_, OutlineRecord>(&sql)
            .bind(outline_id)
            .bind(Json(structure.to_value()))
            .fetch_one(&self.pool)
            .await
            .map_err(not_found_or_unexpected(format!("Outline {}", outline_id)))?;
        Ok(record.to_domain())
    }

    async fn upsert_content_section(&self, upsert: &ContentUpsert) -> PortResult<ContentSection> {
        let citations = serde_json::to_value(&upsert.citations)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let sql = format!(
            "INSERT INTO content_sections (id, project_id, outline_id, section_title, content, citations) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (project_id, outline_id, section_title) DO UPDATE SET \
                 content = EXCLUDED.content, \
                 citations = EXCLUDED.citations, \
                 version = content_sections.version + 1, \
                 updated_at = NOW() \
             RETURNING {CONTENT_COLUMNS}"
        );
        let record = sqlx::query_as::<_, ContentRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(upsert.project_id)
            .bind(upsert.outline_id)
            .bind(&upsert.section_title)
            .bind(&upsert.content)
            .bind(Json(citations))
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_content_sections(
        &self,
        project_id: Uuid,
        outline_id: Uuid,
    ) -> PortResult<Vec<ContentSection>> {
        let sql = format!(
            "SELECT {CONTENT_COLUMNS} FROM content_sections \
             WHERE project_id = $1 AND outline_id = $2 ORDER BY created_at ASC"
        );
        let records = sqlx::query_as::<_, ContentRecord>(&sql)
            .bind(project_id)
            .bind(outline_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_content_section(&self, content_id: Uuid) -> PortResult<ContentSection> {
        let sql = format!("SELECT {CONTENT_COLUMNS} FROM content_sections WHERE id = $1");
        let record = sqlx::query_as::<_, ContentRecord>(&sql)
            .bind(content_id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found_or_unexpected(format!("Content {}", content_id)))?;
        Ok(record.to_domain())
    }
}
