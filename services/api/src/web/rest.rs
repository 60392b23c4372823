//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for project management and the master
//! definition for the OpenAPI specification.

use crate::error::{service_error, HttpError};
use crate::web::{content, export, outlines, state::AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use research_core::{Language, NewProject, User};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        create_project_handler,
        list_projects_handler,
        get_project_handler,
        delete_project_handler,
        outlines::generate_outline_handler,
        outlines::approve_outline_handler,
        outlines::recalculate_outline_handler,
        content::generate_content_handler,
        content::generate_next_handler,
        content::list_content_handler,
        content::content_status_handler,
        content::get_content_handler,
        content::preview_handler,
        export::export_handler,
        export::list_exports_handler,
        export::download_handler,
    ),
    components(
        schemas(
            CreateProjectRequest,
            outlines::GenerateOutlineRequest,
            content::GenerateContentRequest,
            export::ExportResponse,
        )
    ),
    tags(
        (name = "Research Writer API", description = "Outline, write and export research papers.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Payload Structs
//=========================================================================================

/// The request payload for creating a project.
#[derive(Deserialize, ToSchema)]
pub struct CreateProjectRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// `en` or `ar`.
    pub language: String,
    /// Defaults to `APA`.
    pub citation_style: Option<String>,
}

impl CreateProjectRequest {
    fn into_new_project(self) -> Result<NewProject, HttpError> {
        let language = self
            .language
            .parse::<Language>()
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
        Ok(NewProject {
            title: self.title,
            description: self.description,
            language,
            citation_style: self
                .citation_style
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "APA".to_string()),
        })
    }
}

//=========================================================================================
// Project Handlers
//=========================================================================================

/// Create a new research project.
#[utoipa::path(
    post,
    path = "/projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created"),
        (status = 400, description = "Missing title or unsupported language"),
        (status = 401, description = "Missing or invalid session")
    )
)]
pub async fn create_project_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let new_project = payload.into_new_project()?;
    let project = app_state
        .research
        .create_project(user.id, new_project)
        .await
        .map_err(service_error)?;
    info!(project_id = %project.id, user_id = %user.id, "Project created");
    Ok((StatusCode::CREATED, Json(project)))
}

/// List the caller's projects, newest first.
#[utoipa::path(
    get,
    path = "/projects",
    responses(
        (status = 200, description = "The caller's projects"),
        (status = 401, description = "Missing or invalid session")
    )
)]
pub async fn list_projects_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, HttpError> {
    let projects = app_state
        .research
        .list_projects(user.id)
        .await
        .map_err(service_error)?;
    Ok(Json(projects))
}

/// Fetch a project together with its latest outline.
#[utoipa::path(
    get,
    path = "/projects/{project_id}",
    params(("project_id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "The project and its latest outline"),
        (status = 404, description = "Unknown project")
    )
)]
pub async fn get_project_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let detail = app_state
        .research
        .get_project(user.id, project_id)
        .await
        .map_err(service_error)?;
    Ok(Json(detail))
}

/// Delete a project and everything generated for it.
#[utoipa::path(
    delete,
    path = "/projects/{project_id}",
    params(("project_id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 204, description = "Project deleted"),
        (status = 404, description = "Unknown project")
    )
)]
pub async fn delete_project_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .research
        .delete_project(user.id, project_id)
        .await
        .map_err(service_error)?;
    info!(%project_id, "Project deleted");
    Ok(StatusCode::NO_CONTENT)
}
