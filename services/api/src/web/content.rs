//! services/api/src/web/content.rs
//!
//! Handlers for section content: generation, listing, progress and preview.

use crate::error::{service_error, HttpError};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use research_core::User;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

fn default_page_by_page() -> bool {
    true
}

/// The request payload for generating one section.
#[derive(Deserialize, ToSchema)]
pub struct GenerateContentRequest {
    pub section_title: String,
    #[serde(default)]
    pub subsection_titles: Vec<String>,
    /// Generate one page per call instead of the whole section at once.
    #[serde(default = "default_page_by_page")]
    pub page_by_page: bool,
}

/// Generate (or regenerate) the content of one section.
#[utoipa::path(
    post,
    path = "/projects/{project_id}/content",
    request_body = GenerateContentRequest,
    params(("project_id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 201, description = "Section content stored"),
        (status = 400, description = "No approved outline or unsupported language"),
        (status = 404, description = "Unknown project or section")
    )
)]
pub async fn generate_content_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<GenerateContentRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let content = app_state
        .research
        .generate_section(
            user.id,
            project_id,
            &payload.section_title,
            &payload.subsection_titles,
            payload.page_by_page,
        )
        .await
        .map_err(service_error)?;
    info!(content_id = %content.id, version = content.version, "Section content stored");
    Ok((StatusCode::CREATED, Json(content)))
}

/// Generate the first section that has no content yet.
#[utoipa::path(
    post,
    path = "/projects/{project_id}/content/next",
    params(("project_id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "The generated section and the sections that were pending"),
        (status = 400, description = "No approved outline")
    )
)]
pub async fn generate_next_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let result = app_state
        .research
        .generate_next_pending(user.id, project_id)
        .await
        .map_err(service_error)?;
    Ok(Json(result))
}

/// List the stored content of the approved outline in document order.
#[utoipa::path(
    get,
    path = "/projects/{project_id}/content",
    params(("project_id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "Stored sections"),
        (status = 404, description = "Unknown project")
    )
)]
pub async fn list_content_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let contents = app_state
        .research
        .list_content(user.id, project_id)
        .await
        .map_err(service_error)?;
    Ok(Json(contents))
}

/// Progress of content generation against the approved outline.
#[utoipa::path(
    get,
    path = "/projects/{project_id}/content-status",
    params(("project_id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "Section and word progress"),
        (status = 400, description = "No approved outline")
    )
)]
pub async fn content_status_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let status = app_state
        .research
        .content_status(user.id, project_id)
        .await
        .map_err(service_error)?;
    Ok(Json(status))
}

/// Fetch one stored section.
#[utoipa::path(
    get,
    path = "/content/{content_id}",
    params(("content_id" = Uuid, Path, description = "Content id")),
    responses(
        (status = 200, description = "The stored section"),
        (status = 404, description = "Unknown content")
    )
)]
pub async fn get_content_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(content_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let content = app_state
        .research
        .get_content(user.id, content_id)
        .await
        .map_err(service_error)?;
    Ok(Json(content))
}

/// Paginated preview with a table of contents.
#[utoipa::path(
    get,
    path = "/projects/{project_id}/preview",
    params(("project_id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "Pages and table of contents"),
        (status = 400, description = "No approved outline")
    )
)]
pub async fn preview_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let preview = app_state
        .research
        .preview(user.id, project_id)
        .await
        .map_err(service_error)?;
    Ok(Json(preview))
}
