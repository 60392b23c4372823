//! services/api/src/web/export.rs
//!
//! Handlers for rendering a project to a file and serving stored exports.

use crate::error::{export_error, HttpError};
use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    Extension,
};
use research_core::{ExportFormat, ExportedFile, User};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Deserialize, IntoParams)]
pub struct ExportQuery {
    /// Outline to export; defaults to the latest approved one.
    pub outline_id: Option<Uuid>,
}

/// The response payload sent after an export was written.
#[derive(Serialize, ToSchema)]
pub struct ExportResponse {
    pub filename: String,
    pub format: String,
    pub size: u64,
    pub download_url: String,
}

impl From<ExportedFile> for ExportResponse {
    fn from(file: ExportedFile) -> Self {
        Self {
            download_url: format!("/exports/{}", file.filename),
            format: file.format.extension().to_string(),
            filename: file.filename,
            size: file.size,
        }
    }
}

/// Render a project to `pdf`, `docx` or `markdown`.
#[utoipa::path(
    post,
    path = "/projects/{project_id}/export/{format}",
    params(
        ("project_id" = Uuid, Path, description = "Project id"),
        ("format" = String, Path, description = "pdf, docx or markdown"),
        ExportQuery
    ),
    responses(
        (status = 201, description = "Export written", body = ExportResponse),
        (status = 400, description = "Unknown format"),
        (status = 404, description = "Unknown project or no approved outline"),
        (status = 500, description = "Rendering failed")
    )
)]
pub async fn export_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path((project_id, format)): Path<(Uuid, String)>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let format = ExportFormat::parse(&format).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            format!("Unsupported export format: {}", format),
        )
    })?;
    let file = app_state
        .exports
        .export(user.id, project_id, query.outline_id, format)
        .await
        .map_err(export_error)?;
    Ok((StatusCode::CREATED, Json(ExportResponse::from(file))))
}

/// List a project's previous exports, newest first.
#[utoipa::path(
    get,
    path = "/projects/{project_id}/exports",
    params(("project_id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "Stored exports"),
        (status = 404, description = "Unknown project")
    )
)]
pub async fn list_exports_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let exports = app_state
        .exports
        .previous_exports(user.id, project_id)
        .await
        .map_err(export_error)?;
    Ok(Json(exports))
}

/// Download a stored export.
#[utoipa::path(
    get,
    path = "/exports/{filename}",
    params(("filename" = String, Path, description = "Export file name")),
    responses(
        (status = 200, description = "The file contents"),
        (status = 404, description = "Unknown export")
    )
)]
pub async fn download_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let (format, data) = app_state
        .exports
        .download(user.id, &filename)
        .await
        .map_err(export_error)?;
    let headers = [
        (header::CONTENT_TYPE, format.mime_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
    ];
    Ok((headers, data))
}
