//! services/api/src/web/outlines.rs
//!
//! Handlers for outline generation, approval and page recalculation.

use crate::error::{service_error, HttpError};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use research_core::{Complexity, User};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// The request payload for generating an outline.
#[derive(Deserialize, ToSchema)]
pub struct GenerateOutlineRequest {
    /// `basic`, `medium` or `advanced`; anything else means `medium`.
    #[serde(default)]
    pub complexity: Option<String>,
    /// Between 1 and 500.
    pub total_pages: u32,
}

/// Generate a new outline for a project.
#[utoipa::path(
    post,
    path = "/projects/{project_id}/outline",
    request_body = GenerateOutlineRequest,
    params(("project_id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 201, description = "Outline generated and stored"),
        (status = 400, description = "Invalid page count"),
        (status = 404, description = "Unknown project"),
        (status = 502, description = "The text generator failed")
    )
)]
pub async fn generate_outline_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<GenerateOutlineRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let complexity = payload
        .complexity
        .as_deref()
        .map(Complexity::from_tier)
        .unwrap_or_default();
    let outline = app_state
        .research
        .generate_outline(user.id, project_id, complexity, payload.total_pages)
        .await
        .map_err(service_error)?;
    Ok((StatusCode::CREATED, Json(outline)))
}

/// Approve an outline so content can be generated from it.
#[utoipa::path(
    post,
    path = "/outlines/{outline_id}/approve",
    params(("outline_id" = Uuid, Path, description = "Outline id")),
    responses(
        (status = 200, description = "The approved outline"),
        (status = 404, description = "Unknown outline")
    )
)]
pub async fn approve_outline_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(outline_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let outline = app_state
        .research
        .approve_outline(user.id, outline_id)
        .await
        .map_err(service_error)?;
    Ok(Json(outline))
}

/// Rebalance the page counts of an unapproved outline.
#[utoipa::path(
    post,
    path = "/outlines/{outline_id}/recalculate",
    params(("outline_id" = Uuid, Path, description = "Outline id")),
    responses(
        (status = 200, description = "The rebalanced outline"),
        (status = 400, description = "The outline is already approved"),
        (status = 404, description = "Unknown outline")
    )
)]
pub async fn recalculate_outline_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(outline_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let outline = app_state
        .research
        .recalculate_outline_pages(user.id, outline_id)
        .await
        .map_err(service_error)?;
    Ok(Json(outline))
}
