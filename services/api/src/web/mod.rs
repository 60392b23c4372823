pub mod content;
pub mod export;
pub mod middleware;
pub mod outlines;
pub mod rest;
pub mod state;

pub use middleware::require_auth;
pub use rest::ApiDoc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use state::AppState;

/// Builds the authenticated API router. CORS and the Swagger UI are added by the binary.
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/projects",
            get(rest::list_projects_handler).post(rest::create_project_handler),
        )
        .route(
            "/projects/{project_id}",
            get(rest::get_project_handler).delete(rest::delete_project_handler),
        )
        .route(
            "/projects/{project_id}/outline",
            post(outlines::generate_outline_handler),
        )
        .route(
            "/outlines/{outline_id}/approve",
            post(outlines::approve_outline_handler),
        )
        .route(
            "/outlines/{outline_id}/recalculate",
            post(outlines::recalculate_outline_handler),
        )
        .route(
            "/projects/{project_id}/content",
            get(content::list_content_handler).post(content::generate_content_handler),
        )
        .route(
            "/projects/{project_id}/content/next",
            post(content::generate_next_handler),
        )
        .route(
            "/projects/{project_id}/content-status",
            get(content::content_status_handler),
        )
        .route("/content/{content_id}", get(content::get_content_handler))
        .route("/projects/{project_id}/preview", get(content::preview_handler))
        .route(
            "/projects/{project_id}/export/{format}",
            post(export::export_handler),
        )
        .route(
            "/projects/{project_id}/exports",
            get(export::list_exports_handler),
        )
        .route("/exports/{filename}", get(export::download_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ))
        .with_state(app_state)
}
