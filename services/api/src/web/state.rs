//! services/api/src/web/state.rs
//!
//! Defines the application state shared by every handler.

use research_core::ports::DatabaseService;
use research_core::{ExportService, ResearchService};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub research: Arc<ResearchService>,
    pub exports: Arc<ExportService>,
}
