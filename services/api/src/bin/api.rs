//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        ArabicFonts, DbAdapter, DocxRenderer, FsExportStore, GeminiTextAdapter,
        OpenAiTextAdapter, PdfRenderer,
    },
    config::{Config, TextProvider},
    error::ApiError,
    web::{self, rest::ApiDoc, state::AppState},
};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::Router;
use research_core::ports::TextGenerationService;
use research_core::{ContentGenerator, ExportService, OutlineGenerator, ResearchService};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let text_generator: Arc<dyn TextGenerationService> = match config.text_provider {
        TextProvider::Gemini => {
            if config.gemini_api_key.is_none() {
                warn!("GEMINI_API_KEY is not set; generation requests will fail");
            }
            Arc::new(GeminiTextAdapter::new(
                config.gemini_api_key.clone(),
                config.gemini_model.clone(),
                config.gemini_api_base.clone(),
            ))
        }
        TextProvider::OpenAi => {
            if config.openai_api_key.is_none() {
                warn!("OPENAI_API_KEY is not set; generation requests will fail");
            }
            Arc::new(OpenAiTextAdapter::from_credentials(
                config.openai_api_key.as_deref(),
                config.openai_api_base.as_deref(),
                config.openai_model.clone(),
            ))
        }
    };
    info!(provider = ?config.text_provider, "Text generator ready");

    let export_store = Arc::new(FsExportStore::new(config.export_dir.clone()));
    export_store.ensure_dir().await?;

    let arabic_fonts = match &config.arabic_font_path {
        Some(path) => Some(ArabicFonts::load(
            path,
            config.arabic_bold_font_path.as_deref(),
        )?),
        None => {
            warn!("ARABIC_FONT_PATH is not set; Arabic PDF exports are disabled");
            None
        }
    };

    // --- 4. Build the Shared AppState ---
    let research = ResearchService::new(
        db_adapter.clone(),
        OutlineGenerator::new(text_generator.clone()),
        ContentGenerator::new(text_generator).with_batch_pause(config.batch_pause),
    );
    let exports = ExportService::new(db_adapter.clone(), export_store)
        .with_renderer(Arc::new(PdfRenderer::new(arabic_fonts)))
        .with_renderer(Arc::new(DocxRenderer));

    let app_state = Arc::new(AppState {
        db: db_adapter,
        research: Arc::new(research),
        exports: Arc::new(exports),
    });

    // --- 5. Create the Web Router ---
    let cors_origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!(
            "Invalid CORS_ORIGIN '{}': {}",
            config.cors_origin, e
        ))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    let app = Router::new()
        .merge(web::router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
