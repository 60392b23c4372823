use std::sync::Arc;
use std::time::Duration;

use research_core::testing::{InMemoryDatabase, InMemoryExportStore, ScriptedGenerator};
use research_core::domain::MAX_TOTAL_PAGES;
use research_core::ports::DatabaseService;
use research_core::{
    Complexity, ContentGenerator, ExportError, ExportFormat, ExportService, Language, NewProject,
    OutlineGenerator, OutlineStructure, ResearchService, ServiceError,
};
use serde_json::json;
use uuid::Uuid;

const OUTLINE_REPLY: &str = r#"{
  "title": "Groundwater Policy",
  "thesis_statement": "Pumping limits work when they are enforced locally.",
  "research_questions": ["Which limits work?"],
  "sections": [
    {"title": "Background", "pages": 2, "subsections": [{"title": "Aquifers", "pages": 2, "key_points": ["Depletion"]}]},
    {"title": "Analysis", "pages": 2, "subsections": []}
  ]
}"#;

fn content_reply(title: &str, text: &str) -> Result<String, String> {
    Ok(json!({
        "section_title": title,
        "content": text,
        "citations": [{"id": "smith2020", "text": "Smith, J. (2020). Aquifers.", "source_type": "journal"}]
    })
    .to_string())
}

struct Fixture {
    db: Arc<InMemoryDatabase>,
    generator: Arc<ScriptedGenerator>,
    service: ResearchService,
    owner: Uuid,
}

fn fixture() -> Fixture {
    let db = Arc::new(InMemoryDatabase::new());
    let generator = Arc::new(ScriptedGenerator::new(Vec::new()));
    let service = ResearchService::new(
        db.clone(),
        OutlineGenerator::new(generator.clone()),
        ContentGenerator::new(generator.clone()).with_batch_pause(Duration::ZERO),
    );
    let owner = db.add_user_with_session("session-1");
    Fixture { db, generator, service, owner }
}

fn new_project(title: &str) -> NewProject {
    NewProject {
        title: title.into(),
        description: String::new(),
        language: Language::En,
        citation_style: "APA".into(),
    }
}

#[tokio::test]
async fn project_to_export_round_trip() {
    let fx = fixture();
    let project = fx
        .service
        .create_project(fx.owner, new_project("Groundwater Policy"))
        .await
        .expect("project");

    fx.generator.push_reply(Ok(OUTLINE_REPLY.to_string()));
    let outline = fx
        .service
        .generate_outline(fx.owner, project.id, Complexity::Medium, 4)
        .await
        .expect("outline");
    assert!(!outline.is_approved);
    assert!((outline.structure.total_section_pages() - 4.0).abs() <= 0.5);

    let detail = fx.service.get_project(fx.owner, project.id).await.expect("detail");
    assert_eq!(detail.outline.map(|o| o.id), Some(outline.id));
    let index_titles: Vec<&str> = detail.index.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(
        index_titles,
        vec![
            "Title Page",
            "Table of Contents",
            "Introduction",
            "Background",
            "Aquifers",
            "Analysis",
            "Conclusion",
            "References",
        ]
    );
    assert!(detail.index[4].indent);

    // Content needs an approved outline.
    let early = fx.service.generate_section(fx.owner, project.id, "Background", &[], false).await;
    assert!(matches!(early, Err(ServiceError::InvalidRequest(_))));

    let approved = fx.service.approve_outline(fx.owner, outline.id).await.expect("approve");
    assert!(approved.is_approved);
    let again = fx.service.approve_outline(fx.owner, outline.id).await.expect("idempotent");
    assert!(again.is_approved);

    let recalculated = fx.service.recalculate_outline_pages(fx.owner, outline.id).await;
    assert!(matches!(recalculated, Err(ServiceError::InvalidRequest(_))));

    fx.generator.push_reply(content_reply("Background", "First draft of the background."));
    let first = fx
        .service
        .generate_section(fx.owner, project.id, "Background", &[], false)
        .await
        .expect("section");
    assert_eq!(first.version, 1);

    fx.generator.push_reply(content_reply("Background", "Second draft of the background."));
    let second = fx
        .service
        .generate_section(fx.owner, project.id, "Background", &[], false)
        .await
        .expect("section");
    assert_eq!(second.id, first.id);
    assert_eq!(second.version, 2);
    assert_eq!(second.content, "Second draft of the background.");

    let status = fx.service.content_status(fx.owner, project.id).await.expect("status");
    assert_eq!(status.total_sections, 4);
    assert_eq!(status.completed_sections, 1);
    assert_eq!(status.progress_percentage, 25.0);
    assert_eq!(status.total_words, 5);
    assert_eq!(status.target_words, 1000);

    fx.generator.push_reply(content_reply("Introduction", "Why groundwater matters."));
    let next = fx
        .service
        .generate_next_pending(fx.owner, project.id)
        .await
        .expect("next pending");
    assert_eq!(next.pending, vec!["Introduction", "Analysis", "Conclusion"]);
    assert_eq!(
        next.generated.map(|c| c.section_title),
        Some("Introduction".to_string())
    );

    let listed = fx.service.list_content(fx.owner, project.id).await.expect("list");
    let titles: Vec<&str> = listed.iter().map(|c| c.section_title.as_str()).collect();
    assert_eq!(titles, vec!["Introduction", "Background"]);

    let preview = fx.service.preview(fx.owner, project.id).await.expect("preview");
    assert_eq!(preview.table_of_contents.first().map(|e| e.page), Some(2));
    let preview_titles: Vec<&str> = preview
        .table_of_contents
        .iter()
        .map(|e| e.title.as_str())
        .collect();
    assert_eq!(preview_titles, vec!["Introduction", "Background", "Analysis"]);

    let store = Arc::new(InMemoryExportStore::new());
    let exports = ExportService::new(fx.db.clone(), store);
    let file = exports
        .export(fx.owner, project.id, None, ExportFormat::Markdown)
        .await
        .expect("export");
    assert!(file.filename.starts_with(&project.id.to_string()));
    assert!(file.filename.ends_with(".md"));

    let (format, data) = exports.download(fx.owner, &file.filename).await.expect("download");
    assert_eq!(format, ExportFormat::Markdown);
    let text = String::from_utf8(data.to_vec()).expect("utf8");
    assert!(text.starts_with("# Groundwater Policy"));
    assert!(text.contains("Second draft of the background."));
    assert!(text.contains("has not been generated yet"));
    assert_eq!(text.matches("Smith, J. (2020). Aquifers.").count(), 1);

    let previous = exports.previous_exports(fx.owner, project.id).await.expect("list exports");
    assert_eq!(previous.len(), 1);

    let pdf = exports.export(fx.owner, project.id, None, ExportFormat::Pdf).await;
    assert!(matches!(pdf, Err(ExportError::Render(_))));
}

#[tokio::test]
async fn other_users_see_nothing() {
    let fx = fixture();
    let intruder = fx.db.add_user_with_session("session-2");
    let project = fx
        .service
        .create_project(fx.owner, new_project("Private"))
        .await
        .expect("project");

    let peek = fx.service.get_project(intruder, project.id).await;
    assert!(matches!(peek, Err(ServiceError::NotFound(_))));
    let delete = fx.service.delete_project(intruder, project.id).await;
    assert!(matches!(delete, Err(ServiceError::NotFound(_))));
    assert!(fx.service.list_projects(intruder).await.expect("list").is_empty());

    let exports = ExportService::new(fx.db.clone(), Arc::new(InMemoryExportStore::new()));
    let filename = format!("{}_20240101_000000.md", project.id);
    let download = exports.download(intruder, &filename).await;
    assert!(matches!(download, Err(ExportError::NotFound(_))));
    let traversal = exports.download(fx.owner, "../etc/passwd.md").await;
    assert!(matches!(traversal, Err(ExportError::NotFound(_))));
}

#[tokio::test]
async fn invalid_requests_are_rejected_before_generation() {
    let fx = fixture();
    let empty = fx.service.create_project(fx.owner, new_project("  ")).await;
    assert!(matches!(empty, Err(ServiceError::InvalidRequest(_))));

    let project = fx
        .service
        .create_project(fx.owner, new_project("Zero pages"))
        .await
        .expect("project");
    let zero = fx
        .service
        .generate_outline(fx.owner, project.id, Complexity::Basic, 0)
        .await;
    assert!(matches!(zero, Err(ServiceError::InvalidRequest(_))));
    let huge = fx
        .service
        .generate_outline(fx.owner, project.id, Complexity::Basic, MAX_TOTAL_PAGES + 1)
        .await;
    assert!(matches!(huge, Err(ServiceError::InvalidRequest(_))));
    assert!(fx.generator.prompts().is_empty());
}

#[tokio::test]
async fn target_words_do_not_overflow_for_large_stored_outlines() {
    let fx = fixture();
    let project = fx
        .service
        .create_project(fx.owner, new_project("Legacy"))
        .await
        .expect("project");
    // Rows written before the page limit existed can still hold huge totals.
    let outline = fx
        .db
        .create_outline(project.id, &OutlineStructure::default(), 20_000_000)
        .await
        .expect("outline");
    fx.db.approve_outline(outline.id).await.expect("approve");

    let status = fx.service.content_status(fx.owner, project.id).await.expect("status");
    assert_eq!(status.target_words, 5_000_000_000);
    assert_eq!(status.word_percentage, 0.0);
}

#[tokio::test]
async fn padded_section_titles_resolve_to_the_outline_title() {
    let fx = fixture();
    let project = fx
        .service
        .create_project(fx.owner, new_project("Groundwater Policy"))
        .await
        .expect("project");
    fx.generator.push_reply(Ok(OUTLINE_REPLY.to_string()));
    let outline = fx
        .service
        .generate_outline(fx.owner, project.id, Complexity::Medium, 4)
        .await
        .expect("outline");
    fx.service.approve_outline(fx.owner, outline.id).await.expect("approve");

    fx.generator.push_reply(content_reply(" Background", "Padded request."));
    let first = fx
        .service
        .generate_section(fx.owner, project.id, " Background ", &[], false)
        .await
        .expect("section");
    assert_eq!(first.section_title, "Background");

    fx.generator.push_reply(content_reply("Background", "Exact request."));
    let second = fx
        .service
        .generate_section(fx.owner, project.id, "Background", &[], false)
        .await
        .expect("section");
    assert_eq!(second.id, first.id);
    assert_eq!(second.version, 2);

    let preview = fx.service.preview(fx.owner, project.id).await.expect("preview");
    assert!(preview.table_of_contents.iter().any(|e| e.title == "Background"));
}

#[tokio::test]
async fn recalculation_rebalances_unapproved_outline() {
    let fx = fixture();
    let project = fx
        .service
        .create_project(fx.owner, new_project("Groundwater Policy"))
        .await
        .expect("project");
    fx.generator.push_reply(Ok(OUTLINE_REPLY.to_string()));
    let outline = fx
        .service
        .generate_outline(fx.owner, project.id, Complexity::Advanced, 6)
        .await
        .expect("outline");

    let updated = fx
        .service
        .recalculate_outline_pages(fx.owner, outline.id)
        .await
        .expect("recalculate");
    assert!(updated.structure.has_valid_page_ranges());
    assert_eq!(
        updated.structure.sections.first().and_then(|s| s.page_range).map(|r| r.start),
        Some(1)
    );
    assert!((updated.structure.total_section_pages() - 6.0).abs() <= 0.5);
}
