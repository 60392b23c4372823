use std::io::{Cursor, Read};
use std::sync::Arc;
use std::time::Duration;

use api_lib::adapters::DocxRenderer;
use research_core::ports::DatabaseService;
use research_core::testing::{InMemoryDatabase, InMemoryExportStore, ScriptedGenerator};
use research_core::{
    Complexity, ContentGenerator, ExportFormat, ExportService, Language, NewProject,
    OutlineGenerator, OutlineStructure, ResearchService, Section,
};
use serde_json::json;
use uuid::Uuid;

struct Fixture {
    db: Arc<InMemoryDatabase>,
    generator: Arc<ScriptedGenerator>,
    service: ResearchService,
    exports: ExportService,
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
    let exports = ExportService::new(db.clone(), Arc::new(InMemoryExportStore::new()))
        .with_renderer(Arc::new(DocxRenderer));
    let owner = db.add_user_with_session("session-1");
    Fixture { db, generator, service, exports, owner }
}

fn section_reply(title: &str, text: &str) -> Result<String, String> {
    Ok(json!({
        "section_title": title,
        "content": text,
        "citations": [{"id": "smith2020", "text": "Smith, J. (2020). Aquifers.", "source_type": "journal"}]
    })
    .to_string())
}

async fn new_project(fx: &Fixture, title: &str, language: Language) -> Uuid {
    fx.service
        .create_project(
            fx.owner,
            NewProject {
                title: title.into(),
                description: String::new(),
                language,
                citation_style: "APA".into(),
            },
        )
        .await
        .expect("project")
        .id
}

/// Creates a project with an approved outline of the given sections.
async fn approved_project(fx: &Fixture, title: &str, language: Language, sections: &[&str]) -> Uuid {
    let project_id = new_project(fx, title, language).await;

    let outline = json!({
        "title": title,
        "thesis_statement": "Local enforcement decides outcomes.",
        "research_questions": ["Which limits work?", "Who pays?"],
        "sections": sections
            .iter()
            .map(|s| json!({"title": s, "pages": 1, "subsections": []}))
            .collect::<Vec<_>>(),
    });
    fx.generator.push_reply(Ok(outline.to_string()));
    let outline = fx
        .service
        .generate_outline(fx.owner, project_id, Complexity::Basic, sections.len() as u32)
        .await
        .expect("outline");
    fx.service.approve_outline(fx.owner, outline.id).await.expect("approve");
    project_id
}

/// The XML that follows the last run whose text is exactly `text`.
fn after_run<'x>(xml: &'x str, text: &str) -> &'x str {
    let marker = format!(">{}</w:t>", text);
    let at = xml.rfind(&marker).expect("run present");
    &xml[at + marker.len()..]
}

async fn document_xml(fx: &Fixture, project_id: Uuid) -> String {
    let file = fx
        .exports
        .export(fx.owner, project_id, None, ExportFormat::Docx)
        .await
        .expect("export");
    assert!(file.filename.ends_with(".docx"));

    let (format, bytes) = fx.exports.download(fx.owner, &file.filename).await.expect("download");
    assert_eq!(format, ExportFormat::Docx);

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).expect("docx is a zip archive");
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .expect("document part")
        .read_to_string(&mut xml)
        .expect("utf-8 document");
    xml
}

#[tokio::test]
async fn docx_contains_structure_content_and_deduplicated_references() {
    let fx = fixture();
    let project_id = approved_project(&fx, "Groundwater Policy", Language::En, &["Background", "Analysis"]).await;

    fx.generator.push_reply(section_reply(
        "Background",
        "Key findings:\n\n- Wells are drying\n- Costs are rising",
    ));
    fx.service
        .generate_section(fx.owner, project_id, "Background", &[], false)
        .await
        .expect("background");
    fx.generator.push_reply(section_reply("Analysis", "Enforcement varies by district."));
    fx.service
        .generate_section(fx.owner, project_id, "Analysis", &[], false)
        .await
        .expect("analysis");

    let xml = document_xml(&fx, project_id).await;

    assert!(xml.contains("Groundwater Policy"));
    assert!(xml.contains(r#"w:val="Title""#));
    assert!(xml.contains(r#"w:val="Heading1""#));
    assert!(xml.contains(r#"w:type="page""#));
    assert!(xml.contains("Table of Contents"));
    assert!(xml.contains("Background ....."));
    assert!(xml.contains("• Wells are drying"));
    assert!(xml.contains("Enforcement varies by district."));
    assert!(xml.contains("1. Which limits work?"));
    assert_eq!(xml.matches("Smith, J. (2020). Aquifers.").count(), 1);
    assert!(!xml.contains(r#"w:val="right""#));

    // The thesis sits on its own page ahead of the questions.
    let after_thesis = after_run(&xml, "Local enforcement decides outcomes.");
    let questions_heading = after_thesis.find(">Research Questions</w:t>").expect("questions heading");
    assert!(after_thesis[..questions_heading].contains(r#"w:type="page""#));
}

#[tokio::test]
async fn missing_sections_get_a_placeholder() {
    let fx = fixture();
    let project_id = approved_project(&fx, "Groundwater Policy", Language::En, &["Background"]).await;

    let xml = document_xml(&fx, project_id).await;

    assert!(xml.contains("Content for this section has not been generated yet."));
}

#[tokio::test]
async fn empty_content_gets_a_placeholder_and_no_references() {
    let fx = fixture();
    let project_id = approved_project(&fx, "Groundwater Policy", Language::En, &["Background"]).await;

    fx.generator.push_reply(Ok(json!({
        "section_title": "Background",
        "content": "",
        "citations": []
    })
    .to_string()));
    let stored = fx
        .service
        .generate_section(fx.owner, project_id, "Background", &[], false)
        .await
        .expect("background");
    assert!(stored.content.is_empty());

    let xml = document_xml(&fx, project_id).await;

    let background = after_run(&xml, "Background");
    assert!(background.contains("Content for this section has not been generated yet."));
    // Nothing is listed under the references heading.
    let references = after_run(&xml, "References");
    assert!(!references.contains("<w:t>") && !references.contains("<w:t "));
}

#[tokio::test]
async fn thesis_and_questions_are_left_out_when_absent() {
    let fx = fixture();
    let project_id = new_project(&fx, "Groundwater Policy", Language::En).await;
    let structure = OutlineStructure {
        title: "Groundwater Policy".into(),
        sections: vec![Section::single_page("Background")],
        ..Default::default()
    };
    let outline = fx.db.create_outline(project_id, &structure, 1).await.expect("outline");
    fx.db.approve_outline(outline.id).await.expect("approve");

    let xml = document_xml(&fx, project_id).await;

    assert!(!xml.contains("Thesis Statement"));
    assert!(!xml.contains("Research Questions"));
    assert!(xml.contains("Background ....."));
    assert!(xml.contains("References ....."));
}

#[tokio::test]
async fn arabic_docx_is_right_aligned() {
    let fx = fixture();
    let project_id = approved_project(&fx, "ندرة المياه", Language::Ar, &["الخلفية"]).await;

    fx.generator.push_reply(section_reply("الخلفية", "تعاني المنطقة من نقص المياه."));
    fx.service
        .generate_section(fx.owner, project_id, "الخلفية", &[], false)
        .await
        .expect("section");

    let xml = document_xml(&fx, project_id).await;

    assert!(xml.contains(r#"w:val="right""#));
    assert!(xml.contains("المراجع"));
    assert!(xml.contains("تعاني المنطقة من نقص المياه."));
}
