use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use research_core::content_generator::page_failure_marker;
use research_core::testing::ScriptedGenerator;
use research_core::{
    Complexity, ContentGenerator, ContentRequest, GenerationError, Language, OutlineGenerator,
    OutlineRequest, OutlineStructure, Project,
};
use serde_json::json;
use uuid::Uuid;

fn project(language: Language) -> Project {
    Project {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        title: "Water Scarcity".into(),
        description: String::new(),
        language,
        citation_style: "APA".into(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn three_page_outline() -> OutlineStructure {
    OutlineStructure::from_value(&json!({
        "title": "Water Scarcity",
        "thesis_statement": "Scarcity is a governance problem.",
        "research_questions": ["Why?"],
        "sections": [{
            "title": "Background",
            "pages": 3,
            "page_range": {"start": 1, "end": 3},
            "subsections": [{"title": "History", "pages": 3, "key_points": ["Droughts"]}]
        }]
    }))
}

fn page_reply(text: &str, citation_id: &str) -> Result<String, String> {
    Ok(json!({
        "section_title": "Background",
        "content": text,
        "citations": [{"id": citation_id, "text": format!("Ref {citation_id}"), "source_type": "journal"}]
    })
    .to_string())
}

#[tokio::test]
async fn outline_pages_are_balanced_to_requested_total() {
    let reply = r#"```json
{
  "title": "Water Scarcity: Causes and Responses",
  "thesis_statement": "Water scarcity is driven by management as much as climate.",
  "research_questions": ["What drives scarcity?", "Which policies work?", "Who is most affected?"],
  "total_pages": 10,
  "sections": [
    {"title": "Introduction", "pages": "2", "subsections": []},
    {"title": "Literature Review", "pages": 4, "subsections": [{"title": "Climate", "pages": 2, "key_points": ["a", "b", "c"]}]},
    {"title": "Methodology", "pages": 3, "subsections": []},
    {"title": "Conclusion", "pages": 3, "subsections": []}
  ]
}
```"#;
    let generator = Arc::new(ScriptedGenerator::new(vec![Ok(reply.to_string())]));
    let outlines = OutlineGenerator::new(generator.clone());

    let outline = outlines
        .generate(&OutlineRequest {
            topic: "Water Scarcity",
            complexity: Complexity::Medium,
            language: "en",
            total_pages: 10,
        })
        .await
        .expect("outline");

    assert!(!outline.sections.is_empty());
    assert!((outline.total_section_pages() - 10.0).abs() <= 0.5);
    assert!(outline.has_valid_page_ranges());
    assert_eq!(outline.total_pages, Some(10));
    assert_eq!(generator.prompts().len(), 1);
    assert!(generator.prompts()[0].contains("Water Scarcity"));
}

#[tokio::test]
async fn outline_survives_unparseable_reply() {
    let generator = Arc::new(ScriptedGenerator::new(vec![Ok("I cannot help with that.".into())]));
    let outline = OutlineGenerator::new(generator)
        .generate(&OutlineRequest {
            topic: "Water Scarcity",
            complexity: Complexity::Basic,
            language: "ar",
            total_pages: 4,
        })
        .await
        .expect("fallback outline");

    assert_eq!(outline.title, "Water Scarcity");
    assert!(outline.parsing_error.is_some());
    assert_eq!(outline.sections.len(), 1);
}

#[tokio::test]
async fn outline_reports_collaborator_failure() {
    let generator = Arc::new(ScriptedGenerator::new(vec![Err("API key not configured".into())]));
    let result = OutlineGenerator::new(generator)
        .generate(&OutlineRequest {
            topic: "Water Scarcity",
            complexity: Complexity::Medium,
            language: "en",
            total_pages: 10,
        })
        .await;
    assert!(matches!(result, Err(GenerationError::Collaborator(msg)) if msg.contains("API key")));
}

#[tokio::test]
async fn failed_page_is_marked_and_generation_continues() {
    let generator = Arc::new(ScriptedGenerator::new(vec![
        page_reply("Page one text.", "c1"),
        Err("quota exceeded".into()),
        page_reply("Page three text.", "c1"),
    ]));
    let contents = ContentGenerator::new(generator.clone()).with_batch_pause(Duration::ZERO);

    let record = contents
        .generate(
            &project(Language::En),
            &three_page_outline(),
            &ContentRequest {
                section_title: "Background",
                subsection_titles: &[],
                citation_style: "APA",
                language: "en",
                page_by_page: true,
            },
        )
        .await
        .expect("partial content is still a result");

    assert!(record.content.starts_with("Page one text."));
    assert!(record.content.ends_with("Page three text."));
    assert_eq!(record.content.matches("[Content generation for page").count(), 1);
    assert!(record.content.contains(&page_failure_marker(
        2,
        "Text generation failed: An unexpected error occurred: quota exceeded"
    )));
    assert_eq!(record.citations.len(), 1);
    assert_eq!(generator.prompts().len(), 3);

    // Later pages carry the tail of earlier ones as context.
    assert!(generator.prompts()[2].contains("Page one text."));
}

#[tokio::test]
async fn unknown_section_and_language_short_circuit() {
    let generator = Arc::new(ScriptedGenerator::new(Vec::new()));
    let contents = ContentGenerator::new(generator.clone()).with_batch_pause(Duration::ZERO);
    let outline = three_page_outline();

    let missing = contents
        .generate(
            &project(Language::En),
            &outline,
            &ContentRequest {
                section_title: "Results",
                subsection_titles: &[],
                citation_style: "APA",
                language: "en",
                page_by_page: true,
            },
        )
        .await;
    assert!(matches!(missing, Err(GenerationError::SectionNotFound(_))));

    let unsupported = contents
        .generate(
            &project(Language::En),
            &outline,
            &ContentRequest {
                section_title: "Background",
                subsection_titles: &[],
                citation_style: "APA",
                language: "fr",
                page_by_page: true,
            },
        )
        .await;
    assert!(matches!(unsupported, Err(GenerationError::UnsupportedLanguage(_))));
    assert!(generator.prompts().is_empty());
}

#[tokio::test]
async fn single_shot_mode_uses_one_call() {
    let generator = Arc::new(ScriptedGenerator::new(vec![page_reply("Whole section.", "x")]));
    let record = ContentGenerator::new(generator.clone())
        .generate(
            &project(Language::En),
            &three_page_outline(),
            &ContentRequest {
                section_title: "Background",
                subsection_titles: &[],
                citation_style: "MLA",
                language: "en",
                page_by_page: false,
            },
        )
        .await
        .expect("content");

    assert_eq!(record.content, "Whole section.");
    assert_eq!(record.page_range.map(|r| r.end), Some(3));
    assert_eq!(generator.prompts().len(), 1);
    assert!(generator.prompts()[0].contains("approximately 750 words"));
}

#[tokio::test]
async fn arabic_introduction_uses_single_page_pseudo_section() {
    let generator = Arc::new(ScriptedGenerator::new(vec![Ok(
        "{«section_title»: «المقدمة»، «content»: «نص المقدمة»، «citations»: []}".to_string(),
    )]));
    let record = ContentGenerator::new(generator.clone())
        .with_batch_pause(Duration::ZERO)
        .generate(
            &project(Language::Ar),
            &three_page_outline(),
            &ContentRequest {
                section_title: "المقدمة",
                subsection_titles: &[],
                citation_style: "APA",
                language: "ar",
                page_by_page: true,
            },
        )
        .await
        .expect("content");

    assert_eq!(record.content, "نص المقدمة");
    assert_eq!(generator.prompts().len(), 1);
}
