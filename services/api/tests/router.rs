use std::sync::Arc;
use std::time::Duration;

use api_lib::web::{self, state::AppState};
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use research_core::testing::{InMemoryDatabase, InMemoryExportStore, ScriptedGenerator};
use research_core::{ContentGenerator, ExportService, OutlineGenerator, ResearchService};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> (Router, Arc<InMemoryDatabase>) {
    let db = Arc::new(InMemoryDatabase::new());
    let generator = Arc::new(ScriptedGenerator::new(Vec::new()));
    let research = ResearchService::new(
        db.clone(),
        OutlineGenerator::new(generator.clone()),
        ContentGenerator::new(generator).with_batch_pause(Duration::ZERO),
    );
    let exports = ExportService::new(db.clone(), Arc::new(InMemoryExportStore::new()));
    let state = Arc::new(AppState {
        db: db.clone(),
        research: Arc::new(research),
        exports: Arc::new(exports),
    });
    (web::router(state), db)
}

fn request(method: &str, uri: &str, session: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(session) = session {
        builder = builder.header(header::COOKIE, format!("theme=dark; session={}", session));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn requests_without_a_valid_session_are_rejected() {
    let (app, _db) = app();

    let response = app.clone().oneshot(request("GET", "/projects", None, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(request("GET", "/projects", Some("forged"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn projects_are_created_listed_and_scoped_to_their_owner() {
    let (app, db) = app();
    db.add_user_with_session("alice");
    db.add_user_with_session("bob");

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/projects",
            Some("alice"),
            Some(json!({"title": "Water Scarcity", "language": "ar"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json_body(response).await;
    assert_eq!(created["language"], "ar");
    assert_eq!(created["citation_style"], "APA");
    let project_id = created["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(request("GET", "/projects", Some("alice"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = json_body(response).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let response = app
        .clone()
        .oneshot(request("GET", &format!("/projects/{}", project_id), Some("bob"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(request("DELETE", &format!("/projects/{}", project_id), Some("alice"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(request("GET", &format!("/projects/{}", project_id), Some("alice"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_input_is_a_bad_request() {
    let (app, db) = app();
    db.add_user_with_session("alice");

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/projects",
            Some("alice"),
            Some(json!({"title": "Eau", "language": "fr"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/projects",
            Some("alice"),
            Some(json!({"title": "Water", "language": "en"})),
        ))
        .await
        .unwrap();
    let project_id = json_body(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/projects/{}/export/odt", project_id),
            Some("alice"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Content generation needs an approved outline.
    let response = app
        .oneshot(request(
            "GET",
            &format!("/projects/{}/content-status", project_id),
            Some("alice"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
