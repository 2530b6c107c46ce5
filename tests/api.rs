//! End-to-end tests against the HTTP API on an ephemeral port.

use async_trait::async_trait;
use axum::{routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

use papershelf::analysis::llm::{ChatModel, ModelRequest};
use papershelf::analysis::ModelSet;
use papershelf::config::Config;
use papershelf::error::Result;
use papershelf::store::Store;
use papershelf::{router, AppState};

struct CannedModel(&'static str);

#[async_trait]
impl ChatModel for CannedModel {
    fn name(&self) -> &str {
        "canned"
    }

    async fn generate(&self, _request: ModelRequest) -> Result<String> {
        Ok(self.0.to_string())
    }
}

const ANALYSIS_JSON: &str = r#"```json
{"title": "Learned Title", "author": "Doe, Jane", "year": "2020", "keywords": "testing"}
```"#;

struct TestServer {
    base: String,
    client: reqwest::Client,
    state: Arc<AppState>,
    _dir: TempDir,
}

impl TestServer {
    async fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::for_data_dir(dir.path());
        config.allow_private_urls = true;
        let state = AppState::with_store(config, Store::temporary().unwrap())
            .unwrap()
            .with_models(ModelSet {
                primary: Arc::new(CannedModel(ANALYSIS_JSON)),
                verifier: None,
            });
        let state = Arc::new(state);

        let base = serve(router(Arc::clone(&state))).await;
        Self {
            base,
            client: reqwest::Client::new(),
            state,
            _dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.client.post(self.url(path)).json(&body).send().await.unwrap()
    }

    async fn get_json(&self, path: &str) -> Value {
        let response = self.client.get(self.url(path)).send().await.unwrap();
        assert!(response.status().is_success(), "GET {} failed", path);
        response.json().await.unwrap()
    }

    async fn create_paper(&self, title: &str) -> Value {
        let response = self
            .post("/api/papers", json!({ "folderId": "default", "title": title }))
            .await;
        assert_eq!(response.status(), 200);
        response.json().await.unwrap()
    }
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

// ============================================================================
// Analysis
// ============================================================================

#[tokio::test]
async fn test_analyze_reports_first_missing_field() {
    let server = TestServer::start().await;

    let response = server
        .post("/api/analyze", json!({ "pdfUrl": "http://x/a.pdf", "userId": "u1" }))
        .await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Missing required field: paperId");

    let response = server.post("/api/analyze", json!({ "paperId": "p1" })).await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Missing required field: pdfUrl");
    assert_eq!(body["code"], "MISSING_FIELD");

    let response = server
        .post("/api/analyze", json!({ "paperId": "p1", "pdfUrl": "http://x/a.pdf", "userId": "  " }))
        .await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Missing required field: userId");
}

#[tokio::test]
async fn test_analyze_malformed_body_is_bad_request() {
    let server = TestServer::start().await;
    let response = server
        .client
        .post(server.url("/api/analyze"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_analyze_fetch_failure_is_server_error() {
    let server = TestServer::start().await;
    let paper = server.create_paper("Unreachable").await;

    let closed = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = closed.local_addr().unwrap().port();
    drop(closed);

    let response = server
        .post(
            "/api/analyze",
            json!({
                "paperId": paper["id"],
                "pdfUrl": format!("http://127.0.0.1:{}/paper.pdf", port),
                "userId": "u1",
            }),
        )
        .await;
    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "FETCH_ERROR");
}

#[tokio::test]
async fn test_analyze_updates_paper_and_notifies() {
    let server = TestServer::start().await;
    let paper = server.create_paper("placeholder").await;
    let mut events = server.state.events.subscribe();

    let pdf_host = serve(Router::new().route(
        "/paper.pdf",
        get(|| async { ([("content-type", "application/pdf")], b"%PDF-1.4 test".to_vec()) }),
    ))
    .await;

    let response = server
        .post(
            "/api/analyze",
            json!({
                "paperId": paper["id"],
                "pdfUrl": format!("{}/paper.pdf", pdf_host),
                "userId": "reviewer",
            }),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["verified"], false);
    assert_eq!(body["result"]["title"], "Learned Title");

    let id = paper["id"].as_str().unwrap();
    let stored = server.get_json(&format!("/api/papers/{}", id)).await;
    assert_eq!(stored["title"], "Learned Title");
    assert_eq!(stored["year"], 2020);
    assert_eq!(stored["lastAnalyzedBy"], "reviewer");

    let mut channels = Vec::new();
    while let Ok(event) = events.try_recv() {
        channels.push(event.channel());
    }
    assert!(channels.contains(&"papers-changed"));
    assert!(channels.contains(&"analysis-completed"));
}

// ============================================================================
// Library
// ============================================================================

#[tokio::test]
async fn test_folder_and_paper_lifecycle() {
    let server = TestServer::start().await;

    let topic: Value = server
        .post("/api/topics", json!({ "name": "Methods" }))
        .await
        .json()
        .await
        .unwrap();
    let folder: Value = server
        .post("/api/folders", json!({ "topicId": topic["id"], "name": "Surveys" }))
        .await
        .json()
        .await
        .unwrap();

    let paper: Value = server
        .post("/api/papers", json!({ "folderId": folder["id"], "title": "A Survey", "year": 2019 }))
        .await
        .json()
        .await
        .unwrap();

    let listed = server
        .get_json(&format!("/api/papers?folderId={}", folder["id"].as_str().unwrap()))
        .await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let dup = server.get_json("/api/papers/check-duplicate?title=a%20survey").await;
    assert_eq!(dup["isDuplicate"], true);

    let folder_id = folder["id"].as_str().unwrap();
    let response = server
        .client
        .delete(server.url(&format!("/api/folders/{}", folder_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = server
        .client
        .get(server.url(&format!("/api/papers/{}", paper["id"].as_str().unwrap())))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_tabs_follow_paper_lifecycle() {
    let server = TestServer::start().await;
    let a = server.create_paper("First").await;
    let b = server.create_paper("Second").await;

    server.post("/api/tabs", json!({ "paperId": a["id"] })).await;
    let tabs: Value = server
        .post("/api/tabs", json!({ "paperId": b["id"] }))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(tabs["tabs"].as_array().unwrap().len(), 2);
    assert_eq!(tabs["activeIndex"], 1);

    let tabs: Value = server
        .post("/api/tabs", json!({ "paperId": a["id"] }))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(tabs["tabs"].as_array().unwrap().len(), 2);
    assert_eq!(tabs["activeIndex"], 0);

    server
        .client
        .delete(server.url(&format!("/api/papers/{}", a["id"].as_str().unwrap())))
        .send()
        .await
        .unwrap();
    let tabs = server.get_json("/api/tabs").await;
    assert_eq!(tabs["tabs"].as_array().unwrap().len(), 1);
    assert_eq!(tabs["tabs"][0]["title"], "Second");
    assert_eq!(tabs["activeIndex"], 0);

    let response = server.client.delete(server.url("/api/tabs/5")).send().await.unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_import_skips_non_pdf_entries() {
    let server = TestServer::start().await;
    let drop_dir = tempfile::tempdir().unwrap();
    let pdf = drop_dir.path().join("field_notes.pdf");
    let txt = drop_dir.path().join("notes.txt");
    let upper = drop_dir.path().join("SCAN.PDF");
    std::fs::write(&pdf, b"%PDF-1.4 dropped").unwrap();
    std::fs::write(&txt, b"%PDF-1.4 but not a pdf name").unwrap();
    std::fs::write(&upper, b"%PDF-1.4 upper case").unwrap();
    let paths: Vec<String> = [&pdf, &txt, &upper]
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();

    let response = server.post("/api/import", json!({ "paths": paths })).await;
    assert_eq!(response.status(), 200);
    let report: Value = response.json().await.unwrap();
    assert_eq!(report["imported"].as_array().unwrap().len(), 2);
    assert_eq!(report["skipped"], json!([paths[1]]));
    assert!(report["failed"].as_array().unwrap().is_empty());

    let papers = server.get_json("/api/papers").await;
    let titles: Vec<&str> = papers
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles.len(), 2);
    assert!(titles.contains(&"field notes"));
    assert!(!titles.iter().any(|t| t.contains("notes.txt") || *t == "notes"));
}

#[tokio::test]
async fn test_listing_with_filter_drops_hidden_selection() {
    let server = TestServer::start().await;
    let a = server.create_paper("Burnout in nursing").await;
    let b = server.create_paper("Sleep quality").await;

    server.post("/api/selection/all", json!({})).await;
    let selection = server.get_json("/api/selection").await;
    assert_eq!(selection["selected"].as_array().unwrap().len(), 2);

    let listed = server.get_json("/api/papers?query=burnout").await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let selection = server.get_json("/api/selection").await;
    assert_eq!(selection["selected"], json!([a["id"]]));
    assert_ne!(selection["selected"][0], b["id"]);
}

#[tokio::test]
async fn test_upload_and_citation_export() {
    let server = TestServer::start().await;

    let boundary = "papershelf-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"Deep Learning.pdf\"\r\n\
             Content-Type: application/pdf\r\n\r\n",
            b = boundary
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"%PDF-1.4 upload");
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    let response = server
        .client
        .post(server.url("/api/papers/upload"))
        .header("content-type", format!("multipart/form-data; boundary={}", boundary))
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let report: Value = response.json().await.unwrap();
    assert_eq!(report["imported"].as_array().unwrap().len(), 1);
    assert_eq!(report["imported"][0]["title"], "Deep Learning");

    let response = server
        .client
        .get(server.url("/api/citations/export?format=bibtex"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let disposition = response.headers()["content-disposition"].to_str().unwrap().to_string();
    assert!(disposition.contains("papers.bib"));
    let text = response.text().await.unwrap();
    assert!(text.contains("title = {Deep Learning}"));
}

#[tokio::test]
async fn test_writing_project_export() {
    let server = TestServer::start().await;
    let project: Value = server
        .post("/api/projects", json!({ "title": "Thesis" }))
        .await
        .json()
        .await
        .unwrap();
    let project_id = project["id"].as_str().unwrap();

    server
        .post(
            "/api/documents",
            json!({ "projectId": project_id, "parentId": project["rootDocumentId"], "title": "Introduction" }),
        )
        .await;

    let response = server
        .client
        .get(server.url(&format!("/api/projects/{}/export?format=markdown", project_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let markdown = response.text().await.unwrap();
    assert!(markdown.starts_with("# Thesis"));
    assert!(markdown.contains("Introduction"));

    let response = server
        .client
        .get(server.url(&format!("/api/projects/{}/export?format=pdf", project_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

// ============================================================================
// Smart groups, PDF rename, scholar search
// ============================================================================

#[tokio::test]
async fn test_smart_group_lifecycle() {
    let server = TestServer::start().await;
    let read = server.create_paper("Burnout in nursing").await;
    server.create_paper("Sleep quality").await;
    let important = server.create_paper("Staffing ratios").await;
    let put = |id: &Value, body: Value| {
        let url = server.url(&format!("/api/papers/{}", id.as_str().unwrap()));
        server.client.put(url).json(&body).send()
    };
    put(&read["id"], json!({ "isRead": true })).await.unwrap();
    put(&important["id"], json!({ "importance": 5 })).await.unwrap();

    let mut events = server.state.events.subscribe();
    let response = server
        .post(
            "/api/smart-groups",
            json!({
                "name": "Done or starred",
                "criteria": [
                    { "type": "byReadStatus", "value": true },
                    { "type": "favorites" }
                ],
                "matchMode": "or"
            }),
        )
        .await;
    assert_eq!(response.status(), 200);
    let group: Value = response.json().await.unwrap();
    assert_eq!(events.recv().await.unwrap().channel(), "smart-groups-changed");

    let result = server
        .get_json(&format!("/api/smart-groups/{}/papers?sort=name", group["id"].as_str().unwrap()))
        .await;
    assert_eq!(result["count"], 2);
    let titles: Vec<&str> = result["papers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Burnout in nursing", "Staffing ratios"]);

    let unread = server.get_json("/api/smart-groups/unread/papers").await;
    assert_eq!(unread["count"], 2);
    assert_eq!(unread["group"]["predefined"], true);

    let listed = server.get_json("/api/smart-groups").await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    let predefined = server.get_json("/api/smart-groups/predefined").await;
    assert!(predefined.as_array().unwrap().iter().any(|g| g["id"] == "no-pdf"));

    let response = server
        .client
        .delete(server.url(&format!("/api/smart-groups/{}", group["id"].as_str().unwrap())))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let response = server.client.get(server.url("/api/smart-groups/gone/papers")).send().await.unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_evaluate_unsaved_criteria() {
    let server = TestServer::start().await;
    server.create_paper("No file attached").await;

    let response = server
        .post("/api/smart-groups/evaluate", json!({ "criteria": [{ "type": "hasPdf" }] }))
        .await;
    assert_eq!(response.status(), 200);
    let papers: Value = response.json().await.unwrap();
    assert!(papers.as_array().unwrap().is_empty());

    let response = server
        .post("/api/smart-groups/evaluate", json!({ "criteria": [{ "type": "noPdf" }] }))
        .await;
    let papers: Value = response.json().await.unwrap();
    assert_eq!(papers.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_rename_pdf_follows_metadata() {
    let server = TestServer::start().await;
    let drop_dir = tempfile::tempdir().unwrap();
    let source = drop_dir.path().join("scan_0042.pdf");
    std::fs::write(&source, b"%PDF-1.4 renamed").unwrap();
    let report: Value = server
        .post("/api/import", json!({ "paths": [source.to_string_lossy()] }))
        .await
        .json()
        .await
        .unwrap();
    let paper = &report["imported"][0];
    let id = paper["id"].as_str().unwrap();
    let old_path = paper["pdfPath"].as_str().unwrap().to_string();

    server
        .client
        .put(server.url(&format!("/api/papers/{}", id)))
        .json(&json!({ "author": "Park, Ji-Yeon", "year": 2019, "title": "Nurse burnout" }))
        .send()
        .await
        .unwrap();

    let preview: Value = server
        .post(&format!("/api/papers/{}/rename-pdf/preview", id), json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(preview["newFilename"], "Park_2019_Nurse_burnout.pdf");
    assert!(std::path::Path::new(&old_path).is_file());

    let response = server.post(&format!("/api/papers/{}/rename-pdf", id), json!({})).await;
    assert_eq!(response.status(), 200);
    let result: Value = response.json().await.unwrap();
    assert_eq!(result["newPath"], preview["newPath"]);
    assert!(std::path::Path::new(result["newPath"].as_str().unwrap()).is_file());
    assert!(!std::path::Path::new(&old_path).exists());

    let stored = server.get_json(&format!("/api/papers/{}", id)).await;
    assert_eq!(stored["pdfPath"], result["newPath"]);

    let response = server
        .client
        .put(server.url("/api/rename-config"))
        .json(&json!({ "pattern": "paper" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = server
        .client
        .put(server.url("/api/rename-config"))
        .json(&json!({ "pattern": "{year}_{author}", "lowercase": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let results: Value = server
        .post("/api/papers/batch-rename-pdf", json!({ "paperIds": [id, "missing"] }))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(results[0]["newFilename"], "2019_park.pdf");
    assert_eq!(results[1]["success"], false);
}

#[tokio::test]
async fn test_scholar_search_requires_query() {
    let server = TestServer::start().await;
    let response = server
        .client
        .get(server.url("/api/scholar/search?query=%20&source=arxiv"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Missing required field: query");
}
