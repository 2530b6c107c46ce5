//! HTTP route handlers: the backend command surface.
//!
//! Every mutation emits the matching change event after it succeeds so
//! connected clients can re-fetch.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Multipart, Path, Query, Request, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::analysis::{self, PdfSource};
use crate::autosave::{DraftInput, DraftStatus};
use crate::citations::{self, CitationExport, CitationFormat};
use crate::error::{AppError, Result};
use crate::events::ChangeEvent;
use crate::export::{self, ExportFormat};
use crate::import::{self, ImportOutcome};
use crate::indexing;
use crate::lookup;
use crate::models::*;
use crate::rename;
use crate::selection::{ClickMode, PaperFilter, PaperSelection};
use crate::smart_groups;
use crate::store::{PaperSort, DEFAULT_ID};
use crate::viewer::TabSet;
use crate::AppState;

// ============================================================================
// Extractors and helpers
// ============================================================================

/// `Json` whose rejections use the API error body.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(AppError::Validation(rejection.body_text())),
        }
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(AppError::MissingField(field))
}

fn success() -> Json<Value> {
    Json(json!({ "success": true }))
}

fn emit_papers_changed<I: IntoIterator<Item = String>>(state: &AppState, folder_ids: I) {
    let unique: BTreeSet<String> = folder_ids.into_iter().collect();
    for folder_id in unique {
        state.events.emit(ChangeEvent::PapersChanged { folder_id });
    }
}

/// Clean up everything outside the database that refers to a deleted paper.
fn forget_paper(state: &AppState, paper: &Paper) {
    if let Err(e) = import::remove_stored_pdf(&state.pdfs_dir(), &paper.pdf_path) {
        tracing::warn!(paper_id = %paper.id, error = %e, "failed to remove stored PDF");
    }
    state.tabs().close_paper(&paper.id);
    state.selection().remove(&paper.id);
}

async fn blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task).await?
}

// ============================================================================
// Topics
// ============================================================================

pub async fn list_topics(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Topic>>> {
    Ok(Json(state.store.list_topics()?))
}

pub async fn get_topic(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<Topic>> {
    Ok(Json(state.store.get_topic(&id)?))
}

pub async fn create_topic(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<CreateTopicInput>,
) -> Result<Json<Topic>> {
    let topic = state.store.create_topic(input)?;
    state.events.emit(ChangeEvent::TopicsChanged);
    Ok(Json(topic))
}

pub async fn update_topic(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UpdateTopicInput>,
) -> Result<Json<Topic>> {
    let topic = state.store.update_topic(&id, input)?;
    state.events.emit(ChangeEvent::TopicsChanged);
    Ok(Json(topic))
}

pub async fn delete_topic(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<Value>> {
    let folders = state.store.list_folders(Some(&id))?;
    let mut papers = Vec::new();
    for folder in &folders {
        papers.extend(state.store.list_papers(Some(&folder.id), PaperSort::Created)?);
    }

    state.store.delete_topic(&id)?;
    for paper in &papers {
        forget_paper(&state, paper);
    }
    tracing::info!(topic_id = %id, folders = folders.len(), papers = papers.len(), "topic deleted");

    state.events.emit(ChangeEvent::TopicsChanged);
    state.events.emit(ChangeEvent::FoldersChanged { topic_id: id });
    emit_papers_changed(&state, folders.into_iter().map(|f| f.id));
    Ok(success())
}

// ============================================================================
// Folders
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderQuery {
    pub topic_id: Option<String>,
}

pub async fn list_folders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FolderQuery>,
) -> Result<Json<Vec<Folder>>> {
    Ok(Json(state.store.list_folders(query.topic_id.as_deref())?))
}

pub async fn get_folder(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<Folder>> {
    Ok(Json(state.store.get_folder(&id)?))
}

pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<CreateFolderInput>,
) -> Result<Json<Folder>> {
    let folder = state.store.create_folder(input)?;
    state.events.emit(ChangeEvent::FoldersChanged {
        topic_id: folder.topic_id.clone(),
    });
    Ok(Json(folder))
}

pub async fn update_folder(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UpdateFolderInput>,
) -> Result<Json<Folder>> {
    let folder = state.store.update_folder(&id, input)?;
    state.events.emit(ChangeEvent::FoldersChanged {
        topic_id: folder.topic_id.clone(),
    });
    Ok(Json(folder))
}

pub async fn delete_folder(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<Value>> {
    let papers = state.store.list_papers(Some(&id), PaperSort::Created)?;
    let folder = state.store.delete_folder(&id)?;
    for paper in &papers {
        forget_paper(&state, paper);
    }
    tracing::info!(folder_id = %id, papers = papers.len(), "folder deleted");

    state.events.emit(ChangeEvent::FoldersChanged {
        topic_id: folder.topic_id,
    });
    emit_papers_changed(&state, [id]);
    Ok(success())
}

// ============================================================================
// Papers
// ============================================================================

pub async fn list_papers(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<PaperFilter>,
) -> Result<Json<Vec<Paper>>> {
    let papers = state.store.list_papers(filter.folder_id.as_deref(), filter.sort)?;
    let visible: Vec<Paper> = papers.into_iter().filter(|p| filter.matches(p)).collect();
    let ids: Vec<&str> = visible.iter().map(|p| p.id.as_str()).collect();
    // The list is being shown with this filter: hidden papers leave the selection.
    state.selection().retain_visible(&ids);
    Ok(Json(visible))
}

pub async fn get_paper(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<Paper>> {
    Ok(Json(state.store.get_paper(&id)?))
}

pub async fn create_paper(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<CreatePaperInput>,
) -> Result<Json<Paper>> {
    let paper = state.store.create_paper(input)?;
    emit_papers_changed(&state, [paper.folder_id.clone()]);
    Ok(Json(paper))
}

pub async fn update_paper(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UpdatePaperInput>,
) -> Result<Json<Paper>> {
    let before = state.store.get_paper(&id)?;
    let paper = state.store.update_paper(&id, input)?;
    if paper.title != before.title {
        state.tabs().rename_paper(&paper.id, &paper.title);
    }
    emit_papers_changed(&state, [before.folder_id, paper.folder_id.clone()]);
    Ok(Json(paper))
}

pub async fn delete_paper(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<Value>> {
    let paper = state.store.delete_paper(&id)?;
    forget_paper(&state, &paper);
    tracing::info!(paper_id = %id, "paper deleted");

    emit_papers_changed(&state, [paper.folder_id]);
    state.events.emit(ChangeEvent::HighlightsChanged { paper_id: id });
    Ok(success())
}

#[derive(Debug, Deserialize)]
pub struct DuplicateQuery {
    pub title: String,
}

pub async fn check_duplicate(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DuplicateQuery>,
) -> Result<Json<Value>> {
    let is_duplicate = state.store.check_duplicate(&query.title)?;
    Ok(Json(json!({ "isDuplicate": is_duplicate })))
}

pub async fn batch_update_papers(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<BatchUpdateRequest>,
) -> Result<Json<Vec<Paper>>> {
    let before: Vec<String> = request
        .paper_ids
        .iter()
        .filter_map(|id| state.store.get_paper(id).ok())
        .map(|p| p.folder_id)
        .collect();
    let papers = state.store.batch_update_papers(&request.paper_ids, &request.input)?;
    {
        let mut tabs = state.tabs();
        for paper in &papers {
            tabs.rename_paper(&paper.id, &paper.title);
        }
    }
    emit_papers_changed(&state, before.into_iter().chain(papers.iter().map(|p| p.folder_id.clone())));
    Ok(Json(papers))
}

pub async fn batch_delete_papers(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<BatchDeleteRequest>,
) -> Result<Json<Value>> {
    let deleted = state.store.batch_delete_papers(&request.paper_ids)?;
    for paper in &deleted {
        forget_paper(&state, paper);
        state.events.emit(ChangeEvent::HighlightsChanged {
            paper_id: paper.id.clone(),
        });
    }
    tracing::info!(count = deleted.len(), "papers deleted");
    emit_papers_changed(&state, deleted.iter().map(|p| p.folder_id.clone()));
    Ok(Json(json!({ "success": true, "deleted": deleted.len() })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadQuery {
    pub folder_id: Option<String>,
}

/// POST /api/papers/upload: multipart `file` fields, one paper per PDF.
pub async fn upload_pdf(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<Json<ImportReport>> {
    let folder_id = query.folder_id.unwrap_or_else(|| DEFAULT_ID.to_string());
    let mut report = ImportReport::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read upload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("document.pdf").to_string();
        if !import::is_pdf_path(std::path::Path::new(&filename)) {
            report.skipped.push(filename);
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read {}: {}", filename, e)))?;

        let store = state.store.clone();
        let pdfs_dir = state.pdfs_dir();
        let folder = folder_id.clone();
        let name = filename.clone();
        let outcome = blocking(move || import::import_upload(&store, &pdfs_dir, &name, &bytes, &folder)).await;
        match outcome {
            Ok(ImportOutcome::Imported(paper)) => report.imported.push(paper),
            Ok(ImportOutcome::Duplicate(_)) => report.duplicates.push(filename),
            Err(e) => report.failed.push(ImportFailure {
                path: filename,
                error: e.to_string(),
            }),
        }
    }

    if report.imported.is_empty() && report.duplicates.is_empty() && report.failed.is_empty() && report.skipped.is_empty() {
        return Err(AppError::MissingField("file"));
    }
    if !report.imported.is_empty() {
        emit_papers_changed(&state, [folder_id]);
    }
    Ok(Json(report))
}

// ============================================================================
// Highlights
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct HighlightQuery {
    pub page: Option<i32>,
}

pub async fn list_highlights(
    State(state): State<Arc<AppState>>,
    Path(paper_id): Path<String>,
    Query(query): Query<HighlightQuery>,
) -> Result<Json<Vec<Highlight>>> {
    Ok(Json(state.store.list_highlights(&paper_id, query.page)?))
}

pub async fn get_highlight(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<Highlight>> {
    Ok(Json(state.store.get_highlight(&id)?))
}

pub async fn create_highlight(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<CreateHighlightInput>,
) -> Result<Json<Highlight>> {
    let highlight = state.store.create_highlight(input)?;
    state.events.emit(ChangeEvent::HighlightsChanged {
        paper_id: highlight.paper_id.clone(),
    });
    Ok(Json(highlight))
}

pub async fn update_highlight(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UpdateHighlightInput>,
) -> Result<Json<Highlight>> {
    let highlight = state.store.update_highlight(&id, input)?;
    state.events.emit(ChangeEvent::HighlightsChanged {
        paper_id: highlight.paper_id.clone(),
    });
    Ok(Json(highlight))
}

pub async fn delete_highlight(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<Value>> {
    let highlight = state.store.delete_highlight(&id)?;
    state.events.emit(ChangeEvent::HighlightsChanged {
        paper_id: highlight.paper_id,
    });
    Ok(success())
}

// ============================================================================
// Writing projects and documents
// ============================================================================

pub async fn list_projects(State(state): State<Arc<AppState>>) -> Result<Json<Vec<WritingProject>>> {
    Ok(Json(state.store.list_projects()?))
}

pub async fn get_project(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<WritingProject>> {
    Ok(Json(state.store.get_project(&id)?))
}

pub async fn create_project(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<CreateWritingProjectInput>,
) -> Result<Json<WritingProject>> {
    let project = state.store.create_project(input)?;
    state.events.emit(ChangeEvent::WritingProjectsChanged);
    state.events.emit(ChangeEvent::WritingDocumentsChanged {
        project_id: project.id.clone(),
    });
    Ok(Json(project))
}

pub async fn update_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UpdateWritingProjectInput>,
) -> Result<Json<WritingProject>> {
    let project = state.store.update_project(&id, input)?;
    state.events.emit(ChangeEvent::WritingProjectsChanged);
    Ok(Json(project))
}

pub async fn open_project(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<WritingProject>> {
    let project = state.store.open_project(&id)?;
    state.events.emit(ChangeEvent::WritingProjectsChanged);
    Ok(Json(project))
}

pub async fn delete_project(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<Value>> {
    let documents = state.store.list_documents(&id)?;
    state.store.delete_project(&id)?;
    for doc in &documents {
        state.drafts.discard(&doc.id);
    }
    state.events.emit(ChangeEvent::WritingProjectsChanged);
    state.events.emit(ChangeEvent::WritingDocumentsChanged { project_id: id });
    Ok(success())
}

pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> Result<Json<Vec<WritingDocument>>> {
    state.store.get_project(&project_id)?;
    Ok(Json(state.store.list_documents(&project_id)?))
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

/// GET /api/projects/{id}/export?format=markdown|html
pub async fn export_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Response> {
    let project = state.store.get_project(&id)?;
    let requested = query.format.or_else(|| project.metadata.export_format.clone());
    let format = match requested {
        Some(name) => ExportFormat::parse(&name)
            .ok_or_else(|| AppError::Validation(format!("Unsupported export format: {}", name)))?,
        None => ExportFormat::default(),
    };
    let documents = state.store.list_documents(&id)?;
    let body = export::export_project(&project, &documents, format);
    let filename = format!("{}.{}", export::file_stem(&project.title), format.extension());

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
        ],
        body,
    )
        .into_response())
}

pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<WritingDocument>> {
    Ok(Json(state.store.get_document(&id)?))
}

pub async fn create_document(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<CreateWritingDocumentInput>,
) -> Result<Json<WritingDocument>> {
    let doc = state.store.create_document(input)?;
    state.events.emit(ChangeEvent::WritingDocumentsChanged {
        project_id: doc.project_id.clone(),
    });
    Ok(Json(doc))
}

pub async fn update_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(mut input): ApiJson<UpdateWritingDocumentInput>,
) -> Result<Json<WritingDocument>> {
    if input.word_count.is_none() {
        input.word_count = input.content.as_deref().map(export::word_count);
    }
    let doc = state.store.update_document(&id, input)?;
    state.events.emit(ChangeEvent::WritingDocumentsChanged {
        project_id: doc.project_id.clone(),
    });
    Ok(Json(doc))
}

pub async fn move_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<MoveWritingDocumentInput>,
) -> Result<Json<WritingDocument>> {
    let doc = state.store.move_document(&id, input)?;
    state.events.emit(ChangeEvent::WritingDocumentsChanged {
        project_id: doc.project_id.clone(),
    });
    Ok(Json(doc))
}

pub async fn delete_document(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<Value>> {
    let doc = state.store.get_document(&id)?;
    state.drafts.discard(&id);
    let removed = state.store.delete_document(&id)?;
    state.events.emit(ChangeEvent::WritingDocumentsChanged {
        project_id: doc.project_id,
    });
    Ok(Json(json!({ "success": true, "deleted": removed })))
}

/// PUT /api/documents/{id}/draft: debounced save of the editor content.
pub async fn save_draft(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(draft): ApiJson<DraftInput>,
) -> Result<Json<DraftStatus>> {
    Ok(Json(state.drafts.schedule(&id, draft)?))
}

pub async fn flush_draft(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<Value>> {
    let (flushed, document) = match state.drafts.flush(&id)? {
        Some(doc) => (true, doc),
        None => (false, state.store.get_document(&id)?),
    };
    Ok(Json(json!({ "flushed": flushed, "document": document })))
}

// ============================================================================
// Settings
// ============================================================================

pub async fn get_settings(State(state): State<Arc<AppState>>) -> Result<Json<AppSettings>> {
    Ok(Json(state.store.app_settings()?))
}

/// PUT /api/settings: `{key: value}` pairs; `null` or `""` removes a key.
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    ApiJson(changes): ApiJson<BTreeMap<String, Option<String>>>,
) -> Result<Json<AppSettings>> {
    let settings = state.store.update_settings(&changes)?;
    state.events.emit(ChangeEvent::SettingsChanged);
    Ok(Json(settings))
}

pub async fn list_settings(State(state): State<Arc<AppState>>) -> Result<Json<Vec<SettingValue>>> {
    Ok(Json(state.store.list_settings()?))
}

pub async fn get_setting(State(state): State<Arc<AppState>>, Path(key): Path<String>) -> Result<Json<SettingValue>> {
    let value = state.store.get_setting(&key)?;
    Ok(Json(SettingValue { key, value }))
}

#[derive(Debug, Deserialize)]
pub struct SetSettingRequest {
    pub value: String,
}

pub async fn set_setting(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    ApiJson(request): ApiJson<SetSettingRequest>,
) -> Result<Json<SettingValue>> {
    state.store.set_setting(&key, &request.value)?;
    state.events.emit(ChangeEvent::SettingsChanged);
    Ok(Json(SettingValue {
        key,
        value: Some(request.value),
    }))
}

pub async fn delete_setting(State(state): State<Arc<AppState>>, Path(key): Path<String>) -> Result<Json<Value>> {
    state.store.delete_setting(&key)?;
    state.events.emit(ChangeEvent::SettingsChanged);
    Ok(success())
}

// ============================================================================
// Import, indexing and search
// ============================================================================

fn emit_import(state: &AppState, report: &ImportReport) {
    if !report.imported.is_empty() {
        tracing::info!(
            imported = report.imported.len(),
            duplicates = report.duplicates.len(),
            failed = report.failed.len(),
            "import finished"
        );
        emit_papers_changed(state, report.imported.iter().map(|p| p.folder_id.clone()));
    }
}

/// POST /api/import: the drop handler. Non-PDF paths are skipped.
pub async fn import_paths(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<ImportRequest>,
) -> Result<Json<ImportReport>> {
    let store = state.store.clone();
    let pdfs_dir = state.pdfs_dir();
    let report = blocking(move || {
        Ok(import::import_paths(
            &store,
            &pdfs_dir,
            &request.paths,
            request.folder_id.as_deref(),
        ))
    })
    .await?;
    emit_import(&state, &report);
    Ok(Json(report))
}

pub async fn import_directory(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<ImportDirectoryRequest>,
) -> Result<Json<ImportReport>> {
    let store = state.store.clone();
    let pdfs_dir = state.pdfs_dir();
    let report = blocking(move || {
        import::import_directory(
            &store,
            &pdfs_dir,
            std::path::Path::new(&request.path),
            request.folder_id.as_deref(),
        )
    })
    .await?;
    emit_import(&state, &report);
    Ok(Json(report))
}

pub async fn index_paper(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<IndexingStatus>> {
    let store = state.store.clone();
    let paper_id = id.clone();
    let status = blocking(move || indexing::index_paper(&store, &paper_id)).await?;
    let paper = state.store.get_paper(&id)?;
    emit_papers_changed(&state, [paper.folder_id]);
    Ok(Json(status))
}

pub async fn index_all(State(state): State<Arc<AppState>>) -> Result<Json<Vec<IndexingStatus>>> {
    let store = state.store.clone();
    let statuses = blocking(move || indexing::index_all(&store)).await?;
    let folders: Vec<String> = statuses
        .iter()
        .filter(|s| s.is_complete)
        .filter_map(|s| state.store.get_paper(&s.paper_id).ok())
        .map(|p| p.folder_id)
        .collect();
    emit_papers_changed(&state, folders);
    Ok(Json(statuses))
}

pub async fn list_pages(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<Vec<PdfPage>>> {
    state.store.get_paper(&id)?;
    Ok(Json(state.store.list_pages(&id)?))
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FullTextQuery>,
) -> Result<Json<FullTextResponse>> {
    Ok(Json(indexing::search(&state.store, &query)?))
}

// ============================================================================
// AI analysis and text tools
// ============================================================================

/// POST /api/analyze `{paperId, pdfUrl, userId}`
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>> {
    let paper_id = required(request.paper_id, "paperId")?;
    let pdf_url = required(request.pdf_url, "pdfUrl")?;
    let user_id = required(request.user_id, "userId")?;

    let response = analysis::run_analysis(&state, &paper_id, PdfSource::Url(pdf_url), Some(&user_id)).await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAnalysisQuery {
    pub user_id: Option<String>,
}

/// POST /api/papers/{id}/analyze: analyse the paper's own PDF.
pub async fn analyze_stored_pdf(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<StoredAnalysisQuery>,
) -> Result<Json<AnalyzeResponse>> {
    let response = analysis::run_analysis(&state, &id, PdfSource::Stored, query.user_id.as_deref()).await?;
    Ok(Json(response))
}

pub async fn summarize(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<SummarizeRequest>,
) -> Result<Json<TextResponse>> {
    let text = analysis::summarize(&state, &request.text).await?;
    Ok(Json(TextResponse { text }))
}

pub async fn translate(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<TranslateRequest>,
) -> Result<Json<TextResponse>> {
    let text = analysis::translate(&state, &request.text, &request.target_lang).await?;
    Ok(Json(TextResponse { text }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupRequest {
    pub input: String,
    /// Apply the found metadata to this paper.
    pub paper_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LookupResponse {
    pub metadata: ExternalMetadata,
    pub paper: Option<Paper>,
}

pub async fn lookup_metadata(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<LookupRequest>,
) -> Result<Json<LookupResponse>> {
    if let Some(ref id) = request.paper_id {
        state.store.get_paper(id)?;
    }
    let metadata = lookup::lookup(&state.http, &request.input).await?;

    let paper = match request.paper_id {
        Some(id) => {
            let paper = state.store.update_paper(&id, lookup::to_paper_update(&metadata))?;
            state.tabs().rename_paper(&paper.id, &paper.title);
            emit_papers_changed(&state, [paper.folder_id.clone()]);
            Some(paper)
        }
        None => None,
    };
    Ok(Json(LookupResponse { metadata, paper }))
}

pub async fn search_scholar(
    State(state): State<Arc<AppState>>,
    Query(request): Query<ScholarSearchQuery>,
) -> Result<Json<ScholarSearchResponse>> {
    Ok(Json(lookup::search_scholar(&state.http, &request).await?))
}

// ============================================================================
// Smart groups
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SortQuery {
    pub sort: PaperSort,
}

pub async fn list_smart_groups(State(state): State<Arc<AppState>>) -> Result<Json<Vec<SmartGroup>>> {
    Ok(Json(state.store.list_smart_groups()?))
}

pub async fn predefined_smart_groups() -> Json<Vec<SmartGroup>> {
    Json(smart_groups::predefined_groups(chrono::Utc::now()))
}

pub async fn get_smart_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SmartGroup>> {
    Ok(Json(smart_groups::find_group(&state.store, &id)?))
}

pub async fn create_smart_group(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<CreateSmartGroupInput>,
) -> Result<Json<SmartGroup>> {
    let group = state.store.create_smart_group(input)?;
    state.events.emit(ChangeEvent::SmartGroupsChanged);
    Ok(Json(group))
}

pub async fn update_smart_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UpdateSmartGroupInput>,
) -> Result<Json<SmartGroup>> {
    let group = state.store.update_smart_group(&id, input)?;
    state.events.emit(ChangeEvent::SmartGroupsChanged);
    Ok(Json(group))
}

pub async fn delete_smart_group(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<Value>> {
    state.store.delete_smart_group(&id)?;
    state.events.emit(ChangeEvent::SmartGroupsChanged);
    Ok(success())
}

/// Papers of a built-in or saved group.
pub async fn smart_group_papers(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<SortQuery>,
) -> Result<Json<SmartGroupResult>> {
    let group = smart_groups::find_group(&state.store, &id)?;
    let papers = smart_groups::group_papers(&state.store, &group, query.sort)?;
    Ok(Json(SmartGroupResult {
        count: papers.len(),
        group,
        papers,
    }))
}

pub async fn evaluate_smart_group(
    State(state): State<Arc<AppState>>,
    ApiJson(query): ApiJson<SmartGroupQuery>,
) -> Result<Json<Vec<Paper>>> {
    let papers = state.store.list_papers(None, PaperSort::Created)?;
    Ok(Json(smart_groups::evaluate(
        papers,
        &query.criteria,
        query.match_mode,
        PaperSort::Created,
    )))
}

// ============================================================================
// PDF rename
// ============================================================================

pub async fn get_rename_config(State(state): State<Arc<AppState>>) -> Result<Json<RenameConfig>> {
    Ok(Json(state.store.rename_config()?))
}

pub async fn save_rename_config(
    State(state): State<Arc<AppState>>,
    ApiJson(config): ApiJson<RenameConfig>,
) -> Result<Json<RenameConfig>> {
    rename::validate_config(&config)?;
    state.store.save_rename_config(&config)?;
    state.events.emit(ChangeEvent::SettingsChanged);
    Ok(Json(config))
}

fn rename_config_for(state: &AppState, requested: Option<RenameConfig>) -> Result<RenameConfig> {
    match requested {
        Some(config) => {
            rename::validate_config(&config)?;
            Ok(config)
        }
        None => state.store.rename_config(),
    }
}

pub async fn preview_rename(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<RenameRequest>,
) -> Result<Json<RenameResult>> {
    let config = rename_config_for(&state, request.config)?;
    Ok(Json(rename::preview_rename(&state.store, &id, &config)?))
}

pub async fn rename_pdf(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<RenameRequest>,
) -> Result<Json<RenameResult>> {
    let config = rename_config_for(&state, request.config)?;
    let store = state.store.clone();
    let result = blocking(move || rename::rename_paper_pdf(&store, &id, &config)).await?;

    let paper = state.store.get_paper(&result.paper_id)?;
    emit_papers_changed(&state, [paper.folder_id]);
    Ok(Json(result))
}

pub async fn batch_rename_pdfs(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<BatchRenameRequest>,
) -> Result<Json<Vec<RenameResult>>> {
    let config = rename_config_for(&state, request.config)?;
    let store = state.store.clone();
    let paper_ids = request.paper_ids;
    let results = blocking(move || Ok(rename::batch_rename_pdfs(&store, &paper_ids, &config))).await?;

    let mut folders = Vec::new();
    for result in results.iter().filter(|r| r.success) {
        folders.push(state.store.get_paper(&result.paper_id)?.folder_id);
    }
    tracing::info!(
        renamed = folders.len(),
        failed = results.len() - folders.len(),
        "batch PDF rename finished"
    );
    emit_papers_changed(&state, folders);
    Ok(Json(results))
}

// ============================================================================
// Citations
// ============================================================================

fn citation_format(name: Option<&str>, default: CitationFormat) -> Result<CitationFormat> {
    match name {
        Some(name) => CitationFormat::parse(name)
            .ok_or_else(|| AppError::Validation(format!("Unsupported citation format: {}", name))),
        None => Ok(default),
    }
}

#[derive(Debug, Deserialize)]
pub struct CitationQuery {
    pub format: Option<String>,
}

pub async fn paper_citation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<CitationQuery>,
) -> Result<Json<CitationExport>> {
    let format = citation_format(query.format.as_deref(), CitationFormat::Apa)?;
    let paper = state.store.get_paper(&id)?;
    Ok(Json(citations::format_batch(&[paper], format)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationRequest {
    pub format: String,
    pub paper_ids: Option<Vec<String>>,
    pub folder_id: Option<String>,
}

/// POST /api/citations: explicit ids, else a folder, else the whole library.
pub async fn format_citations(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<CitationRequest>,
) -> Result<Json<CitationExport>> {
    let format = citation_format(Some(request.format.as_str()), CitationFormat::Apa)?;
    let papers = match request.paper_ids {
        Some(ids) => ids
            .iter()
            .map(|id| state.store.get_paper(id))
            .collect::<Result<Vec<_>>>()?,
        None => state.store.list_papers(request.folder_id.as_deref(), PaperSort::Name)?,
    };
    Ok(Json(citations::format_batch(&papers, format)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationExportQuery {
    pub format: Option<String>,
    pub folder_id: Option<String>,
}

/// GET /api/citations/export: a downloadable bibliography file.
pub async fn export_citations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CitationExportQuery>,
) -> Result<Response> {
    let format = citation_format(query.format.as_deref(), CitationFormat::Bibtex)?;
    let papers = state.store.list_papers(query.folder_id.as_deref(), PaperSort::Name)?;
    let export = citations::format_batch(&papers, format);
    let filename = format!("papers.{}", format.extension());

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
        ],
        export.content,
    )
        .into_response())
}

// ============================================================================
// Viewer tabs
// ============================================================================

pub async fn get_tabs(State(state): State<Arc<AppState>>) -> Json<TabSet> {
    Json(state.tabs().clone())
}

pub async fn open_tab(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<OpenTabRequest>,
) -> Result<Json<TabSet>> {
    let paper = state.store.get_paper(&request.paper_id)?;
    let mut tabs = state.tabs();
    tabs.open(&paper.id, &paper.title);
    Ok(Json(tabs.clone()))
}

pub async fn activate_tab(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<TabIndexRequest>,
) -> Result<Json<TabSet>> {
    let mut tabs = state.tabs();
    tabs.activate(request.index)?;
    Ok(Json(tabs.clone()))
}

pub async fn close_tab(State(state): State<Arc<AppState>>, Path(index): Path<usize>) -> Result<Json<TabSet>> {
    let mut tabs = state.tabs();
    tabs.close(index)?;
    Ok(Json(tabs.clone()))
}

// ============================================================================
// Paper list selection
// ============================================================================

fn visible_ids(state: &AppState, filter: &PaperFilter) -> Result<Vec<String>> {
    let papers = state.store.list_papers(None, PaperSort::Created)?;
    Ok(filter.apply(papers).into_iter().map(|p| p.id).collect())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickRequest {
    pub paper_id: String,
    #[serde(default)]
    pub mode: ClickMode,
    /// The filter the list is currently shown with.
    #[serde(default)]
    pub filter: PaperFilter,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SelectAllRequest {
    pub filter: PaperFilter,
}

pub async fn get_selection(State(state): State<Arc<AppState>>) -> Json<PaperSelection> {
    Json(state.selection().clone())
}

pub async fn click_paper(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<ClickRequest>,
) -> Result<Json<PaperSelection>> {
    state.store.get_paper(&request.paper_id)?;
    let visible = visible_ids(&state, &request.filter)?;
    let mut selection = state.selection();
    selection.click(&request.paper_id, request.mode, &visible);
    Ok(Json(selection.clone()))
}

pub async fn select_all(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<SelectAllRequest>,
) -> Result<Json<PaperSelection>> {
    let visible = visible_ids(&state, &request.filter)?;
    let mut selection = state.selection();
    selection.select_all(&visible);
    Ok(Json(selection.clone()))
}

pub async fn clear_selection(State(state): State<Arc<AppState>>) -> Json<PaperSelection> {
    let mut selection = state.selection();
    selection.clear();
    Json(selection.clone())
}
