//! papershelf - backend for an academic paper library.
//!
//! The crate owns persistence (sled), exposes the command surface as a JSON
//! HTTP API, publishes change notifications over Server-Sent Events and runs
//! the AI metadata analysis pipeline.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

pub mod analysis;
pub mod autosave;
pub mod citations;
pub mod config;
pub mod error;
pub mod events;
pub mod export;
pub mod handlers;
pub mod import;
pub mod indexing;
pub mod lookup;
pub mod models;
pub mod rename;
pub mod selection;
pub mod smart_groups;
pub mod store;
pub mod url_validator;
pub mod viewer;

use analysis::ModelSet;
use autosave::DraftSaver;
use config::Config;
use error::Result;
use events::EventBus;
use selection::PaperSelection;
use store::Store;
use viewer::TabSet;

// ============================================================================
// Application State
// ============================================================================

pub struct AppState {
    pub config: Config,
    pub store: Store,
    pub events: EventBus,
    pub http: reqwest::Client,
    pub tabs: Mutex<TabSet>,
    pub selection: Mutex<PaperSelection>,
    pub drafts: DraftSaver,
    /// Replaces the settings-derived models (tests, local stubs).
    pub models_override: Option<ModelSet>,
}

impl AppState {
    /// Open the database under the configured data directory.
    pub fn new(config: Config) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;
        let store = Store::open(&config.db_path())?;
        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: Store) -> Result<Self> {
        fs::create_dir_all(config.pdfs_dir())?;
        let events = EventBus::new();
        let drafts = DraftSaver::new(store.clone(), events.clone(), config.autosave_delay);

        Ok(Self {
            http: lookup::lookup_client()?,
            tabs: Mutex::new(TabSet::new()),
            selection: Mutex::new(PaperSelection::new()),
            models_override: None,
            config,
            store,
            events,
            drafts,
        })
    }

    pub fn with_models(mut self, models: ModelSet) -> Self {
        self.models_override = Some(models);
        self
    }

    pub fn pdfs_dir(&self) -> PathBuf {
        self.config.pdfs_dir()
    }

    pub fn tabs(&self) -> MutexGuard<'_, TabSet> {
        self.tabs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn selection(&self) -> MutexGuard<'_, PaperSelection> {
        self.selection.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Write pending drafts and flush the database.
    pub fn shutdown(&self) -> Result<()> {
        let saved = self.drafts.flush_all();
        if saved > 0 {
            tracing::info!(saved, "flushed pending drafts");
        }
        self.store.flush()
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: Arc<AppState>) -> Router {
    let upload_limit = usize::try_from(state.config.max_pdf_bytes).unwrap_or(usize::MAX);
    let pdfs = ServeDir::new(state.pdfs_dir());

    Router::new()
        // Topics and folders
        .route("/api/topics", get(handlers::list_topics).post(handlers::create_topic))
        .route(
            "/api/topics/{id}",
            get(handlers::get_topic)
                .put(handlers::update_topic)
                .delete(handlers::delete_topic),
        )
        .route("/api/folders", get(handlers::list_folders).post(handlers::create_folder))
        .route(
            "/api/folders/{id}",
            get(handlers::get_folder)
                .put(handlers::update_folder)
                .delete(handlers::delete_folder),
        )
        // Papers
        .route("/api/papers", get(handlers::list_papers).post(handlers::create_paper))
        .route("/api/papers/check-duplicate", get(handlers::check_duplicate))
        .route("/api/papers/batch-update", post(handlers::batch_update_papers))
        .route("/api/papers/batch-delete", post(handlers::batch_delete_papers))
        .route(
            "/api/papers/upload",
            post(handlers::upload_pdf).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/api/papers/{id}",
            get(handlers::get_paper)
                .put(handlers::update_paper)
                .delete(handlers::delete_paper),
        )
        .route("/api/papers/{id}/analyze", post(handlers::analyze_stored_pdf))
        .route("/api/papers/{id}/index", post(handlers::index_paper))
        .route("/api/papers/{id}/pages", get(handlers::list_pages))
        .route("/api/papers/{id}/highlights", get(handlers::list_highlights))
        .route("/api/papers/{id}/citation", get(handlers::paper_citation))
        .route("/api/papers/{id}/rename-pdf", post(handlers::rename_pdf))
        .route("/api/papers/{id}/rename-pdf/preview", post(handlers::preview_rename))
        .route("/api/papers/batch-rename-pdf", post(handlers::batch_rename_pdfs))
        .route(
            "/api/rename-config",
            get(handlers::get_rename_config).put(handlers::save_rename_config),
        )
        // Smart groups
        .route(
            "/api/smart-groups",
            get(handlers::list_smart_groups).post(handlers::create_smart_group),
        )
        .route("/api/smart-groups/predefined", get(handlers::predefined_smart_groups))
        .route("/api/smart-groups/evaluate", post(handlers::evaluate_smart_group))
        .route(
            "/api/smart-groups/{id}",
            get(handlers::get_smart_group)
                .put(handlers::update_smart_group)
                .delete(handlers::delete_smart_group),
        )
        .route("/api/smart-groups/{id}/papers", get(handlers::smart_group_papers))
        // Highlights
        .route("/api/highlights", post(handlers::create_highlight))
        .route(
            "/api/highlights/{id}",
            get(handlers::get_highlight)
                .put(handlers::update_highlight)
                .delete(handlers::delete_highlight),
        )
        // Writing
        .route("/api/projects", get(handlers::list_projects).post(handlers::create_project))
        .route(
            "/api/projects/{id}",
            get(handlers::get_project)
                .put(handlers::update_project)
                .delete(handlers::delete_project),
        )
        .route("/api/projects/{id}/open", post(handlers::open_project))
        .route("/api/projects/{id}/documents", get(handlers::list_documents))
        .route("/api/projects/{id}/export", get(handlers::export_project))
        .route("/api/documents", post(handlers::create_document))
        .route(
            "/api/documents/{id}",
            get(handlers::get_document)
                .put(handlers::update_document)
                .delete(handlers::delete_document),
        )
        .route("/api/documents/{id}/move", post(handlers::move_document))
        .route("/api/documents/{id}/draft", put(handlers::save_draft))
        .route("/api/documents/{id}/flush", post(handlers::flush_draft))
        // Settings
        .route("/api/settings", get(handlers::get_settings).put(handlers::update_settings))
        .route("/api/settings/raw", get(handlers::list_settings))
        .route(
            "/api/settings/raw/{key}",
            get(handlers::get_setting)
                .put(handlers::set_setting)
                .delete(handlers::delete_setting),
        )
        // Import, indexing, search
        .route("/api/import", post(handlers::import_paths))
        .route("/api/import/directory", post(handlers::import_directory))
        .route("/api/index", post(handlers::index_all))
        .route("/api/search", get(handlers::search))
        // AI
        .route("/api/analyze", post(handlers::analyze))
        .route("/api/summarize", post(handlers::summarize))
        .route("/api/translate", post(handlers::translate))
        .route("/api/lookup", post(handlers::lookup_metadata))
        .route("/api/scholar/search", get(handlers::search_scholar))
        // Citations
        .route("/api/citations", post(handlers::format_citations))
        .route("/api/citations/export", get(handlers::export_citations))
        // Viewer tabs and list selection
        .route("/api/tabs", get(handlers::get_tabs).post(handlers::open_tab))
        .route("/api/tabs/activate", post(handlers::activate_tab))
        .route("/api/tabs/{index}", axum::routing::delete(handlers::close_tab))
        .route(
            "/api/selection",
            get(handlers::get_selection).delete(handlers::clear_selection),
        )
        .route("/api/selection/click", post(handlers::click_paper))
        .route("/api/selection/all", post(handlers::select_all))
        // Change notifications
        .route("/api/events", get(events::events_stream))
        .nest_service("/pdfs", pdfs)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
