//! Data models for the paper library.
//!
//! Records are serialized as camelCase JSON, both on the wire and inside the
//! sled trees. Update inputs carry `Option` fields: `None` keeps the stored
//! value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Topics and Folders
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: String,
    pub name: String,
    pub color: String,
    pub icon: String,
    pub sort_order: i32,
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTopicInput {
    pub name: String,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTopicInput {
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub sort_order: Option<i32>,
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub topic_id: String,
    pub name: String,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderInput {
    pub topic_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFolderInput {
    pub name: Option<String>,
    pub sort_order: Option<i32>,
}

// ============================================================================
// Papers
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Paper {
    pub id: String,
    pub folder_id: String,
    pub paper_number: i32,

    // Bibliographic info
    pub keywords: String,
    pub author: String,
    pub year: i32,
    pub title: String,
    pub publisher: String,
    pub subject: String,

    // Research design
    pub purposes: Vec<String>,
    pub is_qualitative: bool,
    pub is_quantitative: bool,
    pub qual_tools: Vec<String>,
    pub vars_independent: Vec<String>,
    pub vars_dependent: Vec<String>,
    pub vars_moderator: Vec<String>,
    pub vars_mediator: Vec<String>,
    pub vars_others: Vec<String>,
    pub quant_techniques: Vec<String>,

    // Findings
    pub results: Vec<String>,
    pub limitations: Vec<String>,
    pub implications: Vec<String>,
    pub future_plans: Vec<String>,

    // File management
    pub pdf_path: String,
    pub pdf_filename: String,
    pub file_hash: String,

    // User metadata
    pub user_notes: String,
    pub tags: Vec<String>,
    pub is_read: bool,
    pub importance: i32,
    pub is_indexed: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_analyzed_at: Option<DateTime<Utc>>,
    pub last_analyzed_by: Option<String>,
}

impl Paper {
    pub fn has_pdf(&self) -> bool {
        !self.pdf_path.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaperInput {
    pub folder_id: String,
    pub title: String,
    pub author: Option<String>,
    pub year: Option<i32>,
    pub pdf_path: Option<String>,
    pub pdf_filename: Option<String>,
    pub file_hash: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaperInput {
    pub folder_id: Option<String>,
    pub keywords: Option<String>,
    pub author: Option<String>,
    pub year: Option<i32>,
    pub title: Option<String>,
    pub publisher: Option<String>,
    pub subject: Option<String>,
    pub purposes: Option<Vec<String>>,
    pub is_qualitative: Option<bool>,
    pub is_quantitative: Option<bool>,
    pub qual_tools: Option<Vec<String>>,
    pub vars_independent: Option<Vec<String>>,
    pub vars_dependent: Option<Vec<String>>,
    pub vars_moderator: Option<Vec<String>>,
    pub vars_mediator: Option<Vec<String>>,
    pub vars_others: Option<Vec<String>>,
    pub quant_techniques: Option<Vec<String>>,
    pub results: Option<Vec<String>>,
    pub limitations: Option<Vec<String>>,
    pub implications: Option<Vec<String>>,
    pub future_plans: Option<Vec<String>>,
    pub pdf_path: Option<String>,
    pub pdf_filename: Option<String>,
    pub user_notes: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_read: Option<bool>,
    pub importance: Option<i32>,
}

impl UpdatePaperInput {
    /// Overwrite every field that is `Some` on `paper`.
    pub fn apply_to(self, paper: &mut Paper) {
        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(v) = value {
                *slot = v;
            }
        }

        set(&mut paper.folder_id, self.folder_id);
        set(&mut paper.keywords, self.keywords);
        set(&mut paper.author, self.author);
        set(&mut paper.year, self.year);
        set(&mut paper.title, self.title);
        set(&mut paper.publisher, self.publisher);
        set(&mut paper.subject, self.subject);
        set(&mut paper.purposes, self.purposes);
        set(&mut paper.is_qualitative, self.is_qualitative);
        set(&mut paper.is_quantitative, self.is_quantitative);
        set(&mut paper.qual_tools, self.qual_tools);
        set(&mut paper.vars_independent, self.vars_independent);
        set(&mut paper.vars_dependent, self.vars_dependent);
        set(&mut paper.vars_moderator, self.vars_moderator);
        set(&mut paper.vars_mediator, self.vars_mediator);
        set(&mut paper.vars_others, self.vars_others);
        set(&mut paper.quant_techniques, self.quant_techniques);
        set(&mut paper.results, self.results);
        set(&mut paper.limitations, self.limitations);
        set(&mut paper.implications, self.implications);
        set(&mut paper.future_plans, self.future_plans);
        set(&mut paper.pdf_path, self.pdf_path);
        set(&mut paper.pdf_filename, self.pdf_filename);
        set(&mut paper.user_notes, self.user_notes);
        set(&mut paper.tags, self.tags);
        set(&mut paper.is_read, self.is_read);
        set(&mut paper.importance, self.importance);
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateRequest {
    pub paper_ids: Vec<String>,
    pub input: UpdatePaperInput,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDeleteRequest {
    pub paper_ids: Vec<String>,
}

// ============================================================================
// Smart Groups
// ============================================================================

/// One condition of a smart group. Serialized as `{"type": ..., "value": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum SmartGroupCriterion {
    ByYear(i32),
    /// Inclusive on both ends.
    ByYearRange { start: i32, end: i32 },
    ByAuthor(String),
    /// Free-text match over title, author, keywords, publisher and tags.
    ByKeyword(String),
    ByTag(String),
    ByReadStatus(bool),
    MinImportance(i32),
    ByResearchType { qualitative: bool, quantitative: bool },
    /// Added within the last N days.
    RecentlyAdded(i64),
    HasPdf,
    NoPdf,
    Unread,
    /// Importance 4 or higher.
    Favorites,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SmartGroup {
    pub id: String,
    pub name: String,
    pub criteria: Vec<SmartGroupCriterion>,
    pub match_mode: MatchMode,
    pub icon: Option<String>,
    pub color: Option<String>,
    /// Built-in groups are not stored and cannot be edited.
    #[serde(default)]
    pub predefined: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSmartGroupInput {
    pub name: String,
    #[serde(default)]
    pub criteria: Vec<SmartGroupCriterion>,
    #[serde(default)]
    pub match_mode: MatchMode,
    pub icon: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSmartGroupInput {
    pub name: Option<String>,
    pub criteria: Option<Vec<SmartGroupCriterion>>,
    pub match_mode: Option<MatchMode>,
    pub icon: Option<String>,
    pub color: Option<String>,
}

/// Ad-hoc evaluation without saving a group.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartGroupQuery {
    #[serde(default)]
    pub criteria: Vec<SmartGroupCriterion>,
    #[serde(default)]
    pub match_mode: MatchMode,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartGroupResult {
    pub group: SmartGroup,
    pub papers: Vec<Paper>,
    pub count: usize,
}

// ============================================================================
// PDF Rename
// ============================================================================

pub const SETTING_RENAME_CONFIG: &str = "rename_config";

/// How stored PDFs are renamed from paper metadata. The pattern understands
/// `{author}`, `{year}`, `{title}`, `{keywords}` and `{publisher}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameConfig {
    #[serde(default = "default_rename_pattern")]
    pub pattern: String,
    #[serde(default = "default_max_title_length")]
    pub max_title_length: usize,
    #[serde(default = "default_space_replacement")]
    pub space_replacement: String,
    #[serde(default)]
    pub lowercase: bool,
}

fn default_rename_pattern() -> String {
    "{author}_{year}_{title}".to_string()
}

fn default_max_title_length() -> usize {
    50
}

fn default_space_replacement() -> String {
    "_".to_string()
}

impl Default for RenameConfig {
    fn default() -> Self {
        Self {
            pattern: default_rename_pattern(),
            max_title_length: default_max_title_length(),
            space_replacement: default_space_replacement(),
            lowercase: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RenameResult {
    pub paper_id: String,
    pub old_path: String,
    pub new_path: String,
    pub old_filename: String,
    pub new_filename: String,
    pub success: bool,
    pub error: Option<String>,
}

/// Body of the single-paper rename and preview calls. Without a config the
/// stored one is used.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenameRequest {
    pub config: Option<RenameConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRenameRequest {
    pub paper_ids: Vec<String>,
    #[serde(default)]
    pub config: Option<RenameConfig>,
}

// ============================================================================
// Highlights
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HighlightRect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub id: String,
    pub paper_id: String,
    pub page_number: i32,
    pub rects: Vec<HighlightRect>,
    pub selected_text: String,
    pub color: String,
    pub note: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHighlightInput {
    pub paper_id: String,
    pub page_number: i32,
    pub rects: Vec<HighlightRect>,
    pub selected_text: String,
    pub color: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHighlightInput {
    pub color: Option<String>,
    pub note: Option<String>,
}

// ============================================================================
// Writing Projects and Documents
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WritingProjectMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WritingProject {
    pub id: String,
    pub title: String,
    pub description: String,
    /// "standalone" | "paper-linked"
    #[serde(rename = "type")]
    pub project_type: String,
    pub linked_paper_id: Option<String>,
    pub root_document_id: Option<String>,
    pub target_word_count: Option<i32>,
    /// "draft" | "in-progress" | "completed" | "archived"
    pub status: String,
    pub metadata: WritingProjectMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_opened_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWritingProjectInput {
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub project_type: Option<String>,
    pub linked_paper_id: Option<String>,
    pub target_word_count: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWritingProjectInput {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub project_type: Option<String>,
    pub linked_paper_id: Option<String>,
    pub target_word_count: Option<i32>,
    pub status: Option<String>,
    pub metadata: Option<WritingProjectMetadata>,
}

pub const CONTENT_TYPE_TEXT: &str = "text";
pub const CONTENT_TYPE_FOLDER: &str = "folder";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WritingDocument {
    pub id: String,
    pub project_id: String,
    pub parent_id: Option<String>,
    pub title: String,
    /// Rich-text editor JSON.
    pub content: String,
    /// "text" | "folder"
    pub content_type: String,
    pub sort_order: i32,
    pub is_expanded: bool,
    pub synopsis: String,
    pub notes: String,
    /// "todo" | "in-progress" | "first-draft" | "revised" | "done"
    pub status: String,
    pub word_count: i32,
    pub target_word_count: Option<i32>,
    pub labels: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWritingDocumentInput {
    pub project_id: String,
    pub parent_id: Option<String>,
    pub title: String,
    pub content_type: Option<String>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWritingDocumentInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub content_type: Option<String>,
    pub sort_order: Option<i32>,
    pub is_expanded: Option<bool>,
    pub synopsis: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
    pub word_count: Option<i32>,
    pub target_word_count: Option<i32>,
    pub labels: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveWritingDocumentInput {
    pub parent_id: Option<String>,
    pub sort_order: i32,
}

// ============================================================================
// Settings
// ============================================================================

pub const SETTING_GEMINI_API_KEY: &str = "gemini_api_key";
pub const SETTING_OPENAI_API_KEY: &str = "openai_api_key";
pub const SETTING_FONT_FAMILY: &str = "default_font_family";
pub const SETTING_FONT_SIZE: &str = "default_font_size";
pub const SETTING_STORAGE_PATH: &str = "storage_path";
pub const SETTING_ANALYSIS_VERIFICATION: &str = "analysis_verification";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub gemini_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub default_font_family: String,
    pub default_font_size: String,
    pub storage_path: Option<String>,
    pub analysis_verification: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            openai_api_key: None,
            default_font_family: "sans-serif".to_string(),
            default_font_size: "12".to_string(),
            storage_path: None,
            analysis_verification: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingValue {
    pub key: String,
    pub value: Option<String>,
}

// ============================================================================
// Full-text Index
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PdfPage {
    pub paper_id: String,
    pub page_number: i32,
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullTextQuery {
    pub q: String,
    pub folder_id: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FullTextHit {
    pub paper_id: String,
    pub paper_title: String,
    pub paper_author: String,
    pub page_number: i32,
    pub snippet: String,
    pub rank: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullTextResponse {
    pub total: usize,
    pub results: Vec<FullTextHit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingStatus {
    pub paper_id: String,
    pub total_pages: usize,
    pub indexed_pages: usize,
    pub is_complete: bool,
    pub error: Option<String>,
}

// ============================================================================
// Import
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub paths: Vec<String>,
    pub folder_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDirectoryRequest {
    pub path: String,
    pub folder_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportFailure {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub imported: Vec<Paper>,
    /// Paths whose content already exists in the library.
    pub duplicates: Vec<String>,
    /// Dropped entries that are not PDFs.
    pub skipped: Vec<String>,
    pub failed: Vec<ImportFailure>,
}

// ============================================================================
// AI Analysis
// ============================================================================

/// Structured extraction returned by the analysis models.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisResult {
    pub keywords: Option<String>,
    pub author: Option<String>,
    pub year: Option<String>,
    pub title: Option<String>,
    pub publisher: Option<String>,
    pub subject: Option<String>,
    pub purposes: Option<Vec<String>>,
    pub is_qualitative: Option<bool>,
    pub is_quantitative: Option<bool>,
    pub qual_tools: Option<Vec<String>>,
    pub vars_independent: Option<Vec<String>>,
    pub vars_dependent: Option<Vec<String>>,
    pub vars_moderator: Option<Vec<String>>,
    pub vars_mediator: Option<Vec<String>>,
    pub vars_others: Option<Vec<String>>,
    pub quant_techniques: Option<Vec<String>>,
    pub results: Option<Vec<String>>,
    pub limitations: Option<Vec<String>>,
    pub implications: Option<Vec<String>>,
    pub future_plans: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyzeRequest {
    pub paper_id: Option<String>,
    pub pdf_url: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub success: bool,
    pub result: AnalysisResult,
    pub verified: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeRequest {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    pub text: String,
    pub target_lang: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextResponse {
    pub text: String,
}

// ============================================================================
// Metadata Lookup
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum InputType {
    Arxiv { arxiv_id: String },
    Doi { doi: String },
    PlainText { text: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExternalMetadata {
    pub title: String,
    pub authors: Option<String>,
    pub year: Option<i32>,
    pub venue: Option<String>,
    pub doi: Option<String>,
    pub arxiv_id: Option<String>,
    /// "arxiv" | "crossref"
    pub source: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScholarSource {
    Arxiv,
    Crossref,
    /// Both, queried concurrently.
    #[default]
    All,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScholarSearchQuery {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub source: ScholarSource,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScholarSearchResponse {
    /// Hits reported by the source(s), across all pages.
    pub total: u64,
    pub offset: u32,
    pub results: Vec<ExternalMetadata>,
}

// ============================================================================
// Viewer Tabs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OpenTabRequest {
    pub paper_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TabIndexRequest {
    pub index: usize,
}
