//! AI analysis of papers.
//!
//! The pipeline is linear and never retried:
//! fetch PDF -> primary model (PDF inline) -> optional verifier (extracted
//! text) -> merge -> validate -> persist -> notify.
//! A verifier failure downgrades to the unverified result with a warning.

pub mod llm;
pub mod merge;

use std::future::Future;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::events::ChangeEvent;
use crate::models::{AnalysisResult, AnalyzeResponse, AppSettings, Paper};
use crate::url_validator;
use crate::AppState;
use llm::{ChatModel, GeminiModel, ModelRequest, OpenAiModel};

const ANALYSIS_TEMPERATURE: f32 = 0.1;
const TEXT_TEMPERATURE: f32 = 0.3;
const MAX_VERIFY_CHARS: usize = 30_000;
const ERROR_PREVIEW_CHARS: usize = 200;

// ============================================================================
// Prompts
// ============================================================================

const ANALYSIS_PROMPT: &str = r#"You are an expert in analysing academic papers. Read the attached paper and answer with a single JSON object in exactly this shape:

{
  "keywords": "",
  "author": "",
  "year": "",
  "title": "",
  "publisher": "",
  "subject": "",
  "purposes": [],
  "isQualitative": true/false,
  "isQuantitative": true/false,
  "qualTools": [],
  "varsIndependent": [],
  "varsDependent": [],
  "varsModerator": [],
  "varsMediator": [],
  "varsOthers": [],
  "quantTechniques": [],
  "results": [],
  "limitations": [],
  "implications": [],
  "futurePlans": []
}

Guidelines:
- For theses, include the degree (master's or doctoral) in "publisher".
- "subject" summarises the research participants or objects of study.
- Write the values in Korean.
- Each array holds at most 10 items."#;

fn verification_prompt(paper_text: &str, primary_json: &str) -> String {
    format!(
        "Another model extracted the metadata below from an academic paper. \
         Check every field against the paper text and return a corrected JSON object \
         with the same keys. Keep values that are correct, fix wrong ones, and use an \
         empty string or empty array where the paper gives no information.\n\n\
         Extracted metadata:\n{}\n\nPaper text:\n---\n{}\n---",
        primary_json, paper_text
    )
}

fn summarize_prompt(text: &str) -> String {
    format!(
        "Summarise the following academic text concisely in Korean, in three to five \
         sentences covering only the key points. Keep technical terms but explain them \
         plainly.\n\n---\n{}\n---",
        text
    )
}

fn translate_prompt(text: &str, target_lang: &str) -> Result<String> {
    let instruction = match target_lang {
        "en" => "Translate the following academic text to English. Keep academic terminology accurate.",
        "ko" => "Translate the following academic text to Korean. Keep academic terminology accurate.",
        other => {
            return Err(AppError::Validation(format!(
                "Unsupported target language '{}', expected 'en' or 'ko'",
                other
            )))
        }
    };
    Ok(format!("{}\n\n---\n{}\n---", instruction, text))
}

// ============================================================================
// Models
// ============================================================================

/// The primary analysis model and an optional verifier.
#[derive(Clone)]
pub struct ModelSet {
    pub primary: Arc<dyn ChatModel>,
    pub verifier: Option<Arc<dyn ChatModel>>,
}

impl ModelSet {
    /// Build clients from stored settings, falling back to the environment.
    pub fn from_settings(config: &Config, settings: &AppSettings) -> Result<Self> {
        let gemini_key = settings
            .gemini_api_key
            .clone()
            .or_else(|| config.gemini_api_key.clone())
            .ok_or_else(|| AppError::Model("Gemini API key is not configured".into()))?;
        let primary: Arc<dyn ChatModel> = Arc::new(GeminiModel::new(gemini_key, &config.gemini_model)?);

        let verifier = match settings
            .openai_api_key
            .clone()
            .or_else(|| config.openai_api_key.clone())
        {
            Some(key) if settings.analysis_verification => {
                Some(Arc::new(OpenAiModel::new(key, &config.openai_model)?) as Arc<dyn ChatModel>)
            }
            _ => None,
        };
        Ok(Self { primary, verifier })
    }
}

fn resolve_models(state: &AppState) -> Result<ModelSet> {
    if let Some(ref models) = state.models_override {
        return Ok(models.clone());
    }
    ModelSet::from_settings(&state.config, &state.store.app_settings()?)
}

// ============================================================================
// PDF acquisition
// ============================================================================

/// Where the PDF for an analysis comes from.
#[derive(Debug, Clone)]
pub enum PdfSource {
    Url(String),
    Stored,
}

pub fn check_pdf_bytes(bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Err(AppError::Fetch("empty response body".into()));
    }
    if !bytes.starts_with(b"%PDF") {
        return Err(AppError::Fetch("response is not a PDF".into()));
    }
    Ok(())
}

pub async fn fetch_pdf(client: &reqwest::Client, url: &str, config: &Config) -> Result<Vec<u8>> {
    let url = url_validator::validate_pdf_url(url, config.allow_private_urls).await?;
    tracing::debug!(url = %url, "fetching PDF");

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| AppError::Fetch(format!("{}: {}", url, e)))?;
    let status = response.status();
    if !status.is_success() {
        return Err(AppError::Fetch(format!("{} returned {}", url, status)));
    }
    if response.content_length().is_some_and(|len| len > config.max_pdf_bytes) {
        return Err(AppError::Fetch(format!("{} exceeds the PDF size limit", url)));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| AppError::Fetch(format!("{}: {}", url, e)))?;
    if bytes.len() as u64 > config.max_pdf_bytes {
        return Err(AppError::Fetch(format!("{} exceeds the PDF size limit", url)));
    }
    check_pdf_bytes(&bytes)?;
    Ok(bytes.to_vec())
}

async fn load_stored_pdf(paper: &Paper) -> Result<Vec<u8>> {
    if !paper.has_pdf() {
        return Err(AppError::Validation(format!("Paper {} has no PDF", paper.id)));
    }
    let bytes = tokio::fs::read(&paper.pdf_path)
        .await
        .map_err(|e| AppError::Fetch(format!("cannot read {}: {}", paper.pdf_path, e)))?;
    check_pdf_bytes(&bytes)?;
    Ok(bytes)
}

// ============================================================================
// Pipeline
// ============================================================================

/// Parse model output that is either an object or an array whose first
/// element is the object.
pub fn parse_analysis(text: &str) -> Result<AnalysisResult> {
    let preview = || text.chars().take(ERROR_PREVIEW_CHARS).collect::<String>();
    let value = llm::extract_json(text)
        .ok_or_else(|| AppError::Parse(format!("model did not return JSON: {}", preview())))?;
    let value = match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Parse("model returned an empty array".into()))?,
        other => other,
    };
    serde_json::from_value(value)
        .map_err(|e| AppError::Parse(format!("unexpected analysis shape: {}. Response: {}", e, preview())))
}

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub result: AnalysisResult,
    pub verified: bool,
}

async fn extract_text(pdf: Vec<u8>) -> Result<String> {
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&pdf))
        .await?
        .map_err(|e| AppError::Parse(format!("text extraction failed: {}", e)))?;
    Ok(text.chars().take(MAX_VERIFY_CHARS).collect())
}

async fn verify(verifier: &dyn ChatModel, text: &str, primary: &AnalysisResult) -> Result<AnalysisResult> {
    if text.trim().is_empty() {
        return Err(AppError::Parse("no extractable text".into()));
    }
    let primary_json = serde_json::to_string_pretty(primary)?;
    let response = verifier
        .generate(ModelRequest {
            prompt: verification_prompt(text, &primary_json),
            pdf: None,
            json_output: true,
            temperature: ANALYSIS_TEMPERATURE,
        })
        .await?;
    parse_analysis(&response)
}

async fn verify_extracted(
    verifier: &dyn ChatModel,
    text: Result<String>,
    primary: &AnalysisResult,
) -> Result<AnalysisResult> {
    verify(verifier, &text?, primary).await
}

/// Run the models over a PDF and return the cleaned result.
pub async fn analyze_pdf(models: &ModelSet, pdf: Vec<u8>) -> Result<AnalysisOutcome> {
    analyze_pdf_with(models, pdf, extract_text).await
}

/// `extract` produces the text the verifier reads.
async fn analyze_pdf_with<F, Fut>(models: &ModelSet, pdf: Vec<u8>, extract: F) -> Result<AnalysisOutcome>
where
    F: FnOnce(Vec<u8>) -> Fut,
    Fut: Future<Output = Result<String>>,
{
    let response = models
        .primary
        .generate(ModelRequest {
            prompt: ANALYSIS_PROMPT.to_string(),
            pdf: Some(pdf.clone()),
            json_output: true,
            temperature: ANALYSIS_TEMPERATURE,
        })
        .await?;
    let primary = parse_analysis(&response)?;

    let (result, verified) = match models.verifier {
        Some(ref verifier) => match verify_extracted(verifier.as_ref(), extract(pdf).await, &primary).await {
            Ok(checked) => (merge::merge(primary, checked), true),
            Err(e) => {
                tracing::warn!(verifier = verifier.name(), error = %e, "verification failed, using unverified result");
                (primary, false)
            }
        },
        None => (primary, false),
    };

    Ok(AnalysisOutcome {
        result: merge::validate(result),
        verified,
    })
}

/// Analyse a paper end to end and persist the result.
pub async fn run_analysis(
    state: &AppState,
    paper_id: &str,
    source: PdfSource,
    user_id: Option<&str>,
) -> Result<AnalyzeResponse> {
    let paper = state.store.get_paper(paper_id)?;
    let models = resolve_models(state)?;

    let pdf = match source {
        PdfSource::Url(ref url) => fetch_pdf(&state.http, url, &state.config).await?,
        PdfSource::Stored => load_stored_pdf(&paper).await?,
    };

    tracing::info!(paper_id, model = models.primary.name(), bytes = pdf.len(), "analysing paper");
    let outcome = analyze_pdf(&models, pdf).await?;

    let updated = state.store.apply_analysis(paper_id, &outcome.result, user_id)?;
    state.events.emit(ChangeEvent::PapersChanged {
        folder_id: updated.folder_id.clone(),
    });
    state.events.emit(ChangeEvent::AnalysisCompleted {
        paper_id: paper_id.to_string(),
    });
    tracing::info!(paper_id, verified = outcome.verified, "analysis stored");

    Ok(AnalyzeResponse {
        success: true,
        result: outcome.result,
        verified: outcome.verified,
    })
}

pub async fn summarize(state: &AppState, text: &str) -> Result<String> {
    if text.trim().is_empty() {
        return Err(AppError::Validation("There is no text to summarize".into()));
    }
    let models = resolve_models(state)?;
    models
        .primary
        .generate(ModelRequest::text(summarize_prompt(text), TEXT_TEMPERATURE))
        .await
}

pub async fn translate(state: &AppState, text: &str, target_lang: &str) -> Result<String> {
    if text.trim().is_empty() {
        return Err(AppError::Validation("There is no text to translate".into()));
    }
    let prompt = translate_prompt(text, target_lang)?;
    let models = resolve_models(state)?;
    models
        .primary
        .generate(ModelRequest::text(prompt, TEXT_TEMPERATURE))
        .await
}
