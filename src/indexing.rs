//! Full-text indexing of imported PDFs.
//!
//! Text is extracted with `pdf-extract`, split into pages on form feeds and
//! stored as one row per page. Search is a token-AND scan over those rows.

use crate::error::{AppError, Result};
use crate::models::{FullTextHit, FullTextQuery, FullTextResponse, IndexingStatus, Paper};
use crate::store::{PaperSort, Store};
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_SEARCH_LIMIT: usize = 20;
pub const MAX_SEARCH_LIMIT: usize = 100;
const SNIPPET_CONTEXT: usize = 30;

// ============================================================================
// Extraction
// ============================================================================

/// Split extracted text into pages. Trailing form feeds do not produce an
/// extra empty page.
pub fn split_pages(text: &str) -> Vec<String> {
    let mut pages: Vec<String> = text.split('\x0c').map(|p| p.trim().to_string()).collect();
    while pages.len() > 1 && pages.last().is_some_and(|p| p.is_empty()) {
        pages.pop();
    }
    pages
}

pub fn extract_pages(path: &Path) -> Result<Vec<String>> {
    let text = pdf_extract::extract_text(path)
        .map_err(|e| AppError::Parse(format!("Text extraction failed for {}: {}", path.display(), e)))?;
    Ok(split_pages(&text))
}

/// Extract and store the pages of one paper.
pub fn index_paper(store: &Store, paper_id: &str) -> Result<IndexingStatus> {
    let paper = store.get_paper(paper_id)?;
    if !paper.has_pdf() {
        return Err(AppError::Validation(format!("Paper {} has no PDF", paper_id)));
    }
    let pages = extract_pages(Path::new(&paper.pdf_path))?;
    store_pages(store, &paper, pages)
}

fn store_pages(store: &Store, paper: &Paper, pages: Vec<String>) -> Result<IndexingStatus> {
    let count = store.replace_pages(&paper.id, &pages)?;
    tracing::info!(paper_id = %paper.id, pages = count, "indexed PDF");
    Ok(IndexingStatus {
        paper_id: paper.id.clone(),
        total_pages: count,
        indexed_pages: count,
        is_complete: true,
        error: None,
    })
}

/// Index every paper that has a PDF but no pages yet. Extraction runs in
/// parallel; a failing PDF is reported in its status and does not stop the
/// batch.
pub fn index_all(store: &Store) -> Result<Vec<IndexingStatus>> {
    use rayon::prelude::*;

    let pending: Vec<Paper> = store
        .list_papers(None, PaperSort::Created)?
        .into_iter()
        .filter(|p| p.has_pdf() && !p.is_indexed)
        .collect();

    let extracted: Vec<(Paper, Result<Vec<String>>)> = pending
        .into_par_iter()
        .map(|paper| {
            let pages = extract_pages(Path::new(&paper.pdf_path));
            (paper, pages)
        })
        .collect();

    let mut statuses = Vec::with_capacity(extracted.len());
    for (paper, pages) in extracted {
        let status = match pages {
            Ok(pages) => store_pages(store, &paper, pages)?,
            Err(e) => {
                tracing::warn!(paper_id = %paper.id, error = %e, "indexing failed");
                IndexingStatus {
                    paper_id: paper.id,
                    total_pages: 0,
                    indexed_pages: 0,
                    is_complete: false,
                    error: Some(e.to_string()),
                }
            }
        };
        statuses.push(status);
    }
    Ok(statuses)
}

// ============================================================================
// Search
// ============================================================================

fn fold(text: &str) -> Vec<char> {
    text.chars()
        .map(|c| c.to_lowercase().next().unwrap_or(c))
        .collect()
}

/// Start offsets of non-overlapping occurrences of `needle`.
fn occurrences(haystack: &[char], needle: &[char]) -> Vec<usize> {
    let mut found = Vec::new();
    if needle.is_empty() || needle.len() > haystack.len() {
        return found;
    }
    let mut i = 0;
    while i + needle.len() <= haystack.len() {
        if haystack[i..i + needle.len()] == *needle {
            found.push(i);
            i += needle.len();
        } else {
            i += 1;
        }
    }
    found
}

/// Around 60 characters of `text` centred on the match at `start`, with
/// whitespace collapsed and ellipses where the page continues.
fn snippet(original: &[char], start: usize, len: usize) -> String {
    let from = start.saturating_sub(SNIPPET_CONTEXT);
    let to = (start + len + SNIPPET_CONTEXT).min(original.len());
    let body: String = original[from..to].iter().collect();
    let body = body.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut out = String::new();
    if from > 0 {
        out.push_str("...");
    }
    out.push_str(&body);
    if to < original.len() {
        out.push_str("...");
    }
    out
}

pub fn search(store: &Store, query: &FullTextQuery) -> Result<FullTextResponse> {
    let tokens: Vec<Vec<char>> = query.q.split_whitespace().map(fold).collect();
    if tokens.is_empty() {
        return Ok(FullTextResponse { total: 0, results: Vec::new() });
    }

    let papers: HashMap<String, Paper> = store
        .list_papers(query.folder_id.as_deref(), PaperSort::Created)?
        .into_iter()
        .map(|p| (p.id.clone(), p))
        .collect();

    let mut hits = Vec::new();
    for page in store.all_pages()? {
        let Some(paper) = papers.get(&page.paper_id) else {
            continue;
        };
        let original: Vec<char> = page.text.chars().collect();
        let folded = fold(&page.text);

        let mut rank = 0;
        let mut first_match = None;
        let mut all_present = true;
        for token in &tokens {
            let found = occurrences(&folded, token);
            if found.is_empty() {
                all_present = false;
                break;
            }
            rank += found.len();
            if first_match.is_none() {
                first_match = Some((found[0], token.len()));
            }
        }
        if !all_present {
            continue;
        }

        let (start, len) = first_match.unwrap_or((0, 0));
        hits.push(FullTextHit {
            paper_id: paper.id.clone(),
            paper_title: paper.title.clone(),
            paper_author: paper.author.clone(),
            page_number: page.page_number,
            snippet: snippet(&original, start, len),
            rank,
        });
    }

    hits.sort_by(|a, b| {
        b.rank
            .cmp(&a.rank)
            .then_with(|| a.paper_title.cmp(&b.paper_title))
            .then(a.page_number.cmp(&b.page_number))
    });

    let total = hits.len();
    let limit = query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_SEARCH_LIMIT);
    let results = hits
        .into_iter()
        .skip(query.offset.unwrap_or(0))
        .take(limit)
        .collect();
    Ok(FullTextResponse { total, results })
}
