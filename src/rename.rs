//! Renaming stored PDFs after paper metadata.
//!
//! Files keep the `{paperId prefix}_` in front of the generated name so two
//! papers with identical metadata never collide. The record's `pdfPath` and
//! `pdfFilename` follow the file.

use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::import::sanitize_filename;
use crate::models::{Paper, RenameConfig, RenameResult, UpdatePaperInput};
use crate::store::Store;

const PLACEHOLDERS: [&str; 5] = ["{author}", "{year}", "{title}", "{keywords}", "{publisher}"];

pub fn validate_config(config: &RenameConfig) -> Result<()> {
    if !PLACEHOLDERS.iter().any(|p| config.pattern.contains(p)) {
        return Err(AppError::Validation(format!(
            "Rename pattern must use at least one of {}",
            PLACEHOLDERS.join(", ")
        )));
    }
    if config.max_title_length == 0 {
        return Err(AppError::Validation("maxTitleLength must be at least 1".into()));
    }
    if !config
        .space_replacement
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(AppError::Validation(
            "spaceReplacement may only contain letters, digits, '-', '_' or '.'".into(),
        ));
    }
    Ok(())
}

/// Surname of the first listed author. "Park, Ji-Yeon and Lee" -> "Park",
/// "Ji-Yeon Park; Lee" -> "Park".
fn first_author_surname(author: &str) -> Option<&str> {
    let first = author
        .split(" and ")
        .next()
        .and_then(|a| a.split(';').next())
        .map(str::trim)
        .filter(|a| !a.is_empty())?;
    match first.split_once(',') {
        Some((surname, _)) => Some(surname.trim()),
        None => first.split_whitespace().last(),
    }
}

/// Cut to `max` characters, backing up to a word boundary when one is in the
/// second half.
fn shorten_title(title: &str, max: usize) -> String {
    if title.chars().count() <= max {
        return title.to_string();
    }
    let cut: String = title.chars().take(max).collect();
    if title.chars().nth(max).is_some_and(char::is_whitespace) {
        return cut;
    }
    match cut.rfind(' ') {
        Some(space) if cut[..space].chars().count() > max / 2 => cut[..space].to_string(),
        _ => cut,
    }
}

fn filename_part(value: &str, config: &RenameConfig) -> String {
    value
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_'))
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(&config.space_replacement)
}

/// Filename for `paper` under `config`, without the id prefix.
pub fn generate_paper_filename(paper: &Paper, config: &RenameConfig) -> String {
    let author = first_author_surname(&paper.author).unwrap_or("Unknown");
    let year = if paper.year > 0 {
        paper.year.to_string()
    } else {
        "0000".to_string()
    };
    let title = match paper.title.trim() {
        "" => "Untitled".to_string(),
        title => shorten_title(title, config.max_title_length),
    };
    let keyword = paper.keywords.split(',').next().unwrap_or("");

    let mut name = config
        .pattern
        .replace("{author}", &filename_part(author, config))
        .replace("{year}", &year)
        .replace("{title}", &filename_part(&title, config))
        .replace("{keywords}", &filename_part(keyword, config))
        .replace("{publisher}", &filename_part(&paper.publisher, config));
    if config.lowercase {
        name = name.to_lowercase();
    }
    sanitize_filename(&name)
}

fn id_prefix(paper: &Paper) -> &str {
    paper.id.split('-').next().unwrap_or(&paper.id)
}

fn target_path(paper: &Paper, filename: &str) -> Option<PathBuf> {
    let parent = Path::new(&paper.pdf_path).parent()?;
    Some(parent.join(format!("{}_{}", id_prefix(paper), filename)))
}

/// What a rename would do, without touching anything.
pub fn preview_rename(store: &Store, paper_id: &str, config: &RenameConfig) -> Result<RenameResult> {
    let paper = store.get_paper(paper_id)?;
    let new_filename = generate_paper_filename(&paper, config);
    let new_path = match paper.pdf_path.as_str() {
        "" => String::new(),
        _ => target_path(&paper, &new_filename)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    Ok(RenameResult {
        paper_id: paper.id,
        old_path: paper.pdf_path,
        new_path,
        old_filename: paper.pdf_filename,
        new_filename,
        success: true,
        error: None,
    })
}

/// Rename the paper's stored PDF in place and update the record.
pub fn rename_paper_pdf(store: &Store, paper_id: &str, config: &RenameConfig) -> Result<RenameResult> {
    let paper = store.get_paper(paper_id)?;
    if paper.pdf_path.is_empty() {
        return Err(AppError::Validation("Paper has no PDF attached".into()));
    }
    let old_path = PathBuf::from(&paper.pdf_path);
    if !old_path.is_file() {
        return Err(AppError::NotFound(format!("PDF file not found: {}", paper.pdf_path)));
    }

    let new_filename = generate_paper_filename(&paper, config);
    let new_path = target_path(&paper, &new_filename)
        .ok_or_else(|| AppError::Internal(format!("No parent directory for {}", paper.pdf_path)))?;

    if new_path != old_path {
        if new_path.exists() {
            return Err(AppError::Duplicate(format!(
                "Target file already exists: {}",
                new_path.display()
            )));
        }
        std::fs::rename(&old_path, &new_path)?;
        let update = UpdatePaperInput {
            pdf_path: Some(new_path.to_string_lossy().into_owned()),
            pdf_filename: Some(new_filename.clone()),
            ..Default::default()
        };
        if let Err(e) = store.update_paper(&paper.id, update) {
            let _ = std::fs::rename(&new_path, &old_path);
            return Err(e);
        }
        tracing::info!(paper_id = %paper.id, to = %new_path.display(), "renamed PDF");
    }

    Ok(RenameResult {
        paper_id: paper.id,
        old_path: paper.pdf_path,
        new_path: new_path.to_string_lossy().into_owned(),
        old_filename: paper.pdf_filename,
        new_filename,
        success: true,
        error: None,
    })
}

/// Rename each paper in turn; one failure does not stop the rest.
pub fn batch_rename_pdfs(store: &Store, paper_ids: &[String], config: &RenameConfig) -> Vec<RenameResult> {
    paper_ids
        .iter()
        .map(|id| {
            rename_paper_pdf(store, id, config).unwrap_or_else(|e| {
                tracing::warn!(paper_id = %id, error = %e, "PDF rename failed");
                RenameResult {
                    paper_id: id.clone(),
                    success: false,
                    error: Some(e.to_string()),
                    ..Default::default()
                }
            })
        })
        .collect()
}
