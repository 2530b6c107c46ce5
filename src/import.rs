//! PDF import: drop filtering, copy-in, duplicate detection.
//!
//! Imported files are copied into the PDF storage directory as
//! `{paperId}_{originalName}` and identified by the SHA-256 of their
//! contents, so dropping the same file twice yields one paper.

use crate::error::{AppError, Result};
use crate::models::{CreatePaperInput, ImportFailure, ImportReport, Paper};
use crate::store::{Store, DEFAULT_ID};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub fn is_pdf_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Keep only the dropped entries that are PDFs, in their original order.
pub fn filter_pdf_paths<S: AsRef<str>>(paths: &[S]) -> Vec<String> {
    paths
        .iter()
        .map(AsRef::as_ref)
        .filter(|p| is_pdf_path(Path::new(p)))
        .map(str::to_string)
        .collect()
}

pub fn hash_file(path: &Path) -> Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// "deep_learning-survey_2020" -> "deep learning survey 2020"
pub fn title_from_filename(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let title = stem
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if title.is_empty() {
        "Untitled".to_string()
    } else {
        title
    }
}

#[derive(Debug)]
pub enum ImportOutcome {
    Imported(Paper),
    /// A paper with identical contents already exists.
    Duplicate(Paper),
}

pub fn import_pdf(store: &Store, pdfs_dir: &Path, source: &Path, folder_id: &str) -> Result<ImportOutcome> {
    if !source.is_file() {
        return Err(AppError::NotFound(format!("No such file: {}", source.display())));
    }
    store.get_folder(folder_id)?;

    let file_hash = hash_file(source)?;
    if let Some(existing) = store.find_by_hash(&file_hash)? {
        tracing::info!(path = %source.display(), paper_id = %existing.id, "skipping duplicate PDF");
        return Ok(ImportOutcome::Duplicate(existing));
    }

    let filename = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "paper.pdf".to_string());
    let paper_id = crate::store::new_id();
    std::fs::create_dir_all(pdfs_dir)?;
    let dest = pdfs_dir.join(format!("{}_{}", paper_id, filename));
    std::fs::copy(source, &dest)?;

    let created = store.create_paper_with_id(
        paper_id,
        CreatePaperInput {
            folder_id: folder_id.to_string(),
            title: title_from_filename(source),
            pdf_path: Some(dest.to_string_lossy().into_owned()),
            pdf_filename: Some(filename),
            file_hash: Some(file_hash),
            ..Default::default()
        },
    );
    match created {
        Ok(paper) => {
            tracing::info!(paper_id = %paper.id, path = %source.display(), "imported PDF");
            Ok(ImportOutcome::Imported(paper))
        }
        Err(e) => {
            let _ = std::fs::remove_file(&dest);
            Err(e)
        }
    }
}

/// Only alphanumerics, `-`, `_` and `.` survive; the result always ends in `.pdf`.
pub fn sanitize_filename(filename: &str) -> String {
    let safe: String = filename
        .trim()
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .take(200)
        .collect();
    let safe = safe.trim_start_matches('.');
    let safe = if safe.is_empty() { "document" } else { safe };
    if safe.to_lowercase().ends_with(".pdf") {
        safe.to_string()
    } else {
        format!("{}.pdf", safe)
    }
}

/// Import a PDF received as bytes (browser upload).
pub fn import_upload(store: &Store, pdfs_dir: &Path, filename: &str, bytes: &[u8], folder_id: &str) -> Result<ImportOutcome> {
    if !bytes.starts_with(b"%PDF") {
        return Err(AppError::Validation(format!("{} is not a PDF", filename)));
    }
    store.get_folder(folder_id)?;

    let file_hash = format!("{:x}", Sha256::digest(bytes));
    if let Some(existing) = store.find_by_hash(&file_hash)? {
        return Ok(ImportOutcome::Duplicate(existing));
    }

    let title = title_from_filename(Path::new(filename));
    let filename = sanitize_filename(filename);
    let paper_id = crate::store::new_id();
    std::fs::create_dir_all(pdfs_dir)?;
    let dest = pdfs_dir.join(format!("{}_{}", paper_id, filename));
    std::fs::write(&dest, bytes)?;

    let created = store.create_paper_with_id(
        paper_id,
        CreatePaperInput {
            folder_id: folder_id.to_string(),
            title,
            pdf_path: Some(dest.to_string_lossy().into_owned()),
            pdf_filename: Some(filename),
            file_hash: Some(file_hash),
            ..Default::default()
        },
    );
    if created.is_err() {
        let _ = std::fs::remove_file(&dest);
    }
    created.map(ImportOutcome::Imported)
}

/// Import a dropped file list. Non-PDF entries are skipped; a failing file
/// is reported and does not stop the rest.
pub fn import_paths(store: &Store, pdfs_dir: &Path, paths: &[String], folder_id: Option<&str>) -> ImportReport {
    let folder_id = folder_id.unwrap_or(DEFAULT_ID);
    let pdfs = filter_pdf_paths(paths);
    let mut report = ImportReport {
        skipped: paths.iter().filter(|p| !pdfs.contains(p)).cloned().collect(),
        ..Default::default()
    };

    for path in pdfs {
        match import_pdf(store, pdfs_dir, Path::new(&path), folder_id) {
            Ok(ImportOutcome::Imported(paper)) => report.imported.push(paper),
            Ok(ImportOutcome::Duplicate(_)) => report.duplicates.push(path),
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "PDF import failed");
                report.failed.push(ImportFailure {
                    path,
                    error: e.to_string(),
                });
            }
        }
    }
    report
}

/// Recursively import every PDF under `dir`.
pub fn import_directory(store: &Store, pdfs_dir: &Path, dir: &Path, folder_id: Option<&str>) -> Result<ImportReport> {
    if !dir.is_dir() {
        return Err(AppError::Validation(format!("Not a directory: {}", dir.display())));
    }
    let mut paths: Vec<String> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_pdf_path(e.path()))
        .map(|e| e.path().to_string_lossy().into_owned())
        .collect();
    paths.sort();
    Ok(import_paths(store, pdfs_dir, &paths, folder_id))
}

/// Delete a stored PDF. Paths outside the storage directory are left alone.
pub fn remove_stored_pdf(pdfs_dir: &Path, pdf_path: &str) -> Result<()> {
    if pdf_path.is_empty() {
        return Ok(());
    }
    let path = PathBuf::from(pdf_path);
    if path.starts_with(pdfs_dir) && path.is_file() {
        std::fs::remove_file(&path)?;
    }
    Ok(())
}
