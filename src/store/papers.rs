use super::{get_json, now, new_id, put_json, scan_json, Store, PAPERS_TREE};
use crate::error::{AppError, Result};
use crate::models::{AnalysisResult, CreatePaperInput, Paper, UpdatePaperInput};
use serde::Deserialize;
use std::cmp::Reverse;
use std::collections::HashSet;

/// Ordering of paper listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperSort {
    /// Newest first.
    #[default]
    Created,
    /// Title ascending, case-insensitive.
    #[serde(alias = "title")]
    Name,
    /// Most recent year first.
    Year,
    /// Highest importance first.
    Importance,
}

impl PaperSort {
    pub fn sort(self, papers: &mut [Paper]) {
        match self {
            Self::Created => papers.sort_by_key(|p| Reverse(p.created_at)),
            Self::Name => papers.sort_by_key(|p| p.title.to_lowercase()),
            Self::Year => papers.sort_by_key(|p| (Reverse(p.year), Reverse(p.created_at))),
            Self::Importance => {
                papers.sort_by_key(|p| (Reverse(p.importance), Reverse(p.created_at)))
            }
        }
    }
}

impl Store {
    pub fn list_papers(&self, folder_id: Option<&str>, sort: PaperSort) -> Result<Vec<Paper>> {
        let mut papers: Vec<Paper> = scan_json(&self.tree(PAPERS_TREE)?)?;
        if let Some(folder_id) = folder_id {
            papers.retain(|p| p.folder_id == folder_id);
        }
        sort.sort(&mut papers);
        Ok(papers)
    }

    pub fn get_paper(&self, paper_id: &str) -> Result<Paper> {
        get_json(&self.tree(PAPERS_TREE)?, paper_id)?
            .ok_or_else(|| AppError::NotFound(format!("Paper not found: {}", paper_id)))
    }

    pub fn create_paper(&self, input: CreatePaperInput) -> Result<Paper> {
        self.create_paper_with_id(new_id(), input)
    }

    /// Create a paper under a caller-chosen id (import names the stored PDF
    /// after the paper before the record exists).
    pub fn create_paper_with_id(&self, id: String, input: CreatePaperInput) -> Result<Paper> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Paper title cannot be empty".into()));
        }
        self.get_folder(&input.folder_id)?;

        let timestamp = now();
        let paper = Paper {
            id,
            folder_id: input.folder_id,
            paper_number: self.next_paper_number()?,
            title: title.to_string(),
            author: input.author.unwrap_or_default(),
            year: input.year.unwrap_or(0),
            pdf_path: input.pdf_path.unwrap_or_default(),
            pdf_filename: input.pdf_filename.unwrap_or_default(),
            file_hash: input.file_hash.unwrap_or_default(),
            created_at: timestamp,
            updated_at: timestamp,
            ..Default::default()
        };
        put_json(&self.tree(PAPERS_TREE)?, &paper.id, &paper)?;
        tracing::debug!(paper_id = %paper.id, number = paper.paper_number, "created paper");
        Ok(paper)
    }

    pub fn update_paper(&self, paper_id: &str, input: UpdatePaperInput) -> Result<Paper> {
        let mut paper = self.get_paper(paper_id)?;
        if let Some(ref folder_id) = input.folder_id {
            self.get_folder(folder_id)?;
        }
        if matches!(input.title.as_deref(), Some(t) if t.trim().is_empty()) {
            return Err(AppError::Validation("Paper title cannot be empty".into()));
        }

        input.apply_to(&mut paper);
        paper.updated_at = now();
        put_json(&self.tree(PAPERS_TREE)?, paper_id, &paper)?;
        Ok(paper)
    }

    /// Delete a paper with its highlights and full-text pages. Returns the
    /// removed record.
    pub fn delete_paper(&self, paper_id: &str) -> Result<Paper> {
        let paper = self.get_paper(paper_id)?;
        self.delete_highlights_for_paper(paper_id)?;
        self.delete_pages(paper_id)?;
        self.tree(PAPERS_TREE)?.remove(paper_id)?;
        tracing::debug!(paper_id, "deleted paper");
        Ok(paper)
    }

    /// Apply the same update to several papers. Fails on the first unknown id.
    pub fn batch_update_papers(&self, paper_ids: &[String], input: &UpdatePaperInput) -> Result<Vec<Paper>> {
        paper_ids
            .iter()
            .map(|id| self.update_paper(id, input.clone()))
            .collect()
    }

    pub fn batch_delete_papers(&self, paper_ids: &[String]) -> Result<Vec<Paper>> {
        let mut seen = HashSet::new();
        let mut deleted = Vec::new();
        for id in paper_ids {
            if seen.insert(id.as_str()) {
                deleted.push(self.delete_paper(id)?);
            }
        }
        Ok(deleted)
    }

    /// Whether a paper with this title (ignoring case and surrounding space)
    /// already exists.
    pub fn check_duplicate(&self, title: &str) -> Result<bool> {
        let needle = title.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(false);
        }
        let papers: Vec<Paper> = scan_json(&self.tree(PAPERS_TREE)?)?;
        Ok(papers.iter().any(|p| p.title.trim().to_lowercase() == needle))
    }

    pub fn find_by_hash(&self, file_hash: &str) -> Result<Option<Paper>> {
        if file_hash.is_empty() {
            return Ok(None);
        }
        let papers: Vec<Paper> = scan_json(&self.tree(PAPERS_TREE)?)?;
        Ok(papers.into_iter().find(|p| p.file_hash == file_hash))
    }

    /// Write a validated analysis onto the paper. Fields the analysis did not
    /// produce keep their stored value.
    pub fn apply_analysis(&self, paper_id: &str, analysis: &AnalysisResult, analyzed_by: Option<&str>) -> Result<Paper> {
        let mut paper = self.get_paper(paper_id)?;

        let year = analysis.year.as_deref().and_then(|y| y.parse::<i32>().ok());
        UpdatePaperInput {
            keywords: analysis.keywords.clone(),
            author: analysis.author.clone(),
            year,
            title: analysis.title.clone(),
            publisher: analysis.publisher.clone(),
            subject: analysis.subject.clone(),
            purposes: analysis.purposes.clone(),
            is_qualitative: analysis.is_qualitative,
            is_quantitative: analysis.is_quantitative,
            qual_tools: analysis.qual_tools.clone(),
            vars_independent: analysis.vars_independent.clone(),
            vars_dependent: analysis.vars_dependent.clone(),
            vars_moderator: analysis.vars_moderator.clone(),
            vars_mediator: analysis.vars_mediator.clone(),
            vars_others: analysis.vars_others.clone(),
            quant_techniques: analysis.quant_techniques.clone(),
            results: analysis.results.clone(),
            limitations: analysis.limitations.clone(),
            implications: analysis.implications.clone(),
            future_plans: analysis.future_plans.clone(),
            ..Default::default()
        }
        .apply_to(&mut paper);

        let timestamp = now();
        paper.last_analyzed_at = Some(timestamp);
        paper.last_analyzed_by = analyzed_by.map(str::to_string);
        paper.updated_at = timestamp;
        put_json(&self.tree(PAPERS_TREE)?, paper_id, &paper)?;
        Ok(paper)
    }

    pub(crate) fn set_indexed(&self, paper_id: &str, indexed: bool) -> Result<()> {
        let mut paper = self.get_paper(paper_id)?;
        paper.is_indexed = indexed;
        put_json(&self.tree(PAPERS_TREE)?, paper_id, &paper)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateHighlightInput, HighlightRect};
    use crate::store::DEFAULT_ID;

    fn paper(store: &Store, title: &str) -> Paper {
        store
            .create_paper(CreatePaperInput {
                folder_id: DEFAULT_ID.into(),
                title: title.into(),
                ..Default::default()
            })
            .unwrap()
    }

    #[test]
    fn test_create_paper_assigns_numbers() {
        let store = Store::temporary().unwrap();
        let a = paper(&store, "First");
        let b = paper(&store, "Second");
        assert_eq!(a.paper_number, 1);
        assert_eq!(b.paper_number, 2);
        assert_eq!(a.year, 0);
        assert!(a.author.is_empty());
    }

    #[test]
    fn test_create_paper_requires_folder() {
        let store = Store::temporary().unwrap();
        let result = store.create_paper(CreatePaperInput {
            folder_id: "missing".into(),
            title: "Lost".into(),
            ..Default::default()
        });
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_update_paper_keeps_unset_fields() {
        let store = Store::temporary().unwrap();
        let p = store
            .create_paper(CreatePaperInput {
                folder_id: DEFAULT_ID.into(),
                title: "Grounded Theory".into(),
                author: Some("Glaser, Barney".into()),
                year: Some(1967),
                ..Default::default()
            })
            .unwrap();
        let updated = store
            .update_paper(
                &p.id,
                UpdatePaperInput {
                    is_read: Some(true),
                    tags: Some(vec!["method".into()]),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(updated.is_read);
        assert_eq!(updated.tags, vec!["method"]);
        assert_eq!(updated.author, "Glaser, Barney");
        assert_eq!(updated.year, 1967);
        assert!(updated.updated_at >= p.updated_at);
    }

    #[test]
    fn test_list_papers_sorting() {
        let store = Store::temporary().unwrap();
        paper(&store, "beta");
        paper(&store, "Alpha");
        paper(&store, "gamma");

        let by_name: Vec<String> = store
            .list_papers(None, PaperSort::Name)
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(by_name, vec!["Alpha", "beta", "gamma"]);

        let newest = store.list_papers(None, PaperSort::Created).unwrap();
        assert_eq!(newest.len(), 3);
        assert!(newest[0].created_at >= newest[2].created_at);
    }

    #[test]
    fn test_check_duplicate_ignores_case() {
        let store = Store::temporary().unwrap();
        paper(&store, "Attention Is All You Need");
        assert!(store.check_duplicate("attention is all you need ").unwrap());
        assert!(!store.check_duplicate("Attention").unwrap());
        assert!(!store.check_duplicate("").unwrap());
    }

    #[test]
    fn test_delete_paper_removes_highlights() {
        let store = Store::temporary().unwrap();
        let p = paper(&store, "Annotated");
        store
            .create_highlight(CreateHighlightInput {
                paper_id: p.id.clone(),
                page_number: 1,
                rects: vec![HighlightRect { top: 1.0, left: 1.0, width: 10.0, height: 2.0 }],
                selected_text: "key finding".into(),
                color: None,
                note: None,
            })
            .unwrap();

        let deleted = store.delete_paper(&p.id).unwrap();
        assert_eq!(deleted.id, p.id);
        assert!(store.list_highlights(&p.id, None).unwrap().is_empty());
        assert!(matches!(store.delete_paper(&p.id), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_batch_operations() {
        let store = Store::temporary().unwrap();
        let a = paper(&store, "A");
        let b = paper(&store, "B");
        let ids = vec![a.id.clone(), b.id.clone()];

        let updated = store
            .batch_update_papers(
                &ids,
                &UpdatePaperInput {
                    importance: Some(3),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(updated.iter().all(|p| p.importance == 3));

        let deleted = store
            .batch_delete_papers(&[a.id.clone(), a.id.clone(), b.id.clone()])
            .unwrap();
        assert_eq!(deleted.len(), 2);
        assert!(store.list_papers(None, PaperSort::Created).unwrap().is_empty());
    }

    #[test]
    fn test_apply_analysis_sets_fields() {
        let store = Store::temporary().unwrap();
        let p = paper(&store, "untitled");
        let analysis = AnalysisResult {
            title: Some("Nurse Burnout".into()),
            year: Some("2021".into()),
            results: Some(vec!["burnout predicts turnover".into()]),
            ..Default::default()
        };
        let updated = store.apply_analysis(&p.id, &analysis, Some("user-1")).unwrap();
        assert_eq!(updated.title, "Nurse Burnout");
        assert_eq!(updated.year, 2021);
        assert_eq!(updated.results, vec!["burnout predicts turnover"]);
        assert!(updated.last_analyzed_at.is_some());
        assert_eq!(updated.last_analyzed_by.as_deref(), Some("user-1"));
    }

    #[test]
    fn test_sort_deserializes_lowercase() {
        let sort: PaperSort = serde_json::from_str("\"name\"").unwrap();
        assert_eq!(sort, PaperSort::Name);
        let sort: PaperSort = serde_json::from_str("\"title\"").unwrap();
        assert_eq!(sort, PaperSort::Name);
        assert!(serde_json::from_str::<PaperSort>("\"bogus\"").is_err());
    }
}
