//! Paper list filtering and multi-selection.
//!
//! Range selection works on the list as the user currently sees it: the
//! filtered, sorted papers. Hidden papers are never pulled into a range.

use crate::models::Paper;
use crate::store::PaperSort;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaperFilter {
    /// Matched case-insensitively against title, author, keywords,
    /// publisher and tags. Every whitespace-separated term must match.
    pub query: Option<String>,
    pub folder_id: Option<String>,
    pub is_read: Option<bool>,
    pub tag: Option<String>,
    pub min_importance: Option<i32>,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
    /// Case-insensitive substring of the author field.
    pub author: Option<String>,
    pub has_pdf: Option<bool>,
    /// Only papers created at most this many days ago.
    pub added_within_days: Option<i64>,
    pub is_qualitative: Option<bool>,
    pub is_quantitative: Option<bool>,
    pub sort: PaperSort,
}

impl PaperFilter {
    pub fn matches(&self, paper: &Paper) -> bool {
        if let Some(ref folder_id) = self.folder_id {
            if &paper.folder_id != folder_id {
                return false;
            }
        }
        if let Some(is_read) = self.is_read {
            if paper.is_read != is_read {
                return false;
            }
        }
        if let Some(ref tag) = self.tag {
            if !paper.tags.iter().any(|t| t.eq_ignore_ascii_case(tag.trim())) {
                return false;
            }
        }
        if let Some(min) = self.min_importance {
            if paper.importance < min {
                return false;
            }
        }
        if self.year_from.is_some_and(|from| paper.year < from) {
            return false;
        }
        if self.year_to.is_some_and(|to| paper.year > to) {
            return false;
        }
        if let Some(ref author) = self.author {
            if !paper.author.to_lowercase().contains(&author.trim().to_lowercase()) {
                return false;
            }
        }
        if self.has_pdf.is_some_and(|has| paper.pdf_path.is_empty() == has) {
            return false;
        }
        if let Some(days) = self.added_within_days {
            if (Utc::now() - paper.created_at).num_days() > days {
                return false;
            }
        }
        if self.is_qualitative.is_some_and(|q| paper.is_qualitative != q) {
            return false;
        }
        if self.is_quantitative.is_some_and(|q| paper.is_quantitative != q) {
            return false;
        }

        match self.query.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(query) => {
                let haystack = format!(
                    "{} {} {} {} {}",
                    paper.title,
                    paper.author,
                    paper.keywords,
                    paper.publisher,
                    paper.tags.join(" ")
                )
                .to_lowercase();
                query
                    .to_lowercase()
                    .split_whitespace()
                    .all(|term| haystack.contains(term))
            }
        }
    }

    /// Filter then sort.
    pub fn apply(&self, papers: Vec<Paper>) -> Vec<Paper> {
        let mut visible: Vec<Paper> = papers.into_iter().filter(|p| self.matches(p)).collect();
        self.sort.sort(&mut visible);
        visible
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClickMode {
    /// Plain click: select only this paper.
    #[default]
    Single,
    /// Ctrl/Cmd click.
    Toggle,
    /// Shift click.
    Range,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperSelection {
    selected: BTreeSet<String>,
    anchor: Option<String>,
}

impl PaperSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }

    pub fn is_selected(&self, paper_id: &str) -> bool {
        self.selected.contains(paper_id)
    }

    pub fn anchor(&self) -> Option<&str> {
        self.anchor.as_deref()
    }

    /// Apply a click on `paper_id`; `visible` is the list in display order.
    pub fn click<S: AsRef<str>>(&mut self, paper_id: &str, mode: ClickMode, visible: &[S]) {
        match mode {
            ClickMode::Single => {
                self.selected.clear();
                self.selected.insert(paper_id.to_string());
            }
            ClickMode::Toggle => {
                if !self.selected.remove(paper_id) {
                    self.selected.insert(paper_id.to_string());
                }
            }
            ClickMode::Range => self.select_range(paper_id, visible),
        }
        self.anchor = Some(paper_id.to_string());
    }

    fn select_range<S: AsRef<str>>(&mut self, paper_id: &str, visible: &[S]) {
        let position = |id: &str| visible.iter().position(|v| v.as_ref() == id);
        let anchor = self.anchor.as_deref().and_then(position);

        match (anchor, position(paper_id)) {
            (Some(from), Some(to)) => {
                let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
                self.selected
                    .extend(visible[lo..=hi].iter().map(|v| v.as_ref().to_string()));
            }
            // No usable anchor in the current view: add just this paper.
            _ => {
                self.selected.insert(paper_id.to_string());
            }
        }
    }

    pub fn select_all<S: AsRef<str>>(&mut self, visible: &[S]) {
        self.selected
            .extend(visible.iter().map(|v| v.as_ref().to_string()));
    }

    /// Forget a paper (deleted).
    pub fn remove(&mut self, paper_id: &str) {
        self.selected.remove(paper_id);
        if self.anchor.as_deref() == Some(paper_id) {
            self.anchor = None;
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.anchor = None;
    }

    /// Drop selected papers that are no longer visible (filter changed,
    /// papers deleted).
    pub fn retain_visible<S: AsRef<str>>(&mut self, visible: &[S]) {
        let visible: BTreeSet<&str> = visible.iter().map(AsRef::as_ref).collect();
        self.selected.retain(|id| visible.contains(id.as_str()));
        if self.anchor.as_deref().is_some_and(|a| !visible.contains(a)) {
            self.anchor = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(id: &str, title: &str) -> Paper {
        Paper {
            id: id.into(),
            folder_id: "default".into(),
            title: title.into(),
            ..Default::default()
        }
    }

    fn selected(sel: &PaperSelection) -> Vec<&str> {
        sel.selected().iter().map(String::as_str).collect()
    }

    #[test]
    fn test_filter_query_and_fields() {
        let mut a = paper("a", "Deep Learning for Vision");
        a.author = "Kim, Min".into();
        a.tags = vec!["Survey".into()];
        a.year = 2021;
        a.importance = 3;
        let mut b = paper("b", "Qualitative Interviews");
        b.is_read = true;
        b.year = 2015;

        let f = PaperFilter {
            query: Some("learning kim".into()),
            ..Default::default()
        };
        assert!(f.matches(&a));
        assert!(!f.matches(&b));

        let f = PaperFilter {
            tag: Some("survey".into()),
            min_importance: Some(2),
            ..Default::default()
        };
        assert!(f.matches(&a));
        assert!(!f.matches(&b));

        let f = PaperFilter {
            year_from: Some(2010),
            year_to: Some(2016),
            is_read: Some(true),
            ..Default::default()
        };
        assert!(!f.matches(&a));
        assert!(f.matches(&b));

        assert!(PaperFilter::default().matches(&a));
    }

    #[test]
    fn test_filter_author_pdf_and_age() {
        let mut fresh = paper("a", "Burnout");
        fresh.author = "Park, Ji-Yeon and Lee".into();
        fresh.pdf_path = "/pdfs/a_burnout.pdf".into();
        fresh.created_at = Utc::now();
        let mut old = paper("b", "Retention");
        old.created_at = Utc::now() - chrono::Duration::days(40);
        old.is_qualitative = true;

        let f = PaperFilter {
            author: Some(" PARK ".into()),
            has_pdf: Some(true),
            ..Default::default()
        };
        assert!(f.matches(&fresh));
        assert!(!f.matches(&old));

        let f = PaperFilter {
            has_pdf: Some(false),
            is_qualitative: Some(true),
            ..Default::default()
        };
        assert!(!f.matches(&fresh));
        assert!(f.matches(&old));

        let f = PaperFilter {
            added_within_days: Some(30),
            ..Default::default()
        };
        assert!(f.matches(&fresh));
        assert!(!f.matches(&old));
    }

    #[test]
    fn test_apply_sorts_by_name() {
        let f = PaperFilter {
            sort: PaperSort::Name,
            ..Default::default()
        };
        let sorted = f.apply(vec![paper("1", "beta"), paper("2", "Alpha"), paper("3", "gamma")]);
        let titles: Vec<&str> = sorted.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_single_and_toggle() {
        let visible = ["a", "b", "c"];
        let mut sel = PaperSelection::new();
        sel.click("a", ClickMode::Single, &visible);
        sel.click("c", ClickMode::Toggle, &visible);
        assert_eq!(selected(&sel), vec!["a", "c"]);
        sel.click("a", ClickMode::Toggle, &visible);
        assert_eq!(selected(&sel), vec!["c"]);
        sel.click("b", ClickMode::Single, &visible);
        assert_eq!(selected(&sel), vec!["b"]);
    }

    #[test]
    fn test_range_within_filtered_list_unions() {
        // Full list is a..f; the filter hides c and e.
        let visible = ["a", "b", "d", "f"];
        let mut sel = PaperSelection::new();
        sel.click("x", ClickMode::Single, &["x"]);
        sel.click("b", ClickMode::Toggle, &visible);
        sel.click("f", ClickMode::Range, &visible);
        assert_eq!(selected(&sel), vec!["b", "d", "f", "x"]);
        assert_eq!(sel.anchor(), Some("f"));
    }

    #[test]
    fn test_range_backwards() {
        let visible = ["a", "b", "c", "d"];
        let mut sel = PaperSelection::new();
        sel.click("d", ClickMode::Single, &visible);
        sel.click("b", ClickMode::Range, &visible);
        assert_eq!(selected(&sel), vec!["b", "c", "d"]);
    }

    #[test]
    fn test_range_without_visible_anchor_adds_one() {
        let mut sel = PaperSelection::new();
        sel.click("hidden", ClickMode::Single, &["hidden"]);
        sel.click("c", ClickMode::Range, &["a", "b", "c"]);
        assert_eq!(selected(&sel), vec!["c", "hidden"]);

        let mut fresh = PaperSelection::new();
        fresh.click("b", ClickMode::Range, &["a", "b", "c"]);
        assert_eq!(selected(&fresh), vec!["b"]);
    }

    #[test]
    fn test_select_all_clear_retain() {
        let mut sel = PaperSelection::new();
        sel.click("z", ClickMode::Single, &["z"]);
        sel.select_all(&["a", "b"]);
        assert_eq!(selected(&sel), vec!["a", "b", "z"]);

        sel.retain_visible(&["a", "b"]);
        assert_eq!(selected(&sel), vec!["a", "b"]);
        assert_eq!(sel.anchor(), None);

        sel.clear();
        assert!(sel.selected().is_empty());
    }
}
