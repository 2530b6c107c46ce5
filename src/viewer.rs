//! Open-PDF tabs.
//!
//! At most one tab per paper. Opening a paper that already has a tab focuses
//! it. Closing the active tab moves focus to the tab that slid into its slot,
//! or the new last tab when the closed one was last.

use crate::error::{AppError, Result};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub paper_id: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabSet {
    tabs: Vec<Tab>,
    active_index: Option<usize>,
}

impl TabSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active_index
    }

    pub fn active(&self) -> Option<&Tab> {
        self.active_index.and_then(|i| self.tabs.get(i))
    }

    pub fn position(&self, paper_id: &str) -> Option<usize> {
        self.tabs.iter().position(|t| t.paper_id == paper_id)
    }

    /// Open (or focus) the tab for `paper_id`. Returns its index.
    pub fn open(&mut self, paper_id: &str, title: &str) -> usize {
        let index = match self.position(paper_id) {
            Some(i) => {
                self.tabs[i].title = title.to_string();
                i
            }
            None => {
                self.tabs.push(Tab {
                    paper_id: paper_id.to_string(),
                    title: title.to_string(),
                });
                self.tabs.len() - 1
            }
        };
        self.active_index = Some(index);
        index
    }

    pub fn activate(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.active_index = Some(index);
        Ok(())
    }

    pub fn close(&mut self, index: usize) -> Result<Tab> {
        self.check_index(index)?;
        let removed = self.tabs.remove(index);

        self.active_index = match self.active_index {
            _ if self.tabs.is_empty() => None,
            Some(active) if active == index => Some(index.min(self.tabs.len() - 1)),
            Some(active) if active > index => Some(active - 1),
            other => other,
        };
        Ok(removed)
    }

    /// Close the tab showing `paper_id`, if any.
    pub fn close_paper(&mut self, paper_id: &str) -> Option<Tab> {
        let index = self.position(paper_id)?;
        self.close(index).ok()
    }

    /// Keep tab titles in step with renamed papers.
    pub fn rename_paper(&mut self, paper_id: &str, title: &str) {
        if let Some(i) = self.position(paper_id) {
            self.tabs[i].title = title.to_string();
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.tabs.len() {
            return Err(AppError::Validation(format!(
                "Tab index {} out of range ({} open)",
                index,
                self.tabs.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_tabs(ids: &[&str]) -> TabSet {
        let mut tabs = TabSet::new();
        for id in ids {
            tabs.open(id, &id.to_uppercase());
        }
        tabs
    }

    fn ids(tabs: &TabSet) -> Vec<&str> {
        tabs.tabs().iter().map(|t| t.paper_id.as_str()).collect()
    }

    #[test]
    fn test_open_focuses_existing_tab() {
        let mut tabs = with_tabs(&["a", "b", "c"]);
        assert_eq!(tabs.active_index(), Some(2));

        let index = tabs.open("a", "A renamed");
        assert_eq!(index, 0);
        assert_eq!(tabs.tabs().len(), 3);
        assert_eq!(tabs.active_index(), Some(0));
        assert_eq!(tabs.active().unwrap().title, "A renamed");
    }

    #[test]
    fn test_close_active_selects_adjacent() {
        let mut tabs = with_tabs(&["a", "b", "c"]);
        tabs.activate(1).unwrap();
        tabs.close(1).unwrap();
        assert_eq!(ids(&tabs), vec!["a", "c"]);
        assert_eq!(tabs.active().unwrap().paper_id, "c");

        // Closing the active last tab falls back to the new last tab.
        tabs.close(1).unwrap();
        assert_eq!(tabs.active_index(), Some(0));
        assert_eq!(tabs.active().unwrap().paper_id, "a");
    }

    #[test]
    fn test_close_last_tab_clears_active() {
        let mut tabs = with_tabs(&["a"]);
        tabs.close(0).unwrap();
        assert!(tabs.tabs().is_empty());
        assert_eq!(tabs.active_index(), None);
    }

    #[test]
    fn test_close_other_tabs_keeps_focus() {
        let mut tabs = with_tabs(&["a", "b", "c", "d"]);
        tabs.activate(2).unwrap();

        tabs.close(0).unwrap();
        assert_eq!(tabs.active().unwrap().paper_id, "c");
        assert_eq!(tabs.active_index(), Some(1));

        tabs.close(2).unwrap();
        assert_eq!(tabs.active().unwrap().paper_id, "c");
    }

    #[test]
    fn test_out_of_range() {
        let mut tabs = with_tabs(&["a"]);
        assert!(matches!(tabs.close(3), Err(AppError::Validation(_))));
        assert!(tabs.activate(1).is_err());
        assert_eq!(tabs.tabs().len(), 1);
    }

    #[test]
    fn test_close_paper_and_rename() {
        let mut tabs = with_tabs(&["a", "b"]);
        tabs.rename_paper("a", "Better title");
        assert_eq!(tabs.tabs()[0].title, "Better title");
        assert!(tabs.close_paper("missing").is_none());
        assert_eq!(tabs.close_paper("b").unwrap().paper_id, "b");
        assert_eq!(tabs.active_index(), Some(0));
    }

    #[test]
    fn test_serializes_camel_case() {
        let tabs = with_tabs(&["a"]);
        let json = serde_json::to_value(&tabs).unwrap();
        assert_eq!(json["activeIndex"], 0);
        assert_eq!(json["tabs"][0]["paperId"], "a");
    }
}
