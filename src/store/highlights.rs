use super::{get_json, now, new_id, put_json, scan_json, Store, HIGHLIGHTS_TREE};
use crate::error::{AppError, Result};
use crate::models::{CreateHighlightInput, Highlight, UpdateHighlightInput};

pub const DEFAULT_HIGHLIGHT_COLOR: &str = "#FFFF00";

impl Store {
    /// Highlights of a paper ordered by page then creation time, optionally
    /// restricted to one page.
    pub fn list_highlights(&self, paper_id: &str, page_number: Option<i32>) -> Result<Vec<Highlight>> {
        let mut highlights: Vec<Highlight> = scan_json(&self.tree(HIGHLIGHTS_TREE)?)?;
        highlights.retain(|h| h.paper_id == paper_id && page_number.map_or(true, |p| h.page_number == p));
        highlights.sort_by(|a, b| {
            a.page_number
                .cmp(&b.page_number)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(highlights)
    }

    pub fn get_highlight(&self, highlight_id: &str) -> Result<Highlight> {
        get_json(&self.tree(HIGHLIGHTS_TREE)?, highlight_id)?
            .ok_or_else(|| AppError::NotFound(format!("Highlight not found: {}", highlight_id)))
    }

    pub fn create_highlight(&self, input: CreateHighlightInput) -> Result<Highlight> {
        self.get_paper(&input.paper_id)?;
        if input.page_number < 1 {
            return Err(AppError::Validation("Page numbers start at 1".into()));
        }

        let timestamp = now();
        let highlight = Highlight {
            id: new_id(),
            paper_id: input.paper_id,
            page_number: input.page_number,
            rects: input.rects,
            selected_text: input.selected_text,
            color: input
                .color
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_HIGHLIGHT_COLOR.to_string()),
            note: input.note.unwrap_or_default(),
            created_at: timestamp,
            updated_at: timestamp,
        };
        put_json(&self.tree(HIGHLIGHTS_TREE)?, &highlight.id, &highlight)?;
        Ok(highlight)
    }

    pub fn update_highlight(&self, highlight_id: &str, input: UpdateHighlightInput) -> Result<Highlight> {
        let mut highlight = self.get_highlight(highlight_id)?;
        if let Some(color) = input.color {
            highlight.color = color;
        }
        if let Some(note) = input.note {
            highlight.note = note;
        }
        highlight.updated_at = now();
        put_json(&self.tree(HIGHLIGHTS_TREE)?, highlight_id, &highlight)?;
        Ok(highlight)
    }

    pub fn delete_highlight(&self, highlight_id: &str) -> Result<Highlight> {
        let highlight = self.get_highlight(highlight_id)?;
        self.tree(HIGHLIGHTS_TREE)?.remove(highlight_id)?;
        Ok(highlight)
    }

    pub(super) fn delete_highlights_for_paper(&self, paper_id: &str) -> Result<usize> {
        let tree = self.tree(HIGHLIGHTS_TREE)?;
        let highlights: Vec<Highlight> = scan_json(&tree)?;
        let mut removed = 0;
        for h in highlights.iter().filter(|h| h.paper_id == paper_id) {
            tree.remove(h.id.as_str())?;
            removed += 1;
        }
        Ok(removed)
    }
}
