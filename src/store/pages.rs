use super::{scan_json, scan_prefix_json, put_json, Store, PAGES_TREE};
use crate::error::Result;
use crate::models::PdfPage;

fn page_key(paper_id: &str, page_number: i32) -> String {
    format!("{}:{:06}", paper_id, page_number)
}

impl Store {
    /// Replace the extracted text of a paper. Pages are numbered from 1 in
    /// the order given; blank pages are kept so numbering matches the PDF.
    pub fn replace_pages(&self, paper_id: &str, pages: &[String]) -> Result<usize> {
        self.delete_pages(paper_id)?;
        let tree = self.tree(PAGES_TREE)?;
        for (i, text) in pages.iter().enumerate() {
            let page = PdfPage {
                paper_id: paper_id.to_string(),
                page_number: i as i32 + 1,
                text: text.clone(),
            };
            put_json(&tree, &page_key(paper_id, page.page_number), &page)?;
        }
        self.set_indexed(paper_id, true)?;
        Ok(pages.len())
    }

    pub fn list_pages(&self, paper_id: &str) -> Result<Vec<PdfPage>> {
        // Zero-padded keys keep the prefix scan in page order.
        scan_prefix_json(&self.tree(PAGES_TREE)?, &format!("{}:", paper_id))
    }

    pub fn all_pages(&self) -> Result<Vec<PdfPage>> {
        scan_json(&self.tree(PAGES_TREE)?)
    }

    pub(super) fn delete_pages(&self, paper_id: &str) -> Result<()> {
        let tree = self.tree(PAGES_TREE)?;
        let keys: Vec<sled::IVec> = tree
            .scan_prefix(format!("{}:", paper_id))
            .keys()
            .collect::<std::result::Result<_, _>>()?;
        for key in keys {
            tree.remove(key)?;
        }
        Ok(())
    }
}
