//! Persistence for the paper library, backed by sled.
//!
//! Each entity lives in its own tree keyed by id with a JSON value. Listing
//! operations scan the tree and sort in memory; the library is small enough
//! (thousands of papers at most) that secondary indexes are not worth their
//! write cost.

mod folders;
mod highlights;
mod pages;
mod papers;
mod settings;
mod smart_groups;
mod topics;
mod writing;

pub use papers::PaperSort;

use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

const TOPICS_TREE: &str = "topics";
const FOLDERS_TREE: &str = "folders";
const PAPERS_TREE: &str = "papers";
const HIGHLIGHTS_TREE: &str = "highlights";
const PROJECTS_TREE: &str = "writing_projects";
const DOCUMENTS_TREE: &str = "writing_documents";
const SETTINGS_TREE: &str = "settings";
const SMART_GROUPS_TREE: &str = "smart_groups";
const PAGES_TREE: &str = "pdf_pages";
const META_TREE: &str = "meta";

const PAPER_SEQUENCE_KEY: &str = "paper_sequence";

/// Id of the topic and folder that always exist.
pub const DEFAULT_ID: &str = "default";
pub const DEFAULT_TOPIC_COLOR: &str = "blue";

#[derive(Clone)]
pub struct Store {
    db: sled::Db,
}

impl Store {
    /// Open (or create) the database at `path` and seed the defaults.
    pub fn open(path: &Path) -> Result<Self> {
        let db = sled::open(path)?;
        let store = Self { db };
        store.seed_defaults()?;
        Ok(store)
    }

    /// In-memory database removed on drop.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        let store = Self { db };
        store.seed_defaults()?;
        Ok(store)
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    fn tree(&self, name: &str) -> Result<sled::Tree> {
        Ok(self.db.open_tree(name)?)
    }

    fn seed_defaults(&self) -> Result<()> {
        let topics = self.tree(TOPICS_TREE)?;
        if !topics.contains_key(DEFAULT_ID)? {
            let now = Utc::now();
            let topic = crate::models::Topic {
                id: DEFAULT_ID.to_string(),
                name: "General".to_string(),
                color: DEFAULT_TOPIC_COLOR.to_string(),
                icon: "BookOpen".to_string(),
                sort_order: 0,
                parent_id: None,
                created_at: now,
                updated_at: now,
            };
            put_json(&topics, DEFAULT_ID, &topic)?;
        }

        let folders = self.tree(FOLDERS_TREE)?;
        if !folders.contains_key(DEFAULT_ID)? {
            let now = Utc::now();
            let folder = crate::models::Folder {
                id: DEFAULT_ID.to_string(),
                topic_id: DEFAULT_ID.to_string(),
                name: "Unsorted".to_string(),
                sort_order: 0,
                created_at: now,
                updated_at: now,
            };
            put_json(&folders, DEFAULT_ID, &folder)?;
        }
        Ok(())
    }

    /// Next value of the paper number sequence, starting at 1.
    fn next_paper_number(&self) -> Result<i32> {
        let meta = self.tree(META_TREE)?;
        let previous = meta.fetch_and_update(PAPER_SEQUENCE_KEY, |old| {
            let next = old.map(decode_counter).unwrap_or(0) + 1;
            Some(next.to_be_bytes().to_vec())
        })?;
        let number = previous.as_deref().map(decode_counter).unwrap_or(0) + 1;
        i32::try_from(number).map_err(|_| AppError::Internal("paper sequence overflow".into()))
    }
}

fn decode_counter(bytes: &[u8]) -> u64 {
    bytes.try_into().map(u64::from_be_bytes).unwrap_or(0)
}

// ============================================================================
// JSON Helpers
// ============================================================================

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}

fn get_json<T: DeserializeOwned>(tree: &sled::Tree, key: &str) -> Result<Option<T>> {
    match tree.get(key)? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

fn put_json<T: Serialize>(tree: &sled::Tree, key: &str, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)?;
    tree.insert(key, bytes)?;
    Ok(())
}

fn scan_json<T: DeserializeOwned>(tree: &sled::Tree) -> Result<Vec<T>> {
    let mut out = Vec::new();
    for entry in tree.iter() {
        let (_, value) = entry?;
        out.push(serde_json::from_slice(&value)?);
    }
    Ok(out)
}

fn scan_prefix_json<T: DeserializeOwned>(tree: &sled::Tree, prefix: &str) -> Result<Vec<T>> {
    let mut out = Vec::new();
    for entry in tree.scan_prefix(prefix) {
        let (_, value) = entry?;
        out.push(serde_json::from_slice(&value)?);
    }
    Ok(out)
}

/// Next `sort_order` for a new sibling: one past the current maximum.
fn next_sort_order<I: IntoIterator<Item = i32>>(orders: I) -> i32 {
    orders.into_iter().max().map(|m| m + 1).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_seeded() {
        let store = Store::temporary().unwrap();
        let topic = store.get_topic(DEFAULT_ID).unwrap();
        assert_eq!(topic.name, "General");
        assert_eq!(topic.color, DEFAULT_TOPIC_COLOR);
        let folder = store.get_folder(DEFAULT_ID).unwrap();
        assert_eq!(folder.name, "Unsorted");
        assert_eq!(folder.topic_id, DEFAULT_ID);
    }

    #[test]
    fn test_paper_sequence_is_monotonic() {
        let store = Store::temporary().unwrap();
        assert_eq!(store.next_paper_number().unwrap(), 1);
        assert_eq!(store.next_paper_number().unwrap(), 2);
        assert_eq!(store.next_paper_number().unwrap(), 3);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db");
        {
            let store = Store::open(&path).unwrap();
            store
                .create_topic(crate::models::CreateTopicInput {
                    name: "Methods".into(),
                    color: None,
                    icon: None,
                    parent_id: None,
                })
                .unwrap();
            store.flush().unwrap();
        }
        let store = Store::open(&path).unwrap();
        let names: Vec<String> = store.list_topics().unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["General".to_string(), "Methods".to_string()]);
    }

    #[test]
    fn test_next_sort_order() {
        assert_eq!(next_sort_order(Vec::<i32>::new()), 0);
        assert_eq!(next_sort_order(vec![0, 3, 1]), 4);
    }
}
