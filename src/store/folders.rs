use super::{get_json, next_sort_order, now, new_id, put_json, scan_json, Store, DEFAULT_ID, FOLDERS_TREE};
use crate::error::{AppError, Result};
use crate::models::{CreateFolderInput, Folder, UpdateFolderInput};

impl Store {
    /// Folders ordered by `sort_order`, optionally restricted to one topic.
    pub fn list_folders(&self, topic_id: Option<&str>) -> Result<Vec<Folder>> {
        let mut folders: Vec<Folder> = scan_json(&self.tree(FOLDERS_TREE)?)?;
        if let Some(topic_id) = topic_id {
            folders.retain(|f| f.topic_id == topic_id);
        }
        folders.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(folders)
    }

    pub fn get_folder(&self, folder_id: &str) -> Result<Folder> {
        get_json(&self.tree(FOLDERS_TREE)?, folder_id)?
            .ok_or_else(|| AppError::NotFound(format!("Folder not found: {}", folder_id)))
    }

    pub fn create_folder(&self, input: CreateFolderInput) -> Result<Folder> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Folder name cannot be empty".into()));
        }
        self.get_topic(&input.topic_id)?;

        let siblings = self.list_folders(Some(&input.topic_id))?;
        let timestamp = now();
        let folder = Folder {
            id: new_id(),
            topic_id: input.topic_id,
            name: name.to_string(),
            sort_order: next_sort_order(siblings.iter().map(|f| f.sort_order)),
            created_at: timestamp,
            updated_at: timestamp,
        };
        put_json(&self.tree(FOLDERS_TREE)?, &folder.id, &folder)?;
        tracing::debug!(folder_id = %folder.id, topic_id = %folder.topic_id, "created folder");
        Ok(folder)
    }

    pub fn update_folder(&self, folder_id: &str, input: UpdateFolderInput) -> Result<Folder> {
        let mut folder = self.get_folder(folder_id)?;
        if let Some(name) = input.name {
            if name.trim().is_empty() {
                return Err(AppError::Validation("Folder name cannot be empty".into()));
            }
            folder.name = name.trim().to_string();
        }
        if let Some(sort_order) = input.sort_order {
            folder.sort_order = sort_order;
        }
        folder.updated_at = now();
        put_json(&self.tree(FOLDERS_TREE)?, folder_id, &folder)?;
        Ok(folder)
    }

    /// Delete a folder and every paper filed in it.
    pub fn delete_folder(&self, folder_id: &str) -> Result<Folder> {
        if folder_id == DEFAULT_ID {
            return Err(AppError::Validation("The default folder cannot be deleted".into()));
        }
        let folder = self.get_folder(folder_id)?;
        self.remove_folder_cascade(folder_id)?;
        Ok(folder)
    }

    pub(super) fn remove_folder_cascade(&self, folder_id: &str) -> Result<()> {
        for paper in self.list_papers(Some(folder_id), super::PaperSort::Created)? {
            self.delete_paper(&paper.id)?;
        }
        self.tree(FOLDERS_TREE)?.remove(folder_id)?;
        tracing::debug!(folder_id, "deleted folder");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreatePaperInput;

    #[test]
    fn test_create_folder_requires_topic() {
        let store = Store::temporary().unwrap();
        let result = store.create_folder(CreateFolderInput {
            topic_id: "nope".into(),
            name: "Inbox".into(),
        });
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_folders_are_appended_per_topic() {
        let store = Store::temporary().unwrap();
        let a = store
            .create_folder(CreateFolderInput {
                topic_id: DEFAULT_ID.into(),
                name: "Reading".into(),
            })
            .unwrap();
        let b = store
            .create_folder(CreateFolderInput {
                topic_id: DEFAULT_ID.into(),
                name: "Done".into(),
            })
            .unwrap();
        // "Unsorted" holds sort order 0.
        assert_eq!(a.sort_order, 1);
        assert_eq!(b.sort_order, 2);

        let names: Vec<String> = store
            .list_folders(Some(DEFAULT_ID))
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["Unsorted", "Reading", "Done"]);
    }

    #[test]
    fn test_update_folder_partial() {
        let store = Store::temporary().unwrap();
        let folder = store
            .create_folder(CreateFolderInput {
                topic_id: DEFAULT_ID.into(),
                name: "Old".into(),
            })
            .unwrap();
        let updated = store
            .update_folder(
                &folder.id,
                UpdateFolderInput {
                    name: Some("New".into()),
                    sort_order: None,
                },
            )
            .unwrap();
        assert_eq!(updated.name, "New");
        assert_eq!(updated.sort_order, folder.sort_order);
    }

    #[test]
    fn test_delete_folder_removes_papers() {
        let store = Store::temporary().unwrap();
        let folder = store
            .create_folder(CreateFolderInput {
                topic_id: DEFAULT_ID.into(),
                name: "Temp".into(),
            })
            .unwrap();
        let paper = store
            .create_paper(CreatePaperInput {
                folder_id: folder.id.clone(),
                title: "Ephemeral".into(),
                ..Default::default()
            })
            .unwrap();

        store.delete_folder(&folder.id).unwrap();
        assert!(matches!(store.get_paper(&paper.id), Err(AppError::NotFound(_))));
        assert!(matches!(
            store.delete_folder(DEFAULT_ID),
            Err(AppError::Validation(_))
        ));
    }
}
