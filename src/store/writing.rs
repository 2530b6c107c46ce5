use super::{get_json, next_sort_order, now, new_id, put_json, scan_json, Store, DOCUMENTS_TREE, PROJECTS_TREE};
use crate::error::{AppError, Result};
use crate::models::{
    CreateWritingDocumentInput, CreateWritingProjectInput, MoveWritingDocumentInput,
    UpdateWritingDocumentInput, UpdateWritingProjectInput, WritingDocument, WritingProject,
    WritingProjectMetadata, CONTENT_TYPE_FOLDER, CONTENT_TYPE_TEXT,
};
use std::collections::HashSet;

const PROJECT_TYPES: &[&str] = &["standalone", "paper-linked"];
const PROJECT_STATUSES: &[&str] = &["draft", "in-progress", "completed", "archived"];
const DOCUMENT_STATUSES: &[&str] = &["todo", "in-progress", "first-draft", "revised", "done"];

fn check_one_of(field: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Invalid {} '{}', expected one of: {}",
            field,
            value,
            allowed.join(", ")
        )))
    }
}

// ============================================================================
// Projects
// ============================================================================

impl Store {
    /// Projects, most recently updated first.
    pub fn list_projects(&self) -> Result<Vec<WritingProject>> {
        let mut projects: Vec<WritingProject> = scan_json(&self.tree(PROJECTS_TREE)?)?;
        projects.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(projects)
    }

    pub fn get_project(&self, project_id: &str) -> Result<WritingProject> {
        get_json(&self.tree(PROJECTS_TREE)?, project_id)?
            .ok_or_else(|| AppError::NotFound(format!("Writing project not found: {}", project_id)))
    }

    /// Create a project together with its root document.
    pub fn create_project(&self, input: CreateWritingProjectInput) -> Result<WritingProject> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Project title cannot be empty".into()));
        }
        if let Some(ref paper_id) = input.linked_paper_id {
            self.get_paper(paper_id)?;
        }
        let project_type = match input.project_type {
            Some(t) => t,
            None if input.linked_paper_id.is_some() => "paper-linked".to_string(),
            None => "standalone".to_string(),
        };
        check_one_of("project type", &project_type, PROJECT_TYPES)?;

        let timestamp = now();
        let mut project = WritingProject {
            id: new_id(),
            title: title.to_string(),
            description: input.description.unwrap_or_default(),
            project_type,
            linked_paper_id: input.linked_paper_id,
            root_document_id: None,
            target_word_count: input.target_word_count,
            status: "draft".to_string(),
            metadata: WritingProjectMetadata::default(),
            created_at: timestamp,
            updated_at: timestamp,
            last_opened_at: None,
        };
        let projects = self.tree(PROJECTS_TREE)?;
        put_json(&projects, &project.id, &project)?;

        let root = self.create_document(CreateWritingDocumentInput {
            project_id: project.id.clone(),
            parent_id: None,
            title: "Untitled".to_string(),
            content_type: Some(CONTENT_TYPE_TEXT.to_string()),
            sort_order: None,
        })?;
        project.root_document_id = Some(root.id);
        project.updated_at = root.updated_at;
        put_json(&projects, &project.id, &project)?;

        tracing::debug!(project_id = %project.id, "created writing project");
        Ok(project)
    }

    pub fn update_project(&self, project_id: &str, input: UpdateWritingProjectInput) -> Result<WritingProject> {
        let mut project = self.get_project(project_id)?;
        if let Some(title) = input.title {
            if title.trim().is_empty() {
                return Err(AppError::Validation("Project title cannot be empty".into()));
            }
            project.title = title.trim().to_string();
        }
        if let Some(description) = input.description {
            project.description = description;
        }
        if let Some(project_type) = input.project_type {
            check_one_of("project type", &project_type, PROJECT_TYPES)?;
            project.project_type = project_type;
        }
        if let Some(paper_id) = input.linked_paper_id {
            self.get_paper(&paper_id)?;
            project.linked_paper_id = Some(paper_id);
        }
        if let Some(target) = input.target_word_count {
            project.target_word_count = Some(target);
        }
        if let Some(status) = input.status {
            check_one_of("project status", &status, PROJECT_STATUSES)?;
            project.status = status;
        }
        if let Some(metadata) = input.metadata {
            project.metadata = metadata;
        }
        project.updated_at = now();
        put_json(&self.tree(PROJECTS_TREE)?, project_id, &project)?;
        Ok(project)
    }

    /// Record that the project was opened in the editor.
    pub fn open_project(&self, project_id: &str) -> Result<WritingProject> {
        let mut project = self.get_project(project_id)?;
        project.last_opened_at = Some(now());
        put_json(&self.tree(PROJECTS_TREE)?, project_id, &project)?;
        Ok(project)
    }

    pub fn delete_project(&self, project_id: &str) -> Result<WritingProject> {
        let project = self.get_project(project_id)?;
        let documents = self.tree(DOCUMENTS_TREE)?;
        for doc in self.list_documents(project_id)? {
            documents.remove(doc.id.as_str())?;
        }
        self.tree(PROJECTS_TREE)?.remove(project_id)?;
        tracing::debug!(project_id, "deleted writing project");
        Ok(project)
    }

    fn touch_project(&self, project_id: &str) -> Result<()> {
        let mut project = self.get_project(project_id)?;
        project.updated_at = now();
        put_json(&self.tree(PROJECTS_TREE)?, project_id, &project)
    }
}

// ============================================================================
// Documents
// ============================================================================

impl Store {
    /// All documents of a project ordered by `sort_order`. Parent/child
    /// structure is carried by `parent_id`.
    pub fn list_documents(&self, project_id: &str) -> Result<Vec<WritingDocument>> {
        let mut docs: Vec<WritingDocument> = scan_json(&self.tree(DOCUMENTS_TREE)?)?;
        docs.retain(|d| d.project_id == project_id);
        docs.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(docs)
    }

    pub fn get_document(&self, document_id: &str) -> Result<WritingDocument> {
        get_json(&self.tree(DOCUMENTS_TREE)?, document_id)?
            .ok_or_else(|| AppError::NotFound(format!("Writing document not found: {}", document_id)))
    }

    pub fn create_document(&self, input: CreateWritingDocumentInput) -> Result<WritingDocument> {
        self.get_project(&input.project_id)?;
        if let Some(ref parent_id) = input.parent_id {
            self.check_parent(&input.project_id, parent_id)?;
        }
        let content_type = input.content_type.unwrap_or_else(|| CONTENT_TYPE_TEXT.to_string());
        check_one_of("content type", &content_type, &[CONTENT_TYPE_TEXT, CONTENT_TYPE_FOLDER])?;

        let sort_order = match input.sort_order {
            Some(order) => order,
            None => {
                let siblings = self.list_documents(&input.project_id)?;
                next_sort_order(
                    siblings
                        .iter()
                        .filter(|d| d.parent_id == input.parent_id)
                        .map(|d| d.sort_order),
                )
            }
        };

        let timestamp = now();
        let doc = WritingDocument {
            id: new_id(),
            project_id: input.project_id,
            parent_id: input.parent_id,
            title: input.title.trim().to_string(),
            content: String::new(),
            content_type,
            sort_order,
            is_expanded: true,
            synopsis: String::new(),
            notes: String::new(),
            status: "todo".to_string(),
            word_count: 0,
            target_word_count: None,
            labels: Vec::new(),
            created_at: timestamp,
            updated_at: timestamp,
        };
        put_json(&self.tree(DOCUMENTS_TREE)?, &doc.id, &doc)?;
        self.touch_project(&doc.project_id)?;
        Ok(doc)
    }

    pub fn update_document(&self, document_id: &str, input: UpdateWritingDocumentInput) -> Result<WritingDocument> {
        let mut doc = self.get_document(document_id)?;
        if let Some(title) = input.title {
            doc.title = title;
        }
        if let Some(content) = input.content {
            doc.content = content;
        }
        if let Some(content_type) = input.content_type {
            check_one_of("content type", &content_type, &[CONTENT_TYPE_TEXT, CONTENT_TYPE_FOLDER])?;
            doc.content_type = content_type;
        }
        if let Some(sort_order) = input.sort_order {
            doc.sort_order = sort_order;
        }
        if let Some(is_expanded) = input.is_expanded {
            doc.is_expanded = is_expanded;
        }
        if let Some(synopsis) = input.synopsis {
            doc.synopsis = synopsis;
        }
        if let Some(notes) = input.notes {
            doc.notes = notes;
        }
        if let Some(status) = input.status {
            check_one_of("document status", &status, DOCUMENT_STATUSES)?;
            doc.status = status;
        }
        if let Some(word_count) = input.word_count {
            doc.word_count = word_count.max(0);
        }
        if let Some(target) = input.target_word_count {
            doc.target_word_count = Some(target);
        }
        if let Some(labels) = input.labels {
            doc.labels = labels;
        }
        doc.updated_at = now();
        put_json(&self.tree(DOCUMENTS_TREE)?, document_id, &doc)?;
        self.touch_project(&doc.project_id)?;
        Ok(doc)
    }

    /// Re-parent and/or reorder a document within its project.
    pub fn move_document(&self, document_id: &str, input: MoveWritingDocumentInput) -> Result<WritingDocument> {
        let mut doc = self.get_document(document_id)?;
        if let Some(ref parent_id) = input.parent_id {
            if parent_id == document_id || self.descendant_ids(&doc.project_id, document_id)?.contains(parent_id) {
                return Err(AppError::Validation(
                    "A document cannot be moved inside itself".into(),
                ));
            }
            self.check_parent(&doc.project_id, parent_id)?;
        }
        doc.parent_id = input.parent_id;
        doc.sort_order = input.sort_order;
        doc.updated_at = now();
        put_json(&self.tree(DOCUMENTS_TREE)?, document_id, &doc)?;
        self.touch_project(&doc.project_id)?;
        Ok(doc)
    }

    /// Delete a document and its whole subtree. Returns the number of
    /// documents removed.
    pub fn delete_document(&self, document_id: &str) -> Result<usize> {
        let doc = self.get_document(document_id)?;
        let mut doomed = self.descendant_ids(&doc.project_id, document_id)?;
        doomed.insert(document_id.to_string());

        let tree = self.tree(DOCUMENTS_TREE)?;
        for id in &doomed {
            tree.remove(id.as_str())?;
        }

        let mut project = self.get_project(&doc.project_id)?;
        if project.root_document_id.as_ref().is_some_and(|root| doomed.contains(root)) {
            project.root_document_id = None;
        }
        project.updated_at = now();
        put_json(&self.tree(PROJECTS_TREE)?, &project.id, &project)?;

        tracing::debug!(document_id, removed = doomed.len(), "deleted writing document");
        Ok(doomed.len())
    }

    fn check_parent(&self, project_id: &str, parent_id: &str) -> Result<()> {
        let parent = self.get_document(parent_id)?;
        if parent.project_id != project_id {
            return Err(AppError::Validation(
                "Parent document belongs to a different project".into(),
            ));
        }
        Ok(())
    }

    fn descendant_ids(&self, project_id: &str, document_id: &str) -> Result<HashSet<String>> {
        let docs = self.list_documents(project_id)?;
        let mut found = HashSet::new();
        let mut frontier = vec![document_id.to_string()];
        while let Some(current) = frontier.pop() {
            for child in docs.iter().filter(|d| d.parent_id.as_deref() == Some(current.as_str())) {
                if found.insert(child.id.clone()) {
                    frontier.push(child.id.clone());
                }
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(store: &Store) -> WritingProject {
        store
            .create_project(CreateWritingProjectInput {
                title: "Thesis".into(),
                ..Default::default()
            })
            .unwrap()
    }

    fn doc(store: &Store, project_id: &str, parent: Option<&str>, title: &str) -> WritingDocument {
        store
            .create_document(CreateWritingDocumentInput {
                project_id: project_id.to_string(),
                parent_id: parent.map(str::to_string),
                title: title.to_string(),
                content_type: None,
                sort_order: None,
            })
            .unwrap()
    }

    #[test]
    fn test_create_project_makes_root_document() {
        let store = Store::temporary().unwrap();
        let p = project(&store);
        assert_eq!(p.project_type, "standalone");
        assert_eq!(p.status, "draft");
        let root_id = p.root_document_id.clone().unwrap();
        let root = store.get_document(&root_id).unwrap();
        assert_eq!(root.title, "Untitled");
        assert_eq!(root.project_id, p.id);
        assert_eq!(store.list_documents(&p.id).unwrap().len(), 1);
    }

    #[test]
    fn test_create_project_validates_link() {
        let store = Store::temporary().unwrap();
        let result = store.create_project(CreateWritingProjectInput {
            title: "Review".into(),
            linked_paper_id: Some("nope".into()),
            ..Default::default()
        });
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_siblings_are_appended() {
        let store = Store::temporary().unwrap();
        let p = project(&store);
        let chapter = doc(&store, &p.id, None, "Chapter 1");
        let a = doc(&store, &p.id, Some(&chapter.id), "Intro");
        let b = doc(&store, &p.id, Some(&chapter.id), "Method");
        assert_eq!(chapter.sort_order, 1);
        assert_eq!(a.sort_order, 0);
        assert_eq!(b.sort_order, 1);
    }

    #[test]
    fn test_document_parent_must_share_project() {
        let store = Store::temporary().unwrap();
        let p1 = project(&store);
        let p2 = project(&store);
        let foreign = doc(&store, &p2.id, None, "Elsewhere");
        let result = store.create_document(CreateWritingDocumentInput {
            project_id: p1.id.clone(),
            parent_id: Some(foreign.id),
            title: "Child".into(),
            content_type: None,
            sort_order: None,
        });
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_move_rejects_descendant() {
        let store = Store::temporary().unwrap();
        let p = project(&store);
        let top = doc(&store, &p.id, None, "Part");
        let mid = doc(&store, &p.id, Some(&top.id), "Section");
        let leaf = doc(&store, &p.id, Some(&mid.id), "Paragraph");

        for target in [&top.id, &leaf.id] {
            let result = store.move_document(
                &top.id,
                MoveWritingDocumentInput {
                    parent_id: Some(target.clone()),
                    sort_order: 0,
                },
            );
            assert!(matches!(result, Err(AppError::Validation(_))));
        }

        let moved = store
            .move_document(
                &leaf.id,
                MoveWritingDocumentInput {
                    parent_id: None,
                    sort_order: 7,
                },
            )
            .unwrap();
        assert_eq!(moved.parent_id, None);
        assert_eq!(moved.sort_order, 7);
    }

    #[test]
    fn test_delete_document_removes_subtree() {
        let store = Store::temporary().unwrap();
        let p = project(&store);
        let top = doc(&store, &p.id, None, "Part");
        let mid = doc(&store, &p.id, Some(&top.id), "Section");
        doc(&store, &p.id, Some(&mid.id), "Paragraph");
        let keep = doc(&store, &p.id, None, "Appendix");

        assert_eq!(store.delete_document(&top.id).unwrap(), 3);
        let remaining: Vec<String> = store
            .list_documents(&p.id)
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.contains(&keep.id));
    }

    #[test]
    fn test_document_mutation_touches_project() {
        let store = Store::temporary().unwrap();
        let p = project(&store);
        let root_id = p.root_document_id.clone().unwrap();
        let before = store.get_project(&p.id).unwrap().updated_at;

        store
            .update_document(
                &root_id,
                UpdateWritingDocumentInput {
                    content: Some("{}".into()),
                    status: Some("first-draft".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(store.get_project(&p.id).unwrap().updated_at >= before);

        let bad = store.update_document(
            &root_id,
            UpdateWritingDocumentInput {
                status: Some("finished".into()),
                ..Default::default()
            },
        );
        assert!(matches!(bad, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_delete_project_cascades() {
        let store = Store::temporary().unwrap();
        let p = project(&store);
        let d = doc(&store, &p.id, None, "Notes");
        store.delete_project(&p.id).unwrap();
        assert!(matches!(store.get_document(&d.id), Err(AppError::NotFound(_))));
        assert!(store.list_projects().unwrap().is_empty());
    }

    #[test]
    fn test_open_project_records_time() {
        let store = Store::temporary().unwrap();
        let p = project(&store);
        assert!(p.last_opened_at.is_none());
        assert!(store.open_project(&p.id).unwrap().last_opened_at.is_some());
    }
}
