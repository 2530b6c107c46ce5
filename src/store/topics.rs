use super::{get_json, next_sort_order, now, new_id, put_json, scan_json, Store, DEFAULT_ID, TOPICS_TREE};
use crate::error::{AppError, Result};
use crate::models::{CreateTopicInput, Topic, UpdateTopicInput};

impl Store {
    pub fn list_topics(&self) -> Result<Vec<Topic>> {
        let mut topics: Vec<Topic> = scan_json(&self.tree(TOPICS_TREE)?)?;
        topics.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(topics)
    }

    pub fn get_topic(&self, topic_id: &str) -> Result<Topic> {
        get_json(&self.tree(TOPICS_TREE)?, topic_id)?
            .ok_or_else(|| AppError::NotFound(format!("Topic not found: {}", topic_id)))
    }

    pub fn create_topic(&self, input: CreateTopicInput) -> Result<Topic> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Topic name cannot be empty".into()));
        }
        if let Some(ref parent_id) = input.parent_id {
            self.get_topic(parent_id)?;
        }

        let tree = self.tree(TOPICS_TREE)?;
        let existing: Vec<Topic> = scan_json(&tree)?;
        let timestamp = now();
        let topic = Topic {
            id: new_id(),
            name: name.to_string(),
            color: input.color.unwrap_or_else(|| super::DEFAULT_TOPIC_COLOR.to_string()),
            icon: input.icon.unwrap_or_else(|| "BookOpen".to_string()),
            sort_order: next_sort_order(existing.iter().map(|t| t.sort_order)),
            parent_id: input.parent_id,
            created_at: timestamp,
            updated_at: timestamp,
        };
        put_json(&tree, &topic.id, &topic)?;
        tracing::debug!(topic_id = %topic.id, name = %topic.name, "created topic");
        Ok(topic)
    }

    pub fn update_topic(&self, topic_id: &str, input: UpdateTopicInput) -> Result<Topic> {
        let mut topic = self.get_topic(topic_id)?;

        if let Some(ref parent_id) = input.parent_id {
            if parent_id == topic_id || self.topic_ancestors(parent_id)?.iter().any(|id| id == topic_id) {
                return Err(AppError::Validation("A topic cannot be nested inside itself".into()));
            }
            self.get_topic(parent_id)?;
            topic.parent_id = Some(parent_id.clone());
        }
        if let Some(name) = input.name {
            if name.trim().is_empty() {
                return Err(AppError::Validation("Topic name cannot be empty".into()));
            }
            topic.name = name.trim().to_string();
        }
        if let Some(color) = input.color {
            topic.color = color;
        }
        if let Some(icon) = input.icon {
            topic.icon = icon;
        }
        if let Some(sort_order) = input.sort_order {
            topic.sort_order = sort_order;
        }
        topic.updated_at = now();

        put_json(&self.tree(TOPICS_TREE)?, topic_id, &topic)?;
        Ok(topic)
    }

    /// Delete a topic, its folders (with their papers) and detach child topics.
    pub fn delete_topic(&self, topic_id: &str) -> Result<()> {
        if topic_id == DEFAULT_ID {
            return Err(AppError::Validation("The default topic cannot be deleted".into()));
        }
        self.get_topic(topic_id)?;

        for folder in self.list_folders(Some(topic_id))? {
            self.remove_folder_cascade(&folder.id)?;
        }

        let tree = self.tree(TOPICS_TREE)?;
        let topics: Vec<Topic> = scan_json(&tree)?;
        for mut child in topics.into_iter().filter(|t| t.parent_id.as_deref() == Some(topic_id)) {
            child.parent_id = None;
            child.updated_at = now();
            put_json(&tree, &child.id, &child)?;
        }

        tree.remove(topic_id)?;
        tracing::debug!(topic_id, "deleted topic");
        Ok(())
    }

    fn topic_ancestors(&self, topic_id: &str) -> Result<Vec<String>> {
        let mut ancestors = Vec::new();
        let mut current = self.get_topic(topic_id)?.parent_id;
        while let Some(id) = current {
            if ancestors.contains(&id) {
                break;
            }
            current = self.get_topic(&id)?.parent_id;
            ancestors.push(id);
        }
        Ok(ancestors)
    }
}
