use super::{get_json, now, new_id, put_json, scan_json, Store, SMART_GROUPS_TREE};
use crate::error::{AppError, Result};
use crate::models::{CreateSmartGroupInput, SmartGroup, UpdateSmartGroupInput};

impl Store {
    /// Saved groups by name, case-insensitive.
    pub fn list_smart_groups(&self) -> Result<Vec<SmartGroup>> {
        let mut groups: Vec<SmartGroup> = scan_json(&self.tree(SMART_GROUPS_TREE)?)?;
        groups.sort_by_key(|g| g.name.to_lowercase());
        Ok(groups)
    }

    pub fn get_smart_group(&self, group_id: &str) -> Result<SmartGroup> {
        get_json(&self.tree(SMART_GROUPS_TREE)?, group_id)?
            .ok_or_else(|| AppError::NotFound(format!("Smart group not found: {}", group_id)))
    }

    pub fn create_smart_group(&self, input: CreateSmartGroupInput) -> Result<SmartGroup> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Smart group name cannot be empty".into()));
        }

        let timestamp = now();
        let group = SmartGroup {
            id: new_id(),
            name: name.to_string(),
            criteria: input.criteria,
            match_mode: input.match_mode,
            icon: input.icon,
            color: input.color,
            predefined: false,
            created_at: timestamp,
            updated_at: timestamp,
        };
        put_json(&self.tree(SMART_GROUPS_TREE)?, &group.id, &group)?;
        tracing::debug!(group_id = %group.id, name = %group.name, "created smart group");
        Ok(group)
    }

    pub fn update_smart_group(&self, group_id: &str, input: UpdateSmartGroupInput) -> Result<SmartGroup> {
        let mut group = self.get_smart_group(group_id)?;
        if let Some(name) = input.name {
            if name.trim().is_empty() {
                return Err(AppError::Validation("Smart group name cannot be empty".into()));
            }
            group.name = name.trim().to_string();
        }
        if let Some(criteria) = input.criteria {
            group.criteria = criteria;
        }
        if let Some(match_mode) = input.match_mode {
            group.match_mode = match_mode;
        }
        if input.icon.is_some() {
            group.icon = input.icon;
        }
        if input.color.is_some() {
            group.color = input.color;
        }
        group.updated_at = now();

        put_json(&self.tree(SMART_GROUPS_TREE)?, group_id, &group)?;
        Ok(group)
    }

    pub fn delete_smart_group(&self, group_id: &str) -> Result<()> {
        if self.tree(SMART_GROUPS_TREE)?.remove(group_id)?.is_none() {
            return Err(AppError::NotFound(format!("Smart group not found: {}", group_id)));
        }
        tracing::debug!(group_id, "deleted smart group");
        Ok(())
    }
}
