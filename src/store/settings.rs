use super::{Store, SETTINGS_TREE};
use crate::error::{AppError, Result};
use crate::models::{
    AppSettings, RenameConfig, SettingValue, SETTING_ANALYSIS_VERIFICATION, SETTING_FONT_FAMILY,
    SETTING_FONT_SIZE, SETTING_GEMINI_API_KEY, SETTING_OPENAI_API_KEY, SETTING_RENAME_CONFIG,
    SETTING_STORAGE_PATH,
};
use std::collections::BTreeMap;

impl Store {
    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        match self.tree(SETTINGS_TREE)?.get(key)? {
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|e| AppError::Parse(format!("setting {} is not UTF-8: {}", key, e))),
            None => Ok(None),
        }
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        if key.trim().is_empty() {
            return Err(AppError::Validation("Setting key cannot be empty".into()));
        }
        self.tree(SETTINGS_TREE)?.insert(key, value.as_bytes())?;
        Ok(())
    }

    pub fn delete_setting(&self, key: &str) -> Result<()> {
        self.tree(SETTINGS_TREE)?.remove(key)?;
        Ok(())
    }

    /// Every stored key in key order.
    pub fn list_settings(&self) -> Result<Vec<SettingValue>> {
        let mut out = Vec::new();
        for entry in self.tree(SETTINGS_TREE)?.iter() {
            let (key, value) = entry?;
            out.push(SettingValue {
                key: String::from_utf8_lossy(&key).into_owned(),
                value: Some(String::from_utf8_lossy(&value).into_owned()),
            });
        }
        Ok(out)
    }

    /// Typed view over the key/value table, with defaults for absent keys.
    pub fn app_settings(&self) -> Result<AppSettings> {
        let defaults = AppSettings::default();
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Ok(AppSettings {
            gemini_api_key: non_empty(self.get_setting(SETTING_GEMINI_API_KEY)?),
            openai_api_key: non_empty(self.get_setting(SETTING_OPENAI_API_KEY)?),
            default_font_family: non_empty(self.get_setting(SETTING_FONT_FAMILY)?)
                .unwrap_or(defaults.default_font_family),
            default_font_size: non_empty(self.get_setting(SETTING_FONT_SIZE)?)
                .unwrap_or(defaults.default_font_size),
            storage_path: non_empty(self.get_setting(SETTING_STORAGE_PATH)?),
            analysis_verification: match self.get_setting(SETTING_ANALYSIS_VERIFICATION)? {
                Some(v) => !matches!(v.trim().to_ascii_lowercase().as_str(), "false" | "0" | "off" | "no"),
                None => defaults.analysis_verification,
            },
        })
    }

    /// Apply a batch of changes: `Some` stores the value, `None` removes the key.
    pub fn update_settings(&self, changes: &BTreeMap<String, Option<String>>) -> Result<AppSettings> {
        for (key, value) in changes {
            match value {
                Some(v) => self.set_setting(key, v)?,
                None => self.delete_setting(key)?,
            }
        }
        self.app_settings()
    }

    /// Stored PDF rename config, or the default when none was saved.
    pub fn rename_config(&self) -> Result<RenameConfig> {
        match self.get_setting(SETTING_RENAME_CONFIG)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(RenameConfig::default()),
        }
    }

    pub fn save_rename_config(&self, config: &RenameConfig) -> Result<()> {
        self.set_setting(SETTING_RENAME_CONFIG, &serde_json::to_string(config)?)
    }
}
