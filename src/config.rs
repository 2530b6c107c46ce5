//! Runtime configuration.
//!
//! Everything is read from environment variables once at startup. API keys
//! stored through the settings commands take precedence over the environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DATA_DIR: &str = ".papershelf";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_AUTOSAVE_MS: u64 = 1000;
pub const DEFAULT_MAX_PDF_MB: u64 = 50;

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub bind_addr: String,
    pub gemini_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub gemini_model: String,
    pub openai_model: String,
    /// Permit fetching PDFs from loopback/private addresses.
    pub allow_private_urls: bool,
    pub autosave_delay: Duration,
    pub max_pdf_bytes: u64,
}

impl Config {
    pub fn from_env() -> Self {
        let data_dir = env::var("PAPERSHELF_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));

        let mut config = Self::for_data_dir(data_dir);

        if let Ok(bind) = env::var("PAPERSHELF_BIND") {
            config.bind_addr = bind;
        }
        config.gemini_api_key = non_empty_var("GEMINI_API_KEY");
        config.openai_api_key = non_empty_var("OPENAI_API_KEY");
        if let Some(model) = non_empty_var("PAPERSHELF_GEMINI_MODEL") {
            config.gemini_model = model;
        }
        if let Some(model) = non_empty_var("PAPERSHELF_OPENAI_MODEL") {
            config.openai_model = model;
        }
        config.allow_private_urls = env::var("PAPERSHELF_ALLOW_PRIVATE_URLS")
            .map(|v| parse_flag(&v))
            .unwrap_or(false);
        if let Some(ms) = non_empty_var("PAPERSHELF_AUTOSAVE_MS").and_then(|v| v.parse().ok()) {
            config.autosave_delay = Duration::from_millis(ms);
        }
        if let Some(mb) = non_empty_var("PAPERSHELF_MAX_PDF_MB").and_then(|v| v.parse::<u64>().ok()) {
            config.max_pdf_bytes = megabytes(mb);
        }

        config
    }

    /// Defaults rooted at `data_dir`, ignoring the environment.
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            gemini_api_key: None,
            openai_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            allow_private_urls: false,
            autosave_delay: Duration::from_millis(DEFAULT_AUTOSAVE_MS),
            max_pdf_bytes: DEFAULT_MAX_PDF_MB * 1024 * 1024,
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("db")
    }

    pub fn pdfs_dir(&self) -> PathBuf {
        self.data_dir.join("pdfs")
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn megabytes(mb: u64) -> u64 {
    mb.saturating_mul(1024 * 1024)
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_data_dir() {
        let config = Config::for_data_dir("/tmp/shelf");
        assert_eq!(config.db_path(), PathBuf::from("/tmp/shelf/db"));
        assert_eq!(config.pdfs_dir(), PathBuf::from("/tmp/shelf/pdfs"));
        assert_eq!(config.autosave_delay, Duration::from_secs(1));
        assert!(!config.allow_private_urls);
    }

    #[test]
    fn test_megabytes_saturates() {
        assert_eq!(megabytes(50), DEFAULT_MAX_PDF_MB * 1024 * 1024);
        assert_eq!(megabytes(u64::MAX), u64::MAX);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" YES "));
        assert!(parse_flag("1"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("nope"));
    }
}
