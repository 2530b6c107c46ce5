//! Combining and cleaning model output before it touches the database.

use crate::models::AnalysisResult;
use chrono::Datelike;
use regex::Regex;
use std::collections::HashSet;

pub const MAX_LIST_ITEMS: usize = 10;

fn pick_string(verified: Option<String>, primary: Option<String>) -> Option<String> {
    verified.filter(|v| !v.trim().is_empty()).or(primary)
}

fn pick_list(verified: Option<Vec<String>>, primary: Option<Vec<String>>) -> Option<Vec<String>> {
    verified
        .filter(|v| v.iter().any(|item| !item.trim().is_empty()))
        .or(primary)
}

/// Field-wise merge: a non-empty verified value replaces the primary one.
pub fn merge(primary: AnalysisResult, verified: AnalysisResult) -> AnalysisResult {
    AnalysisResult {
        keywords: pick_string(verified.keywords, primary.keywords),
        author: pick_string(verified.author, primary.author),
        year: pick_string(verified.year, primary.year),
        title: pick_string(verified.title, primary.title),
        publisher: pick_string(verified.publisher, primary.publisher),
        subject: pick_string(verified.subject, primary.subject),
        purposes: pick_list(verified.purposes, primary.purposes),
        is_qualitative: verified.is_qualitative.or(primary.is_qualitative),
        is_quantitative: verified.is_quantitative.or(primary.is_quantitative),
        qual_tools: pick_list(verified.qual_tools, primary.qual_tools),
        vars_independent: pick_list(verified.vars_independent, primary.vars_independent),
        vars_dependent: pick_list(verified.vars_dependent, primary.vars_dependent),
        vars_moderator: pick_list(verified.vars_moderator, primary.vars_moderator),
        vars_mediator: pick_list(verified.vars_mediator, primary.vars_mediator),
        vars_others: pick_list(verified.vars_others, primary.vars_others),
        quant_techniques: pick_list(verified.quant_techniques, primary.quant_techniques),
        results: pick_list(verified.results, primary.results),
        limitations: pick_list(verified.limitations, primary.limitations),
        implications: pick_list(verified.implications, primary.implications),
        future_plans: pick_list(verified.future_plans, primary.future_plans),
    }
}

fn clean_string(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|v| !v.is_empty())
}

fn clean_list(value: Option<Vec<String>>) -> Option<Vec<String>> {
    let items = value?;
    let mut seen = HashSet::new();
    let cleaned: Vec<String> = items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty() && seen.insert(item.to_lowercase()))
        .take(MAX_LIST_ITEMS)
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// The first plausible publication year in `value`: four digits between
/// 1900 and next year.
pub fn clean_year(value: Option<String>, current_year: i32) -> Option<String> {
    let value = value?;
    let re = Regex::new(r"\b(\d{4})\b").ok()?;
    let year = re
        .captures_iter(&value)
        .filter_map(|c| c[1].parse::<i32>().ok())
        .find(|y| (1900..=current_year + 1).contains(y));
    year.map(|y| y.to_string())
}

/// Trim, dedupe and cap every field; empty values become `None` so they do
/// not overwrite stored data.
pub fn validate(result: AnalysisResult) -> AnalysisResult {
    validate_for_year(result, chrono::Utc::now().year())
}

pub fn validate_for_year(result: AnalysisResult, current_year: i32) -> AnalysisResult {
    AnalysisResult {
        keywords: clean_string(result.keywords),
        author: clean_string(result.author),
        year: clean_year(result.year, current_year),
        title: clean_string(result.title),
        publisher: clean_string(result.publisher),
        subject: clean_string(result.subject),
        purposes: clean_list(result.purposes),
        is_qualitative: result.is_qualitative,
        is_quantitative: result.is_quantitative,
        qual_tools: clean_list(result.qual_tools),
        vars_independent: clean_list(result.vars_independent),
        vars_dependent: clean_list(result.vars_dependent),
        vars_moderator: clean_list(result.vars_moderator),
        vars_mediator: clean_list(result.vars_mediator),
        vars_others: clean_list(result.vars_others),
        quant_techniques: clean_list(result.quant_techniques),
        results: clean_list(result.results),
        limitations: clean_list(result.limitations),
        implications: clean_list(result.implications),
        future_plans: clean_list(result.future_plans),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Option<Vec<String>> {
        Some(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_merge_prefers_non_empty_verified() {
        let primary = AnalysisResult {
            title: Some("Primary Title".into()),
            author: Some("Kim".into()),
            results: strings(&["a"]),
            is_qualitative: Some(true),
            ..Default::default()
        };
        let verified = AnalysisResult {
            title: Some("Verified Title".into()),
            author: Some("  ".into()),
            results: strings(&[""]),
            is_qualitative: Some(false),
            ..Default::default()
        };
        let merged = merge(primary, verified);
        assert_eq!(merged.title.as_deref(), Some("Verified Title"));
        assert_eq!(merged.author.as_deref(), Some("Kim"));
        assert_eq!(merged.results, strings(&["a"]));
        assert_eq!(merged.is_qualitative, Some(false));
    }

    #[test]
    fn test_clean_year() {
        assert_eq!(clean_year(Some("2021".into()), 2026).as_deref(), Some("2021"));
        assert_eq!(clean_year(Some("Published in 2019.".into()), 2026).as_deref(), Some("2019"));
        assert_eq!(clean_year(Some("2027".into()), 2026).as_deref(), Some("2027"));
        assert_eq!(clean_year(Some("2028".into()), 2026), None);
        assert_eq!(clean_year(Some("1850".into()), 2026), None);
        assert_eq!(clean_year(Some("n.d.".into()), 2026), None);
        assert_eq!(clean_year(None, 2026), None);
    }

    #[test]
    fn test_validate_lists() {
        let many: Vec<String> = (0..15).map(|i| format!("item {}", i)).collect();
        let result = validate_for_year(
            AnalysisResult {
                purposes: Some(many),
                results: strings(&[" Effect ", "effect", "", "Other"]),
                limitations: strings(&["", "  "]),
                title: Some("  Spaced   out \n title ".into()),
                keywords: Some("".into()),
                ..Default::default()
            },
            2026,
        );
        assert_eq!(result.purposes.unwrap().len(), MAX_LIST_ITEMS);
        assert_eq!(result.results, strings(&["Effect", "Other"]));
        assert_eq!(result.limitations, None);
        assert_eq!(result.title.as_deref(), Some("Spaced out title"));
        assert_eq!(result.keywords, None);
    }
}
