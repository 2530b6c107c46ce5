//! Smart groups: saved sets of conditions evaluated against the library.
//!
//! Each criterion becomes a [`PaperFilter`]; a group combines its filters with
//! `and` (all must match) or `or` (any). A group without criteria matches every
//! paper. The built-in groups are computed on demand and never stored.

use chrono::{DateTime, Datelike, Utc};

use crate::error::Result;
use crate::models::{MatchMode, Paper, SmartGroup, SmartGroupCriterion};
use crate::selection::PaperFilter;
use crate::store::{PaperSort, Store};

impl From<&SmartGroupCriterion> for PaperFilter {
    fn from(criterion: &SmartGroupCriterion) -> Self {
        use crate::models::SmartGroupCriterion::*;
        let base = PaperFilter::default();
        match criterion {
            ByYear(year) => PaperFilter {
                year_from: Some(*year),
                year_to: Some(*year),
                ..base
            },
            ByYearRange { start, end } => PaperFilter {
                year_from: Some(*start),
                year_to: Some(*end),
                ..base
            },
            ByAuthor(author) => PaperFilter {
                author: Some(author.clone()),
                ..base
            },
            ByKeyword(text) => PaperFilter {
                query: Some(text.clone()),
                ..base
            },
            ByTag(tag) => PaperFilter {
                tag: Some(tag.clone()),
                ..base
            },
            ByReadStatus(is_read) => PaperFilter {
                is_read: Some(*is_read),
                ..base
            },
            MinImportance(min) => PaperFilter {
                min_importance: Some(*min),
                ..base
            },
            ByResearchType { qualitative, quantitative } => PaperFilter {
                is_qualitative: Some(*qualitative),
                is_quantitative: Some(*quantitative),
                ..base
            },
            RecentlyAdded(days) => PaperFilter {
                added_within_days: Some(*days),
                ..base
            },
            HasPdf => PaperFilter {
                has_pdf: Some(true),
                ..base
            },
            NoPdf => PaperFilter {
                has_pdf: Some(false),
                ..base
            },
            Unread => PaperFilter {
                is_read: Some(false),
                ..base
            },
            Favorites => PaperFilter {
                min_importance: Some(4),
                ..base
            },
        }
    }
}

/// Papers matching `criteria` under `mode`, in `sort` order.
pub fn evaluate(papers: Vec<Paper>, criteria: &[SmartGroupCriterion], mode: MatchMode, sort: PaperSort) -> Vec<Paper> {
    let filters: Vec<PaperFilter> = criteria.iter().map(PaperFilter::from).collect();
    let mut matched: Vec<Paper> = papers
        .into_iter()
        .filter(|paper| match mode {
            _ if filters.is_empty() => true,
            MatchMode::And => filters.iter().all(|f| f.matches(paper)),
            MatchMode::Or => filters.iter().any(|f| f.matches(paper)),
        })
        .collect();
    sort.sort(&mut matched);
    matched
}

fn builtin(id: &str, name: String, criterion: SmartGroupCriterion, icon: &str, color: &str, at: DateTime<Utc>) -> SmartGroup {
    SmartGroup {
        id: id.to_string(),
        name,
        criteria: vec![criterion],
        match_mode: MatchMode::And,
        icon: Some(icon.to_string()),
        color: Some(color.to_string()),
        predefined: true,
        created_at: at,
        updated_at: at,
    }
}

/// Built-in groups. "Published in" follows the year of `now`.
pub fn predefined_groups(now: DateTime<Utc>) -> Vec<SmartGroup> {
    use crate::models::SmartGroupCriterion::*;
    let research = |qualitative, quantitative| ByResearchType { qualitative, quantitative };
    vec![
        builtin("unread", "Unread Papers".into(), Unread, "book-open", "#3b82f6", now),
        builtin("favorites", "Favorites".into(), Favorites, "star", "#eab308", now),
        builtin("recent-week", "Added This Week".into(), RecentlyAdded(7), "clock", "#22c55e", now),
        builtin("recent-month", "Added This Month".into(), RecentlyAdded(30), "calendar", "#06b6d4", now),
        builtin(
            "this-year",
            format!("Published in {}", now.year()),
            ByYear(now.year()),
            "calendar-days",
            "#8b5cf6",
            now,
        ),
        builtin("no-pdf", "Missing PDFs".into(), NoPdf, "file-x", "#ef4444", now),
        builtin("qualitative", "Qualitative Research".into(), research(true, false), "message-square", "#f97316", now),
        builtin("quantitative", "Quantitative Research".into(), research(false, true), "bar-chart", "#14b8a6", now),
        builtin("mixed-methods", "Mixed Methods".into(), research(true, true), "git-merge", "#ec4899", now),
    ]
}

/// A built-in group by id, else a saved one.
pub fn find_group(store: &Store, group_id: &str) -> Result<SmartGroup> {
    match predefined_groups(Utc::now()).into_iter().find(|g| g.id == group_id) {
        Some(group) => Ok(group),
        None => store.get_smart_group(group_id),
    }
}

pub fn group_papers(store: &Store, group: &SmartGroup, sort: PaperSort) -> Result<Vec<Paper>> {
    let papers = store.list_papers(None, PaperSort::Created)?;
    Ok(evaluate(papers, &group.criteria, group.match_mode, sort))
}
