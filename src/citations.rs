//! Citation export: BibTeX, RIS and formatted references (APA, MLA,
//! Chicago author-date, Harvard).
//!
//! Author strings are free text as typed or extracted, so they are parsed
//! leniently: `;` separates authors when present, otherwise ` and ` does.
//! Each name is either "Last, First" or "First Last".

use crate::models::Paper;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[cfg(test)]
#[path = "citations_test.rs"]
mod citations_test;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CitationFormat {
    Bibtex,
    Ris,
    Apa,
    Mla,
    Chicago,
    Harvard,
}

impl CitationFormat {
    pub const ALL: [CitationFormat; 6] = [
        CitationFormat::Bibtex,
        CitationFormat::Ris,
        CitationFormat::Apa,
        CitationFormat::Mla,
        CitationFormat::Chicago,
        CitationFormat::Harvard,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bibtex" | "bib" => Some(Self::Bibtex),
            "ris" => Some(Self::Ris),
            "apa" => Some(Self::Apa),
            "mla" => Some(Self::Mla),
            "chicago" => Some(Self::Chicago),
            "harvard" => Some(Self::Harvard),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bibtex => "bibtex",
            Self::Ris => "ris",
            Self::Apa => "apa",
            Self::Mla => "mla",
            Self::Chicago => "chicago",
            Self::Harvard => "harvard",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Bibtex => "bib",
            Self::Ris => "ris",
            _ => "txt",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Bibtex => "application/x-bibtex; charset=utf-8",
            Self::Ris => "application/x-research-info-systems; charset=utf-8",
            _ => "text/plain; charset=utf-8",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationExport {
    pub format: CitationFormat,
    pub content: String,
    pub paper_count: usize,
}

// ============================================================================
// Author Parsing
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorName {
    pub last: String,
    pub first: String,
}

impl AuthorName {
    /// "Smith, John" or just "Smith".
    fn inverted(&self) -> String {
        if self.first.is_empty() {
            self.last.clone()
        } else {
            format!("{}, {}", self.last, self.first)
        }
    }

    /// "John Smith" or just "Smith".
    fn natural(&self) -> String {
        if self.first.is_empty() {
            self.last.clone()
        } else {
            format!("{} {}", self.first, self.last)
        }
    }

    /// "J. K." for "John Kenneth"; hyphenated names keep the hyphen ("J.-P.").
    fn initials(&self, separator: &str) -> String {
        self.first
            .split_whitespace()
            .filter_map(|part| {
                let pieces: Vec<String> = part
                    .split('-')
                    .filter_map(|p| p.chars().next())
                    .map(|c| format!("{}.", c))
                    .collect();
                (!pieces.is_empty()).then(|| pieces.join("-"))
            })
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// "Smith, J. K." or just "Smith".
    fn with_initials(&self, separator: &str) -> String {
        let initials = self.initials(separator);
        if initials.is_empty() {
            self.last.clone()
        } else {
            format!("{}, {}", self.last, initials)
        }
    }
}

pub fn parse_authors(author_str: &str) -> Vec<AuthorName> {
    let separator = if author_str.contains(';') { ";" } else { " and " };
    let mut authors: Vec<AuthorName> = Vec::new();

    for raw in author_str.split(separator) {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let name = match raw.split_once(',') {
            Some((last, first)) => AuthorName {
                last: last.trim().to_string(),
                first: first.trim().to_string(),
            },
            None => {
                let parts: Vec<&str> = raw.split_whitespace().collect();
                match parts.split_last() {
                    Some((last, rest)) => AuthorName {
                        last: last.to_string(),
                        first: rest.join(" "),
                    },
                    None => continue,
                }
            }
        };
        if !authors.contains(&name) {
            authors.push(name);
        }
    }
    authors
}

/// Join with commas and a final conjunction: "A, B, and C" / "A and B".
fn join_list(items: &[String], conjunction: &str, serial_comma: bool) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [a, b] => format!("{} {} {}", a, conjunction, b),
        [init @ .., last] => {
            let comma = if serial_comma { "," } else { "" };
            format!("{}{} {} {}", init.join(", "), comma, conjunction, last)
        }
    }
}

const UNKNOWN_AUTHOR: &str = "Unknown Author";

// ============================================================================
// BibTeX and RIS
// ============================================================================

pub fn escape_bibtex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str(r"\textbackslash{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '~' => out.push_str(r"\textasciitilde{}"),
            '^' => out.push_str(r"\textasciicircum{}"),
            _ => out.push(c),
        }
    }
    out
}

/// Surname of the first author (lowercase alphanumerics) plus the year,
/// or `nd` when the year is unknown: `smith2023`.
pub fn citation_key(paper: &Paper) -> String {
    let surname: String = parse_authors(&paper.author)
        .first()
        .map(|a| a.last.to_lowercase())
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();
    let surname = if surname.is_empty() { "unknown".to_string() } else { surname };
    let year = if paper.year > 0 {
        paper.year.to_string()
    } else {
        "nd".to_string()
    };
    format!("{}{}", surname, year)
}

fn bibtex_entry(paper: &Paper, key: &str) -> String {
    let mut fields: Vec<(&str, String)> = vec![("title", escape_bibtex(&paper.title))];
    let authors = parse_authors(&paper.author);
    if !authors.is_empty() {
        let names: Vec<String> = authors.iter().map(|a| escape_bibtex(&a.inverted())).collect();
        fields.push(("author", names.join(" and ")));
    }
    if paper.year > 0 {
        fields.push(("year", paper.year.to_string()));
    }
    if !paper.publisher.is_empty() {
        fields.push(("journal", escape_bibtex(&paper.publisher)));
    }
    if !paper.keywords.is_empty() {
        fields.push(("keywords", escape_bibtex(&paper.keywords)));
    }
    if !paper.subject.is_empty() {
        fields.push(("abstract", escape_bibtex(&paper.subject)));
    }

    let mut entry = format!("@article{{{},\n", key);
    for (name, value) in fields {
        entry.push_str(&format!("  {} = {{{}}},\n", name, value));
    }
    entry.push('}');
    entry
}

pub fn format_bibtex(paper: &Paper) -> String {
    bibtex_entry(paper, &citation_key(paper))
}

pub fn format_ris(paper: &Paper) -> String {
    let mut lines = vec!["TY  - JOUR".to_string(), format!("TI  - {}", paper.title)];
    for author in parse_authors(&paper.author) {
        lines.push(format!("AU  - {}", author.inverted()));
    }
    if paper.year > 0 {
        lines.push(format!("PY  - {}", paper.year));
        lines.push(format!("DA  - {}/01/01", paper.year));
    }
    if !paper.publisher.is_empty() {
        lines.push(format!("JO  - {}", paper.publisher));
        lines.push(format!("PB  - {}", paper.publisher));
    }
    for keyword in paper.keywords.split(',').map(str::trim).filter(|k| !k.is_empty()) {
        lines.push(format!("KW  - {}", keyword));
    }
    if !paper.subject.is_empty() {
        lines.push(format!("AB  - {}", paper.subject));
    }
    lines.push("ER  - ".to_string());
    lines.join("\n") + "\n"
}

// ============================================================================
// Reference Styles
// ============================================================================

fn year_or_nd(paper: &Paper) -> String {
    if paper.year > 0 {
        paper.year.to_string()
    } else {
        "n.d.".to_string()
    }
}

/// APA 7: `Smith, J., & Doe, J. (2023). Title. Journal.`
pub fn format_apa(paper: &Paper) -> String {
    let authors = parse_authors(&paper.author);
    let names: Vec<String> = authors.iter().map(|a| a.with_initials(" ")).collect();
    let author_part = match names.as_slice() {
        [] => UNKNOWN_AUTHOR.to_string(),
        [only] => only.clone(),
        [init @ .., last] => format!("{}, & {}", init.join(", "), last),
    };

    let mut citation = format!("{} ({}). {}.", author_part, year_or_nd(paper), paper.title.trim_end_matches('.'));
    if !paper.publisher.is_empty() {
        citation.push_str(&format!(" {}.", paper.publisher));
    }
    citation
}

/// MLA 9: `Smith, John, and Jane Doe. "Title." Journal, 2023.`
pub fn format_mla(paper: &Paper) -> String {
    let authors = parse_authors(&paper.author);
    let author_part = match authors.as_slice() {
        [] => UNKNOWN_AUTHOR.to_string(),
        [only] => only.inverted(),
        [first, second] => format!("{}, and {}", first.inverted(), second.natural()),
        [first, ..] => format!("{}, et al", first.inverted()),
    };

    let mut citation = format!("{}. \"{}.\"", author_part.trim_end_matches('.'), paper.title.trim_end_matches('.'));
    let mut tail = Vec::new();
    if !paper.publisher.is_empty() {
        tail.push(paper.publisher.clone());
    }
    if paper.year > 0 {
        tail.push(paper.year.to_string());
    }
    if !tail.is_empty() {
        citation.push_str(&format!(" {}.", tail.join(", ")));
    }
    citation
}

/// Chicago author-date: `Smith, John, and Jane Doe. 2023. "Title." Journal.`
pub fn format_chicago(paper: &Paper) -> String {
    let authors = parse_authors(&paper.author);
    let author_part = match authors.split_first() {
        None => UNKNOWN_AUTHOR.to_string(),
        Some((first, rest)) => {
            let mut names = vec![first.inverted()];
            names.extend(rest.iter().map(AuthorName::natural));
            join_list(&names, "and", true)
        }
    };

    let year = if paper.year > 0 {
        format!("{}.", paper.year)
    } else {
        "n.d.".to_string()
    };
    let mut citation = format!(
        "{}. {} \"{}.\"",
        author_part.trim_end_matches('.'),
        year,
        paper.title.trim_end_matches('.')
    );
    if !paper.publisher.is_empty() {
        citation.push_str(&format!(" {}.", paper.publisher));
    }
    citation
}

/// Harvard: `Smith, J. and Doe, J. (2023) 'Title', Journal.`
pub fn format_harvard(paper: &Paper) -> String {
    let authors = parse_authors(&paper.author);
    let author_part = match authors.as_slice() {
        [] => UNKNOWN_AUTHOR.to_string(),
        [only] => only.with_initials(""),
        [a, b] => format!("{} and {}", a.with_initials(""), b.with_initials("")),
        [first, ..] => format!("{} et al.", first.with_initials("")),
    };

    let mut citation = format!("{} ({}) '{}'", author_part, year_or_nd(paper), paper.title);
    if !paper.publisher.is_empty() {
        citation.push_str(&format!(", {}", paper.publisher));
    }
    citation.push('.');
    citation
}

pub fn format_citation(paper: &Paper, format: CitationFormat) -> String {
    match format {
        CitationFormat::Bibtex => format_bibtex(paper),
        CitationFormat::Ris => format_ris(paper),
        CitationFormat::Apa => format_apa(paper),
        CitationFormat::Mla => format_mla(paper),
        CitationFormat::Chicago => format_chicago(paper),
        CitationFormat::Harvard => format_harvard(paper),
    }
}

/// Format several papers, separated by blank lines. BibTeX keys that would
/// collide get a letter suffix (`smith2023`, `smith2023a`, ...).
pub fn format_batch(papers: &[Paper], format: CitationFormat) -> CitationExport {
    let entries: Vec<String> = match format {
        CitationFormat::Bibtex => {
            let mut seen: HashMap<String, usize> = HashMap::new();
            papers
                .iter()
                .map(|paper| {
                    let base = citation_key(paper);
                    let count = seen.entry(base.clone()).or_insert(0);
                    let key = match *count {
                        0 => base,
                        n => format!("{}{}", base, suffix(n - 1)),
                    };
                    *count += 1;
                    bibtex_entry(paper, &key)
                })
                .collect()
        }
        CitationFormat::Ris => papers.iter().map(format_ris).map(|s| s.trim_end().to_string()).collect(),
        other => papers.iter().map(|p| format_citation(p, other)).collect(),
    };

    CitationExport {
        format,
        content: entries.join("\n\n"),
        paper_count: papers.len(),
    }
}

/// a, b, ..., z, aa, ab, ...
fn suffix(n: usize) -> String {
    let letter = (b'a' + (n % 26) as u8) as char;
    if n < 26 {
        letter.to_string()
    } else {
        format!("{}{}", suffix(n / 26 - 1), letter)
    }
}
