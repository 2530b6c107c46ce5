//! Writing-project export.
//!
//! Documents store the editor's JSON tree (`{"type":"doc","content":[...]}`).
//! Export walks that tree into Markdown; HTML is rendered from the Markdown
//! and sanitized. Content that is not editor JSON is passed through as-is.

use crate::models::{WritingDocument, WritingProject, CONTENT_TYPE_FOLDER};
use pulldown_cmark::{Options, Parser};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

const MAX_HEADING_LEVEL: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Markdown,
    Html,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Some(Self::Markdown),
            "html" => Some(Self::Html),
            _ => None,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Markdown => "text/markdown; charset=utf-8",
            Self::Html => "text/html; charset=utf-8",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Html => "html",
        }
    }
}

// ============================================================================
// Editor JSON -> Markdown
// ============================================================================

fn parse_editor_json(content: &str) -> Option<Value> {
    let value: Value = serde_json::from_str(content.trim()).ok()?;
    value.get("type").and_then(Value::as_str)?;
    Some(value)
}

fn children(node: &Value) -> &[Value] {
    node.get("content")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn node_type(node: &Value) -> &str {
    node.get("type").and_then(Value::as_str).unwrap_or("")
}

fn attr<'a>(node: &'a Value, name: &str) -> Option<&'a Value> {
    node.get("attrs").and_then(|a| a.get(name))
}

fn inline_markdown(nodes: &[Value]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node_type(node) {
            "text" => out.push_str(&marked_text(node)),
            "hardBreak" => out.push_str("  \n"),
            _ => out.push_str(&inline_markdown(children(node))),
        }
    }
    out
}

fn marked_text(node: &Value) -> String {
    let mut text = node.get("text").and_then(Value::as_str).unwrap_or("").to_string();
    let marks = node.get("marks").and_then(Value::as_array);
    let Some(marks) = marks else {
        return text;
    };

    // Code first so the other marks wrap the backticks.
    let mut ordered: Vec<&Value> = marks.iter().collect();
    ordered.sort_by_key(|m| if node_type(m) == "code" { 0 } else { 1 });

    for mark in ordered {
        text = match node_type(mark) {
            "bold" | "strong" => format!("**{}**", text),
            "italic" | "em" => format!("*{}*", text),
            "code" => format!("`{}`", text),
            "strike" => format!("~~{}~~", text),
            "link" => {
                let href = attr(mark, "href").and_then(Value::as_str).unwrap_or("");
                format!("[{}]({})", text, href)
            }
            _ => text,
        };
    }
    text
}

fn prefix_lines(text: &str, first: &str, rest: &str) -> String {
    text.lines()
        .enumerate()
        .map(|(i, line)| {
            let prefix = if i == 0 { first } else { rest };
            if line.is_empty() {
                prefix.trim_end().to_string()
            } else {
                format!("{}{}", prefix, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn list_markdown(node: &Value, ordered: bool) -> String {
    let start = attr(node, "start").and_then(Value::as_u64).unwrap_or(1);
    children(node)
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let marker = if ordered {
                format!("{}. ", start + i as u64)
            } else if let Some(checked) = attr(item, "checked").and_then(Value::as_bool) {
                format!("- [{}] ", if checked { "x" } else { " " })
            } else {
                "- ".to_string()
            };
            let indent = " ".repeat(if ordered { marker.len() } else { 2 });
            let body = children(item)
                .iter()
                .map(block_markdown)
                .filter(|b| !b.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            prefix_lines(&body, &marker, &indent)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn block_markdown(node: &Value) -> String {
    match node_type(node) {
        "doc" => blocks_markdown(children(node)),
        "paragraph" => inline_markdown(children(node)),
        "heading" => {
            let level = attr(node, "level")
                .and_then(Value::as_u64)
                .unwrap_or(1)
                .clamp(1, MAX_HEADING_LEVEL as u64) as usize;
            format!("{} {}", "#".repeat(level), inline_markdown(children(node)))
        }
        "bulletList" | "taskList" => list_markdown(node, false),
        "orderedList" => list_markdown(node, true),
        "blockquote" => {
            let inner = blocks_markdown(children(node));
            prefix_lines(&inner, "> ", "> ")
        }
        "codeBlock" => {
            let lang = attr(node, "language").and_then(Value::as_str).unwrap_or("");
            let code: String = children(node)
                .iter()
                .filter_map(|n| n.get("text").and_then(Value::as_str))
                .collect();
            format!("```{}\n{}\n```", lang, code)
        }
        "horizontalRule" => "---".to_string(),
        "hardBreak" => "  \n".to_string(),
        "text" => marked_text(node),
        _ => blocks_markdown(children(node)),
    }
}

fn blocks_markdown(nodes: &[Value]) -> String {
    nodes
        .iter()
        .map(block_markdown)
        .filter(|b| !b.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Convert stored document content to Markdown.
pub fn content_to_markdown(content: &str) -> String {
    match parse_editor_json(content) {
        Some(doc) => block_markdown(&doc),
        None => content.trim().to_string(),
    }
}

// ============================================================================
// Plain text and word counts
// ============================================================================

fn collect_text(node: &Value, out: &mut String) {
    match node_type(node) {
        "text" => out.push_str(node.get("text").and_then(Value::as_str).unwrap_or("")),
        "hardBreak" => out.push('\n'),
        _ => {
            for child in children(node) {
                collect_text(child, out);
                if !matches!(node_type(child), "text" | "hardBreak") {
                    out.push('\n');
                }
            }
        }
    }
}

pub fn plain_text(content: &str) -> String {
    match parse_editor_json(content) {
        Some(doc) => {
            let mut out = String::new();
            collect_text(&doc, &mut out);
            out.trim().to_string()
        }
        None => content.trim().to_string(),
    }
}

pub fn word_count(content: &str) -> i32 {
    plain_text(content).split_whitespace().count() as i32
}

// ============================================================================
// Project export
// ============================================================================

pub fn project_to_markdown(project: &WritingProject, documents: &[WritingDocument]) -> String {
    let mut by_parent: HashMap<Option<&str>, Vec<&WritingDocument>> = HashMap::new();
    for doc in documents.iter().filter(|d| d.project_id == project.id) {
        by_parent.entry(doc.parent_id.as_deref()).or_default().push(doc);
    }
    for siblings in by_parent.values_mut() {
        siblings.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then(a.created_at.cmp(&b.created_at)));
    }

    let mut sections = vec![format!("# {}", project.title.trim())];
    if !project.description.trim().is_empty() {
        sections.push(project.description.trim().to_string());
    }
    append_documents(&by_parent, None, 2, &mut sections);
    sections.join("\n\n") + "\n"
}

fn append_documents(
    by_parent: &HashMap<Option<&str>, Vec<&WritingDocument>>,
    parent: Option<&str>,
    level: usize,
    sections: &mut Vec<String>,
) {
    let Some(siblings) = by_parent.get(&parent) else {
        return;
    };
    for doc in siblings {
        if doc.content_type != CONTENT_TYPE_FOLDER {
            sections.push(format!("{} {}", "#".repeat(level.min(MAX_HEADING_LEVEL)), doc.title.trim()));
            let body = content_to_markdown(&doc.content);
            if !body.is_empty() {
                sections.push(body);
            }
        }
        append_documents(by_parent, Some(doc.id.as_str()), level + 1, sections);
    }
}

pub fn render_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    let parser = Parser::new_ext(markdown, options);
    let mut html_output = String::new();
    pulldown_cmark::html::push_html(&mut html_output, parser);
    ammonia::clean(&html_output)
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// A standalone HTML page for the project.
pub fn project_to_html(project: &WritingProject, documents: &[WritingDocument]) -> String {
    let body = render_html(&project_to_markdown(project, documents));
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        html_escape(project.title.trim()),
        body
    )
}

/// Download file stem for a project title: "My Thesis: Draft 2" -> "my-thesis-draft-2".
pub fn file_stem(title: &str) -> String {
    let slug = title
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "project".to_string()
    } else {
        slug
    }
}

pub fn export_project(project: &WritingProject, documents: &[WritingDocument], format: ExportFormat) -> String {
    match format {
        ExportFormat::Markdown => project_to_markdown(project, documents),
        ExportFormat::Html => project_to_html(project, documents),
    }
}
