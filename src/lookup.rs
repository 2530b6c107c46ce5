//! Bibliographic metadata lookup against arXiv and Crossref.
//!
//! Input is free text as typed or pasted by the user: an arXiv URL or id,
//! a DOI (bare or inside a publisher URL), or a title to search for.
//! [`search_scholar`] is the paged, multi-result variant behind the search
//! dialog.

use crate::error::{AppError, Result};
use crate::models::{
    ExternalMetadata, InputType, ScholarSearchQuery, ScholarSearchResponse, ScholarSource, UpdatePaperInput,
};
use regex::Regex;
use serde_json::Value;
use std::time::Duration;

const ARXIV_API: &str = "https://export.arxiv.org/api/query";
const CROSSREF_API: &str = "https://api.crossref.org/works";
const USER_AGENT: &str = concat!("papershelf/", env!("CARGO_PKG_VERSION"));
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_SEARCH_LIMIT: u32 = 10;
const MAX_SEARCH_LIMIT: u32 = 100;

// ============================================================================
// Input Detection
// ============================================================================

pub fn detect_input_type(input: &str) -> InputType {
    let input = input.trim();
    if let Some(arxiv_id) = extract_arxiv_id(input) {
        return InputType::Arxiv { arxiv_id };
    }
    if let Some(doi) = extract_doi(input) {
        return InputType::Doi { doi };
    }
    InputType::PlainText {
        text: input.to_string(),
    }
}

/// arxiv.org/abs/2301.00001, arxiv.org/pdf/2301.00001v2.pdf, arXiv:2301.00001,
/// a bare new-style id, or an old-style `hep-th/9901001`.
pub fn extract_arxiv_id(input: &str) -> Option<String> {
    let patterns = [
        r"arxiv\.org/(?:abs|pdf)/(\d{4}\.\d{4,5})",
        r"arxiv\.org/(?:abs|pdf)/([a-z-]+(?:\.[A-Z]{2})?/\d{7})",
        r"(?i)arXiv:\s*(\d{4}\.\d{4,5})",
        r"^(\d{4}\.\d{4,5})(?:v\d+)?$",
    ];
    for pattern in patterns {
        if let Ok(re) = Regex::new(pattern) {
            if let Some(m) = re.captures(input).and_then(|c| c.get(1)) {
                return Some(m.as_str().to_string());
            }
        }
    }
    None
}

pub fn extract_doi(input: &str) -> Option<String> {
    let patterns = [
        r#"(?:doi\.org|dx\.doi\.org)/(10\.\d{4,}/[^\s\]"'<>]+)"#,
        r#"(?i)doi:\s*(10\.\d{4,}/[^\s\]"'<>]+)"#,
        r#"/(10\.\d{4,}/[^\s\]"'<>?#]+)"#,
        r#"^(10\.\d{4,}/[^\s\]"'<>]+)$"#,
    ];
    for pattern in patterns {
        if let Ok(re) = Regex::new(pattern) {
            if let Some(m) = re.captures(input).and_then(|c| c.get(1)) {
                let doi = m.as_str().trim_end_matches(['.', ',', ';']);
                return Some(doi.to_string());
            }
        }
    }
    None
}

// ============================================================================
// Response Parsing
// ============================================================================

fn xml_tag(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);
    let start = xml.find(&open)?;
    let body_start = start + xml[start..].find('>')? + 1;
    let end = body_start + xml[body_start..].find(&close)?;
    Some(xml[body_start..end].to_string())
}

fn xml_tags(xml: &str, tag: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = xml;
    let close = format!("</{}>", tag);
    while let Some(value) = xml_tag(rest, tag) {
        out.push(value);
        match rest.find(&close) {
            Some(pos) => rest = &rest[pos + close.len()..],
            None => break,
        }
    }
    out
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse an arXiv Atom feed. The feed has its own `<title>`, so fields are
/// read from inside the first `<entry>`.
pub fn parse_arxiv_feed(xml: &str, arxiv_id: &str) -> Option<ExternalMetadata> {
    parse_arxiv_entry(&xml_tag(xml, "entry")?, arxiv_id)
}

/// "http://arxiv.org/abs/1706.03762v5" -> "1706.03762"
fn arxiv_id_from_entry(entry: &str) -> Option<String> {
    let id = xml_tag(entry, "id")?;
    let id = id.trim().rsplit_once("/abs/")?.1;
    let id = match id.rfind('v') {
        Some(pos) if pos > 0 && pos + 1 < id.len() && id[pos + 1..].bytes().all(|b| b.is_ascii_digit()) => &id[..pos],
        _ => id,
    };
    (!id.is_empty()).then(|| id.to_string())
}

/// Every entry of an arXiv search feed, with the `opensearch:totalResults`
/// count when present.
pub fn parse_arxiv_search(xml: &str, offset: u32) -> ScholarSearchResponse {
    let results: Vec<ExternalMetadata> = xml_tags(xml, "entry")
        .iter()
        .filter_map(|entry| parse_arxiv_entry(entry, &arxiv_id_from_entry(entry)?))
        .collect();
    let total = xml_tag(xml, "opensearch:totalResults")
        .and_then(|t| t.trim().parse().ok())
        .unwrap_or(results.len() as u64);
    ScholarSearchResponse { total, offset, results }
}

fn parse_arxiv_entry(entry: &str, arxiv_id: &str) -> Option<ExternalMetadata> {
    let title = xml_tag(entry, "title")
        .map(|t| collapse(&t))
        .filter(|t| !t.is_empty() && !t.starts_with("Error"))?;

    let authors: Vec<String> = xml_tags(entry, "name").iter().map(|n| collapse(n)).collect();
    let year = xml_tag(entry, "published").and_then(|p| p.get(..4).and_then(|y| y.parse().ok()));
    let doi = xml_tag(entry, "arxiv:doi").map(|d| collapse(&d));

    Some(ExternalMetadata {
        title,
        authors: (!authors.is_empty()).then(|| authors.join(" and ")),
        year,
        venue: Some("arXiv".to_string()),
        doi,
        arxiv_id: Some(arxiv_id.to_string()),
        source: "arxiv".to_string(),
    })
}

fn first_str(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)?
        .as_array()?
        .first()?
        .as_str()
        .map(collapse)
        .filter(|s| !s.is_empty())
}

/// Parse the `message` of a Crossref `/works/{doi}` response.
pub fn parse_crossref_work(message: &Value) -> Option<ExternalMetadata> {
    let title = first_str(message, "title")?;

    let authors: Vec<String> = message
        .get("author")
        .and_then(|a| a.as_array())
        .map(|authors| {
            authors
                .iter()
                .filter_map(|a| {
                    if let Some(name) = a.get("name").and_then(|n| n.as_str()) {
                        return Some(name.to_string());
                    }
                    let given = a.get("given").and_then(|g| g.as_str()).unwrap_or("");
                    let family = a.get("family").and_then(|f| f.as_str()).unwrap_or("");
                    if family.is_empty() {
                        None
                    } else {
                        Some(format!("{} {}", given, family).trim().to_string())
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    let year = ["published", "published-print", "published-online", "issued"]
        .iter()
        .filter_map(|k| message.get(*k))
        .filter_map(|p| p.get("date-parts")?.get(0)?.get(0)?.as_i64())
        .next()
        .map(|y| y as i32);

    Some(ExternalMetadata {
        title,
        authors: (!authors.is_empty()).then(|| authors.join(" and ")),
        year,
        venue: first_str(message, "container-title").or_else(|| {
            message
                .get("publisher")
                .and_then(|p| p.as_str())
                .map(str::to_string)
        }),
        doi: message.get("DOI").and_then(|d| d.as_str()).map(str::to_string),
        arxiv_id: None,
        source: "crossref".to_string(),
    })
}

/// The first title-search hit whose title contains, or is contained in,
/// the query.
pub fn best_title_match(response: &Value, title: &str) -> Option<ExternalMetadata> {
    let wanted = collapse(&title.to_lowercase());
    response
        .get("message")?
        .get("items")?
        .as_array()?
        .iter()
        .filter_map(parse_crossref_work)
        .find(|m| {
            let found = m.title.to_lowercase();
            found.contains(&wanted) || wanted.contains(&found)
        })
}

/// Every item of a Crossref `/works?query...` response.
pub fn parse_crossref_search(response: &Value, offset: u32) -> ScholarSearchResponse {
    let message = response.get("message");
    let results: Vec<ExternalMetadata> = message
        .and_then(|m| m.get("items"))
        .and_then(|items| items.as_array())
        .map(|items| items.iter().filter_map(parse_crossref_work).collect())
        .unwrap_or_default();
    let total = message
        .and_then(|m| m.get("total-results"))
        .and_then(|t| t.as_u64())
        .unwrap_or(results.len() as u64);
    ScholarSearchResponse { total, offset, results }
}

/// Combine the two sources' pages, alternating hits. A source that failed is
/// left out; the call fails only when both did.
pub fn merge_pages(
    arxiv: Result<ScholarSearchResponse>,
    crossref: Result<ScholarSearchResponse>,
) -> Result<ScholarSearchResponse> {
    let (arxiv, crossref) = match (arxiv, crossref) {
        (Ok(a), Ok(c)) => (a, c),
        (Ok(page), Err(e)) | (Err(e), Ok(page)) => {
            tracing::warn!(error = %e, "scholar search source failed");
            return Ok(page);
        }
        (Err(e), Err(_)) => return Err(e),
    };

    let mut results = Vec::with_capacity(arxiv.results.len() + crossref.results.len());
    let mut a = arxiv.results.into_iter();
    let mut c = crossref.results.into_iter();
    loop {
        match (a.next(), c.next()) {
            (None, None) => break,
            (x, y) => results.extend(x.into_iter().chain(y)),
        }
    }
    Ok(ScholarSearchResponse {
        total: arxiv.total + crossref.total,
        offset: arxiv.offset,
        results,
    })
}

/// Paper fields filled from looked-up metadata.
pub fn to_paper_update(meta: &ExternalMetadata) -> UpdatePaperInput {
    UpdatePaperInput {
        title: Some(meta.title.clone()),
        author: meta.authors.clone(),
        year: meta.year,
        publisher: meta.venue.clone(),
        ..Default::default()
    }
}

// ============================================================================
// External API Calls
// ============================================================================

pub fn lookup_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(LOOKUP_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))
}

pub async fn query_arxiv(client: &reqwest::Client, arxiv_id: &str) -> Result<Option<ExternalMetadata>> {
    let text = client
        .get(ARXIV_API)
        .query(&[("id_list", arxiv_id)])
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(parse_arxiv_feed(&text, arxiv_id))
}

pub async fn query_crossref(client: &reqwest::Client, doi: &str) -> Result<Option<ExternalMetadata>> {
    let url = format!("{}/{}", CROSSREF_API, doi);
    let response = client.get(&url).send().await?;
    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }
    let json: Value = response.error_for_status()?.json().await?;
    Ok(json.get("message").and_then(parse_crossref_work))
}

pub async fn query_crossref_by_title(client: &reqwest::Client, title: &str) -> Result<Option<ExternalMetadata>> {
    let url = format!(
        "{}?query.bibliographic={}&rows=5",
        CROSSREF_API,
        urlencoding::encode(title)
    );
    let json: Value = client.get(&url).send().await?.error_for_status()?.json().await?;
    Ok(best_title_match(&json, title))
}

pub async fn search_arxiv(client: &reqwest::Client, query: &str, limit: u32, offset: u32) -> Result<ScholarSearchResponse> {
    let text = client
        .get(ARXIV_API)
        .query(&[
            ("search_query", format!("all:{}", query)),
            ("start", offset.to_string()),
            ("max_results", limit.to_string()),
        ])
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(parse_arxiv_search(&text, offset))
}

pub async fn search_crossref(client: &reqwest::Client, query: &str, limit: u32, offset: u32) -> Result<ScholarSearchResponse> {
    let json: Value = client
        .get(CROSSREF_API)
        .query(&[
            ("query.bibliographic", query.to_string()),
            ("rows", limit.to_string()),
            ("offset", offset.to_string()),
        ])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(parse_crossref_search(&json, offset))
}

/// One page of search hits. `limit` is clamped to 1..=100 and applies per
/// source.
pub async fn search_scholar(client: &reqwest::Client, request: &ScholarSearchQuery) -> Result<ScholarSearchResponse> {
    let query = request.query.trim();
    if query.is_empty() {
        return Err(AppError::MissingField("query"));
    }
    let limit = request.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_SEARCH_LIMIT);
    let offset = request.offset.unwrap_or(0);
    tracing::debug!(query, source = ?request.source, limit, offset, "scholar search");

    match request.source {
        ScholarSource::Arxiv => search_arxiv(client, query, limit, offset).await,
        ScholarSource::Crossref => search_crossref(client, query, limit, offset).await,
        ScholarSource::All => {
            let (arxiv, crossref) = tokio::join!(
                search_arxiv(client, query, limit, offset),
                search_crossref(client, query, limit, offset)
            );
            merge_pages(arxiv, crossref)
        }
    }
}

/// Resolve free-form input to metadata.
pub async fn lookup(client: &reqwest::Client, input: &str) -> Result<ExternalMetadata> {
    let input_type = detect_input_type(input);
    tracing::debug!(?input_type, "metadata lookup");
    let found = match input_type {
        InputType::Arxiv { ref arxiv_id } => query_arxiv(client, arxiv_id).await?,
        InputType::Doi { ref doi } => query_crossref(client, doi).await?,
        InputType::PlainText { ref text } if text.is_empty() => {
            return Err(AppError::MissingField("input"));
        }
        InputType::PlainText { ref text } => query_crossref_by_title(client, text).await?,
    };
    found.ok_or_else(|| AppError::NotFound(format!("No metadata found for '{}'", input.trim())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_arxiv_id() {
        assert_eq!(extract_arxiv_id("https://arxiv.org/abs/2301.00001").as_deref(), Some("2301.00001"));
        assert_eq!(extract_arxiv_id("https://arxiv.org/pdf/1706.03762v5.pdf").as_deref(), Some("1706.03762"));
        assert_eq!(extract_arxiv_id("arXiv:2106.09685").as_deref(), Some("2106.09685"));
        assert_eq!(extract_arxiv_id("2106.09685v2").as_deref(), Some("2106.09685"));
        assert_eq!(extract_arxiv_id("https://arxiv.org/abs/hep-th/9901001").as_deref(), Some("hep-th/9901001"));
        assert_eq!(extract_arxiv_id("Attention is all you need"), None);
    }

    #[test]
    fn test_extract_doi() {
        assert_eq!(extract_doi("https://doi.org/10.1145/3290605.3300233").as_deref(), Some("10.1145/3290605.3300233"));
        assert_eq!(extract_doi("doi: 10.1037/a0012345.").as_deref(), Some("10.1037/a0012345"));
        assert_eq!(
            extract_doi("https://link.springer.com/article/10.1007/s11192-020-03690-4").as_deref(),
            Some("10.1007/s11192-020-03690-4")
        );
        assert_eq!(extract_doi("10.1016/j.tate.2019.102914").as_deref(), Some("10.1016/j.tate.2019.102914"));
        assert_eq!(extract_doi("no identifier"), None);
    }

    #[test]
    fn test_detect_input_type() {
        assert!(matches!(detect_input_type("arXiv:1706.03762"), InputType::Arxiv { .. }));
        assert!(matches!(detect_input_type(" 10.1000/xyz123 "), InputType::Doi { .. }));
        assert_eq!(
            detect_input_type("  nurse burnout "),
            InputType::PlainText { text: "nurse burnout".into() }
        );
    }

    #[test]
    fn test_parse_arxiv_feed() {
        let xml = r#"<feed><title>arXiv Query: id_list=1706.03762</title>
            <entry>
              <published>2017-06-12T17:57:34Z</published>
              <title>Attention Is All
                You Need</title>
              <author><name>Ashish Vaswani</name></author>
              <author><name>Noam Shazeer</name></author>
              <arxiv:doi xmlns:arxiv="http://arxiv.org/schemas/atom">10.48550/arXiv.1706.03762</arxiv:doi>
            </entry></feed>"#;
        let meta = parse_arxiv_feed(xml, "1706.03762").unwrap();
        assert_eq!(meta.title, "Attention Is All You Need");
        assert_eq!(meta.authors.as_deref(), Some("Ashish Vaswani and Noam Shazeer"));
        assert_eq!(meta.year, Some(2017));
        assert_eq!(meta.doi.as_deref(), Some("10.48550/arXiv.1706.03762"));
        assert_eq!(meta.source, "arxiv");

        assert!(parse_arxiv_feed("<feed><title>Error</title></feed>", "x").is_none());
    }

    #[test]
    fn test_parse_crossref_work() {
        let message = json!({
            "DOI": "10.1016/j.tate.2019.102914",
            "title": ["Nurse burnout:  a review"],
            "author": [
                {"given": "Ji-Yeon", "family": "Park"},
                {"family": "Lee"},
                {"given": "NoFamily"}
            ],
            "issued": {"date-parts": [[2019, 10]]},
            "container-title": ["Journal of Advanced Nursing"]
        });
        let meta = parse_crossref_work(&message).unwrap();
        assert_eq!(meta.title, "Nurse burnout: a review");
        assert_eq!(meta.authors.as_deref(), Some("Ji-Yeon Park and Lee"));
        assert_eq!(meta.year, Some(2019));
        assert_eq!(meta.venue.as_deref(), Some("Journal of Advanced Nursing"));

        let update = to_paper_update(&meta);
        assert_eq!(update.publisher.as_deref(), Some("Journal of Advanced Nursing"));
        assert_eq!(update.year, Some(2019));
    }

    #[test]
    fn test_best_title_match() {
        let response = json!({"message": {"items": [
            {"title": ["Something else entirely"], "DOI": "10.1/a"},
            {"title": ["Grounded Theory Methods in Education Research"], "DOI": "10.1/b"}
        ]}});
        let meta = best_title_match(&response, "grounded theory methods").unwrap();
        assert_eq!(meta.doi.as_deref(), Some("10.1/b"));
        assert!(best_title_match(&response, "quantum chromodynamics").is_none());
    }

    #[test]
    fn test_parse_arxiv_search() {
        let xml = r#"<feed xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">
            <title>ArXiv Query: search_query=all:burnout</title>
            <opensearch:totalResults>142</opensearch:totalResults>
            <entry>
              <id>http://arxiv.org/abs/2101.00001v2</id>
              <published>2021-01-01T00:00:00Z</published>
              <title>Burnout in Intensive Care Nurses</title>
              <author><name>Ji-Yeon Park</name></author>
            </entry>
            <entry>
              <id>http://arxiv.org/abs/hep-th/9901001v1</id>
              <published>1999-01-04T00:00:00Z</published>
              <title>Strings and Burnout</title>
            </entry>
            <entry><id>http://arxiv.org/abs/2101.00003</id><title></title></entry>
            </feed>"#;
        let page = parse_arxiv_search(xml, 20);
        assert_eq!(page.total, 142);
        assert_eq!(page.offset, 20);
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.results[0].arxiv_id.as_deref(), Some("2101.00001"));
        assert_eq!(page.results[0].authors.as_deref(), Some("Ji-Yeon Park"));
        assert_eq!(page.results[1].arxiv_id.as_deref(), Some("hep-th/9901001"));
        assert_eq!(page.results[1].year, Some(1999));
        assert_eq!(page.results[1].authors, None);

        let empty = parse_arxiv_search("<feed><title>nothing</title></feed>", 0);
        assert_eq!(empty, ScholarSearchResponse::default());
    }

    #[test]
    fn test_parse_crossref_search() {
        let response = json!({"message": {
            "total-results": 3081,
            "items": [
                {"title": ["Compassion fatigue in nurses"], "DOI": "10.1/x", "issued": {"date-parts": [[2020]]}},
                {"DOI": "10.1/untitled"},
                {"title": ["Moral distress"], "DOI": "10.1/y"}
            ]
        }});
        let page = parse_crossref_search(&response, 10);
        assert_eq!(page.total, 3081);
        assert_eq!(page.offset, 10);
        let dois: Vec<&str> = page.results.iter().filter_map(|m| m.doi.as_deref()).collect();
        assert_eq!(dois, vec!["10.1/x", "10.1/y"]);
        assert_eq!(page.results[0].year, Some(2020));
    }

    fn page(source: &str, titles: &[&str], total: u64) -> ScholarSearchResponse {
        ScholarSearchResponse {
            total,
            offset: 0,
            results: titles
                .iter()
                .map(|t| ExternalMetadata {
                    title: t.to_string(),
                    authors: None,
                    year: None,
                    venue: None,
                    doi: None,
                    arxiv_id: None,
                    source: source.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_merge_pages_interleaves() {
        let merged = merge_pages(Ok(page("arxiv", &["a1", "a2", "a3"], 30)), Ok(page("crossref", &["c1"], 7))).unwrap();
        let titles: Vec<&str> = merged.results.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["a1", "c1", "a2", "a3"]);
        assert_eq!(merged.total, 37);
    }

    #[test]
    fn test_merge_pages_tolerates_one_failure() {
        let merged = merge_pages(Err(AppError::Fetch("arxiv down".into())), Ok(page("crossref", &["c1"], 1))).unwrap();
        assert_eq!(merged.results.len(), 1);
        assert_eq!(merged.results[0].source, "crossref");

        let both = merge_pages(Err(AppError::Fetch("arxiv down".into())), Err(AppError::Fetch("crossref down".into())));
        assert!(matches!(both, Err(AppError::Fetch(msg)) if msg == "arxiv down"));
    }

    #[tokio::test]
    async fn test_search_requires_query() {
        let client = lookup_client().unwrap();
        let request = ScholarSearchQuery {
            query: "   ".into(),
            ..Default::default()
        };
        assert!(matches!(
            search_scholar(&client, &request).await,
            Err(AppError::MissingField("query"))
        ));
    }
}
