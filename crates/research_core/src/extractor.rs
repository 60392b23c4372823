//! crates/research_core/src/extractor.rs
//!
//! Recovers a structured record from free-text model output.
//!
//! The chain is: locate a JSON candidate, parse it strictly, run the repair
//! passes and parse again, pull fields out one by one, and finally fall back to
//! a record that carries the raw text. [`extract`] never fails.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::domain::{Citation, ContentRecord};
use crate::repair;

/// Which record shape the caller expects back.
#[derive(Debug, Clone, Copy)]
pub enum ResponseSchema<'a> {
    /// An outline for `topic`.
    Outline { topic: &'a str },
    /// Content for the section the caller asked for.
    Content { section_title: &'a str },
}

/// How far down the recovery chain the record was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    Strict,
    Repaired,
    FieldByField,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub record: Map<String, Value>,
    pub method: ExtractionMethod,
}

impl Extraction {
    pub fn parse_failed(&self) -> bool {
        self.method == ExtractionMethod::Fallback
    }

    /// Converts a content-schema extraction into its typed form.
    pub fn into_content_record(self) -> ContentRecord {
        let text = |key: &str| match self.record.get(key) {
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        };
        let citations = match self.record.get("citations") {
            Some(Value::Array(items)) => items.iter().filter_map(Citation::from_value).collect(),
            _ => Vec::new(),
        };
        ContentRecord {
            section_title: text("section_title"),
            content: text("content"),
            citations,
            page_range: None,
        }
    }
}

/// Extracts a record of the requested shape from `raw`.
pub fn extract(raw: &str, schema: ResponseSchema<'_>) -> Extraction {
    let found = candidates(raw);
    let parsed = found
        .iter()
        .find_map(|candidate| parse_json(candidate))
        .or_else(|| found.iter().find_map(|candidate| parse_fields(candidate, schema)));

    let (mut record, method) = match parsed {
        Some(parsed) => parsed,
        None => {
            warn!("No structured data recovered from model response; using fallback record");
            (fallback_record(raw, schema), ExtractionMethod::Fallback)
        }
    };

    if let ResponseSchema::Content { section_title } = schema {
        apply_content_postconditions(&mut record, section_title);
    }
    debug!(?method, "Extracted model response");
    Extraction { record, method }
}

//=========================================================================================
// Candidate location
//=========================================================================================

const FENCE: &str = "```";

/// Texts that may hold the JSON object, most likely first.
///
/// A whole response that is itself an object comes first, then the body of
/// the first fenced block (closed by its last fence line, then by its first),
/// then the widest brace span.
pub fn candidates(raw: &str) -> Vec<&str> {
    fn push<'a>(found: &mut Vec<&'a str>, candidate: &'a str) {
        let candidate = candidate.trim();
        if !candidate.is_empty() && !found.contains(&candidate) {
            found.push(candidate);
        }
    }

    let mut found = Vec::new();
    let trimmed = raw.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        push(&mut found, trimmed);
    }

    for body in fenced_bodies(raw) {
        push(&mut found, body);
    }

    if let (Some(open), Some(close)) = (raw.find('{'), raw.rfind('}')) {
        if open < close {
            push(&mut found, &raw[open..=close]);
        }
    }
    found
}

/// Bodies of the first fenced block, preferring a ```json block.
fn fenced_bodies(raw: &str) -> Vec<&str> {
    const JSON_FENCE: &str = "```json";
    let lowered = raw.to_ascii_lowercase();

    let tagged = lowered.match_indices(JSON_FENCE).find(|(start, _)| {
        lowered[start + JSON_FENCE.len()..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_ascii_alphanumeric())
    });
    let (body, tagged) = match tagged {
        Some((start, _)) => (&raw[start + JSON_FENCE.len()..], true),
        None => match raw.find(FENCE) {
            Some(start) => (&raw[start + FENCE.len()..], false),
            None => return Vec::new(),
        },
    };

    closing_fences(body)
        .into_iter()
        .map(|end| &body[..end])
        .map(|inner| if tagged { inner } else { strip_language_tag(inner) })
        .collect()
}

/// End offsets for a fenced body: the last closing fence, then the first.
/// Fences at the start of a line are preferred over inline ones.
fn closing_fences(body: &str) -> Vec<usize> {
    let all: Vec<usize> = body.match_indices(FENCE).map(|(i, _)| i).collect();
    let line_start: Vec<usize> = all
        .iter()
        .copied()
        .filter(|&i| body[..i].trim_end_matches([' ', '\t']).ends_with('\n'))
        .collect();
    let ends = if line_start.is_empty() { &all } else { &line_start };

    match (ends.first(), ends.last()) {
        (Some(&first), Some(&last)) if first != last => vec![last, first],
        (Some(&only), _) => vec![only],
        _ => vec![body.len()],
    }
}

fn strip_language_tag(body: &str) -> &str {
    match body.split_once('\n') {
        Some((first, rest))
            if !first.trim().is_empty()
                && first.trim().chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            rest
        }
        _ => body,
    }
}

/// Strict, then repaired parsing. Only objects are accepted.
fn parse_json(candidate: &str) -> Option<(Map<String, Value>, ExtractionMethod)> {
    let parsed = match serde_json::from_str::<Value>(candidate) {
        Ok(value) => (value, ExtractionMethod::Strict),
        Err(_) => match serde_json::from_str::<Value>(&repair::repair(candidate)) {
            Ok(value) => (value, ExtractionMethod::Repaired),
            Err(e) => {
                debug!(error = %e, "Candidate is not valid JSON after repair");
                return None;
            }
        },
    };
    match parsed {
        (Value::Object(record), method) => Some((record, method)),
        _ => {
            warn!("Candidate parsed to a non-object value; skipping it");
            None
        }
    }
}

fn parse_fields(candidate: &str, schema: ResponseSchema<'_>) -> Option<(Map<String, Value>, ExtractionMethod)> {
    let repaired = repair::repair(candidate);
    let fields = match schema {
        ResponseSchema::Content { .. } => content_fields(&repaired),
        ResponseSchema::Outline { .. } => outline_fields(&repaired),
    };
    fields.map(|record| (record, ExtractionMethod::FieldByField))
}

//=========================================================================================
// Field-by-field extraction
//=========================================================================================

static CONTENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)"content"\s*:\s*"(.*?)"\s*(?:,\s*"(?:citations|page_number|section_title|page_range)"|\}\s*$)"#,
    )
    .expect("valid content regex")
});

static CITATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\{\s*"id"\s*:\s*"([^"]*)"\s*,\s*"text"\s*:\s*"((?:[^"\\]|\\.)*)"\s*,\s*"source_type"\s*:\s*"([^"]*)"\s*,?\s*\}"#,
    )
    .expect("valid citation regex")
});

fn content_fields(text: &str) -> Option<Map<String, Value>> {
    let mut record = Map::new();

    if let Some(title) = string_field(text, "section_title") {
        record.insert("section_title".into(), Value::String(title));
    }
    if let Some(content) = content_value(text) {
        record.insert("content".into(), Value::String(content));
    }
    if let Some(citations) = citations_value(text) {
        record.insert("citations".into(), Value::Array(citations));
    }

    (!record.is_empty()).then_some(record)
}

fn outline_fields(text: &str) -> Option<Map<String, Value>> {
    let mut record = Map::new();

    for key in ["title", "thesis_statement"] {
        if let Some(value) = string_field(text, key) {
            record.insert(key.into(), Value::String(value));
        }
    }
    for key in ["research_questions", "sections"] {
        let parsed = balanced_array(text, key)
            .and_then(|slice| serde_json::from_str::<Value>(slice).ok());
        if let Some(value) = parsed {
            record.insert(key.into(), value);
        }
    }

    (!record.is_empty()).then_some(record)
}

/// Reads the first `"key": "..."` string value.
fn string_field(text: &str, key: &str) -> Option<String> {
    let pattern = format!(r#""{}"\s*:\s*"((?:[^"\\]|\\.)*)""#, regex::escape(key));
    let re = Regex::new(&pattern).ok()?;
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| unescape(m.as_str()))
}

fn content_value(text: &str) -> Option<String> {
    if let Some(caps) = CONTENT_RE.captures(text) {
        return caps.get(1).map(|m| unescape(m.as_str()));
    }

    // Unterminated or truncated value: take everything up to the citations key.
    let key = text.find("\"content\"")?;
    let after_key = &text[key + "\"content\"".len()..];
    let value = after_key.trim_start().strip_prefix(':')?.trim_start();
    let value = value.strip_prefix('"').unwrap_or(value);
    let end = value.find("\"citations\"").unwrap_or(value.len());
    let body = value[..end].trim_end().trim_end_matches(|c| c == ',' || c == '}' || c == '"');
    Some(unescape(body.trim_end()))
}

fn citations_value(text: &str) -> Option<Vec<Value>> {
    let slice = balanced_array(text, "citations");
    if let Some(Ok(Value::Array(items))) = slice.map(serde_json::from_str::<Value>) {
        return Some(items);
    }

    let haystack = slice.unwrap_or(text);
    let citations: Vec<Value> = CITATION_RE
        .captures_iter(haystack)
        .map(|caps| {
            json!({
                "id": unescape(&caps[1]),
                "text": unescape(&caps[2]),
                "source_type": unescape(&caps[3]),
            })
        })
        .collect();

    if citations.is_empty() && slice.is_none() {
        None
    } else {
        Some(citations)
    }
}

/// Returns the `[...]` value of `key`, matched by bracket depth outside strings.
/// An unbalanced array runs to the end of the text.
fn balanced_array<'t>(text: &'t str, key: &str) -> Option<&'t str> {
    let needle = format!("\"{}\"", key);
    let key_at = text.find(&needle)?;
    let rest = &text[key_at + needle.len()..];
    let after_colon = rest.trim_start().strip_prefix(':')?.trim_start();
    if !after_colon.starts_with('[') {
        return None;
    }
    let start = text.len() - after_colon.len();

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, c) in after_colon.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    Some(&text[start..])
}

/// Decodes JSON escapes in a captured string body.
fn unescape(body: &str) -> String {
    if let Ok(decoded) = serde_json::from_str::<String>(&format!("\"{}\"", body)) {
        return decoded;
    }
    body.replace("\\n", "\n")
        .replace("\\t", "\t")
        .replace("\\\"", "\"")
        .replace("\\\\", "\\")
}

//=========================================================================================
// Fallback and post-conditions
//=========================================================================================

fn fallback_record(raw: &str, schema: ResponseSchema<'_>) -> Map<String, Value> {
    let value = match schema {
        ResponseSchema::Content { section_title } => json!({
            "section_title": section_title,
            "content": raw,
            "citations": [],
        }),
        ResponseSchema::Outline { topic } => json!({
            "title": topic,
            "thesis_statement": "Could not generate thesis statement due to parsing error",
            "research_questions": ["Could not generate research questions due to parsing error"],
            "sections": [{
                "title": "Introduction",
                "pages": 1,
                "subsections": [{
                    "title": "Background",
                    "pages": 1,
                    "key_points": ["Please regenerate the outline"],
                }],
            }],
            "parsing_error": "Could not extract a JSON object from the model response",
        }),
    };
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn apply_content_postconditions(record: &mut Map<String, Value>, requested_title: &str) {
    let title_is_usable = matches!(
        record.get("section_title"),
        Some(Value::String(title)) if !title.trim().is_empty()
    );
    if !title_is_usable {
        record.insert("section_title".into(), Value::String(requested_title.to_string()));
    }

    let content = match record.remove("content") {
        Some(Value::String(text)) => text,
        Some(Value::Array(parts)) => parts
            .iter()
            .map(|part| match part {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n\n"),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };
    record.insert("content".into(), Value::String(content));

    if !matches!(record.get("citations"), Some(Value::Array(_))) {
        record.insert("citations".into(), Value::Array(Vec::new()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(raw: &str) -> Extraction {
        extract(raw, ResponseSchema::Content { section_title: "Introduction" })
    }

    #[test]
    fn fenced_json_is_returned_unchanged() {
        let body = r#"{"section_title": "Intro", "content": "Text", "citations": [{"id": "c1", "text": "Ref", "source_type": "book"}], "page_number": 1}"#;
        let raw = format!("Here you go:\n```json\n{}\n```\nThanks", body);
        let extraction = content(&raw);

        let expected: Value = serde_json::from_str(body).unwrap();
        assert_eq!(Value::Object(extraction.record), expected);
        assert_eq!(extraction.method, ExtractionMethod::Strict);
    }

    #[test]
    fn untagged_fence_with_language_line() {
        let raw = "```JSON5\n{\"content\": \"x\"}\n```";
        assert_eq!(candidates(raw).first(), Some(&"{\"content\": \"x\"}"));
    }

    #[test]
    fn inline_fences_inside_a_whole_object_are_kept() {
        let raw = r#"{"content": "Use ```code``` here", "citations": []}"#;
        let extraction = content(raw);
        assert_eq!(extraction.method, ExtractionMethod::Strict);
        assert_eq!(extraction.record["content"], "Use ```code``` here");
    }

    #[test]
    fn code_blocks_inside_fenced_content_survive() {
        let raw = "```json\n{\"content\": \"Example:\n```python\nx=1\n```\nDone\", \"citations\": []}\n```";
        let extraction = content(raw);
        assert_eq!(extraction.method, ExtractionMethod::Repaired);
        assert_eq!(extraction.record["content"], "Example:\n```python\nx=1\n```\nDone");
    }

    #[test]
    fn later_candidates_are_tried_when_the_first_fails() {
        // The fenced block is an example, the object after it is the answer.
        let raw = "```\nnot json at all\n```\nAnswer: {\"content\": \"x\", \"citations\": []}";
        let extraction = content(raw);
        assert_eq!(extraction.method, ExtractionMethod::Strict);
        assert_eq!(extraction.record["content"], "x");
    }

    #[test]
    fn brace_span_inside_prose() {
        let raw = "Sure! {\"content\": \"x\", \"citations\": []} Hope this helps.";
        let extraction = content(raw);
        assert_eq!(extraction.method, ExtractionMethod::Strict);
        assert_eq!(extraction.record["content"], "x");
    }

    #[test]
    fn python_style_output_is_repaired() {
        let raw = "{'section_title': 'Intro', 'content': 'It\\'s \"vital\"', 'citations': [], 'draft': True}";
        let extraction = content(raw);
        assert_eq!(extraction.method, ExtractionMethod::Repaired);
        assert_eq!(extraction.record["content"], "It's \"vital\"");
        assert_eq!(extraction.record["draft"], true);
    }

    #[test]
    fn plain_prose_becomes_fallback_record() {
        let raw = "The model ignored the instructions and wrote prose.";
        let extraction = content(raw);
        assert!(extraction.parse_failed());
        assert_eq!(extraction.record["content"], raw);
        assert_eq!(extraction.record["citations"], json!([]));
        assert_eq!(extraction.record["section_title"], "Introduction");
    }

    #[test]
    fn non_object_json_uses_fallback() {
        let extraction = content("```json\n[1, 2, 3]\n```");
        assert!(extraction.parse_failed());
        assert_eq!(extraction.record["content"], "```json\n[1, 2, 3]\n```");
    }

    #[test]
    fn truncated_output_is_recovered_field_by_field() {
        let raw = r#"{"section_title": "Methods", "content": "We sampled wells {north} and south.", "citations": [{"id": "a", "text": "Ali 2020", "source_type": "journal"}, {"id": "b", "text": "Bo"#;
        let extraction = content(raw);
        assert_eq!(extraction.method, ExtractionMethod::FieldByField);
        assert_eq!(extraction.record["section_title"], "Methods");
        assert_eq!(extraction.record["content"], "We sampled wells {north} and south.");
        assert_eq!(
            extraction.record["citations"],
            json!([{"id": "a", "text": "Ali 2020", "source_type": "journal"}])
        );
    }

    #[test]
    fn missing_and_malformed_fields_are_filled() {
        let extraction = content(r#"{"section_title": "  ", "content": ["a", "b"], "citations": "none"}"#);
        assert_eq!(extraction.record["section_title"], "Introduction");
        assert_eq!(extraction.record["content"], "a\n\nb");
        assert_eq!(extraction.record["citations"], json!([]));
    }

    #[test]
    fn typed_record_from_extraction() {
        let record = content(r#"{"content": "Body", "citations": [{"id": 1, "text": "A", "source_type": "web"}, "B"]}"#)
            .into_content_record();
        assert_eq!(record.section_title, "Introduction");
        assert_eq!(record.citations.len(), 2);
        assert_eq!(record.citations[0].id, "1");
        assert_eq!(record.citations[1].text, "B");
    }

    #[test]
    fn outline_fallback_carries_topic() {
        let extraction = extract("no json here", ResponseSchema::Outline { topic: "Water Scarcity" });
        assert!(extraction.parse_failed());
        assert_eq!(extraction.record["title"], "Water Scarcity");
        assert!(extraction.record.contains_key("parsing_error"));
    }
}
