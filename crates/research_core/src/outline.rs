//! crates/research_core/src/outline.rs
//!
//! The outline model: a hierarchical plan of sections, subsections, key points
//! and page budgets. Model output is loosely typed, so every numeric field is
//! read leniently and unusable entries are dropped instead of failing the whole
//! structure.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::Language;

/// An inclusive range of document pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subsection {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(default = "one_page", deserialize_with = "lenient_pages")]
    pub pages: f64,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub key_points: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(default = "one_page", deserialize_with = "lenient_pages")]
    pub pages: f64,
    #[serde(default, deserialize_with = "lenient_range", skip_serializing_if = "Option::is_none")]
    pub page_range: Option<PageRange>,
    #[serde(default, deserialize_with = "lenient_subsections")]
    pub subsections: Vec<Subsection>,
}

impl Section {
    /// A bare single-page section, used for the introduction and conclusion
    /// when the outline does not list them explicitly.
    pub fn single_page(title: &str) -> Self {
        Section {
            title: title.to_string(),
            pages: 1.0,
            page_range: Some(PageRange { start: 1, end: 1 }),
            subsections: Vec::new(),
        }
    }
}

/// The plan stored on an outline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutlineStructure {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub thesis_statement: String,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub research_questions: Vec<String>,
    #[serde(default, deserialize_with = "lenient_total", skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
    #[serde(default, deserialize_with = "lenient_sections")]
    pub sections: Vec<Section>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsing_error: Option<String>,
}

/// One line of the outline-based index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexEntry {
    pub title: String,
    pub page: u32,
    pub indent: bool,
}

impl OutlineStructure {
    /// Builds a structure from a loosely shaped JSON value.
    /// Non-object input produces an empty structure.
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn find_section(&self, title: &str) -> Option<&Section> {
        let wanted = title.trim();
        self.sections.iter().find(|s| s.title.trim() == wanted)
    }

    pub fn ordered_section_titles(&self) -> Vec<String> {
        self.sections.iter().map(|s| s.title.clone()).collect()
    }

    pub fn total_section_pages(&self) -> f64 {
        self.sections.iter().map(|s| s.pages).sum()
    }

    /// Replaces page counts that cannot be used for arithmetic.
    pub fn coerce_page_counts(&mut self) {
        for section in &mut self.sections {
            section.pages = sanitize_pages(section.pages);
            for subsection in &mut section.subsections {
                subsection.pages = sanitize_pages(subsection.pages);
            }
        }
    }

    /// Scales section page counts so they sum to `total`.
    ///
    /// Counts are rounded to half pages with a floor of 0.5; any rounding drift is
    /// absorbed by the largest section. Subsections scale by the same factor.
    pub fn balance_pages(&mut self, total: u32) {
        if self.sections.is_empty() || total == 0 {
            return;
        }
        let target = f64::from(total);
        let current = self.total_section_pages();

        if current <= 0.0 {
            let even = target / self.sections.len() as f64;
            for section in &mut self.sections {
                section.pages = even;
            }
            return;
        }
        if (current - target).abs() < 0.01 {
            return;
        }

        let factor = target / current;
        for section in &mut self.sections {
            section.pages = round_half(section.pages * factor).max(0.5);
            for subsection in &mut section.subsections {
                subsection.pages = (subsection.pages * factor * 100.0).round() / 100.0;
            }
        }

        let drift = target - self.total_section_pages();
        if drift.abs() >= 0.01 {
            let largest = self
                .sections
                .iter_mut()
                .max_by(|a, b| a.pages.total_cmp(&b.pages));
            if let Some(section) = largest {
                if section.pages + drift >= 0.5 {
                    section.pages += drift;
                }
            }
        }
    }

    /// Assigns contiguous page ranges starting at `first_page`.
    /// Every section spans at least one page.
    pub fn recalculate_page_ranges(&mut self, first_page: u32) {
        let mut cursor = first_page.max(1);
        for section in &mut self.sections {
            let span = page_span(section.pages);
            section.page_range = Some(PageRange {
                start: cursor,
                end: cursor + span - 1,
            });
            cursor += span;
        }
    }

    /// True when every section has a range and ranges strictly increase without overlap.
    pub fn has_valid_page_ranges(&self) -> bool {
        let mut previous_end = 0;
        for section in &self.sections {
            match section.page_range {
                Some(range) if range.start >= 1 && range.start <= range.end => {
                    if range.start <= previous_end {
                        return false;
                    }
                    previous_end = range.end;
                }
                _ => return false,
            }
        }
        true
    }

    /// Builds the outline-based index: title page, table of contents, introduction,
    /// each section with its subsections, conclusion and references.
    pub fn index(&self, language: Language) -> Vec<IndexEntry> {
        let labels = language.labels();
        let entry = |title: &str, page: u32, indent: bool| IndexEntry {
            title: title.to_string(),
            page,
            indent,
        };

        let mut entries = vec![
            entry(labels.title_page, 1, false),
            entry(labels.table_of_contents, 2, false),
            entry(labels.introduction, 3, false),
        ];
        let mut page = 4;

        for section in &self.sections {
            let title = section.title.trim();
            if title == labels.introduction || title == labels.conclusion {
                continue;
            }
            let start = section.page_range.map(|r| r.start).unwrap_or(page);
            entries.push(entry(title, start, false));

            let mut sub_page = start;
            for subsection in &section.subsections {
                entries.push(entry(&subsection.title, sub_page, true));
                sub_page += page_span(subsection.pages).saturating_sub(1);
            }
            page = section
                .page_range
                .map(|r| r.end + 1)
                .unwrap_or(start + page_span(section.pages));
        }

        entries.push(entry(labels.conclusion, page, false));
        entries.push(entry(labels.references, page + 1, false));
        entries
    }
}

fn page_span(pages: f64) -> u32 {
    let rounded = pages.round();
    if rounded.is_finite() && rounded >= 1.0 {
        rounded as u32
    } else {
        1
    }
}

fn round_half(value: f64) -> f64 {
    (value * 2.0).round() / 2.0
}

fn sanitize_pages(pages: f64) -> f64 {
    if pages.is_finite() && pages >= 0.0 {
        pages
    } else {
        1.0
    }
}

fn one_page() -> f64 {
    1.0
}

//=========================================================================================
// Lenient deserialization helpers
//=========================================================================================

/// Reads a page count from a number or a numeric string. Anything else is one page.
pub fn coerce_pages(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.map(sanitize_pages).unwrap_or(1.0)
}

fn coerce_u32(value: &Value) -> Option<u32> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (number.is_finite() && number >= 0.0).then(|| number.round() as u32)
}

fn lenient_pages<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_pages(&value))
}

fn lenient_total<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_u32(&value))
}

fn lenient_range<'de, D>(deserializer: D) -> Result<Option<PageRange>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let range = value.as_object().and_then(|map| {
        let start = map.get("start").and_then(coerce_u32)?;
        let end = map.get("end").and_then(coerce_u32)?;
        Some(PageRange { start, end })
    });
    Ok(range)
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let items = match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.trim().is_empty())
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    };
    Ok(items)
}

fn lenient_sections<'de, D>(deserializer: D) -> Result<Vec<Section>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_list(value)
        .into_iter()
        .filter(|s: &Section| !s.title.trim().is_empty())
        .collect())
}

fn lenient_subsections<'de, D>(deserializer: D) -> Result<Vec<Subsection>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_list(value)
        .into_iter()
        .filter(|s: &Subsection| !s.title.trim().is_empty())
        .collect())
}

fn lenient_list<T: serde::de::DeserializeOwned>(value: Value) -> Vec<T> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn outline_with_pages(pages: &[f64]) -> OutlineStructure {
        OutlineStructure {
            title: "Test".into(),
            sections: pages
                .iter()
                .enumerate()
                .map(|(i, p)| Section {
                    title: format!("Section {}", i + 1),
                    pages: *p,
                    page_range: None,
                    subsections: Vec::new(),
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn page_counts_accept_strings_and_garbage() {
        let structure = OutlineStructure::from_value(&json!({
            "title": "T",
            "sections": [
                {"title": "A", "pages": "2.5"},
                {"title": "B", "pages": "many"},
                {"title": "C"},
                {"title": "", "pages": 4},
                "not a section"
            ]
        }));
        let pages: Vec<f64> = structure.sections.iter().map(|s| s.pages).collect();
        assert_eq!(pages, vec![2.5, 1.0, 1.0]);
    }

    #[test]
    fn page_ranges_are_contiguous_and_increasing() {
        let mut outline = outline_with_pages(&[1.0, 2.0, 3.0, 0.5, 2.4]);
        outline.recalculate_page_ranges(3);

        let ranges: Vec<PageRange> = outline.sections.iter().filter_map(|s| s.page_range).collect();
        assert_eq!(ranges.len(), 5);
        assert_eq!(ranges[0], PageRange { start: 3, end: 3 });
        for pair in ranges.windows(2) {
            assert!(pair[0].start <= pair[0].end);
            assert_eq!(pair[1].start, pair[0].end + 1);
        }
        assert!(outline.has_valid_page_ranges());
    }

    #[test]
    fn overlapping_ranges_are_invalid() {
        let structure = OutlineStructure::from_value(&json!({
            "sections": [
                {"title": "A", "page_range": {"start": 1, "end": 3}},
                {"title": "B", "page_range": {"start": "3", "end": 4}}
            ]
        }));
        assert!(!structure.has_valid_page_ranges());
    }

    #[test]
    fn balancing_scales_to_total() {
        let mut outline = outline_with_pages(&[2.0, 4.0, 6.0, 8.0]);
        outline.balance_pages(10);
        assert!((outline.total_section_pages() - 10.0).abs() < 0.01);
        assert!(outline.sections.iter().all(|s| s.pages >= 0.5));
    }

    #[test]
    fn balancing_zero_pages_divides_evenly() {
        let mut outline = outline_with_pages(&[0.0, 0.0]);
        outline.balance_pages(6);
        assert_eq!(outline.sections[0].pages, 3.0);
        assert_eq!(outline.sections[1].pages, 3.0);
    }

    #[test]
    fn index_lists_fixed_entries_around_sections() {
        let mut outline = outline_with_pages(&[2.0, 1.0]);
        outline.sections[0].subsections.push(Subsection {
            title: "Sub".into(),
            pages: 1.0,
            key_points: vec![],
        });
        outline.recalculate_page_ranges(4);

        let index = outline.index(Language::En);
        let titles: Vec<&str> = index.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Title Page",
                "Table of Contents",
                "Introduction",
                "Section 1",
                "Sub",
                "Section 2",
                "Conclusion",
                "References"
            ]
        );
        assert_eq!(index[5].page, 6);
        assert_eq!(index[6].page, 7);
        assert!(index[4].indent);
    }
}
