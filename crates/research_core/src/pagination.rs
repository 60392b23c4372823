//! crates/research_core/src/pagination.rs
//!
//! Layout pagination: packs section bodies into word-limited pages and derives
//! a page-numbered table of contents.

use std::collections::HashMap;

use serde::Serialize;

use crate::domain::{ContentSection, WORDS_PER_PAGE};
use crate::markdown::split_units;

pub const DEFAULT_MAX_WORDS_PER_PAGE: usize = WORDS_PER_PAGE as usize;

/// Page 1 holds the title; numbering of content pages starts after it.
pub const FIRST_CONTENT_PAGE: u32 = 2;

const MISSING_CONTENT: &str = "Content not available";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub section_title: String,
    pub content_fragment: String,
    pub word_count: usize,
    pub is_section_start: bool,
    pub is_continuation: bool,
    pub continues: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub title: String,
    pub page: u32,
}

/// Paginates every section listed in `order`, looking bodies up in `sections`.
pub fn paginate(
    sections: &HashMap<String, ContentSection>,
    order: &[String],
    max_words: usize,
) -> Vec<Page> {
    order
        .iter()
        .flat_map(|title| match sections.get(title) {
            Some(section) => paginate_section(title, &section.content, max_words),
            None => vec![Page {
                section_title: title.clone(),
                content_fragment: MISSING_CONTENT.to_string(),
                word_count: 0,
                is_section_start: true,
                is_continuation: false,
                continues: false,
            }],
        })
        .collect()
}

/// Greedily packs the blocks of one body into pages of at most `max_words`.
///
/// A page that already holds a block is closed before a block that would push it
/// over the limit; a single oversized block still gets a page of its own.
pub fn paginate_section(title: &str, body: &str, max_words: usize) -> Vec<Page> {
    let mut groups: Vec<(Vec<&str>, usize)> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_words = 0usize;

    for unit in split_units(body) {
        if !current.is_empty() && current_words + unit.word_count > max_words {
            groups.push((std::mem::take(&mut current), current_words));
            current_words = 0;
        }
        current.push(unit.source);
        current_words += unit.word_count;
    }
    if !current.is_empty() || groups.is_empty() {
        groups.push((current, current_words));
    }

    let last = groups.len() - 1;
    groups
        .into_iter()
        .enumerate()
        .map(|(i, (units, words))| Page {
            section_title: title.to_string(),
            content_fragment: units.join("\n\n"),
            word_count: words,
            is_section_start: i == 0,
            is_continuation: i > 0,
            continues: i < last,
        })
        .collect()
}

/// Records the page number on which each section starts.
pub fn table_of_contents(pages: &[Page]) -> Vec<TocEntry> {
    let mut entries = Vec::new();
    for (offset, page) in pages.iter().enumerate() {
        if page.is_section_start {
            entries.push(TocEntry {
                title: page.section_title.clone(),
                page: FIRST_CONTENT_PAGE + offset as u32,
            });
        }
    }
    entries
}
