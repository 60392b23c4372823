//! crates/research_core/src/markdown.rs
//!
//! Block-level views of the markdown bodies the model produces.
//!
//! Two views are provided: [`split_units`] cuts a body into top-level source
//! slices for pagination, and [`parse_blocks`] flattens it into typed blocks for
//! the document renderers.

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};

fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options
}

/// One top-level block of a markdown body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockUnit<'a> {
    /// The block's markdown source, trimmed.
    pub source: &'a str,
    /// Number of words in the block's rendered text.
    pub word_count: usize,
}

/// Splits `markdown` into its top-level blocks.
///
/// Text before the first block (reference definitions, stray whitespace) is kept
/// with the first unit so that concatenating every unit loses no words.
pub fn split_units(markdown: &str) -> Vec<BlockUnit<'_>> {
    let mut starts: Vec<usize> = Vec::new();
    let mut words: Vec<usize> = Vec::new();
    let mut text = String::new();
    let mut depth = 0usize;

    fn close_unit(text: &mut String, words: &mut [usize]) {
        if let Some(last) = words.last_mut() {
            *last += text.split_whitespace().count();
        }
        text.clear();
    }

    for (event, range) in Parser::new_ext(markdown, parser_options()).into_offset_iter() {
        match event {
            Event::Start(_) => {
                if depth == 0 {
                    close_unit(&mut text, &mut words);
                    starts.push(range.start);
                    words.push(0);
                }
                depth += 1;
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                text.push(' ');
            }
            Event::Rule if depth == 0 => {
                close_unit(&mut text, &mut words);
                starts.push(range.start);
                words.push(0);
            }
            Event::Text(t) | Event::Code(t) => text.push_str(&t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            _ => {}
        }
    }
    close_unit(&mut text, &mut words);

    if let Some(first) = starts.first_mut() {
        *first = 0;
    }

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(markdown.len());
            BlockUnit {
                source: markdown[start..end].trim(),
                word_count: words[i],
            }
        })
        .filter(|unit| !unit.source.is_empty())
        .collect()
}

/// Counts the words of a markdown body the same way pagination does.
pub fn count_words(markdown: &str) -> usize {
    split_units(markdown).iter().map(|unit| unit.word_count).sum()
}

/// A flattened block, ready for layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph(String),
    ListItem { number: Option<u64>, text: String },
    Code(String),
    Rule,
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Flattens `markdown` into headings, paragraphs, list items and code blocks.
/// Inline formatting is dropped; nested list items are emitted in order.
pub fn parse_blocks(markdown: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut buffer = String::new();
    // Next number for each open list; `None` for bullet lists.
    let mut lists: Vec<Option<u64>> = Vec::new();
    let mut item_open = false;
    let mut in_code = false;

    fn take(buffer: &mut String) -> String {
        let text = buffer.split_whitespace().collect::<Vec<_>>().join(" ");
        buffer.clear();
        text
    }

    for event in Parser::new_ext(markdown, parser_options()) {
        match event {
            Event::Start(Tag::Heading { .. }) => buffer.clear(),
            Event::End(TagEnd::Heading(level)) => {
                let text = take(&mut buffer);
                if !text.is_empty() {
                    blocks.push(Block::Heading { level: heading_level(level), text });
                }
            }
            Event::Start(Tag::List(first)) => {
                if item_open {
                    flush_item(&mut blocks, &mut buffer, &lists);
                }
                lists.push(first);
            }
            Event::End(TagEnd::List(_)) => {
                lists.pop();
            }
            Event::Start(Tag::Item) => {
                buffer.clear();
                item_open = true;
            }
            Event::End(TagEnd::Item) => {
                flush_item(&mut blocks, &mut buffer, &lists);
                item_open = false;
                if let Some(Some(next)) = lists.last_mut() {
                    *next += 1;
                }
            }
            Event::Start(Tag::Paragraph) if !item_open => buffer.clear(),
            Event::End(TagEnd::Paragraph) if !item_open => {
                let text = take(&mut buffer);
                if !text.is_empty() {
                    blocks.push(Block::Paragraph(text));
                }
            }
            Event::End(TagEnd::Paragraph) => buffer.push(' '),
            Event::Start(Tag::CodeBlock(_)) => {
                buffer.clear();
                in_code = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code = false;
                let code = std::mem::take(&mut buffer);
                blocks.push(Block::Code(code.trim_end().to_string()));
            }
            Event::End(TagEnd::TableCell) => buffer.push_str(" | "),
            Event::End(TagEnd::TableRow) | Event::End(TagEnd::TableHead) => {
                let row = take(&mut buffer);
                let row = row.trim_end_matches('|').trim().to_string();
                if !row.is_empty() {
                    blocks.push(Block::Paragraph(row));
                }
            }
            Event::Text(text) | Event::Code(text) => buffer.push_str(&text),
            Event::SoftBreak | Event::HardBreak => {
                buffer.push(if in_code { '\n' } else { ' ' });
            }
            Event::Rule => blocks.push(Block::Rule),
            _ => {}
        }
    }

    let trailing = take(&mut buffer);
    if !trailing.is_empty() {
        blocks.push(Block::Paragraph(trailing));
    }
    blocks
}

fn flush_item(blocks: &mut Vec<Block>, buffer: &mut String, lists: &[Option<u64>]) {
    let text = buffer.split_whitespace().collect::<Vec<_>>().join(" ");
    buffer.clear();
    if text.is_empty() {
        return;
    }
    let number = lists.last().copied().flatten();
    blocks.push(Block::ListItem { number, text });
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "Intro paragraph with **five** words.\n\n## Methods used\n\n- first item\n- second *item*\n\n1. one\n2. two\n\n---\n\nClosing `code` words here.";

    #[test]
    fn units_cover_every_top_level_block() {
        let units = split_units(BODY);
        let sources: Vec<&str> = units.iter().map(|u| u.source).collect();
        assert_eq!(
            sources,
            vec![
                "Intro paragraph with **five** words.",
                "## Methods used",
                "- first item\n- second *item*",
                "1. one\n2. two",
                "---",
                "Closing `code` words here."
            ]
        );
        let counts: Vec<usize> = units.iter().map(|u| u.word_count).collect();
        assert_eq!(counts, vec![5, 2, 4, 2, 0, 4]);
        assert_eq!(count_words(BODY), 17);
    }

    #[test]
    fn blocks_are_flattened() {
        let blocks = parse_blocks(BODY);
        assert_eq!(blocks[0], Block::Paragraph("Intro paragraph with five words.".into()));
        assert_eq!(blocks[1], Block::Heading { level: 2, text: "Methods used".into() });
        assert_eq!(blocks[2], Block::ListItem { number: None, text: "first item".into() });
        assert_eq!(blocks[3], Block::ListItem { number: None, text: "second item".into() });
        assert_eq!(blocks[4], Block::ListItem { number: Some(1), text: "one".into() });
        assert_eq!(blocks[5], Block::ListItem { number: Some(2), text: "two".into() });
        assert_eq!(blocks[6], Block::Rule);
        assert_eq!(blocks[7], Block::Paragraph("Closing code words here.".into()));
    }

    #[test]
    fn empty_body_has_no_units() {
        assert!(split_units("   \n").is_empty());
        assert_eq!(count_words(""), 0);
    }
}
