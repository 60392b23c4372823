//! services/api/src/adapters/arabic.rs
//!
//! Arabic text preparation for fonts without a shaping engine: letters are
//! replaced by their contextual presentation forms, then each laid-out line is
//! reordered from logical into visual (left to right) order.

use unicode_bidi::{BidiInfo, Level};

/// Replaces Arabic letters by their contextual presentation forms and merges
/// lam-alef pairs. Output stays in logical order.
pub fn reshape(text: &str) -> String {
    ar_reshaper::reshape_line(text)
}

fn mirror(c: char) -> char {
    match c {
        '(' => ')',
        ')' => '(',
        '[' => ']',
        ']' => '[',
        '{' => '}',
        '}' => '{',
        '<' => '>',
        '>' => '<',
        '«' => '»',
        '»' => '«',
        other => other,
    }
}

/// Reorders one laid-out line from logical to visual order, with a
/// right-to-left base direction. Brackets inside right-to-left runs are mirrored.
pub fn visual_line(line: &str) -> String {
    if line.is_empty() {
        return String::new();
    }
    let bidi = BidiInfo::new(line, Some(Level::rtl()));
    let mut out = String::with_capacity(line.len());
    for paragraph in &bidi.paragraphs {
        let (levels, runs) = bidi.visual_runs(paragraph, paragraph.range.clone());
        for run in runs {
            let text = &line[run.clone()];
            if levels[run.start].is_rtl() {
                out.extend(text.chars().rev().map(mirror));
            } else {
                out.push_str(text);
            }
        }
    }
    out
}
