//! crates/research_core/src/repair.rs
//!
//! Textual repair passes for quasi-JSON model output.
//!
//! Every pass is a total `&str -> String` function: it never fails and leaves
//! well-formed JSON untouched. [`repair`] composes them in the order of [`PASSES`].

/// A single repair step.
pub type RepairPass = fn(&str) -> String;

/// The repair pipeline, in application order.
pub const PASSES: &[(&str, RepairPass)] = &[
    ("arabic_punctuation", normalize_arabic_punctuation),
    ("curly_double_quotes", normalize_curly_double_quotes),
    ("single_quotes", normalize_single_quotes),
    ("line_comments", strip_line_comments),
    ("literals", normalize_literals),
    ("interior_quotes", escape_interior_quotes),
    ("control_characters", escape_control_characters),
    ("trailing_commas", strip_trailing_commas),
];

/// Runs every pass in order.
pub fn repair(text: &str) -> String {
    PASSES
        .iter()
        .fold(text.to_string(), |current, (_, pass)| pass(&current))
}

//=========================================================================================
// Scanning helpers
//=========================================================================================

/// Tracks whether a scan position is inside a double-quoted JSON string.
#[derive(Debug, Default)]
struct Strings {
    inside: bool,
    escaped: bool,
}

impl Strings {
    /// Advances over `c` and reports whether it belonged to a string literal,
    /// delimiters included.
    fn step(&mut self, c: char) -> bool {
        if self.inside {
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == '"' {
                self.inside = false;
            }
            true
        } else if c == '"' {
            self.inside = true;
            true
        } else {
            false
        }
    }
}

fn skip_whitespace(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    i
}

fn starts_literal(chars: &[char], at: usize) -> bool {
    ["true", "false", "null", "True", "False", "None"]
        .iter()
        .any(|literal| {
            let end = at + literal.chars().count();
            end <= chars.len()
                && chars[at..end].iter().copied().eq(literal.chars())
                && chars
                    .get(end)
                    .map_or(true, |c| !c.is_alphanumeric() && *c != '_')
        })
}

/// Decides whether a quote whose successor is at `after` ends a string value,
/// judging by what follows it.
fn closes_string(chars: &[char], after: usize) -> bool {
    let i = skip_whitespace(chars, after);
    match chars.get(i) {
        None | Some('}') | Some(']') | Some(':') => true,
        Some(',') | Some('،') => {
            let j = skip_whitespace(chars, i + 1);
            match chars.get(j) {
                None => true,
                Some(c) => {
                    matches!(c, '"' | '\'' | '‘' | '“' | '«' | '{' | '[' | '}' | ']' | '-')
                        || c.is_ascii_digit()
                        || starts_literal(chars, j)
                }
            }
        }
        _ => false,
    }
}

/// A value may start after these characters.
fn opens_value(previous: Option<char>) -> bool {
    matches!(previous, None | Some('{') | Some('[') | Some(',') | Some(':'))
}

/// Applies `map` to every character that lies outside double-quoted strings.
fn map_outside_strings(text: &str, convert: impl Fn(char) -> char) -> String {
    let mut strings = Strings::default();
    text.chars()
        .map(|c| if strings.step(c) { c } else { convert(c) })
        .collect()
}

/// Rewrites strings delimited by non-JSON quote characters into double-quoted ones.
fn convert_delimited(text: &str, opens: &[char], closes: &[char]) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut strings = Strings::default();
    let mut foreign = false;
    let mut previous: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if foreign {
            if c == '\\' {
                match chars.get(i + 1) {
                    Some(next) if closes.contains(next) || opens.contains(next) => {
                        out.push(*next);
                        i += 2;
                    }
                    Some(next) => {
                        out.push('\\');
                        out.push(*next);
                        i += 2;
                    }
                    None => {
                        out.push('\\');
                        i += 1;
                    }
                }
                continue;
            }
            if closes.contains(&c) && closes_string(&chars, i + 1) {
                out.push('"');
                foreign = false;
                previous = Some('"');
            } else if c == '"' {
                out.push_str("\\\"");
            } else {
                out.push(c);
            }
            i += 1;
            continue;
        }

        if strings.step(c) {
            out.push(c);
            if !strings.inside {
                previous = Some('"');
            }
        } else if opens.contains(&c) && opens_value(previous) {
            out.push('"');
            foreign = true;
        } else {
            out.push(c);
            if !c.is_whitespace() {
                previous = Some(c);
            }
        }
        i += 1;
    }
    out
}

//=========================================================================================
// Passes
//=========================================================================================

/// Guillemet-delimited strings become JSON strings; Arabic comma, semicolon,
/// question mark and Arabic-Indic digits outside strings become ASCII.
pub fn normalize_arabic_punctuation(text: &str) -> String {
    let quoted = convert_delimited(text, &['«'], &['»']);
    map_outside_strings(&quoted, |c| match c {
        '،' => ',',
        '؛' => ';',
        '؟' => '?',
        '٠'..='٩' => char::from_digit(c as u32 - '٠' as u32, 10).unwrap_or(c),
        _ => c,
    })
}

/// Typographic double quotes used as delimiters become ASCII quotes.
pub fn normalize_curly_double_quotes(text: &str) -> String {
    convert_delimited(text, &['“', '„'], &['”', '“'])
}

/// Single-quoted strings become double-quoted. Apostrophes inside words survive
/// because a closing quote must be followed by JSON structure.
pub fn normalize_single_quotes(text: &str) -> String {
    convert_delimited(text, &['\'', '‘'], &['\'', '’'])
}

/// Drops `//` comments that appear outside strings.
pub fn strip_line_comments(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut strings = Strings::default();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if !strings.inside && c == '/' && chars.get(i + 1) == Some(&'/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        strings.step(c);
        out.push(c);
        i += 1;
    }
    out
}

/// `True`, `False` and `None` outside strings become JSON literals.
pub fn normalize_literals(text: &str) -> String {
    fn flush(out: &mut String, word: &mut String) {
        out.push_str(match word.as_str() {
            "True" => "true",
            "False" => "false",
            "None" => "null",
            other => other,
        });
        word.clear();
    }

    let mut out = String::with_capacity(text.len());
    let mut strings = Strings::default();
    let mut word = String::new();
    for c in text.chars() {
        if !strings.inside && (c.is_alphanumeric() || c == '_') {
            word.push(c);
            continue;
        }
        flush(&mut out, &mut word);
        strings.step(c);
        out.push(c);
    }
    flush(&mut out, &mut word);
    out
}

/// Escapes a `"` met inside a string unless what follows it looks like the end
/// of a JSON value.
pub fn escape_interior_quotes(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);
    let mut inside = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if !inside {
            inside = c == '"';
            out.push(c);
            continue;
        }
        if escaped {
            escaped = false;
            out.push(c);
            continue;
        }
        match c {
            '\\' => {
                escaped = true;
                out.push(c);
            }
            '"' if closes_string(&chars, i + 1) => {
                inside = false;
                out.push(c);
            }
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out
}

/// Escapes raw newlines, tabs and other control characters inside strings.
pub fn escape_control_characters(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut strings = Strings::default();
    for c in text.chars() {
        let inside_before = strings.inside;
        strings.step(c);
        if inside_before && strings.inside && c.is_control() {
            match c {
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                other => out.push_str(&format!("\\u{:04x}", other as u32)),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Removes commas that directly precede a closing brace or bracket.
pub fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut strings = Strings::default();
    for (i, &c) in chars.iter().enumerate() {
        if !strings.inside && c == ',' {
            let next = skip_whitespace(&chars, i + 1);
            if matches!(chars.get(next), Some('}') | Some(']')) {
                continue;
            }
        }
        strings.step(c);
        out.push(c);
    }
    out
}
