//! Parser for canonical diagnostic lines.
//!
//! Compiler-style tools report problems one per line in the shape
//! `[origin[(position)]:][subcategory] category code: [message]`, where
//! `category` is the case-insensitive literal `error` or `warning` and all
//! bracketed parts are optional:
//!
//! ```text
//! a.cs(10,5): error CS0001: something went wrong
//! main.o: Command line warning D123: linker flag ignored
//! fatal error LNK1104: cannot open file
//! ```
//!
//! The parser is pure and total: every input yields either a [`Diagnostic`]
//! or `None` ("not a diagnostic line"), never an error or a panic. It does a
//! single left-to-right scan with backtracking over the two candidate
//! interpretations (with and without an origin segment).

use super::{Diagnostic, Severity};

/// Source span extracted from a parenthesized position group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Span {
    start_line: u32,
    start_col: u32,
    end_line: u32,
    end_col: u32,
}

/// Attempt to parse one line of tool output as a diagnostic.
///
/// Returns `None` when the line carries no recognizable `error`/`warning`
/// category and should be relayed as a plain message instead.
#[must_use]
pub fn parse_diagnostic(line: &str) -> Option<Diagnostic> {
    let text = line.trim_start();
    if text.is_empty() {
        return None;
    }

    // The first candidate colon starts at index 2 so a Windows drive letter
    // such as `C:` is never mistaken for the end of the origin.
    let first_colon = find_colon_from(text, 2)?;

    // Interpretation 1: `origin: [subcategory] category code: message`.
    if let Some(second_colon) = find_colon_from(text, first_colon + 1) {
        let middle = &text[first_colon + 1..second_colon];
        if let Some((subcategory, severity, code)) = parse_category_suffix(middle) {
            let origin_raw = text[..first_colon].trim_end();
            let (origin, span) = split_position(origin_raw);
            return Some(Diagnostic {
                origin,
                start_line: span.start_line,
                start_col: span.start_col,
                end_line: span.end_line,
                end_col: span.end_col,
                subcategory,
                severity,
                code,
                message: text[second_colon + 1..].trim().to_string(),
            });
        }
    }

    // Interpretation 2: no origin, only `[subcategory] category code: message`.
    let head = &text[..first_colon];
    let (subcategory, severity, code) = parse_category_suffix(head)?;
    Some(Diagnostic {
        origin: String::new(),
        start_line: 0,
        start_col: 0,
        end_line: 0,
        end_col: 0,
        subcategory,
        severity,
        code,
        message: text[first_colon + 1..].trim().to_string(),
    })
}

/// Find the first `:` at byte index `from` or later.
fn find_colon_from(text: &str, from: usize) -> Option<usize> {
    text.char_indices()
        .find(|&(i, c)| i >= from && c == ':')
        .map(|(i, _)| i)
}

/// Parse the tail of a segment as `[subcategory] category code`.
///
/// The code is the contiguous alphanumeric token at the end of the segment;
/// immediately before it (after whitespace) must sit the `error`/`warning`
/// keyword, itself preceded by a non-alphanumeric boundary. Whatever remains
/// in front becomes the subcategory.
fn parse_category_suffix(segment: &str) -> Option<(String, Severity, String)> {
    let trimmed = segment.trim_end();
    let bytes = trimmed.as_bytes();

    let mut code_start = bytes.len();
    while code_start > 0 && bytes[code_start - 1].is_ascii_alphanumeric() {
        code_start -= 1;
    }
    if code_start == bytes.len() {
        return None;
    }
    let code = trimmed[code_start..].to_string();

    let before_code = trimmed[..code_start].trim_end();
    let (keyword_start, severity) = strip_category_keyword(before_code)?;

    let prefix = &before_code[..keyword_start];
    if prefix
        .chars()
        .next_back()
        .is_some_and(char::is_alphanumeric)
    {
        return None;
    }

    Some((prefix.trim().to_string(), severity, code))
}

/// Match a trailing `error`/`warning` keyword, case-insensitively.
fn strip_category_keyword(text: &str) -> Option<(usize, Severity)> {
    for (keyword, severity) in [("error", Severity::Error), ("warning", Severity::Warning)] {
        let Some(start) = text.len().checked_sub(keyword.len()) else {
            continue;
        };
        if text.is_char_boundary(start) && text[start..].eq_ignore_ascii_case(keyword) {
            return Some((start, severity));
        }
    }
    None
}

/// Split a trailing parenthesized position off an origin segment.
///
/// When the segment does not end in a well-formed position group, the whole
/// segment is kept verbatim as origin text, so file names that merely contain
/// parentheses survive intact.
fn split_position(origin_raw: &str) -> (String, Span) {
    if origin_raw.ends_with(')') {
        if let Some(open) = origin_raw.rfind('(') {
            let inner = &origin_raw[open + 1..origin_raw.len() - 1];
            if let Some(span) = parse_span(inner) {
                return (origin_raw[..open].trim_end().to_string(), span);
            }
        }
    }
    (origin_raw.to_string(), Span::default())
}

/// Parse the interior of a position group.
///
/// Supported forms, most to least specific: `L,C,L,C`, `L,C-C`, `L-L`, `L,C`,
/// `L`. Wrong comma/dash arity rejects the group; a numeric component out of
/// range silently becomes 0.
fn parse_span(inner: &str) -> Option<Span> {
    let parts: Vec<&str> = inner.split(',').collect();
    match parts.as_slice() {
        [only] => {
            let mut span = Span::default();
            match split_dash(only)? {
                (line, None) => span.start_line = line,
                (line, Some(end_line)) => {
                    span.start_line = line;
                    span.end_line = end_line;
                }
            }
            Some(span)
        }
        [line, col] => {
            let mut span = Span {
                start_line: parse_component(line)?,
                ..Span::default()
            };
            match split_dash(col)? {
                (start_col, None) => span.start_col = start_col,
                (start_col, Some(end_col)) => {
                    span.start_col = start_col;
                    span.end_col = end_col;
                }
            }
            Some(span)
        }
        [start_line, start_col, end_line, end_col] => Some(Span {
            start_line: parse_component(start_line)?,
            start_col: parse_component(start_col)?,
            end_line: parse_component(end_line)?,
            end_col: parse_component(end_col)?,
        }),
        _ => None,
    }
}

/// Split a position slot on a single optional dash.
///
/// More than one dash in a slot rejects the whole group.
fn split_dash(slot: &str) -> Option<(u32, Option<u32>)> {
    let mut pieces = slot.split('-');
    let first = parse_component(pieces.next()?)?;
    let second = match pieces.next() {
        Some(piece) => Some(parse_component(piece)?),
        None => None,
    };
    if pieces.next().is_some() {
        return None;
    }
    Some((first, second))
}

/// Parse one numeric position component.
///
/// Only ASCII digits are accepted; an out-of-range value becomes 0 rather
/// than rejecting the group.
fn parse_component(component: &str) -> Option<u32> {
    if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(component.parse().unwrap_or(0))
}
