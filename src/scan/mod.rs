pub mod json;
pub mod toml;

use crate::dialect::Dialect;
use crate::path::PathSegment;

/// Byte offset range of a located value within one line of source text,
/// exclusive of surrounding whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueSpan {
    pub line: usize,
    pub start: usize,
    pub end: usize,
}

/// Locates the exact span of the existing value at `path` inside `text`.
/// Purely textual: the scanners re-derive just enough structural context
/// (bracket depth, current section) to disambiguate, never a full AST.
/// Returns `None` when the path cannot be located; callers treat that as a
/// skippable condition, not an error.
pub fn find_value_span(text: &str, path: &[PathSegment], dialect: Dialect) -> Option<ValueSpan> {
    if path.is_empty() {
        return None;
    }

    let lines: Vec<&str> = text.split('\n').collect();
    let span = match dialect {
        Dialect::Json | Dialect::Json5 => json::find_value_span(&lines, path),
        Dialect::Toml => toml::find_value_span(&lines, path),
    }?;

    if span.start >= span.end {
        return None;
    }
    Some(span)
}

/// Replaces the located span with `replacement`, leaving every other byte of
/// the document untouched. Operates on an owned, function-local line buffer;
/// the input text is never mutated.
pub fn splice(text: &str, span: ValueSpan, replacement: &str) -> String {
    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
    if let Some(line) = lines.get_mut(span.line) {
        if span.start <= span.end && span.end <= line.len() {
            line.replace_range(span.start..span.end, replacement);
        }
    }
    lines.join("\n")
}
