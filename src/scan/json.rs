use regex::Regex;

use super::ValueSpan;
use crate::path::PathSegment;

/// JSON / JSON5 scanner. A cheap single-line heuristic runs first: a per-line
/// regex search for the final path segment, trusted only when it matches
/// exactly once in the whole document. Zero or multiple matches escalate to
/// the nested scan, which walks the document tracking a live path stack and
/// matches on the full reconstructed path.
pub fn find_value_span(lines: &[&str], path: &[PathSegment]) -> Option<ValueSpan> {
    single_line_scan(lines, path).or_else(|| nested_scan(lines, path))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ValueEnd {
    pub(crate) end: usize,
    pub(crate) container_closed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    InString { quote: char, escaped: bool },
    InBlockComment,
}

/// Locates the end of the value beginning at `start`, tracking string and
/// escape state, comments, and bracket/brace nesting. The value ends at the
/// first top-level `,`, `}`, or `]` (a closer at depth zero belongs to the
/// parent), at the start of a `//` comment, or at end of line.
pub(crate) fn find_value_end(line: &str, start: usize) -> ValueEnd {
    let opens_container = matches!(line[start..].chars().next(), Some('{' | '['));
    let mut state = State::Normal;
    let mut depth = 0usize;
    let mut end = line.len();
    let mut container_closed = false;

    let mut characters = line[start..].char_indices().peekable();
    while let Some((relative, character)) = characters.next() {
        let at = start + relative;
        match state {
            State::InString { quote, escaped } => {
                if escaped {
                    state = State::InString {
                        quote,
                        escaped: false,
                    };
                } else if character == '\\' {
                    state = State::InString {
                        quote,
                        escaped: true,
                    };
                } else if character == quote {
                    state = State::Normal;
                }
            }
            State::InBlockComment => {
                if character == '*' && matches!(characters.peek(), Some((_, '/'))) {
                    characters.next();
                    state = State::Normal;
                }
            }
            State::Normal => match character {
                '"' | '\'' => {
                    state = State::InString {
                        quote: character,
                        escaped: false,
                    };
                }
                '/' => match characters.peek() {
                    Some((_, '/')) => {
                        end = at;
                        break;
                    }
                    Some((_, '*')) => {
                        characters.next();
                        state = State::InBlockComment;
                    }
                    _ => {}
                },
                '{' | '[' => depth += 1,
                '}' | ']' => {
                    if depth == 0 {
                        end = at;
                        break;
                    }
                    depth -= 1;
                    if depth == 0 && opens_container {
                        end = at + character.len_utf8();
                        container_closed = true;
                        break;
                    }
                }
                ',' if depth == 0 => {
                    end = at;
                    break;
                }
                _ => {}
            },
        }
    }

    let trimmed = line[start..end].trim_end();
    ValueEnd {
        end: start + trimmed.len(),
        container_closed: container_closed || !opens_container,
    }
}

/// Splits trailing array-index segments off the path, leaving a head that
/// ends in an object key. `"list[1][2]"` becomes `(["list"], [1, 2])`.
fn split_trailing_indices(path: &[PathSegment]) -> (&[PathSegment], Vec<usize>) {
    let mut head_len = path.len();
    let mut indices = Vec::new();
    while head_len > 0 && path[head_len - 1].is_array_index {
        match path[head_len - 1].array_index() {
            Some(index) => indices.push(index),
            None => return (path, Vec::new()),
        }
        head_len -= 1;
    }
    indices.reverse();
    (&path[..head_len], indices)
}

fn single_line_scan(lines: &[&str], path: &[PathSegment]) -> Option<ValueSpan> {
    let (head, trailing_indices) = split_trailing_indices(path);
    let final_key = head.last().filter(|segment| !segment.is_array_index)?;
    if final_key.key.is_empty() {
        return None;
    }

    let escaped = regex::escape(&final_key.key);
    let key_pattern =
        Regex::new(&format!(r#"(?:"{escaped}"|'{escaped}'|\b{escaped}\b)\s*:"#)).ok()?;

    let mut located: Option<(usize, usize)> = None;
    let mut match_count = 0usize;
    let mut in_block_comment = false;
    for (line_index, line) in lines.iter().enumerate() {
        let masked = masked_ranges(line, in_block_comment);
        in_block_comment = masked.ends_inside_block;
        for found in key_pattern.find_iter(line) {
            if masked.contains(found.start()) {
                continue;
            }
            match_count += 1;
            located = Some((line_index, found.end()));
        }
    }

    if match_count != 1 {
        return None;
    }

    let (line_index, key_end) = located?;
    let line = lines[line_index];
    let value_start = skip_spaces(line, key_end);
    resolve_trailing_indices(line, line_index, value_start, &trailing_indices)
}

fn resolve_trailing_indices(
    line: &str,
    line_index: usize,
    value_start: usize,
    trailing_indices: &[usize],
) -> Option<ValueSpan> {
    let mut start = value_start;
    for target_index in trailing_indices {
        if !line[start..].starts_with('[') {
            return None;
        }
        let (element_start, _) = array_element_span(line, start, *target_index)?;
        start = element_start;
    }

    let value_end = find_value_end(line, start);
    if !value_end.container_closed || value_end.end <= start {
        return None;
    }
    Some(ValueSpan {
        line: line_index,
        start,
        end: value_end.end,
    })
}

/// Walks a single-line array starting at `open` (which must point at `[`)
/// and returns the span of the element at `target_index`.
fn array_element_span(line: &str, open: usize, target_index: usize) -> Option<(usize, usize)> {
    let mut cursor = open + 1;
    let mut element_index = 0usize;
    loop {
        cursor = skip_spaces(line, cursor);
        let next = line[cursor..].chars().next()?;
        if next == ']' {
            return None;
        }

        let element_end = find_value_end(line, cursor);
        if element_index == target_index {
            return Some((cursor, element_end.end));
        }

        cursor = skip_spaces(line, element_end.end);
        match line[cursor..].chars().next()? {
            ',' => cursor += 1,
            ']' => return None,
            _ => return None,
        }
        element_index += 1;
    }
}

fn skip_spaces(line: &str, from: usize) -> usize {
    line[from..]
        .char_indices()
        .find(|(_, character)| !character.is_whitespace())
        .map_or(line.len(), |(offset, _)| from + offset)
}

struct MaskedRanges {
    ranges: Vec<(usize, usize)>,
    ends_inside_block: bool,
}

impl MaskedRanges {
    fn contains(&self, offset: usize) -> bool {
        self.ranges
            .iter()
            .any(|(start, end)| offset >= *start && offset < *end)
    }
}

/// Marks the byte ranges of a line the key heuristic must not trust matches
/// inside: `//` and `/* */` comments, plus string-literal interiors. A string
/// mask begins one byte past the opening quote, so a quoted-key match (which
/// anchors on that quote) stays valid while a key name mentioned inside a
/// string value does not.
fn masked_ranges(line: &str, starts_inside_block: bool) -> MaskedRanges {
    let mut ranges = Vec::new();
    let mut state = if starts_inside_block {
        State::InBlockComment
    } else {
        State::Normal
    };
    let mut block_start = if starts_inside_block { Some(0) } else { None };
    let mut string_start: Option<usize> = None;

    let mut characters = line.char_indices().peekable();
    while let Some((at, character)) = characters.next() {
        match state {
            State::InString { quote, escaped } => {
                if escaped {
                    state = State::InString {
                        quote,
                        escaped: false,
                    };
                } else if character == '\\' {
                    state = State::InString {
                        quote,
                        escaped: true,
                    };
                } else if character == quote {
                    state = State::Normal;
                    if let Some(start) = string_start.take() {
                        ranges.push((start + 1, at + 1));
                    }
                }
            }
            State::InBlockComment => {
                if character == '*' && matches!(characters.peek(), Some((_, '/'))) {
                    characters.next();
                    state = State::Normal;
                    if let Some(start) = block_start.take() {
                        ranges.push((start, at + 2));
                    }
                }
            }
            State::Normal => match character {
                '"' | '\'' => {
                    state = State::InString {
                        quote: character,
                        escaped: false,
                    };
                    string_start = Some(at);
                }
                '/' => match characters.peek() {
                    Some((_, '/')) => {
                        ranges.push((at, line.len()));
                        return MaskedRanges {
                            ranges,
                            ends_inside_block: false,
                        };
                    }
                    Some((_, '*')) => {
                        characters.next();
                        state = State::InBlockComment;
                        block_start = Some(at);
                    }
                    _ => {}
                },
                _ => {}
            },
        }
    }

    let ends_inside_block = matches!(state, State::InBlockComment);
    if let Some(start) = block_start {
        ranges.push((start, line.len()));
    }
    if let Some(start) = string_start {
        ranges.push((start + 1, line.len()));
    }
    MaskedRanges {
        ranges,
        ends_inside_block,
    }
}

#[derive(Debug)]
enum Frame {
    Object {
        pending_key: Option<String>,
        awaiting_value: bool,
    },
    Array {
        next_index: usize,
    },
}

#[derive(Debug)]
struct FrameEntry {
    frame: Frame,
    pushed_segment: bool,
}

/// Full-document fallback: reconstructs the live path at every value start
/// by tracking brace/bracket depth transitions and key definitions, and
/// matches only when the complete path equals the target. This is what
/// disambiguates same-named keys at different nesting levels.
fn nested_scan(lines: &[&str], path: &[PathSegment]) -> Option<ValueSpan> {
    let mut frames: Vec<FrameEntry> = Vec::new();
    let mut path_stack: Vec<PathSegment> = Vec::new();
    let mut in_block_comment = false;

    for (line_index, line) in lines.iter().enumerate() {
        let mut characters = line.char_indices().peekable();
        while let Some((at, character)) = characters.next() {
            if in_block_comment {
                if character == '*' && matches!(characters.peek(), Some((_, '/'))) {
                    characters.next();
                    in_block_comment = false;
                }
                continue;
            }

            match character {
                '/' => match characters.peek() {
                    Some((_, '/')) => break,
                    Some((_, '*')) => {
                        characters.next();
                        in_block_comment = true;
                    }
                    _ => {}
                },
                '"' | '\'' => {
                    let (content, after) = read_string_literal(line, at, character);
                    while matches!(characters.peek(), Some((offset, _)) if *offset < after) {
                        characters.next();
                    }
                    if expecting_key(frames.last()) {
                        set_pending_key(&mut frames, content);
                    } else if let Some(span) =
                        value_event(&mut frames, &mut path_stack, path, line, line_index, at)
                    {
                        return Some(span);
                    }
                }
                ':' => {
                    if let Some(FrameEntry {
                        frame: Frame::Object { awaiting_value, .. },
                        ..
                    }) = frames.last_mut()
                    {
                        *awaiting_value = true;
                    }
                }
                ',' => match frames.last_mut() {
                    Some(FrameEntry {
                        frame:
                            Frame::Object {
                                pending_key,
                                awaiting_value,
                            },
                        ..
                    }) => {
                        *pending_key = None;
                        *awaiting_value = false;
                    }
                    Some(FrameEntry {
                        frame: Frame::Array { next_index },
                        ..
                    }) => *next_index += 1,
                    None => {}
                },
                '{' | '[' => {
                    let slot = current_slot(frames.last());
                    if let Some(segment) = &slot {
                        if path_matches(&path_stack, segment, path) {
                            let value_end = find_value_end(line, at);
                            if value_end.container_closed {
                                return Some(ValueSpan {
                                    line: line_index,
                                    start: at,
                                    end: value_end.end,
                                });
                            }
                        }
                    }
                    consume_value_slot(&mut frames);
                    let pushed_segment = slot.is_some();
                    if let Some(segment) = slot {
                        path_stack.push(segment);
                    }
                    frames.push(FrameEntry {
                        frame: if character == '{' {
                            Frame::Object {
                                pending_key: None,
                                awaiting_value: false,
                            }
                        } else {
                            Frame::Array { next_index: 0 }
                        },
                        pushed_segment,
                    });
                }
                '}' | ']' => {
                    if let Some(entry) = frames.pop() {
                        if entry.pushed_segment {
                            path_stack.pop();
                        }
                    }
                }
                other if other.is_whitespace() => {}
                _ => {
                    let token_end = bare_token_end(line, at);
                    while matches!(characters.peek(), Some((offset, _)) if *offset < token_end) {
                        characters.next();
                    }
                    if expecting_key(frames.last()) {
                        set_pending_key(&mut frames, line[at..token_end].to_string());
                    } else if let Some(span) =
                        value_event(&mut frames, &mut path_stack, path, line, line_index, at)
                    {
                        return Some(span);
                    }
                }
            }
        }
    }

    None
}

fn expecting_key(top: Option<&FrameEntry>) -> bool {
    matches!(
        top,
        Some(FrameEntry {
            frame: Frame::Object {
                awaiting_value: false,
                ..
            },
            ..
        })
    )
}

fn set_pending_key(frames: &mut [FrameEntry], key: String) {
    if let Some(FrameEntry {
        frame: Frame::Object { pending_key, .. },
        ..
    }) = frames.last_mut()
    {
        *pending_key = Some(key);
    }
}

fn current_slot(top: Option<&FrameEntry>) -> Option<PathSegment> {
    match top {
        Some(FrameEntry {
            frame:
                Frame::Object {
                    pending_key: Some(key),
                    awaiting_value: true,
                },
            ..
        }) => Some(PathSegment::key(key.clone())),
        Some(FrameEntry {
            frame: Frame::Array { next_index },
            ..
        }) => Some(PathSegment::index(*next_index)),
        _ => None,
    }
}

fn path_matches(path_stack: &[PathSegment], slot: &PathSegment, target: &[PathSegment]) -> bool {
    target.len() == path_stack.len() + 1
        && target[..path_stack.len()] == *path_stack
        && target[path_stack.len()] == *slot
}

/// Handles a scalar value beginning at `at`: returns its span when the live
/// path equals the target, otherwise just marks the slot as consumed.
fn value_event(
    frames: &mut [FrameEntry],
    path_stack: &mut [PathSegment],
    target: &[PathSegment],
    line: &str,
    line_index: usize,
    at: usize,
) -> Option<ValueSpan> {
    let slot = current_slot(frames.last())?;
    let matched = path_matches(path_stack, &slot, target);
    consume_value_slot(frames);
    if !matched {
        return None;
    }

    let value_end = find_value_end(line, at);
    Some(ValueSpan {
        line: line_index,
        start: at,
        end: value_end.end,
    })
}

fn consume_value_slot(frames: &mut [FrameEntry]) {
    if let Some(FrameEntry {
        frame: Frame::Object { awaiting_value, .. },
        ..
    }) = frames.last_mut()
    {
        *awaiting_value = false;
    }
}

/// Reads a quoted string starting at `open`, returning the unescaped content
/// and the byte offset just past the closing quote.
fn read_string_literal(line: &str, open: usize, quote: char) -> (String, usize) {
    let mut content = String::new();
    let mut characters = line[open + quote.len_utf8()..].char_indices();
    while let Some((relative, character)) = characters.next() {
        let at = open + quote.len_utf8() + relative;
        if character == quote {
            return (content, at + quote.len_utf8());
        }
        if character == '\\' {
            match characters.next() {
                Some((_, 'n')) => content.push('\n'),
                Some((_, 't')) => content.push('\t'),
                Some((_, 'r')) => content.push('\r'),
                Some((_, escaped)) => content.push(escaped),
                None => break,
            }
        } else {
            content.push(character);
        }
    }
    (content, line.len())
}

fn bare_token_end(line: &str, start: usize) -> usize {
    line[start..]
        .char_indices()
        .find(|(_, character)| {
            !(character.is_alphanumeric() || matches!(character, '_' | '$' | '-' | '+' | '.'))
        })
        .map_or(line.len(), |(offset, _)| start + offset)
}
