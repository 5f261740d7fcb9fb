use regex::Regex;

use super::ValueSpan;
use crate::path::PathSegment;

/// TOML scanner. Walks the document line by line, maintaining the current
/// section context from `[section]` / `[[array-of-tables]]` headers, and
/// matches a key line when the target's parent keys equal the section
/// context exactly. Array-index segments are excluded from section matching
/// because TOML sections are name-based, not index-based; indices trailing
/// the final key are resolved inside the value line itself.
pub fn find_value_span(lines: &[&str], path: &[PathSegment]) -> Option<ValueSpan> {
    let target = TargetParts::from_path(path)?;

    let header_pattern = Regex::new(r"^\s*\[\[?\s*([^\]]+?)\s*\]\]?\s*(?:#.*)?$").ok()?;
    let key_pattern =
        Regex::new(r#"^\s*(?:"((?:[^"\\]|\\.)*)"|'([^']*)'|([A-Za-z0-9_-]+))\s*=\s*"#).ok()?;

    let mut section: Vec<String> = Vec::new();
    for (line_index, line) in lines.iter().enumerate() {
        if let Some(header) = header_pattern.captures(line) {
            section = split_section_name(header.get(1).map_or("", |name| name.as_str()));
            continue;
        }

        let Some(key_line) = key_pattern.captures(line) else {
            continue;
        };
        let key = key_line
            .get(1)
            .or_else(|| key_line.get(2))
            .or_else(|| key_line.get(3))
            .map_or("", |group| group.as_str());

        // A bare key belongs to the most recent section, or the implicit
        // root before any header; exact context equality enforces both.
        if section != target.section_keys || key != target.final_key {
            continue;
        }

        let value_start = key_line.get(0).map_or(0, |whole| whole.end());
        return resolve_span(line, line_index, value_start, &target.trailing_indices);
    }

    None
}

struct TargetParts<'path> {
    section_keys: Vec<String>,
    final_key: &'path str,
    trailing_indices: Vec<usize>,
}

impl<'path> TargetParts<'path> {
    fn from_path(path: &'path [PathSegment]) -> Option<Self> {
        let last_key_position = path.iter().rposition(|segment| !segment.is_array_index)?;

        let mut trailing_indices = Vec::new();
        for segment in &path[last_key_position + 1..] {
            trailing_indices.push(segment.array_index()?);
        }

        let section_keys = path[..last_key_position]
            .iter()
            .filter(|segment| !segment.is_array_index)
            .map(|segment| segment.key.clone())
            .collect();

        Some(Self {
            section_keys,
            final_key: &path[last_key_position].key,
            trailing_indices,
        })
    }
}

/// Splits a section header name on dots, stripping quotes from quoted
/// segments so names containing dots, spaces, or apostrophes resolve (e.g.
/// `["YUNG's Better Dungeons".General]`).
pub(crate) fn split_section_name(name: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut buffer = String::new();
    let mut quote: Option<char> = None;

    for character in name.chars() {
        match quote {
            Some(open) => {
                if character == open {
                    quote = None;
                } else {
                    buffer.push(character);
                }
            }
            None => match character {
                '"' | '\'' => quote = Some(character),
                '.' => segments.push(std::mem::take(&mut buffer).trim().to_string()),
                other => buffer.push(other),
            },
        }
    }
    segments.push(buffer.trim().to_string());
    segments
}

fn resolve_span(
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

    let value_end = find_toml_value_end(line, start);
    if !value_end.container_closed || value_end.end <= start {
        return None;
    }
    Some(ValueSpan {
        line: line_index,
        start,
        end: value_end.end,
    })
}

fn array_element_span(line: &str, open: usize, target_index: usize) -> Option<(usize, usize)> {
    let mut cursor = open + 1;
    let mut element_index = 0usize;
    loop {
        cursor = skip_spaces(line, cursor);
        let next = line[cursor..].chars().next()?;
        if next == ']' {
            return None;
        }

        let element_end = find_toml_value_end(line, cursor);
        if element_index == target_index {
            return Some((cursor, element_end.end));
        }

        cursor = skip_spaces(line, element_end.end);
        match line[cursor..].chars().next()? {
            ',' => cursor += 1,
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct TomlValueEnd {
    pub(super) end: usize,
    pub(super) container_closed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    InBasicString { escaped: bool },
    InLiteralString,
}

/// Value-end state machine for TOML, distinct from the JSON one: it knows
/// triple-quoted strings (three-character lookahead, scan forward for the
/// closing triple, end-of-line offset when unterminated on this line),
/// array-bracket depth, inline-table brace depth, and terminates at an
/// unquoted `,`, `#`, or `}` outside those nestings.
pub(super) fn find_toml_value_end(line: &str, start: usize) -> TomlValueEnd {
    let rest = &line[start..];
    for triple in ["\"\"\"", "'''"] {
        if rest.starts_with(triple) {
            let end = match rest[triple.len()..].find(triple) {
                Some(close) => start + triple.len() + close + triple.len(),
                None => start + rest.trim_end().len(),
            };
            return TomlValueEnd {
                end,
                container_closed: true,
            };
        }
    }

    let opens_container = matches!(rest.chars().next(), Some('[' | '{'));
    let mut state = State::Normal;
    let mut array_depth = 0usize;
    let mut table_depth = 0usize;
    let mut end = line.len();
    let mut container_closed = false;

    for (relative, character) in rest.char_indices() {
        let at = start + relative;
        match state {
            State::InBasicString { escaped } => {
                if escaped {
                    state = State::InBasicString { escaped: false };
                } else if character == '\\' {
                    state = State::InBasicString { escaped: true };
                } else if character == '"' {
                    state = State::Normal;
                }
            }
            State::InLiteralString => {
                if character == '\'' {
                    state = State::Normal;
                }
            }
            State::Normal => match character {
                '"' => state = State::InBasicString { escaped: false },
                '\'' => state = State::InLiteralString,
                '#' => {
                    end = at;
                    break;
                }
                '[' => array_depth += 1,
                ']' => {
                    if array_depth == 0 {
                        end = at;
                        break;
                    }
                    array_depth -= 1;
                    if array_depth == 0 && table_depth == 0 && opens_container {
                        end = at + 1;
                        container_closed = true;
                        break;
                    }
                }
                '{' => table_depth += 1,
                '}' => {
                    if table_depth == 0 {
                        end = at;
                        break;
                    }
                    table_depth -= 1;
                    if table_depth == 0 && array_depth == 0 && opens_container {
                        end = at + 1;
                        container_closed = true;
                        break;
                    }
                }
                ',' if array_depth == 0 && table_depth == 0 => {
                    end = at;
                    break;
                }
                _ => {}
            },
        }
    }

    let trimmed = line[start..end].trim_end();
    TomlValueEnd {
        end: start + trimmed.len(),
        container_closed: container_closed || !opens_container,
    }
}
