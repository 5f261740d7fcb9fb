use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathSegment {
    pub key: String,
    pub is_array_index: bool,
}

impl PathSegment {
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            is_array_index: false,
        }
    }

    pub fn index(index: usize) -> Self {
        Self {
            key: index.to_string(),
            is_array_index: true,
        }
    }

    pub fn array_index(&self) -> Option<usize> {
        if self.is_array_index {
            self.key.parse::<usize>().ok()
        } else {
            None
        }
    }
}

/// Splits a dotted/bracketed path string into ordered segments.
///
/// The scan is greedy and best-effort: malformed input (unbalanced brackets,
/// empty segments) never raises, it just produces whatever segments the
/// characters spell out. Callers treat an empty result as not-found. Stale
/// UI paths referencing removed keys must not break a save batch, so this
/// leniency is deliberate.
pub fn parse_path(path_string: &str) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    let mut buffer = String::new();
    let mut in_brackets = false;

    for character in path_string.chars() {
        match character {
            '.' if !in_brackets => {
                if !buffer.is_empty() {
                    segments.push(PathSegment::key(std::mem::take(&mut buffer)));
                }
            }
            '[' if !in_brackets => {
                if !buffer.is_empty() {
                    segments.push(PathSegment::key(std::mem::take(&mut buffer)));
                }
                in_brackets = true;
            }
            ']' if in_brackets => {
                segments.push(PathSegment {
                    key: std::mem::take(&mut buffer),
                    is_array_index: true,
                });
                in_brackets = false;
            }
            other => buffer.push(other),
        }
    }

    if !buffer.is_empty() {
        segments.push(PathSegment::key(buffer));
    }

    segments
}

pub fn display_path(segments: &[PathSegment]) -> String {
    let mut output = String::new();
    for segment in segments {
        if segment.is_array_index {
            output.push('[');
            output.push_str(&segment.key);
            output.push(']');
        } else {
            if !output.is_empty() {
                output.push('.');
            }
            output.push_str(&segment.key);
        }
    }
    output
}
