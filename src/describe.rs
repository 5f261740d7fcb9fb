use regex::Regex;

use crate::dialect::Dialect;
use crate::path::PathSegment;

/// Collects the human-readable documentation attached to a configuration
/// key: contiguous comment lines directly above its definition plus any
/// same-line trailing comment. Purely read-only; absence of a comment is
/// "no description", not an error.
///
/// Array-index segments in `parent_path` are ignored for matching, the same
/// name-based rule the scanners use for TOML sections.
pub fn extract_description(
    text: &str,
    key: &str,
    parent_path: &[PathSegment],
    dialect: Dialect,
) -> Option<String> {
    let lines: Vec<&str> = text.split('\n').collect();
    let parent_keys: Vec<&str> = parent_path
        .iter()
        .filter(|segment| !segment.is_array_index)
        .map(|segment| segment.key.as_str())
        .collect();

    let matched_line = match dialect {
        Dialect::Json | Dialect::Json5 => find_json_key_line(&lines, key, &parent_keys)?,
        Dialect::Toml => find_toml_key_line(&lines, key, &parent_keys)?,
    };

    let mut collected = leading_comment_lines(&lines, matched_line, dialect);
    if let Some(trailing) = trailing_comment(lines[matched_line], dialect) {
        collected.push(trailing);
    }

    if collected.is_empty() {
        None
    } else {
        Some(collected.join("\n"))
    }
}

/// Indentation-based path tracking: each key line pops stack entries whose
/// indentation is at least as deep as its own, then the reconstructed key
/// chain is compared against the target.
fn find_json_key_line(lines: &[&str], key: &str, parent_keys: &[&str]) -> Option<usize> {
    let key_line =
        Regex::new(r#"^(\s*)(?:"((?:[^"\\]|\\.)*)"|'([^']*)'|([A-Za-z0-9_$-]+))\s*:\s*"#).ok()?;

    let mut stack: Vec<(usize, String)> = Vec::new();
    for (line_index, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with("//") || trimmed.starts_with("/*") {
            continue;
        }
        let Some(captures) = key_line.captures(line) else {
            continue;
        };

        let indent = captures.get(1).map_or(0, |group| group.as_str().len());
        let line_key = captures
            .get(2)
            .or_else(|| captures.get(3))
            .or_else(|| captures.get(4))
            .map_or("", |group| group.as_str());

        while matches!(stack.last(), Some((top_indent, _)) if *top_indent >= indent) {
            stack.pop();
        }

        if line_key == key && stack.len() == parent_keys.len() {
            let stack_keys: Vec<&str> = stack.iter().map(|(_, entry)| entry.as_str()).collect();
            if stack_keys == parent_keys {
                return Some(line_index);
            }
        }

        let value_start = captures.get(0).map_or(line.len(), |whole| whole.end());
        if opens_unclosed_container(line, value_start) {
            stack.push((indent, line_key.to_string()));
        }
    }
    None
}

fn opens_unclosed_container(line: &str, value_start: usize) -> bool {
    if !matches!(line[value_start..].chars().next(), Some('{' | '[')) {
        return false;
    }
    !crate::scan::json::find_value_end(line, value_start).container_closed
}

fn find_toml_key_line(lines: &[&str], key: &str, parent_keys: &[&str]) -> Option<usize> {
    let header_pattern = Regex::new(r"^\s*\[\[?\s*([^\]]+?)\s*\]\]?\s*(?:#.*)?$").ok()?;
    let key_pattern =
        Regex::new(r#"^\s*(?:"((?:[^"\\]|\\.)*)"|'([^']*)'|([A-Za-z0-9_-]+))\s*=\s*"#).ok()?;

    let mut section: Vec<String> = Vec::new();
    for (line_index, line) in lines.iter().enumerate() {
        if let Some(header) = header_pattern.captures(line) {
            section = crate::scan::toml::split_section_name(
                header.get(1).map_or("", |name| name.as_str()),
            );
            continue;
        }
        let Some(captures) = key_pattern.captures(line) else {
            continue;
        };
        let line_key = captures
            .get(1)
            .or_else(|| captures.get(2))
            .or_else(|| captures.get(3))
            .map_or("", |group| group.as_str());
        if line_key == key && section == parent_keys {
            return Some(line_index);
        }
    }
    None
}

/// Walks backward from the definition line collecting contiguous comment
/// lines. Any blank or non-comment line terminates collection: a blank line
/// between a comment block and the key means the block documents whatever
/// precedes it, not this key. `===`/`---` ruler lines and content-free
/// comment lines (a lone `*/` close marker, a bare `#`) are dropped without
/// terminating.
fn leading_comment_lines(lines: &[&str], matched_line: usize, dialect: Dialect) -> Vec<String> {
    let mut collected = Vec::new();
    for line in lines[..matched_line].iter().rev() {
        match comment_text(line, dialect) {
            Some(comment) => {
                if !comment.is_empty() && !is_separator_decoration(&comment) {
                    collected.push(comment);
                }
            }
            None => break,
        }
    }
    collected.reverse();
    collected
}

/// Returns the comment content when the whole (trimmed) line is a comment.
fn comment_text(line: &str, dialect: Dialect) -> Option<String> {
    let trimmed = line.trim();
    match dialect {
        Dialect::Toml => trimmed
            .strip_prefix('#')
            .map(|content| content.trim().to_string()),
        Dialect::Json | Dialect::Json5 => {
            if let Some(content) = trimmed.strip_prefix("//") {
                return Some(content.trim().to_string());
            }
            let without_close = trimmed.strip_suffix("*/").unwrap_or(trimmed);
            if let Some(content) = without_close.strip_prefix("/*") {
                return Some(content.trim().to_string());
            }
            if let Some(content) = without_close.strip_prefix('*') {
                return Some(content.trim().to_string());
            }
            if trimmed == "*/" {
                return Some(String::new());
            }
            None
        }
    }
}

fn is_separator_decoration(comment: &str) -> bool {
    comment.starts_with("===") || comment.starts_with("---")
}

/// Extracts a same-line trailing comment after the key's value, skipping
/// comment markers that appear inside string literals.
fn trailing_comment(line: &str, dialect: Dialect) -> Option<String> {
    let mut in_string: Option<char> = None;
    let mut escaped = false;
    let mut characters = line.char_indices().peekable();

    while let Some((at, character)) = characters.next() {
        if let Some(quote) = in_string {
            if escaped {
                escaped = false;
            } else if character == '\\' && quote == '"' {
                escaped = true;
            } else if character == quote {
                in_string = None;
            }
            continue;
        }
        match character {
            '"' | '\'' => in_string = Some(character),
            '#' if dialect == Dialect::Toml => {
                let content = line[at + 1..].trim();
                return (!content.is_empty() && !is_separator_decoration(content))
                    .then(|| content.to_string());
            }
            '/' if dialect != Dialect::Toml => match characters.peek() {
                Some((_, '/')) => {
                    let content = line[at + 2..].trim();
                    return (!content.is_empty() && !is_separator_decoration(content))
                        .then(|| content.to_string());
                }
                Some((_, '*')) => {
                    let rest = &line[at + 2..];
                    let content = rest.split("*/").next().unwrap_or(rest).trim();
                    return (!content.is_empty() && !is_separator_decoration(content))
                        .then(|| content.to_string());
                }
                _ => {}
            },
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::extract_description;
    use crate::dialect::Dialect;
    use crate::path::{PathSegment, parse_path};

    #[test]
    fn collects_contiguous_leading_comment_lines_in_order() {
        let text = "# First line\n# Second line\nkey = 1\n";
        let description = extract_description(text, "key", &[], Dialect::Toml)
            .expect("comment block should be found");
        assert_eq!(description, "First line\nSecond line");
    }

    #[test]
    fn a_blank_line_detaches_the_comment_block_from_the_key() {
        let text = "# First line\n# Second line\n\nkey = 1\n";
        assert_eq!(extract_description(text, "key", &[], Dialect::Toml), None);
    }

    #[test]
    fn trailing_inline_comment_is_collected() {
        let text = "key = 5 # measured in chunks\n";
        assert_eq!(
            extract_description(text, "key", &[], Dialect::Toml)
                .expect("trailing comment should be found"),
            "measured in chunks"
        );
    }

    #[test]
    fn leading_block_and_trailing_comment_concatenate_newline_joined() {
        let text = "# Above\nkey = 5 # beside\n";
        assert_eq!(
            extract_description(text, "key", &[], Dialect::Toml)
                .expect("both comments should be found"),
            "Above\nbeside"
        );
    }

    #[test]
    fn separator_ruler_lines_are_filtered_out() {
        let text = "#===========#\n# Real docs\n#-----------#\nkey = 1\n";
        assert_eq!(
            extract_description(text, "key", &[], Dialect::Toml)
                .expect("real docs should survive the rulers"),
            "Real docs"
        );
    }

    #[test]
    fn toml_keys_are_matched_within_their_section_only() {
        let text = "# root speed\nspeed = 1\n\n[horse]\n# horse speed\nspeed = 9\n";
        assert_eq!(
            extract_description(text, "speed", &[], Dialect::Toml)
                .expect("root key should match"),
            "root speed"
        );
        assert_eq!(
            extract_description(text, "speed", &parse_path("horse"), Dialect::Toml)
                .expect("sectioned key should match"),
            "horse speed"
        );
    }

    #[test]
    fn json5_line_comments_and_nesting_are_respected() {
        let text = "{\n  outer: {\n    // inner docs\n    value: 1, // beside\n  },\n  value: 2,\n}";
        assert_eq!(
            extract_description(text, "value", &parse_path("outer"), Dialect::Json5)
                .expect("nested key should match"),
            "inner docs\nbeside"
        );
        assert_eq!(
            extract_description(text, "value", &[], Dialect::Json5),
            None
        );
    }

    #[test]
    fn json5_block_comment_line_is_collected() {
        let text = "{\n  /* chunk radius */\n  radius: 8,\n}";
        assert_eq!(
            extract_description(text, "radius", &[], Dialect::Json5)
                .expect("block comment should be found"),
            "chunk radius"
        );
    }

    #[test]
    fn block_comment_close_marker_never_leaks_into_the_description() {
        let text = "{\n  /* Density of effects:\n   * \"all\" or \"minimal\". */\n  particles: 'all',\n}";
        let description = extract_description(text, "particles", &[], Dialect::Json5)
            .expect("block comment should be found");
        assert_eq!(description, "Density of effects:\n\"all\" or \"minimal\".");
        assert!(!description.contains("*/"));
    }

    #[test]
    fn close_marker_on_its_own_line_does_not_break_the_block() {
        let text = "{\n  /* measured in chunks\n   */\n  radius: 8,\n}";
        assert_eq!(
            extract_description(text, "radius", &[], Dialect::Json5)
                .expect("block comment should be found"),
            "measured in chunks"
        );
    }

    #[test]
    fn hash_inside_a_string_value_is_not_a_comment() {
        let text = "color = \"#ff0000\"\n";
        assert_eq!(extract_description(text, "color", &[], Dialect::Toml), None);
    }

    #[test]
    fn array_index_segments_in_the_parent_path_are_ignored() {
        let text = "[[servers]]\n# primary port\nport = 100\n";
        let parent = vec![PathSegment::key("servers"), PathSegment::index(0)];
        assert_eq!(
            extract_description(text, "port", &parent, Dialect::Toml)
                .expect("array-of-tables key should match"),
            "primary port"
        );
    }

    #[test]
    fn missing_key_yields_no_description() {
        assert_eq!(
            extract_description("key = 1\n", "other", &[], Dialect::Toml),
            None
        );
    }
}
