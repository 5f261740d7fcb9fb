use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::path::{PathSegment, display_path, parse_path};
use crate::render::render_value;
use crate::scan;
use crate::value::{ConfigValue, ValueDiff};

#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub path: Vec<PathSegment>,
    pub op: ChangeOp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChangeOp {
    Set(ConfigValue),
    Remove,
}

impl Change {
    pub fn set(path: &str, value: ConfigValue) -> Self {
        Self {
            path: parse_path(path),
            op: ChangeOp::Set(value),
        }
    }

    pub fn remove(path: &str) -> Self {
        Self {
            path: parse_path(path),
            op: ChangeOp::Remove,
        }
    }

    pub fn from_diff(diff: &ValueDiff) -> Self {
        match &diff.value {
            Some(value) => Self::set(&diff.path, value.clone()),
            None => Self::remove(&diff.path),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Applied,
    SkippedNotFound,
    SkippedUnsupported,
    SkippedUnrepresentable,
}

impl ChangeStatus {
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeOutcome {
    pub path: String,
    pub status: ChangeStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatchResult {
    pub text: String,
    pub outcomes: Vec<ChangeOutcome>,
}

impl PatchResult {
    pub fn applied_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status.is_applied())
            .count()
    }
}

/// Applies value replacements against `original_text`, one change at a time,
/// returning the patched text plus a per-change outcome in the caller's
/// original order.
///
/// Changes are processed deepest-path-first: patching a parent can rewrite
/// the text a child scan depends on, and every scan runs against the full
/// text as mutated by the changes already applied. A change whose path
/// cannot be located is skipped, not failed; a key may legitimately be
/// absent from a template file.
pub fn apply_changes(original_text: &str, changes: &[Change], dialect: Dialect) -> PatchResult {
    let mut order: Vec<usize> = (0..changes.len()).collect();
    order.sort_by_key(|index| std::cmp::Reverse(changes[*index].path.len()));

    let mut text = original_text.to_string();
    let mut outcomes: Vec<Option<ChangeOutcome>> = vec![None; changes.len()];

    for index in order {
        let change = &changes[index];
        let status = apply_one(&mut text, change, dialect);
        outcomes[index] = Some(ChangeOutcome {
            path: display_path(&change.path),
            status,
        });
    }

    PatchResult {
        text,
        outcomes: outcomes.into_iter().flatten().collect(),
    }
}

fn apply_one(text: &mut String, change: &Change, dialect: Dialect) -> ChangeStatus {
    let value = match &change.op {
        // Span removal is not supported by the minimal-diff patcher; the
        // caller falls back to full re-serialization for these.
        ChangeOp::Remove => return ChangeStatus::SkippedUnsupported,
        ChangeOp::Set(value) => value,
    };

    let replacement = match render_value(value, dialect) {
        Ok(rendered) => rendered,
        Err(_) => return ChangeStatus::SkippedUnrepresentable,
    };

    match scan::find_value_span(text, &change.path, dialect) {
        Some(span) => {
            *text = scan::splice(text, span, &replacement);
            ChangeStatus::Applied
        }
        None => ChangeStatus::SkippedNotFound,
    }
}
