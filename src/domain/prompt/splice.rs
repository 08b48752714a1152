//! Splicing the rules block into a prompt

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::domain::DomainError;

/// Default anchor for the instruction-relative insertion points
pub const DEFAULT_INSTRUCTIONS_MARKER: &str = "## Instructions";

/// Appended to truncated text
pub const ELLIPSIS: &str = "…";

const SECTION_GAP: &str = "\n\n";

/// Where the rules block goes in the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertionPoint {
    Beginning,
    #[default]
    End,
    #[serde(alias = "beforeInstructions")]
    BeforeInstructions,
    #[serde(alias = "afterInstructions")]
    AfterInstructions,
}

impl InsertionPoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginning => "beginning",
            Self::End => "end",
            Self::BeforeInstructions => "before_instructions",
            Self::AfterInstructions => "after_instructions",
        }
    }
}

impl fmt::Display for InsertionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InsertionPoint {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "beginning" => Ok(Self::Beginning),
            "end" => Ok(Self::End),
            "before_instructions" | "beforeInstructions" => Ok(Self::BeforeInstructions),
            "after_instructions" | "afterInstructions" => Ok(Self::AfterInstructions),
            other => Err(DomainError::configuration(format!(
                "Unknown insertion point '{}'",
                other
            ))),
        }
    }
}

/// Insert `block` into `base` at the requested point
///
/// Instruction-relative points anchor on the first occurrence of `marker`;
/// without it they degrade to [`InsertionPoint::End`]. A blank block leaves
/// the prompt unchanged.
pub fn splice(base: &str, block: &str, point: InsertionPoint, marker: &str) -> String {
    if block.trim().is_empty() {
        return base.to_string();
    }

    let anchor = match point {
        InsertionPoint::BeforeInstructions | InsertionPoint::AfterInstructions
            if !marker.is_empty() =>
        {
            base.find(marker)
        }
        _ => None,
    };

    match (point, anchor) {
        (InsertionPoint::Beginning, _) => format!("{}{}{}", block, SECTION_GAP, base),
        (InsertionPoint::BeforeInstructions, Some(at)) => {
            let (head, tail) = base.split_at(at);
            format!("{}{}{}{}", head, block, SECTION_GAP, tail)
        }
        (InsertionPoint::AfterInstructions, Some(at)) => {
            let line_end = base[at..].find('\n').map_or(base.len(), |n| at + n);
            let (head, tail) = base.split_at(line_end);
            let tail = tail.trim_start_matches('\n');

            if tail.is_empty() {
                format!("{}{}{}", head, SECTION_GAP, block)
            } else {
                format!("{}{}{}{}{}", head, SECTION_GAP, block, SECTION_GAP, tail)
            }
        }
        _ => append(base, block),
    }
}

fn append(base: &str, block: &str) -> String {
    let base = base.trim_end();
    if base.is_empty() {
        block.to_string()
    } else {
        format!("{}{}{}", base, SECTION_GAP, block)
    }
}

/// Truncate text to at most `max_chars` chars on grapheme boundaries
///
/// Truncated output ends with [`ELLIPSIS`], which counts against the
/// limit. Text that already fits is returned unchanged.
pub fn truncate_graphemes(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let ellipsis_len = ELLIPSIS.chars().count();
    if max_chars < ellipsis_len {
        return String::new();
    }

    let budget = max_chars - ellipsis_len;
    let mut used = 0;
    let mut truncated = String::new();

    for grapheme in text.graphemes(true) {
        let len = grapheme.chars().count();
        if used + len > budget {
            break;
        }
        truncated.push_str(grapheme);
        used += len;
    }

    truncated.push_str(ELLIPSIS);
    truncated
}
