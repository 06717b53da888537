//! Blob-level diff: line-by-line comparison of file contents.
//!
//! Uses the `similar` crate (Myers diff) and reports changed lines as
//! `+ text` / `- text` markers.

use similar::{ChangeTag, TextDiff};

/// A single changed line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiffLine {
    Added(String),
    Removed(String),
}

impl DiffLine {
    /// `+ line` or `- line`.
    pub fn marker(&self) -> String {
        match self {
            Self::Added(text) => format!("+ {text}"),
            Self::Removed(text) => format!("- {text}"),
        }
    }
}

/// Changed lines between two blobs, in document order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlobDiff {
    pub lines: Vec<DiffLine>,
    /// Set when either side is not UTF-8; `lines` is then empty.
    pub binary: bool,
}

impl BlobDiff {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && !self.binary
    }

    pub fn markers(&self) -> Vec<String> {
        self.lines.iter().map(DiffLine::marker).collect()
    }
}

/// Compute the changed lines between `old` and `new`.
pub fn diff_blobs(old: &[u8], new: &[u8]) -> BlobDiff {
    let (Ok(old), Ok(new)) = (std::str::from_utf8(old), std::str::from_utf8(new)) else {
        return BlobDiff {
            lines: Vec::new(),
            binary: old != new,
        };
    };
    if old == new {
        return BlobDiff::default();
    }

    let text_diff = TextDiff::from_lines(old, new);
    let lines = text_diff
        .iter_all_changes()
        .filter_map(|change| {
            let text = change.value().trim_end_matches('\n').to_string();
            match change.tag() {
                ChangeTag::Equal => None,
                ChangeTag::Delete => Some(DiffLine::Removed(text)),
                ChangeTag::Insert => Some(DiffLine::Added(text)),
            }
        })
        .collect();
    BlobDiff {
        lines,
        binary: false,
    }
}
