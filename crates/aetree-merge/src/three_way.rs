//! Three-way merge of flattened trees.
//!
//! For every path, with `base` the common ancestor, `ours` the commit being
//! landed and `theirs` the current head:
//!
//! | condition        | result          |
//! |------------------|-----------------|
//! | ours == theirs   | ours            |
//! | base == ours     | theirs          |
//! | base == theirs   | ours            |
//! | otherwise        | content conflict |
//!
//! Absence counts as a value, so a delete on one side and an untouched file
//! on the other merges to a delete. Content is never combined line by line.

use std::collections::BTreeSet;

use aetree_index::{FlatEntry, FlatTree};
use tracing::debug;

/// Result of a three-way merge.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// The merged file set; meaningful only when `conflicts` is empty.
    pub merged: FlatTree,
    /// Lowercased keys of every conflicting path, sorted.
    pub conflicts: Vec<String>,
}

impl MergeOutcome {
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

fn same(a: Option<&FlatEntry>, b: Option<&FlatEntry>) -> bool {
    a.map(|e| e.object_id) == b.map(|e| e.object_id)
}

pub fn merge_flat(base: &FlatTree, ours: &FlatTree, theirs: &FlatTree) -> MergeOutcome {
    let keys: BTreeSet<&String> = base.keys().chain(ours.keys()).chain(theirs.keys()).collect();

    let mut outcome = MergeOutcome::default();
    for key in keys {
        let (b, o, t) = (base.get(key), ours.get(key), theirs.get(key));
        let pick = if same(o, t) || same(b, t) {
            o
        } else if same(b, o) {
            t
        } else {
            outcome.conflicts.push(key.clone());
            continue;
        };
        if let Some(entry) = pick {
            outcome.merged.insert(key.clone(), entry.clone());
        }
    }

    // One side may add a file where the other added a directory.
    let shadowed: Vec<String> = outcome
        .merged
        .keys()
        .filter(|key| {
            let prefix = format!("{key}/");
            outcome
                .merged
                .range(prefix.clone()..)
                .next()
                .is_some_and(|(k, _)| k.starts_with(&prefix))
        })
        .cloned()
        .collect();
    for key in shadowed {
        outcome.merged.remove(&key);
        outcome.conflicts.push(key);
    }
    outcome.conflicts.sort();
    debug!(
        merged = outcome.merged.len(),
        conflicts = outcome.conflicts.len(),
        "three-way merge"
    );
    outcome
}
