//! Path normalization shared by the index and tree walkers.
//!
//! Paths are `/`-separated and relative to the repository root. Lookups
//! compare paths by their ASCII-lowercased key.

use crate::error::{IndexError, IndexResult};

/// Strip surrounding slashes and reject empty, `.` or `..` segments.
pub fn normalize_path(path: &str) -> IndexResult<String> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Err(IndexError::InvalidPath(format!("{path:?} is empty")));
    }
    for segment in trimmed.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(IndexError::InvalidPath(format!(
                "{path:?} has an invalid segment {segment:?}"
            )));
        }
    }
    Ok(trimmed.to_string())
}

/// Case-insensitive lookup key for a normalized path.
pub fn path_key(path: &str) -> String {
    path.to_ascii_lowercase()
}

/// Join a directory and a child name; an empty directory means the root.
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn surrounding_slashes_are_dropped() {
        assert_eq!(normalize_path("/a/b.yaml/").unwrap(), "a/b.yaml");
        assert_eq!(normalize_path("a").unwrap(), "a");
    }

    #[test]
    fn bad_segments_are_rejected() {
        for bad in ["", "/", "a//b", "a/./b", "../a", "a/.."] {
            assert!(
                matches!(normalize_path(bad), Err(IndexError::InvalidPath(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn keys_fold_case_and_join_handles_root() {
        assert_eq!(path_key("Dom/NS/Klass.class"), "dom/ns/klass.class");
        assert_eq!(join("", "a"), "a");
        assert_eq!(join("a/b", "c"), "a/b/c");
    }

    proptest! {
        #[test]
        fn normalizing_is_idempotent(
            segments in prop::collection::vec("[A-Za-z0-9_.$-]{1,8}", 1..5),
        ) {
            prop_assume!(segments.iter().all(|s| s != "." && s != ".."));
            let path = format!("/{}/", segments.join("/"));
            let once = normalize_path(&path).unwrap();
            prop_assert_eq!(normalize_path(&once).unwrap(), once.clone());
            prop_assert_eq!(path_key(&once), segments.join("/").to_ascii_lowercase());
        }
    }
}
