use ignore::overrides::{Override, OverrideBuilder};

use crate::error::{DatastoreError, DatastoreResult};

/// Case-insensitive glob filters over entity names (`*`, `?`, `[a-z]`).
///
/// A name passes when it matches at least one pattern; an empty pattern
/// list matches nothing.
#[derive(Clone, Debug)]
pub struct NameFilter {
    globs: Option<Override>,
}

impl NameFilter {
    pub fn new<I, S>(patterns: I) -> DatastoreResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = OverrideBuilder::new("");
        builder
            .case_insensitive(true)
            .map_err(|e| DatastoreError::InvalidFilter(e.to_string()))?;
        for pattern in patterns {
            let pattern = pattern.as_ref();
            if pattern.starts_with('!') || pattern.contains('/') {
                return Err(DatastoreError::InvalidFilter(format!(
                    "{pattern:?} is not a name pattern"
                )));
            }
            builder
                .add(pattern)
                .map_err(|e| DatastoreError::InvalidFilter(e.to_string()))?;
        }
        let globs = builder
            .build()
            .map_err(|e| DatastoreError::InvalidFilter(e.to_string()))?;
        Ok(Self { globs: Some(globs) })
    }

    /// Matches every name.
    pub fn any() -> Self {
        Self { globs: None }
    }

    pub fn matches(&self, name: &str) -> bool {
        match &self.globs {
            None => true,
            Some(globs) => globs.matched(name, false).is_whitelist(),
        }
    }
}

impl Default for NameFilter {
    fn default() -> Self {
        Self::any()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_matches_everything() {
        let filter = NameFilter::new(["*"]).unwrap();
        assert!(filter.matches("Provision"));
        assert!(filter.matches("$CLASS$setup"));
        assert!(NameFilter::any().matches("anything"));
    }

    #[test]
    fn globs_ignore_case() {
        let filter = NameFilter::new(["prov*", "vm_?"]).unwrap();
        assert!(filter.matches("Provision"));
        assert!(filter.matches("PROVISIONING"));
        assert!(filter.matches("VM_1"));
        assert!(!filter.matches("vm_12"));
        assert!(!filter.matches("retire"));
    }

    #[test]
    fn character_classes() {
        let filter = NameFilter::new(["[a-c]*"]).unwrap();
        assert!(filter.matches("Alpha"));
        assert!(filter.matches("charlie"));
        assert!(!filter.matches("delta"));
    }

    #[test]
    fn empty_list_matches_nothing() {
        let filter = NameFilter::new(Vec::<String>::new()).unwrap();
        assert!(!filter.matches("x"));
    }

    #[test]
    fn path_patterns_are_rejected() {
        assert!(matches!(
            NameFilter::new(["a/b"]),
            Err(DatastoreError::InvalidFilter(_))
        ));
        assert!(NameFilter::new(["!x"]).is_err());
        assert!(NameFilter::new(["[z-"]).is_err());
    }
}
