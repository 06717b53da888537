//! Reference name validation.
//!
//! Names are slash-separated paths under `refs/`. Components must be
//! non-empty, must not start with `.`, and must not end with `.lock` or
//! contain characters that are awkward on a filesystem.

use crate::error::{RefError, Result};

const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '\n', '\r', '~', '^', ':', '?', '*', '[', '\\'];

pub fn validate_ref_name(name: &str) -> Result<()> {
    let invalid = |reason: String| RefError::InvalidName {
        name: name.to_string(),
        reason,
    };

    let rest = name
        .strip_prefix("refs/")
        .ok_or_else(|| invalid("must start with 'refs/'".into()))?;

    if let Some(ch) = FORBIDDEN_CHARS.iter().find(|c| name.contains(**c)) {
        return Err(invalid(format!("contains forbidden character: {ch:?}")));
    }
    if name.contains("..") {
        return Err(invalid("must not contain '..'".into()));
    }
    if name.ends_with(".lock") {
        return Err(invalid("must not end with '.lock'".into()));
    }
    for component in rest.split('/') {
        if component.is_empty() {
            return Err(invalid("path components must not be empty".into()));
        }
        if component.starts_with('.') {
            return Err(invalid(format!(
                "component must not start with '.': {component:?}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HEAD_REF, LOCK_REF};

    #[test]
    fn builtin_names_are_valid() {
        assert!(validate_ref_name(HEAD_REF).is_ok());
        assert!(validate_ref_name(LOCK_REF).is_ok());
        assert!(validate_ref_name("refs/heads/feature/x").is_ok());
    }

    #[test]
    fn reject_outside_refs() {
        assert!(validate_ref_name("HEAD").is_err());
        assert!(validate_ref_name("").is_err());
    }

    #[test]
    fn reject_bad_components() {
        assert!(validate_ref_name("refs/").is_err());
        assert!(validate_ref_name("refs//x").is_err());
        assert!(validate_ref_name("refs/heads/.hidden").is_err());
        assert!(validate_ref_name("refs/heads/../x").is_err());
        assert!(validate_ref_name("refs/heads/main.lock").is_err());
        assert!(validate_ref_name("refs/heads/a b").is_err());
        assert!(validate_ref_name("refs/heads/a*").is_err());
    }
}
