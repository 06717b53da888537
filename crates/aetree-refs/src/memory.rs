//! In-memory reference store for tests and ephemeral repositories.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::{RefError, Result};
use crate::names::validate_ref_name;
use crate::traits::RefStore;
use crate::types::Ref;

/// An in-memory implementation of [`RefStore`].
///
/// Refs live in a `BTreeMap` behind a `RwLock`; creation checks and inserts
/// under the same write guard, which makes `create_ref` atomic.
#[derive(Debug, Default)]
pub struct InMemoryRefStore {
    refs: RwLock<BTreeMap<String, Ref>>,
}

impl InMemoryRefStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> RefError {
    RefError::Serialization(format!("lock poisoned: {e}"))
}

impl RefStore for InMemoryRefStore {
    fn read_ref(&self, name: &str) -> Result<Option<Ref>> {
        let refs = self.refs.read().map_err(poisoned)?;
        Ok(refs.get(name).cloned())
    }

    fn write_ref(&self, name: &str, reference: &Ref) -> Result<()> {
        validate_ref_name(name)?;
        let mut refs = self.refs.write().map_err(poisoned)?;
        refs.insert(name.to_string(), reference.clone());
        Ok(())
    }

    fn create_ref(&self, name: &str, reference: &Ref) -> Result<()> {
        validate_ref_name(name)?;
        let mut refs = self.refs.write().map_err(poisoned)?;
        if refs.contains_key(name) {
            return Err(RefError::AlreadyExists {
                name: name.to_string(),
            });
        }
        refs.insert(name.to_string(), reference.clone());
        Ok(())
    }

    fn delete_ref(&self, name: &str) -> Result<bool> {
        let mut refs = self.refs.write().map_err(poisoned)?;
        Ok(refs.remove(name).is_some())
    }

    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, Ref)>> {
        let refs = self.refs.read().map_err(poisoned)?;
        Ok(refs
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, r)| (name.clone(), r.clone()))
            .collect())
    }
}
