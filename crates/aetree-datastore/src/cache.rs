use std::collections::HashMap;

use aetree_model::ObjectType;
use aetree_types::identifier;
use tracing::trace;

use crate::datastore::{Child, Datastore};
use crate::error::DatastoreResult;

/// Memoized [`Datastore::load_children`] results, keyed by entity.
///
/// Entries are never refreshed on their own: callers that write through the
/// datastore invalidate what they touched, or clear the whole cache.
#[derive(Debug, Default)]
pub struct ChildCache {
    entries: HashMap<(ObjectType, String), Vec<Child>>,
}

fn cache_key(kind: ObjectType, fqname: &str) -> (ObjectType, String) {
    let fqname = fqname.trim_start_matches('/').to_ascii_lowercase();
    (kind, identifier::encode(&fqname))
}

impl ChildCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Children of `fqname`, loading them on first use.
    pub fn children(
        &mut self,
        datastore: &Datastore,
        kind: ObjectType,
        fqname: &str,
    ) -> DatastoreResult<&[Child]> {
        let key = cache_key(kind, fqname);
        if !self.entries.contains_key(&key) {
            let loaded = datastore.load_children(kind, fqname)?;
            trace!(kind = %kind, fqname, count = loaded.len(), "cached children");
            self.entries.insert(key.clone(), loaded);
        }
        Ok(self.entries.get(&key).map_or(&[][..], Vec::as_slice))
    }

    /// Forget the children of one entity.
    pub fn invalidate(&mut self, kind: ObjectType, fqname: &str) -> bool {
        self.entries.remove(&cache_key(kind, fqname)).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use aetree_model::{AeClass, Domain, Namespace};
    use aetree_repo::Repository;

    use super::*;

    #[test]
    fn children_are_kept_until_invalidated() {
        let ds = Datastore::new(Repository::in_memory());
        ds.create(&mut Domain::new("Acme")).unwrap();
        ds.create(&mut Namespace::new("Acme", "Infra")).unwrap();
        ds.create(&mut AeClass::new("Acme/Infra", "Provision")).unwrap();

        let mut cache = ChildCache::new();
        let kind = ObjectType::Namespace;
        assert_eq!(cache.children(&ds, kind, "Acme/Infra").unwrap().len(), 1);

        ds.create(&mut AeClass::new("Acme/Infra", "Retire")).unwrap();
        assert_eq!(cache.children(&ds, kind, "/acme/INFRA").unwrap().len(), 1);
        assert_eq!(cache.len(), 1);

        assert!(cache.invalidate(kind, "ACME/infra"));
        assert!(!cache.invalidate(kind, "ACME/infra"));
        assert_eq!(cache.children(&ds, kind, "Acme/Infra").unwrap().len(), 2);

        cache.children(&ds, ObjectType::Domain, "Acme").unwrap();
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }
}
