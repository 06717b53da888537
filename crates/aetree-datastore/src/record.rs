use aetree_model::{AeClass, Domain, Entity, Instance, Language, Method, Namespace};

use crate::datastore::Datastore;
use crate::error::DatastoreResult;

/// An entity the datastore can persist.
///
/// Besides its document, a record may own sibling files in the same
/// directory (an inline method's script).
pub trait Record: Entity {
    /// Every sibling file name the record may own, written or not.
    fn sidecar_names(&self) -> Vec<String> {
        Vec::new()
    }

    /// The sibling file to write on save, as `(file name, content)`.
    fn sidecar(&self) -> Option<(String, String)> {
        None
    }

    /// The sibling file whose content is loaded into the record.
    fn sidecar_to_read(&self) -> Option<String> {
        None
    }

    fn attach_sidecar(&mut self, _content: String) {}

    /// Fill in anything that is assigned on save.
    fn prepare(&mut self, _datastore: &Datastore) -> DatastoreResult<()> {
        Ok(())
    }
}

impl Record for Domain {
    fn prepare(&mut self, datastore: &Datastore) -> DatastoreResult<()> {
        if self.priority.is_none() {
            self.priority = Some(datastore.domains()?.highest_priority() + 1);
        }
        Ok(())
    }
}

impl Record for Namespace {}

impl Record for AeClass {}

impl Record for Instance {}

impl Record for Method {
    fn sidecar_names(&self) -> Vec<String> {
        [Language::Ruby, Language::Perl]
            .iter()
            .map(|lang| format!("{}.{}", self.name, lang.script_extension()))
            .collect()
    }

    fn sidecar(&self) -> Option<(String, String)> {
        Some((self.script_file_name()?, self.script_contents()?))
    }

    fn sidecar_to_read(&self) -> Option<String> {
        self.script_file_name()
    }

    fn attach_sidecar(&mut self, content: String) {
        self.data = Some(content);
    }
}
