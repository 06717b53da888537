use aetree_index::{join, Index};
use aetree_model::{
    join_fqname, validate_name, AeClass, Domain, Entity, Instance, Method, Namespace, ObjectType,
    CLASS_SCOPE_PREFIX,
};
use aetree_repo::{Entry, Repository};
use aetree_types::{identifier, ObjectId};
use tracing::{debug, info};

use crate::error::{DatastoreError, DatastoreResult};
use crate::filter::NameFilter;
use crate::paths::{
    fqname_to_path, parent_fqname, path_to_fqname, PathResolver, CLASS_MARKER, CLASS_SCOPE_DIR,
    DOMAIN_MARKER, METHODS_DIR, NAMESPACE_MARKER,
};
use crate::priority::DomainPriorityIndex;
use crate::record::Record;

/// Directory part of a path, empty at the root.
fn dir_of(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// Domain-or-namespace kind of a container name.
fn container_kind(fqname: &str) -> ObjectType {
    if fqname.trim_matches('/').contains('/') {
        ObjectType::Namespace
    } else {
        ObjectType::Domain
    }
}

/// A child loaded by [`Datastore::load_children`].
#[derive(Clone, Debug, PartialEq)]
pub enum Child {
    Namespace(Namespace),
    Class(AeClass),
    Instance(Instance),
    Method(Method),
}

/// Entity storage on top of a [`Repository`].
///
/// Every read runs against one snapshot of the head, every write is a single
/// commit. Conflicting concurrent writes surface as
/// [`DatastoreError::Repo`] carrying the conflict report.
#[derive(Debug)]
pub struct Datastore {
    repo: Repository,
}

impl Datastore {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    pub fn into_repo(self) -> Repository {
        self.repo
    }

    /// A resolver pinned to the current head.
    pub fn resolver(&self) -> DatastoreResult<PathResolver<'_>> {
        PathResolver::pinned(&self.repo)
    }

    fn stage(&self, resolver: &PathResolver<'_>) -> DatastoreResult<Index> {
        Ok(match resolver.as_of() {
            Some(commit) => self.repo.stage_at(commit)?,
            None => self.repo.stage()?,
        })
    }

    // ---- Reads ----

    fn load<R: Record>(&self, resolver: &PathResolver<'_>, entry: &Entry) -> DatastoreResult<R> {
        let stored = path_to_fqname(&entry.path, R::OBJECT_TYPE)?;
        let document = resolver
            .read(&entry.path)?
            .ok_or_else(|| DatastoreError::NotFound(stored.clone()))?;
        let mut record = R::from_document(parent_fqname(&stored), &document)?;
        if let Some(name) = record.sidecar_to_read() {
            if let Some(content) = resolver.read(&join(dir_of(&entry.path), &name))? {
                record.attach_sidecar(String::from_utf8_lossy(&content).into_owned());
            }
        }
        Ok(record)
    }

    fn find_in<R: Record>(
        &self,
        resolver: &PathResolver<'_>,
        fqname: &str,
    ) -> DatastoreResult<Option<R>> {
        match resolver.document(fqname, R::OBJECT_TYPE)? {
            Some(entry) => self.load(resolver, &entry).map(Some),
            None => Ok(None),
        }
    }

    /// Look an entity up by fully-qualified name, ignoring case. The record
    /// carries the casing stored in the tree.
    pub fn find<R: Record>(&self, fqname: &str) -> DatastoreResult<Option<R>> {
        self.find_in(&self.resolver()?, fqname)
    }

    pub fn find_by_id<R: Record>(&self, id: &str) -> DatastoreResult<Option<R>> {
        self.find(&identifier::decode(id).map_err(|_| DatastoreError::NotFound(id.into()))?)
    }

    pub fn exists<R: Record>(&self, fqname: &str) -> DatastoreResult<bool> {
        Ok(self
            .resolver()?
            .document(fqname, R::OBJECT_TYPE)?
            .is_some())
    }

    // ---- Writes ----

    fn check_parent(
        &self,
        resolver: &PathResolver<'_>,
        kind: ObjectType,
        parent: &str,
    ) -> DatastoreResult<()> {
        let parent_kind = match kind {
            ObjectType::Domain => return Ok(()),
            ObjectType::Namespace | ObjectType::Class => container_kind(parent),
            ObjectType::Instance | ObjectType::Method => ObjectType::Class,
        };
        if parent.is_empty() || resolver.document(parent, parent_kind)?.is_none() {
            return Err(DatastoreError::NotFound(format!("{parent_kind} {parent}")));
        }
        Ok(())
    }

    /// Stage a record's document and sibling files. Returns the stored path
    /// of the document.
    fn stage_record<R: Record>(&self, index: &mut Index, record: &R) -> DatastoreResult<String> {
        let path = fqname_to_path(&record.fqname(), R::OBJECT_TYPE)?;
        let stored = index.write(&path, record.to_document()?.as_bytes())?;
        let dir = dir_of(&stored);
        for name in record.sidecar_names() {
            let sidecar = join(dir, &name);
            if index.contains(&sidecar) {
                index.remove(&sidecar)?;
            }
        }
        if let Some((name, content)) = record.sidecar() {
            index.write(&join(dir, &name), content.as_bytes())?;
        }
        Ok(stored)
    }

    fn write<R: Record>(&self, record: &mut R, create: bool) -> DatastoreResult<ObjectId> {
        validate_name(record.name())?;
        let kind = R::OBJECT_TYPE;
        let fqname = record.fqname();
        let resolver = self.resolver()?;
        if create && resolver.document(&fqname, kind)?.is_some() {
            return Err(DatastoreError::DuplicateName { kind, fqname });
        }
        self.check_parent(&resolver, kind, record.parent())?;
        record.prepare(self)?;

        let mut index = self.stage(&resolver)?;
        let stored = self.stage_record(&mut index, record)?;
        let verb = if create { "create" } else { "save" };
        let commit = self.repo.commit(index, &format!("{verb} {kind} {fqname}"))?;
        info!(kind = %kind, path = %stored, commit = %commit.short_hex(), "{verb}d entity");
        Ok(commit)
    }

    /// Store a new entity. Fails with [`DatastoreError::DuplicateName`] when
    /// one already exists under the same name, and with
    /// [`DatastoreError::NotFound`] when its container does not exist.
    ///
    /// A domain without a priority is ranked above every existing domain.
    pub fn create<R: Record>(&self, record: &mut R) -> DatastoreResult<ObjectId> {
        self.write(record, true)
    }

    /// Store an entity, replacing any previous version in full.
    pub fn save<R: Record>(&self, record: &mut R) -> DatastoreResult<ObjectId> {
        self.write(record, false)
    }

    /// Remove an entity and everything beneath it. Destroying a domain also
    /// re-densifies the remaining priorities in the same commit.
    pub fn destroy<R: Record>(&self, fqname: &str) -> DatastoreResult<ObjectId> {
        let kind = R::OBJECT_TYPE;
        let resolver = self.resolver()?;
        let entry = resolver
            .document(fqname, kind)?
            .ok_or_else(|| DatastoreError::NotFound(format!("{kind} {fqname}")))?;
        let record: R = self.load(&resolver, &entry)?;

        let mut index = self.stage(&resolver)?;
        let dir = dir_of(&entry.path);
        match kind {
            ObjectType::Domain | ObjectType::Namespace | ObjectType::Class => {
                index.remove_subtree(dir)?;
            }
            ObjectType::Instance | ObjectType::Method => {
                index.remove(&entry.path)?;
                for name in record.sidecar_names() {
                    let sidecar = join(dir, &name);
                    if index.contains(&sidecar) {
                        index.remove(&sidecar)?;
                    }
                }
            }
        }

        if kind == ObjectType::Domain {
            let mut domains = self.domains_in(&resolver)?;
            domains.remove(record.name());
            for name in domains.squeeze() {
                if let Some(domain) = domains.get(&name) {
                    self.stage_record(&mut index, domain)?;
                }
            }
        }

        let commit = self
            .repo
            .commit(index, &format!("destroy {kind} {}", record.fqname()))?;
        info!(
            kind = %kind,
            fqname = %record.fqname(),
            commit = %commit.short_hex(),
            "destroyed entity"
        );
        Ok(commit)
    }

    // ---- Domains ----

    fn domains_in(&self, resolver: &PathResolver<'_>) -> DatastoreResult<DomainPriorityIndex> {
        let mut domains = DomainPriorityIndex::default();
        for name in resolver.child_entries("", DOMAIN_MARKER, &NameFilter::any())? {
            if let Some(domain) = self.find_in::<Domain>(resolver, &name)? {
                domains.push(domain);
            }
        }
        Ok(domains)
    }

    /// Every domain, in tree order.
    pub fn domains(&self) -> DatastoreResult<DomainPriorityIndex> {
        self.domains_in(&self.resolver()?)
    }

    /// Rank domains by the order of `ids` (highest priority last). Returns
    /// the commit, or `None` when nothing changed.
    pub fn reorder_domains<S: AsRef<str>>(&self, ids: &[S]) -> DatastoreResult<Option<ObjectId>> {
        let resolver = self.resolver()?;
        let mut domains = self.domains_in(&resolver)?;
        let changed = domains.reassign_priorities(ids);
        if changed.is_empty() {
            return Ok(None);
        }
        let mut index = self.stage(&resolver)?;
        for name in &changed {
            if let Some(domain) = domains.get(name) {
                self.stage_record(&mut index, domain)?;
            }
        }
        let commit = self.repo.commit(index, "reorder domains")?;
        debug!(domains = ?changed, "rewrote domain priorities");
        Ok(Some(commit))
    }

    /// Find a namespace, creating it and any missing namespaces above it.
    /// The domain must already exist.
    pub fn find_or_create_namespace(&self, fqname: &str) -> DatastoreResult<Namespace> {
        fqname_to_path(fqname, ObjectType::Namespace)?;
        let fqname = fqname.trim_start_matches('/');
        let resolver = self.resolver()?;
        if let Some(found) = self.find_in::<Namespace>(&resolver, fqname)? {
            return Ok(found);
        }

        let segments: Vec<&str> = fqname.split('/').collect();
        let domain = self
            .find_in::<Domain>(&resolver, segments[0])?
            .ok_or_else(|| DatastoreError::NotFound(format!("domain {}", segments[0])))?;

        let mut index = self.stage(&resolver)?;
        let mut parent = domain.name;
        let mut missing = false;
        for segment in &segments[1..] {
            let current = join_fqname(&parent, segment);
            if !missing {
                if let Some(ns) = self.find_in::<Namespace>(&resolver, &current)? {
                    parent = ns.fqname();
                    continue;
                }
                missing = true;
            }
            self.stage_record(&mut index, &Namespace::new(parent.clone(), *segment))?;
            parent = current;
        }
        self.repo
            .commit(index, &format!("create namespace {fqname}"))?;
        info!(fqname = %fqname, "created namespace");

        self.find(fqname)?
            .ok_or_else(|| DatastoreError::NotFound(format!("namespace {fqname}")))
    }

    /// The highest-priority enabled domain's version of `relative`, a
    /// fully-qualified name without its domain.
    pub fn resolve_homonym<R: Record>(&self, relative: &str) -> DatastoreResult<Option<R>> {
        let resolver = self.resolver()?;
        let relative = relative.trim_start_matches('/');
        self.domains_in(&resolver)?
            .resolve_homonym(|d| self.find_in(&resolver, &join_fqname(&d.name, relative)))
    }

    /// Every domain's version of `relative`, highest priority first.
    pub fn homonyms<R: Record>(
        &self,
        relative: &str,
        enabled_only: bool,
    ) -> DatastoreResult<Vec<R>> {
        let resolver = self.resolver()?;
        let relative = relative.trim_start_matches('/');
        self.domains_in(&resolver)?.homonyms(enabled_only, |d| {
            self.find_in(&resolver, &join_fqname(&d.name, relative))
        })
    }

    // ---- Children ----

    /// Stored directory and fully-qualified name of a container document.
    fn container(
        &self,
        resolver: &PathResolver<'_>,
        fqname: &str,
        kind: ObjectType,
    ) -> DatastoreResult<Option<(String, String)>> {
        Ok(match resolver.document(fqname, kind)? {
            Some(entry) => {
                let stored = path_to_fqname(&entry.path, kind)?;
                Some((dir_of(&entry.path).to_string(), stored))
            }
            None => None,
        })
    }

    fn child_namespaces_in(
        &self,
        resolver: &PathResolver<'_>,
        parent: &str,
        filter: &NameFilter,
    ) -> DatastoreResult<Vec<Namespace>> {
        let Some((dir, stored)) = self.container(resolver, parent, container_kind(parent))? else {
            return Ok(Vec::new());
        };
        let mut found = Vec::new();
        for name in resolver.child_entries(&dir, NAMESPACE_MARKER, filter)? {
            found.extend(self.find_in::<Namespace>(resolver, &join_fqname(&stored, &name))?);
        }
        Ok(found)
    }

    fn classes_in(
        &self,
        resolver: &PathResolver<'_>,
        parent: &str,
        filter: &NameFilter,
    ) -> DatastoreResult<Vec<AeClass>> {
        let Some((dir, stored)) = self.container(resolver, parent, container_kind(parent))? else {
            return Ok(Vec::new());
        };
        let mut found = Vec::new();
        for name in resolver.child_entries(&dir, CLASS_MARKER, filter)? {
            found.extend(self.find_in::<AeClass>(resolver, &join_fqname(&stored, &name))?);
        }
        Ok(found)
    }

    fn instances_in(
        &self,
        resolver: &PathResolver<'_>,
        class: &str,
        filter: &NameFilter,
    ) -> DatastoreResult<Vec<Instance>> {
        let Some((dir, stored)) = self.container(resolver, class, ObjectType::Class)? else {
            return Ok(Vec::new());
        };
        let mut found = Vec::new();
        for name in resolver.documents(&dir, filter)? {
            found.extend(self.find_in::<Instance>(resolver, &join_fqname(&stored, &name))?);
        }
        Ok(found)
    }

    fn methods_in(
        &self,
        resolver: &PathResolver<'_>,
        class: &str,
        filter: &NameFilter,
    ) -> DatastoreResult<Vec<Method>> {
        let Some((dir, stored)) = self.container(resolver, class, ObjectType::Class)? else {
            return Ok(Vec::new());
        };
        let methods_dir = join(&dir, METHODS_DIR);
        let scopes = [
            (methods_dir.clone(), ""),
            (join(&methods_dir, CLASS_SCOPE_DIR), CLASS_SCOPE_PREFIX),
        ];
        let mut found = Vec::new();
        for (dir, prefix) in &scopes {
            for name in resolver.documents(dir, filter)? {
                let fqname = join_fqname(&stored, &format!("{prefix}{name}"));
                found.extend(self.find_in::<Method>(resolver, &fqname)?);
            }
        }
        Ok(found)
    }

    /// Namespaces directly inside a domain or namespace whose names match
    /// `filter`.
    pub fn child_namespaces(
        &self,
        parent: &str,
        filter: &NameFilter,
    ) -> DatastoreResult<Vec<Namespace>> {
        self.child_namespaces_in(&self.resolver()?, parent, filter)
    }

    /// Classes directly inside a domain or namespace.
    pub fn classes(&self, parent: &str, filter: &NameFilter) -> DatastoreResult<Vec<AeClass>> {
        self.classes_in(&self.resolver()?, parent, filter)
    }

    pub fn instances(&self, class: &str, filter: &NameFilter) -> DatastoreResult<Vec<Instance>> {
        self.instances_in(&self.resolver()?, class, filter)
    }

    /// Instance-scope methods of a class followed by its class-scope ones.
    pub fn methods(&self, class: &str, filter: &NameFilter) -> DatastoreResult<Vec<Method>> {
        self.methods_in(&self.resolver()?, class, filter)
    }

    /// Everything directly owned by the entity `fqname` of kind `kind`:
    /// namespaces then classes for a domain or namespace, instances then
    /// methods for a class. Instances and methods own no entities.
    pub fn load_children(&self, kind: ObjectType, fqname: &str) -> DatastoreResult<Vec<Child>> {
        let resolver = self.resolver()?;
        let all = NameFilter::any();
        let mut children = Vec::new();
        match kind {
            ObjectType::Domain | ObjectType::Namespace => {
                let namespaces = self.child_namespaces_in(&resolver, fqname, &all)?;
                children.extend(namespaces.into_iter().map(Child::Namespace));
                let classes = self.classes_in(&resolver, fqname, &all)?;
                children.extend(classes.into_iter().map(Child::Class));
            }
            ObjectType::Class => {
                let instances = self.instances_in(&resolver, fqname, &all)?;
                children.extend(instances.into_iter().map(Child::Instance));
                let methods = self.methods_in(&resolver, fqname, &all)?;
                children.extend(methods.into_iter().map(Child::Method));
            }
            ObjectType::Instance | ObjectType::Method => {}
        }
        Ok(children)
    }

    /// Whether the entity may be edited: nothing between it and its domain
    /// (the domain included) is marked as system.
    pub fn editable(&self, kind: ObjectType, fqname: &str) -> DatastoreResult<bool> {
        fqname_to_path(fqname, kind)?;
        let resolver = self.resolver()?;
        let segments: Vec<&str> = fqname.trim_start_matches('/').split('/').collect();
        let domain = self
            .find_in::<Domain>(&resolver, segments[0])?
            .ok_or_else(|| DatastoreError::NotFound(format!("domain {}", segments[0])))?;
        if domain.system {
            return Ok(false);
        }
        let last_namespace = match kind {
            ObjectType::Domain => return Ok(true),
            ObjectType::Namespace => segments.len(),
            ObjectType::Class => segments.len() - 1,
            ObjectType::Instance | ObjectType::Method => segments.len() - 2,
        };
        for end in 2..=last_namespace {
            let ns = self.find_in::<Namespace>(&resolver, &segments[..end].join("/"))?;
            if ns.is_some_and(|ns| ns.system) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use aetree_model::{Field, ModelError, Scope};

    use super::*;

    const CLASS: &str = "Acme/Infra/Provision";

    fn seeded() -> Datastore {
        let ds = Datastore::new(Repository::in_memory());
        ds.create(&mut Domain::new("Acme")).unwrap();
        ds.create(&mut Namespace::new("Acme", "Infra")).unwrap();
        let mut class = AeClass::new("Acme/Infra", "Provision")
            .with_field(Field::new("vm_name").with_default("vm1"));
        ds.create(&mut class).unwrap();
        ds
    }

    fn exists(ds: &Datastore, path: &str) -> bool {
        ds.repo().exists(path, None).unwrap()
    }

    #[test]
    fn domains_rank_above_existing_ones() {
        let ds = Datastore::new(Repository::in_memory());
        let mut a = Domain::new("A");
        let mut b = Domain::new("B");
        ds.create(&mut a).unwrap();
        ds.create(&mut b).unwrap();
        assert_eq!(a.priority, Some(1));
        assert_eq!(b.priority, Some(2));

        let mut pinned = Domain::new("Pinned").with_priority(10);
        ds.create(&mut pinned).unwrap();
        assert_eq!(ds.find::<Domain>("pinned").unwrap().unwrap().priority(), 10);
        assert_eq!(ds.domains().unwrap().len(), 3);

        assert!(matches!(
            ds.create(&mut Domain::new("a")),
            Err(DatastoreError::DuplicateName { kind: ObjectType::Domain, .. })
        ));
    }

    #[test]
    fn missing_container_is_not_found() {
        let ds = seeded();
        assert!(matches!(
            ds.create(&mut Namespace::new("Nope", "x")),
            Err(DatastoreError::NotFound(_))
        ));
        assert!(matches!(
            ds.create(&mut Instance::new("Acme/Infra/Missing", "small")),
            Err(DatastoreError::NotFound(_))
        ));
        assert!(matches!(
            ds.create(&mut Namespace::new("Acme", "bad name")),
            Err(DatastoreError::Model(ModelError::InvalidName { .. }))
        ));
    }

    #[test]
    fn find_ignores_case_and_keeps_stored_casing() {
        let ds = seeded();
        let ns = ds.find::<Namespace>("acme/INFRA").unwrap().unwrap();
        assert_eq!(ns.name, "Infra");
        assert_eq!(ns.parent, "Acme");
        assert!(ds.exists::<AeClass>("ACME/infra/provision").unwrap());
        assert!(!ds.exists::<AeClass>("Acme/Infra/Other").unwrap());
        assert!(ds.find::<Instance>("Acme/Infra/Provision/none").unwrap().is_none());
    }

    #[test]
    fn find_by_id_decodes_the_name() {
        let ds = seeded();
        let mut inst = Instance::new(CLASS, "a$b");
        ds.create(&mut inst).unwrap();
        let id = inst.id();
        assert!(id.contains("%24"));
        let found = ds.find_by_id::<Instance>(&id).unwrap().unwrap();
        assert_eq!(found.name, "a$b");
        assert!(matches!(
            ds.find_by_id::<Instance>("%G"),
            Err(DatastoreError::NotFound(_))
        ));
    }

    #[test]
    fn namespaces_are_created_along_the_way() {
        let ds = seeded();
        let ns = ds.find_or_create_namespace("acme/infra/Deep/Deeper").unwrap();
        assert_eq!(ns.fqname(), "Acme/Infra/Deep/Deeper");
        assert!(exists(&ds, "Acme/Infra/Deep/__namespace__.yaml"));

        let head = ds.repo().head().unwrap();
        let again = ds.find_or_create_namespace("Acme/Infra/Deep/Deeper").unwrap();
        assert_eq!(again, ns);
        assert_eq!(ds.repo().head().unwrap(), head);

        assert!(matches!(
            ds.find_or_create_namespace("Other/ns"),
            Err(DatastoreError::NotFound(_))
        ));
    }

    #[test]
    fn instance_fields_survive_a_round_trip() {
        let ds = seeded();
        let class = ds.find::<AeClass>(CLASS).unwrap().unwrap();
        let mut inst = Instance::new(CLASS, "small");
        inst.set_field_value(&class, "VM_NAME", "web01").unwrap();
        ds.create(&mut inst).unwrap();

        let found = ds.find::<Instance>("acme/infra/provision/SMALL").unwrap().unwrap();
        assert_eq!(found.field_value("vm_name").unwrap().value.as_deref(), Some("web01"));
        assert!(exists(&ds, "Acme/Infra/Provision.class/small.yaml"));
    }

    #[test]
    fn inline_method_keeps_its_script_beside_the_document() {
        let ds = seeded();
        let mut method = Method::new(CLASS, "run").with_data("exit 0");
        ds.create(&mut method).unwrap();

        let script = ds
            .repo()
            .read("Acme/Infra/Provision.class/__methods__/run.rb", None)
            .unwrap()
            .unwrap();
        assert_eq!(script, b"exit 0\n");
        let found = ds.find::<Method>("Acme/Infra/Provision/run").unwrap().unwrap();
        assert_eq!(found.data.as_deref(), Some("exit 0\n"));

        method.location = aetree_model::Location::Builtin;
        ds.save(&mut method).unwrap();
        assert!(!exists(&ds, "Acme/Infra/Provision.class/__methods__/run.rb"));
        assert_eq!(ds.find::<Method>("Acme/Infra/Provision/run").unwrap().unwrap().data, None);
    }

    #[test]
    fn class_scope_methods_live_apart() {
        let ds = seeded();
        ds.create(&mut Method::new(CLASS, "run")).unwrap();
        ds.create(&mut Method::new(CLASS, "setup").with_scope(Scope::Class))
            .unwrap();
        assert!(exists(
            &ds,
            "Acme/Infra/Provision.class/__methods__/$CLASS$/setup.yaml"
        ));

        let methods = ds.methods(CLASS, &NameFilter::any()).unwrap();
        let names: Vec<String> = methods.iter().map(|m| m.fqname()).collect();
        assert_eq!(
            names,
            ["Acme/Infra/Provision/run", "Acme/Infra/Provision/$CLASS$setup"]
        );
        assert!(ds
            .find::<Method>("acme/infra/provision/$CLASS$Setup")
            .unwrap()
            .is_some());
    }

    #[test]
    fn destroying_a_method_drops_its_script() {
        let ds = seeded();
        ds.create(&mut Method::new(CLASS, "run").with_data("exit 0"))
            .unwrap();
        ds.destroy::<Method>("acme/infra/provision/run").unwrap();
        assert!(!exists(&ds, "Acme/Infra/Provision.class/__methods__/run.yaml"));
        assert!(!exists(&ds, "Acme/Infra/Provision.class/__methods__/run.rb"));
        assert!(matches!(
            ds.destroy::<Method>("Acme/Infra/Provision/run"),
            Err(DatastoreError::NotFound(_))
        ));
    }

    #[test]
    fn destroying_a_domain_closes_the_priority_gap() {
        let ds = Datastore::new(Repository::in_memory());
        for name in ["A", "B", "C"] {
            ds.create(&mut Domain::new(name)).unwrap();
        }
        ds.create(&mut Namespace::new("B", "ns")).unwrap();

        ds.destroy::<Domain>("b").unwrap();
        assert!(!exists(&ds, "B"));
        let domains = ds.domains().unwrap();
        assert_eq!(domains.len(), 2);
        assert_eq!(domains.get("A").unwrap().priority(), 1);
        assert_eq!(domains.get("C").unwrap().priority(), 2);
    }

    #[test]
    fn reorder_rewrites_only_changed_domains() {
        let ds = Datastore::new(Repository::in_memory());
        for name in ["A", "B", "C"] {
            ds.create(&mut Domain::new(name)).unwrap();
        }
        let ids = [identifier::encode("C"), identifier::encode("B"), identifier::encode("A")];
        assert!(ds.reorder_domains(&ids).unwrap().is_some());
        let domains = ds.domains().unwrap();
        assert_eq!(domains.get("C").unwrap().priority(), 1);
        assert_eq!(domains.get("A").unwrap().priority(), 3);
        assert!(ds.reorder_domains(&ids).unwrap().is_none());
    }

    #[test]
    fn homonyms_follow_domain_priority() {
        let ds = Datastore::new(Repository::in_memory());
        for name in ["X", "Y"] {
            ds.create(&mut Domain::new(name)).unwrap();
            ds.find_or_create_namespace(&format!("{name}/Common")).unwrap();
            ds.create(&mut AeClass::new(format!("{name}/Common"), "Util"))
                .unwrap();
        }

        let winner = ds.resolve_homonym::<AeClass>("/common/util").unwrap().unwrap();
        assert_eq!(winner.fqname(), "Y/Common/Util");

        let mut y = ds.find::<Domain>("Y").unwrap().unwrap();
        y.enabled = false;
        ds.save(&mut y).unwrap();
        let winner = ds.resolve_homonym::<AeClass>("Common/Util").unwrap().unwrap();
        assert_eq!(winner.fqname(), "X/Common/Util");

        assert_eq!(ds.homonyms::<AeClass>("Common/Util", true).unwrap().len(), 1);
        let all = ds.homonyms::<AeClass>("Common/Util", false).unwrap();
        let names: Vec<String> = all.iter().map(|c| c.fqname()).collect();
        assert_eq!(names, ["Y/Common/Util", "X/Common/Util"]);
    }

    #[test]
    fn children_by_kind_and_filter() {
        let ds = seeded();
        ds.create(&mut AeClass::new("Acme/Infra", "Retire")).unwrap();
        ds.create(&mut Namespace::new("Acme/Infra", "Sub")).unwrap();
        ds.create(&mut Instance::new(CLASS, "small")).unwrap();
        ds.create(&mut Method::new(CLASS, "run")).unwrap();

        let prov = NameFilter::new(["PROV*"]).unwrap();
        let classes = ds.classes("acme/infra", &prov).unwrap();
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].name, "Provision");
        assert_eq!(ds.child_namespaces("Acme", &NameFilter::any()).unwrap().len(), 1);
        assert!(ds.instances("Acme/Infra/Missing", &NameFilter::any()).unwrap().is_empty());

        let children = ds.load_children(ObjectType::Namespace, "Acme/Infra").unwrap();
        assert!(matches!(&children[0], Child::Namespace(ns) if ns.name == "Sub"));
        assert_eq!(children.len(), 3);

        let children = ds.load_children(ObjectType::Class, CLASS).unwrap();
        assert!(matches!(&children[0], Child::Instance(i) if i.name == "small"));
        assert!(matches!(&children[1], Child::Method(m) if m.name == "run"));
        assert!(ds
            .load_children(ObjectType::Instance, "Acme/Infra/Provision/small")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn system_containers_lock_their_contents() {
        let ds = Datastore::new(Repository::in_memory());
        let mut core = Domain::new("Core");
        core.system = true;
        ds.create(&mut core).unwrap();
        ds.create(&mut Namespace::new("Core", "Base")).unwrap();
        ds.create(&mut Domain::new("Acme")).unwrap();
        let mut locked = Namespace::new("Acme", "Locked");
        locked.system = true;
        ds.create(&mut locked).unwrap();
        ds.create(&mut Namespace::new("Acme/Locked", "Inner")).unwrap();
        ds.create(&mut Namespace::new("Acme", "Open")).unwrap();

        assert!(!ds.editable(ObjectType::Namespace, "Core/Base").unwrap());
        assert!(!ds.editable(ObjectType::Class, "Acme/Locked/Inner/K").unwrap());
        assert!(!ds.editable(ObjectType::Namespace, "Acme/Locked").unwrap());
        assert!(ds.editable(ObjectType::Class, "Acme/Open/K").unwrap());
        assert!(ds.editable(ObjectType::Domain, "Acme").unwrap());
        assert!(ds.editable(ObjectType::Method, "Acme/Open/K/m").unwrap());
    }

    #[test]
    fn malformed_document_is_reported() {
        let ds = seeded();
        let mut index = ds.repo().stage().unwrap();
        index
            .write("Acme/Infra/Bad.class/__class__.yaml", b"hello: world\n")
            .unwrap();
        ds.repo().commit(index, "bad class").unwrap();

        assert!(matches!(
            ds.find::<AeClass>("Acme/Infra/Bad"),
            Err(DatastoreError::Model(ModelError::MalformedDocument(_)))
        ));
    }

    #[test]
    fn every_write_is_one_commit() {
        let ds = seeded();
        let before = ds.repo().head().unwrap().unwrap();
        let commit = ds.create(&mut Instance::new(CLASS, "small")).unwrap();
        assert_eq!(ds.repo().head().unwrap(), Some(commit));
        let commit = ds.repo().read_commit(&commit).unwrap();
        assert_eq!(commit.parent, Some(before));
        assert_eq!(commit.message, "create instance Acme/Infra/Provision/small");
    }

    #[test]
    fn entities_persist_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = aetree_repo::RepoConfig::default();
        let ds = Datastore::new(Repository::create(dir.path(), config.clone()).unwrap());
        ds.create(&mut Domain::new("Acme")).unwrap();
        ds.find_or_create_namespace("Acme/Infra").unwrap();
        drop(ds);

        let ds = Datastore::new(Repository::open(dir.path(), config).unwrap());
        assert!(ds.exists::<Namespace>("acme/infra").unwrap());
        assert_eq!(ds.domains().unwrap().get("acme").unwrap().priority(), 1);
    }
}
