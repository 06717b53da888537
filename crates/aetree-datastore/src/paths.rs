//! Mapping between fully-qualified names and paths in the tree.
//!
//! ```text
//! Dom                    -> Dom/__domain__.yaml
//! Dom/ns                 -> Dom/ns/__namespace__.yaml
//! Dom/ns/Klass           -> Dom/ns/Klass.class/__class__.yaml
//! Dom/ns/Klass/inst      -> Dom/ns/Klass.class/inst.yaml
//! Dom/ns/Klass/meth      -> Dom/ns/Klass.class/__methods__/meth.yaml
//! Dom/ns/Klass/$CLASS$m  -> Dom/ns/Klass.class/__methods__/$CLASS$/m.yaml
//! ```

use aetree_index::{join, normalize_path};
use aetree_model::{validate_name, ObjectType, CLASS_SCOPE_PREFIX};
use aetree_repo::{Entry, Repository};
use aetree_types::ObjectId;

use crate::error::{DatastoreError, DatastoreResult};
use crate::filter::NameFilter;

pub const DOMAIN_MARKER: &str = "__domain__.yaml";
pub const NAMESPACE_MARKER: &str = "__namespace__.yaml";
pub const CLASS_MARKER: &str = "__class__.yaml";
pub const METHODS_DIR: &str = "__methods__";
pub const CLASS_SCOPE_DIR: &str = CLASS_SCOPE_PREFIX;
pub const CLASS_DIR_SUFFIX: &str = ".class";
pub const DOCUMENT_EXT: &str = ".yaml";

const RESERVED_NAMES: &[&str] = &[
    "__domain__",
    "__namespace__",
    "__class__",
    METHODS_DIR,
    CLASS_SCOPE_DIR,
];

fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    let split = s.len().checked_sub(suffix.len())?;
    let tail = s.get(split..)?;
    (split > 0 && tail.eq_ignore_ascii_case(suffix)).then(|| &s[..split])
}

fn class_name(dir: &str) -> Option<&str> {
    strip_suffix_ignore_case(dir, CLASS_DIR_SUFFIX)
}

fn is_marker(name: &str) -> bool {
    [DOMAIN_MARKER, NAMESPACE_MARKER, CLASS_MARKER]
        .iter()
        .any(|m| m.eq_ignore_ascii_case(name))
}

/// Fully-qualified name of the container, empty for a domain.
pub fn parent_fqname(fqname: &str) -> &str {
    fqname.rsplit_once('/').map_or("", |(parent, _)| parent)
}

fn split_fqname(fqname: &str, kind: ObjectType) -> DatastoreResult<Vec<&str>> {
    let invalid = |reason: String| DatastoreError::InvalidFqname {
        kind,
        fqname: fqname.to_string(),
        reason,
    };
    let trimmed = fqname.strip_prefix('/').unwrap_or(fqname);
    if trimmed.is_empty() {
        return Err(DatastoreError::MissingArgument("fqname"));
    }
    let segments: Vec<&str> = trimmed.split('/').collect();
    let (min, max) = match kind {
        ObjectType::Domain => (1, 1),
        ObjectType::Namespace | ObjectType::Class => (2, usize::MAX),
        ObjectType::Instance | ObjectType::Method => (3, usize::MAX),
    };
    if segments.len() < min || segments.len() > max {
        return Err(invalid(format!("{} segments", segments.len())));
    }

    let last = segments.len() - 1;
    for (i, &segment) in segments.iter().enumerate() {
        let name = match (kind, i == last) {
            (ObjectType::Method, true) => {
                segment.strip_prefix(CLASS_SCOPE_PREFIX).unwrap_or(segment)
            }
            _ => segment,
        };
        validate_name(name).map_err(|e| invalid(e.to_string()))?;
        if RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(name)) {
            return Err(invalid(format!("{name:?} is reserved")));
        }
    }
    Ok(segments)
}

/// Directory of the class whose fully-qualified name is `segments`.
fn class_dir(segments: &[&str]) -> String {
    let (name, parents) = segments
        .split_last()
        .map_or(("", &[][..]), |(name, parents)| (*name, parents));
    join(&parents.join("/"), &format!("{name}{CLASS_DIR_SUFFIX}"))
}

/// Path of the document for `fqname`. A leading `/` is ignored.
pub fn fqname_to_path(fqname: &str, kind: ObjectType) -> DatastoreResult<String> {
    let segments = split_fqname(fqname, kind)?;
    let (last, parents) = segments
        .split_last()
        .ok_or(DatastoreError::MissingArgument("fqname"))?;
    Ok(match kind {
        ObjectType::Domain => format!("{last}/{DOMAIN_MARKER}"),
        ObjectType::Namespace => format!("{}/{NAMESPACE_MARKER}", segments.join("/")),
        ObjectType::Class => format!("{}/{CLASS_MARKER}", class_dir(&segments)),
        ObjectType::Instance => format!("{}/{last}{DOCUMENT_EXT}", class_dir(parents)),
        ObjectType::Method => match last.strip_prefix(CLASS_SCOPE_PREFIX) {
            Some(name) => format!(
                "{}/{METHODS_DIR}/{CLASS_SCOPE_DIR}/{name}{DOCUMENT_EXT}",
                class_dir(parents)
            ),
            None => format!("{}/{METHODS_DIR}/{last}{DOCUMENT_EXT}", class_dir(parents)),
        },
    })
}

/// Inverse of [`fqname_to_path`]. Marker names and suffixes match in any
/// case; the returned name keeps the casing of `path`.
pub fn path_to_fqname(path: &str, kind: ObjectType) -> DatastoreResult<String> {
    let invalid = || DatastoreError::InvalidPath {
        kind,
        path: path.to_string(),
    };
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    let n = segments.len();

    let fqname = match kind {
        ObjectType::Domain if n == 2 && segments[1].eq_ignore_ascii_case(DOMAIN_MARKER) => {
            segments[0].to_string()
        }
        ObjectType::Namespace
            if n >= 3 && segments[n - 1].eq_ignore_ascii_case(NAMESPACE_MARKER) =>
        {
            segments[..n - 1].join("/")
        }
        ObjectType::Class if n >= 3 && segments[n - 1].eq_ignore_ascii_case(CLASS_MARKER) => {
            let name = class_name(segments[n - 2]).ok_or_else(invalid)?;
            join(&segments[..n - 2].join("/"), name)
        }
        ObjectType::Instance if n >= 3 && !is_marker(segments[n - 1]) => {
            let name =
                strip_suffix_ignore_case(segments[n - 1], DOCUMENT_EXT).ok_or_else(invalid)?;
            let class = class_name(segments[n - 2]).ok_or_else(invalid)?;
            format!("{}/{class}/{name}", segments[..n - 2].join("/"))
        }
        ObjectType::Method if n >= 4 => {
            let file =
                strip_suffix_ignore_case(segments[n - 1], DOCUMENT_EXT).ok_or_else(invalid)?;
            let (methods_at, prefix) = if segments[n - 2].eq_ignore_ascii_case(CLASS_SCOPE_DIR) {
                (n - 3, CLASS_SCOPE_PREFIX)
            } else {
                (n - 2, "")
            };
            if methods_at < 2 || !segments[methods_at].eq_ignore_ascii_case(METHODS_DIR) {
                return Err(invalid());
            }
            let class = class_name(segments[methods_at - 1]).ok_or_else(invalid)?;
            format!(
                "{}/{class}/{prefix}{file}",
                segments[..methods_at - 1].join("/")
            )
        }
        _ => return Err(invalid()),
    };
    // Reject anything that would not map back to the same path.
    split_fqname(&fqname, kind).map_err(|_| invalid())?;
    Ok(fqname)
}

/// Work out which kind of document a path holds, if any.
pub fn classify_path(path: &str) -> Option<(ObjectType, String)> {
    ObjectType::ALL
        .into_iter()
        .find_map(|kind| path_to_fqname(path, kind).ok().map(|f| (kind, f)))
}

/// Tree lookups for name resolution against one snapshot.
#[derive(Debug)]
pub struct PathResolver<'a> {
    repo: &'a Repository,
    as_of: Option<ObjectId>,
}

impl<'a> PathResolver<'a> {
    /// Resolve against whatever the head points to at each call.
    pub fn new(repo: &'a Repository) -> Self {
        Self { repo, as_of: None }
    }

    pub fn at(repo: &'a Repository, commit: ObjectId) -> Self {
        Self {
            repo,
            as_of: Some(commit),
        }
    }

    /// Resolve against the commit the head points to now, even if it moves.
    pub fn pinned(repo: &'a Repository) -> DatastoreResult<Self> {
        Ok(Self {
            repo,
            as_of: repo.head()?,
        })
    }

    /// The commit lookups run against; `None` means the head.
    pub fn as_of(&self) -> Option<ObjectId> {
        self.as_of
    }

    /// File content at `path` in the snapshot.
    pub fn read(&self, path: &str) -> DatastoreResult<Option<Vec<u8>>> {
        Ok(self.repo.read(path, self.as_of)?)
    }

    /// Walk `path` one segment at a time, adopting the stored casing of
    /// each segment that exists.
    ///
    /// With `create`, the first missing segment and everything after it are
    /// taken literally; without it a missing segment gives `None`.
    pub fn locate(&self, path: &str, create: bool) -> DatastoreResult<Option<String>> {
        let path = normalize_path(path)?;
        if let Some(entry) = self.repo.resolve(&path, self.as_of)? {
            return Ok(Some(entry.path));
        }
        if !create {
            return Ok(None);
        }
        let mut located = String::new();
        let mut missing = false;
        for segment in path.split('/') {
            if !missing {
                match self.repo.resolve(&join(&located, segment), self.as_of)? {
                    Some(entry) => {
                        located = entry.path;
                        continue;
                    }
                    None => missing = true,
                }
            }
            located = join(&located, segment);
        }
        Ok(Some(located))
    }

    /// The stored document of `fqname`, if there is one.
    pub fn document(&self, fqname: &str, kind: ObjectType) -> DatastoreResult<Option<Entry>> {
        let path = fqname_to_path(fqname, kind)?;
        Ok(self
            .repo
            .resolve(&path, self.as_of)?
            .filter(|entry| !entry.is_directory()))
    }

    /// Subdirectories of `parent` holding `marker`, by name.
    ///
    /// For class directories the `.class` suffix is dropped before the name
    /// is matched and returned.
    pub fn child_entries(
        &self,
        parent: &str,
        marker: &str,
        filter: &NameFilter,
    ) -> DatastoreResult<Vec<String>> {
        let mut names = Vec::new();
        for child in self.repo.entries(parent, self.as_of)? {
            if !child.is_directory() {
                continue;
            }
            let name = if marker.eq_ignore_ascii_case(CLASS_MARKER) {
                match class_name(child.name()) {
                    Some(name) => name,
                    None => continue,
                }
            } else {
                child.name()
            };
            if filter.matches(name) && self.repo.exists(&join(&child.path, marker), self.as_of)? {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    /// Document names (without extension) directly inside `dir`, skipping
    /// marker files.
    pub fn documents(&self, dir: &str, filter: &NameFilter) -> DatastoreResult<Vec<String>> {
        Ok(self
            .repo
            .entries(dir, self.as_of)?
            .iter()
            .filter(|e| !e.is_directory() && !is_marker(e.name()))
            .filter_map(|e| strip_suffix_ignore_case(e.name(), DOCUMENT_EXT))
            .filter(|name| filter.matches(name))
            .map(str::to_string)
            .collect())
    }
}
