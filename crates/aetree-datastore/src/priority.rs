use std::cmp::Reverse;

use aetree_model::Domain;
use aetree_types::identifier;
use tracing::debug;

/// The set of domains ranked by priority.
///
/// Domains keep the order they were added in; that order breaks ties
/// between equal priorities everywhere, so results never depend on sort
/// instability. A higher priority wins homonym resolution.
#[derive(Clone, Debug, Default)]
pub struct DomainPriorityIndex {
    domains: Vec<Domain>,
}

impl DomainPriorityIndex {
    pub fn new(domains: Vec<Domain>) -> Self {
        Self { domains }
    }

    pub fn push(&mut self, domain: Domain) {
        self.domains.push(domain);
    }

    /// Drop a domain by name, ignoring case.
    pub fn remove(&mut self, name: &str) -> Option<Domain> {
        let pos = self
            .domains
            .iter()
            .position(|d| d.name.eq_ignore_ascii_case(name))?;
        Some(self.domains.remove(pos))
    }

    pub fn get(&self, name: &str) -> Option<&Domain> {
        self.domains.iter().find(|d| d.name.eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Domains in the order they were added.
    pub fn domains(&self) -> &[Domain] {
        &self.domains
    }

    pub fn into_domains(self) -> Vec<Domain> {
        self.domains
    }

    /// Lowest priority first.
    pub fn ordered(&self) -> Vec<&Domain> {
        let mut ordered: Vec<&Domain> = self.domains.iter().collect();
        ordered.sort_by_key(|d| d.priority());
        ordered
    }

    /// Highest priority first: the order homonyms are resolved in.
    pub fn by_precedence(&self) -> Vec<&Domain> {
        let mut ordered: Vec<&Domain> = self.domains.iter().collect();
        ordered.sort_by_key(|d| Reverse(d.priority()));
        ordered
    }

    /// Enabled domains, lowest priority first.
    pub fn enabled_domains(&self) -> Vec<&Domain> {
        self.ordered().into_iter().filter(|d| d.enabled).collect()
    }

    /// Domains that are not system domains, highest priority first.
    pub fn unlocked_domains(&self) -> Vec<&Domain> {
        self.by_precedence()
            .into_iter()
            .filter(|d| !d.system)
            .collect()
    }

    pub fn any_unlocked(&self) -> bool {
        self.domains.iter().any(|d| !d.system)
    }

    /// The largest priority in use, or 0 without domains.
    pub fn highest_priority(&self) -> u32 {
        self.domains.iter().map(Domain::priority).max().unwrap_or(0)
    }

    /// Give each domain in `ids` priority `position + 1`. Unknown ids are
    /// skipped. Returns the names of the domains whose priority changed.
    pub fn reassign_priorities<S: AsRef<str>>(&mut self, ids: &[S]) -> Vec<String> {
        let mut changed = Vec::new();
        for (position, id) in ids.iter().enumerate() {
            let Ok(name) = identifier::decode(id.as_ref()) else {
                continue;
            };
            let Some(domain) = self
                .domains
                .iter_mut()
                .find(|d| d.name.eq_ignore_ascii_case(&name))
            else {
                continue;
            };
            let priority = u32::try_from(position + 1).unwrap_or(u32::MAX);
            if domain.priority != Some(priority) {
                debug!(domain = %domain.name, priority, "reassigned domain priority");
                domain.priority = Some(priority);
                changed.push(domain.name.clone());
            }
        }
        changed
    }

    /// Renumber the ranked domains to `1..=N`, keeping their relative order.
    /// Unranked domains stay at 0.
    pub fn squeeze(&mut self) -> Vec<String> {
        let ids: Vec<String> = self
            .ordered()
            .into_iter()
            .filter(|d| d.priority() > 0)
            .map(|d| identifier::encode(&d.name))
            .collect();
        self.reassign_priorities(&ids)
    }

    /// First hit of `lookup` over the enabled domains, highest priority
    /// first.
    pub fn resolve_homonym<T, E>(
        &self,
        mut lookup: impl FnMut(&Domain) -> Result<Option<T>, E>,
    ) -> Result<Option<T>, E> {
        for domain in self.by_precedence().into_iter().filter(|d| d.enabled) {
            if let Some(found) = lookup(domain)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Every hit of `lookup`, highest priority first. With `enabled_only`
    /// disabled domains are skipped.
    pub fn homonyms<T, E>(
        &self,
        enabled_only: bool,
        mut lookup: impl FnMut(&Domain) -> Result<Option<T>, E>,
    ) -> Result<Vec<T>, E> {
        let mut found = Vec::new();
        for domain in self.by_precedence() {
            if enabled_only && !domain.enabled {
                continue;
            }
            if let Some(hit) = lookup(domain)? {
                found.push(hit);
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::convert::Infallible;

    use super::*;

    fn domain(name: &str, priority: u32) -> Domain {
        Domain::new(name).with_priority(priority)
    }

    fn names<'a>(domains: Vec<&'a Domain>) -> Vec<&'a str> {
        domains.into_iter().map(|d| d.name.as_str()).collect()
    }

    fn priorities(index: &DomainPriorityIndex) -> Vec<(String, u32)> {
        index
            .domains()
            .iter()
            .map(|d| (d.name.clone(), d.priority()))
            .collect()
    }

    #[test]
    fn squeeze_densifies_ranked_domains() {
        let mut index = DomainPriorityIndex::new(vec![
            domain("D1", 0),
            domain("D2", 3),
            domain("D3", 0),
            domain("D4", 1),
        ]);
        let changed = index.squeeze();
        assert_eq!(changed, ["D2"]);
        assert_eq!(
            priorities(&index),
            [
                ("D1".to_string(), 0),
                ("D2".to_string(), 2),
                ("D3".to_string(), 0),
                ("D4".to_string(), 1),
            ]
        );
        assert_eq!(names(index.ordered()), ["D1", "D3", "D4", "D2"]);
    }

    #[test]
    fn squeeze_after_removal_closes_the_gap() {
        let mut index =
            DomainPriorityIndex::new(vec![domain("A", 1), domain("B", 2), domain("C", 3)]);
        index.remove("b").unwrap();
        assert_eq!(index.squeeze(), ["C"]);
        assert_eq!(index.get("C").unwrap().priority(), 2);
        assert_eq!(index.highest_priority(), 2);
    }

    #[test]
    fn reassign_follows_the_given_order() {
        let mut index =
            DomainPriorityIndex::new(vec![domain("A", 1), domain("B", 2), domain("C", 3)]);
        let changed = index.reassign_priorities(&["C", "missing", "A"]);
        assert_eq!(changed, ["C", "A"]);
        assert_eq!(index.get("C").unwrap().priority(), 1);
        assert_eq!(index.get("A").unwrap().priority(), 3);
        assert_eq!(index.get("B").unwrap().priority(), 2);
    }

    #[test]
    fn equal_priorities_keep_insertion_order() {
        let index = DomainPriorityIndex::new(vec![
            domain("first", 2),
            domain("second", 2),
            domain("third", 5),
        ]);
        assert_eq!(names(index.by_precedence()), ["third", "first", "second"]);
    }

    #[test]
    fn lock_and_enable_filters() {
        let mut system = domain("ManageIQ", 1);
        system.system = true;
        let mut off = domain("Off", 3);
        off.enabled = false;
        let index = DomainPriorityIndex::new(vec![system, domain("Acme", 2), off]);

        assert_eq!(names(index.enabled_domains()), ["ManageIQ", "Acme"]);
        assert_eq!(names(index.unlocked_domains()), ["Off", "Acme"]);
        assert!(index.any_unlocked());
        assert_eq!(DomainPriorityIndex::default().highest_priority(), 0);
        assert!(!DomainPriorityIndex::default().any_unlocked());
    }

    #[test]
    fn homonym_goes_to_highest_enabled_domain() {
        let defines_foo: BTreeSet<&str> = ["X", "Y"].into();
        let lookup = |d: &Domain| -> Result<Option<String>, Infallible> {
            Ok(defines_foo
                .contains(d.name.as_str())
                .then(|| format!("{}/foo", d.name)))
        };

        let mut index = DomainPriorityIndex::new(vec![domain("X", 2), domain("Y", 5)]);
        assert_eq!(index.resolve_homonym(lookup).unwrap().as_deref(), Some("Y/foo"));
        assert_eq!(index.homonyms(true, lookup).unwrap(), ["Y/foo", "X/foo"]);

        let mut y = index.remove("Y").unwrap();
        y.enabled = false;
        index.push(y);
        assert_eq!(index.resolve_homonym(lookup).unwrap().as_deref(), Some("X/foo"));
        assert_eq!(index.homonyms(true, lookup).unwrap(), ["X/foo"]);
        assert_eq!(index.homonyms(false, lookup).unwrap(), ["Y/foo", "X/foo"]);
    }
}
