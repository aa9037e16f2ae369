//! Graph-set resolution.
//!
//! An in-memory index over every graph fetched for one request, grouped by
//! wildcard-instance address. Within a group, `keyring_version` orders the
//! graph versions newest-first; the walk decides which graphs are still
//! live, which credentials demand rotation, and where appends should land.
//! The set is rebuilt from scratch per workflow — it caches one fetch,
//! never the process.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::address::Address;
use crate::envelope::Envelope;
use crate::error::{GraphError, Result};
use crate::graph::{Credential, CredentialGraph};
use crate::types::Id;

#[derive(Debug, Default)]
pub struct CredentialGraphSet {
    /// Group key (wildcard-instance address string) → graphs, newest first.
    groups: BTreeMap<String, Vec<CredentialGraph>>,
}

impl CredentialGraphSet {
    /// Index a fetched batch of graphs.
    ///
    /// Rejects keyring-version ties within a group and cyclic or
    /// version-inverted `previous` chains — both are registry corruption.
    pub fn build(graphs: Vec<CredentialGraph>) -> Result<Self> {
        let mut groups: BTreeMap<String, Vec<CredentialGraph>> = BTreeMap::new();
        for graph in graphs {
            groups.entry(graph.group_key()).or_default().push(graph);
        }

        for (key, group) in groups.iter_mut() {
            group.sort_by(|a, b| b.keyring_version().cmp(&a.keyring_version()));
            for pair in group.windows(2) {
                if pair[0].keyring_version() == pair[1].keyring_version() {
                    return Err(GraphError::MalformedGraph(format!(
                        "keyring version tie in group {}",
                        key
                    ))
                    .into());
                }
            }
            validate_chains(group)?;
        }

        Ok(Self { groups })
    }

    /// Graphs still worth decrypting.
    ///
    /// Walks each group newest to oldest carrying the set of shadowed
    /// credential ids. A graph survives if it contributed at least one
    /// unshadowed, set credential — and the newest graph of a group always
    /// survives: it is the current home for the address even when empty.
    pub fn active(&self) -> Vec<&CredentialGraph> {
        self.active_credentials()
            .into_iter()
            .map(|(graph, _)| graph)
            .collect()
    }

    /// Active graphs paired with their unshadowed credentials.
    ///
    /// Unset tombstones that nothing newer has superseded are included so
    /// retrieval can report them with their original state; they never
    /// count toward a graph's survival on their own.
    pub fn active_credentials(&self) -> Vec<(&CredentialGraph, Vec<&Envelope<Credential>>)> {
        let mut out = Vec::new();
        for group in self.groups.values() {
            self.walk_group(group, |graph, unshadowed, is_newest| {
                if is_newest || unshadowed.iter().any(|c| c.body.is_set()) {
                    out.push((graph, unshadowed.to_vec()));
                }
            });
        }
        out
    }

    /// Active credentials living under a keyring with a revocation claim.
    ///
    /// A revoked member may already have observed the MEK, so every value
    /// still reachable through that keyring needs a fresh value under a
    /// fresh keyring. Superseded credentials are never reported.
    pub fn need_rotation(&self) -> Vec<&Envelope<Credential>> {
        let mut out: Vec<&Envelope<Credential>> = Vec::new();
        for group in self.groups.values() {
            self.walk_group(group, |graph, unshadowed, _is_newest| {
                if graph.has_revocations() {
                    out.extend(unshadowed.iter().filter(|c| c.body.is_set()).copied());
                }
            });
        }
        out
    }

    /// The graph a new credential for `address` should be appended to:
    /// highest keyring version in the address's group.
    pub fn head(&self, address: &Address) -> Option<&CredentialGraph> {
        let key = address.with_wildcard_instance().to_string();
        self.groups.get(&key).and_then(|group| group.first())
    }

    /// The authoritative chain tail for a named credential: the highest
    /// credential version across *all* graph versions in the group. May
    /// live in an older keyring than [`head`].
    pub fn head_credential(
        &self,
        address: &Address,
        name: &str,
    ) -> Option<&Envelope<Credential>> {
        let key = address.with_wildcard_instance().to_string();
        self.groups
            .get(&key)?
            .iter()
            .flat_map(|graph| graph.credentials.iter())
            .filter(|c| c.body.name == name && c.body.address == *address)
            .max_by_key(|c| c.body.version)
    }

    /// All graphs, newest first within each group.
    pub fn graphs(&self) -> impl Iterator<Item = &CredentialGraph> {
        self.groups.values().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Shared newest-to-oldest walk. Calls `visit` with each graph and the
    /// credentials of that graph that no newer credential shadows.
    ///
    /// A `previous` reference always targets a same-or-older graph, so a
    /// graph's own references join the shadow set before its credentials
    /// are filtered: successive versions appended under one keyring
    /// shadow each other just like versions split across keyrings.
    fn walk_group<'a, F>(&self, group: &'a [CredentialGraph], mut visit: F)
    where
        F: FnMut(&'a CredentialGraph, &[&'a Envelope<Credential>], bool),
    {
        let mut shadowed: HashSet<Id> = HashSet::new();
        for (index, graph) in group.iter().enumerate() {
            for credential in &graph.credentials {
                if let Some(previous) = credential.body.previous {
                    shadowed.insert(previous);
                }
            }

            let unshadowed: Vec<&Envelope<Credential>> = graph
                .credentials
                .iter()
                .filter(|credential| !shadowed.contains(&credential.id))
                .collect();

            visit(graph, &unshadowed, index == 0);
        }
    }
}

/// Walk every `previous` chain in a group, rejecting cycles and
/// non-increasing version numbers.
fn validate_chains(group: &[CredentialGraph]) -> Result<()> {
    let mut arena: HashMap<Id, &Envelope<Credential>> = HashMap::new();
    for graph in group {
        for credential in &graph.credentials {
            arena.insert(credential.id, credential);
        }
    }

    for start in arena.values() {
        let mut seen: HashSet<Id> = HashSet::new();
        let mut current = *start;
        seen.insert(current.id);

        while let Some(previous_id) = current.body.previous {
            if !seen.insert(previous_id) {
                return Err(GraphError::MalformedGraph(format!(
                    "credential chain cycle at {}",
                    previous_id
                ))
                .into());
            }
            let Some(&previous) = arena.get(&previous_id) else {
                // The ancestor may live outside the fetched window.
                break;
            };
            if previous.body.version >= current.body.version {
                return Err(GraphError::MalformedGraph(format!(
                    "credential chain version does not increase at {}",
                    previous_id
                ))
                .into());
            }
            current = previous;
        }
    }

    Ok(())
}
