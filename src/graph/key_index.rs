//! Key-generation index.
//!
//! Groups the graphs a principal belongs to by the public-key id their
//! membership is wrapped to. A principal that has rotated its own keys
//! has historical memberships under prior key generations; retrieval
//! unwraps each group with the matching private key instead of guessing.

use std::collections::BTreeMap;

use crate::error::{Error, GraphError, Result};
use crate::graph::CredentialGraph;
use crate::types::Id;

#[derive(Debug, Default)]
pub struct KeyIndex<'a> {
    by_key: BTreeMap<Id, Vec<&'a CredentialGraph>>,
}

impl<'a> KeyIndex<'a> {
    /// Index `graphs` by the key id enrolling `owner`.
    ///
    /// Graphs without a membership for the owner are skipped; duplicate
    /// unrevoked memberships propagate as the malformed-data error they are.
    pub fn build(graphs: &[&'a CredentialGraph], owner: Id) -> Result<Self> {
        let mut by_key: BTreeMap<Id, Vec<&'a CredentialGraph>> = BTreeMap::new();

        for &graph in graphs {
            match graph.find_member(owner) {
                Ok((member, _share)) => {
                    by_key
                        .entry(member.body.public_key_id())
                        .or_default()
                        .push(graph);
                }
                Err(Error::Graph(GraphError::MembershipNotFound(_))) => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(Self { by_key })
    }

    /// Key ids with at least one graph, in stable order.
    pub fn key_ids(&self) -> impl Iterator<Item = Id> + '_ {
        self.by_key.keys().copied()
    }

    pub fn graphs_for(&self, key_id: Id) -> &[&'a CredentialGraph] {
        self.by_key
            .get(&key_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
