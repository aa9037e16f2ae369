//! Credential graph model.
//!
//! A graph is one keyring plus the membership, claim, and credential
//! envelopes attached to it. Graphs are pure data; the derived queries
//! here are what the resolver in [`set`] builds on.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::error::{GraphError, Result};
use crate::types::Id;

pub mod credential;
pub mod key_index;
pub mod keyring;
pub mod set;

pub use credential::{Credential, CredentialState};
pub use key_index::KeyIndex;
pub use keyring::{Claim, ClaimKind, Keyring, KeyringMember, MekShare, MemberV1, MemberV2};
pub use set::CredentialGraphSet;

/// One keyring with its members, revocation claims, and credentials.
///
/// Doubles as the registry wire record; the JSON shape is the envelope
/// composition the server stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialGraph {
    pub keyring: Envelope<Keyring>,
    pub members: Vec<Envelope<KeyringMember>>,
    pub claims: Vec<Envelope<Claim>>,
    pub credentials: Vec<Envelope<Credential>>,
}

impl CredentialGraph {
    pub fn keyring_id(&self) -> Id {
        self.keyring.id
    }

    pub fn keyring_version(&self) -> u32 {
        self.keyring.body.keyring_version
    }

    /// Canonical grouping key: the keyring's wildcard-instance address.
    pub fn group_key(&self) -> String {
        self.keyring.body.address.to_string()
    }

    /// True iff any revocation claim targets a current member.
    pub fn has_revocations(&self) -> bool {
        let member_ids: HashSet<Id> = self.members.iter().map(|m| m.id).collect();
        self.claims
            .iter()
            .any(|claim| member_ids.contains(&claim.body.member_id))
    }

    /// Ids of members with a revocation claim against them.
    fn revoked_member_ids(&self) -> HashSet<Id> {
        self.claims.iter().map(|claim| claim.body.member_id).collect()
    }

    /// The single unrevoked membership for `owner`, with its MEK share.
    ///
    /// More than one unrevoked membership for the same owner is registry
    /// corruption and is reported, never silently resolved.
    pub fn find_member(&self, owner: Id) -> Result<(&Envelope<KeyringMember>, &MekShare)> {
        let revoked = self.revoked_member_ids();

        let mut found = None;
        for member in &self.members {
            if member.body.owner_id() != owner || revoked.contains(&member.id) {
                continue;
            }
            if found.is_some() {
                return Err(GraphError::DuplicateMembership(owner).into());
            }
            found = Some(member);
        }

        found
            .map(|member| (member, member.body.share()))
            .ok_or_else(|| GraphError::MembershipNotFound(owner).into())
    }

    /// Look up a credential envelope by id.
    pub fn credential(&self, id: Id) -> Option<&Envelope<Credential>> {
        self.credentials.iter().find(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::address::Address;
    use crate::crypto::kdf::NONCE_LEN;
    use crate::crypto::sign::SigningKeyPair;
    use crate::envelope::Envelope;
    use crate::graph::keyring::{MekShare, MemberV2};

    fn graph_with_members(owners: &[(Id, bool)]) -> CredentialGraph {
        let signer = SigningKeyPair::generate();
        let keyring = Envelope::sign(
            2,
            Keyring {
                address: Address::parse("/acme/api/production/auth/user/*").unwrap(),
                keyring_version: 1,
                previous: None,
                created_at: Utc::now(),
            },
            &signer,
            None,
        )
        .unwrap();

        let mut members = Vec::new();
        let mut claims = Vec::new();
        for (index, (owner, revoked)) in owners.iter().enumerate() {
            let member = Envelope::sign(
                2,
                KeyringMember::V2(MemberV2 {
                    keyring_id: keyring.id,
                    owner_id: *owner,
                    public_key_id: Id::derive("key", &[index as u8]),
                    encrypting_key_id: Id::derive("key", b"creator"),
                    share: MekShare {
                        ciphertext: vec![index as u8],
                        nonce: [0u8; NONCE_LEN],
                    },
                    created_at: Utc::now(),
                }),
                &signer,
                None,
            )
            .unwrap();

            if *revoked {
                claims.push(
                    Envelope::sign(
                        2,
                        Claim {
                            member_id: member.id,
                            kind: ClaimKind::Revocation,
                            created_at: Utc::now(),
                        },
                        &signer,
                        None,
                    )
                    .unwrap(),
                );
            }
            members.push(member);
        }

        CredentialGraph {
            keyring,
            members,
            claims,
            credentials: Vec::new(),
        }
    }

    #[test]
    fn test_find_member() {
        let alice = Id::derive("user", b"alice");
        let bob = Id::derive("user", b"bob");
        let graph = graph_with_members(&[(alice, false), (bob, false)]);

        let (member, _share) = graph.find_member(alice).unwrap();
        assert_eq!(member.body.owner_id(), alice);
    }

    #[test]
    fn test_find_member_skips_revoked() {
        let alice = Id::derive("user", b"alice");
        let graph = graph_with_members(&[(alice, true)]);

        assert!(graph.find_member(alice).is_err());
        assert!(graph.has_revocations());
    }

    #[test]
    fn test_find_member_duplicate_is_error() {
        let alice = Id::derive("user", b"alice");
        let graph = graph_with_members(&[(alice, false), (alice, false)]);

        // Same owner enrolled twice without a revocation: malformed data.
        let err = graph.find_member(alice).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Graph(GraphError::DuplicateMembership(_))
        ));
    }

    #[test]
    fn test_revoked_then_reenrolled_resolves_to_new_member() {
        let alice = Id::derive("user", b"alice");
        let graph = graph_with_members(&[(alice, true), (alice, false)]);

        let (member, _share) = graph.find_member(alice).unwrap();
        assert!(graph
            .claims
            .iter()
            .all(|claim| claim.body.member_id != member.id));
    }

    #[test]
    fn test_no_revocations_without_claims() {
        let alice = Id::derive("user", b"alice");
        let graph = graph_with_members(&[(alice, false)]);
        assert!(!graph.has_revocations());
    }
}
