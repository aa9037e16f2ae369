//! Registry, key-directory, and session boundaries.
//!
//! The core never speaks HTTP; it consumes these traits. Implementations
//! own transport, retries, and timeouts. Ids are content-derived hashes
//! and the registry is the id authority: POSTing returns the canonical
//! record.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::crypto::kdf::NONCE_LEN;
use crate::crypto::master::SealedMasterKey;
use crate::crypto::secure::SecretVec;
use crate::envelope::{Body, Envelope};
use crate::error::Result;
use crate::graph::{Credential, CredentialGraph, KeyringMember};
use crate::types::{serde_hex, Id, KeyType};

/// System team holding every human principal of an org.
pub const SYSTEM_TEAM_MEMBER: &str = "member";

/// System team holding an org's machine principals.
pub const SYSTEM_TEAM_MACHINE: &str = "machine";

/// A directory entry: one public key of one owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeySegment {
    pub key_id: Id,
    pub owner_id: Id,
    pub key_type: KeyType,
    #[serde(with = "serde_hex::key32")]
    pub public_key: [u8; 32],
}

impl PublicKeySegment {
    /// Directory ids are content-derived from the key bytes.
    pub fn derive_key_id(public_key: &[u8; 32]) -> Id {
        Id::derive("public_key", public_key)
    }
}

/// A private key half sealed under its owner's master key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedPrivateKey {
    #[serde(with = "serde_hex::vec")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "serde_hex::nonce")]
    pub nonce: [u8; NONCE_LEN],
}

/// One sealed keypair held by the session for the acting principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedKeypair {
    pub key_id: Id,
    #[serde(with = "serde_hex::key32")]
    pub public_key: [u8; 32],
    pub private: SealedPrivateKey,
}

/// The acting principal's current keypairs for one org.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedKeypairs {
    pub signing: SealedKeypair,
    pub encryption: SealedKeypair,
}

/// Self-signed assertion of a newly generated public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyClaim {
    pub owner_id: Id,
    pub key_type: KeyType,
    #[serde(with = "serde_hex::key32")]
    pub public_key: [u8; 32],
}

impl Body for KeyClaim {
    const TYPE_TAG: &'static str = "key_claim";
}

/// Everything the registry needs to register one new keypair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeypairUpload {
    pub org: String,
    pub owner_id: Id,
    pub key_type: KeyType,
    #[serde(with = "serde_hex::key32")]
    pub public_key: [u8; 32],
    pub sealed_private_key: SealedPrivateKey,
    pub claim: Envelope<KeyClaim>,
}

/// The remote registry of graphs, teams, and keypairs.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Graphs whose keyring group covers an exact address.
    async fn graphs_by_path(&self, path: &Address) -> Result<Vec<CredentialGraph>>;

    /// Graphs matching a pattern address. `contains` selects the
    /// registry's substring search mode, required when the project
    /// segment is not a literal.
    async fn graphs_by_pattern(
        &self,
        pattern: &Address,
        contains: bool,
    ) -> Result<Vec<CredentialGraph>>;

    /// Graphs with a membership for `owner` anywhere in `org`.
    async fn graphs_by_owner(&self, org: &str, owner: Id) -> Result<Vec<CredentialGraph>>;

    /// Persist a full new graph. All-or-nothing: the registry never
    /// stores a keyring missing some of its member shares.
    async fn post_graph(&self, graph: CredentialGraph) -> Result<CredentialGraph>;

    /// Append one credential to an existing keyring.
    async fn post_credential(
        &self,
        credential: Envelope<Credential>,
    ) -> Result<Envelope<Credential>>;

    /// Batch-upload memberships produced by an invite approval.
    async fn post_members(&self, members: Vec<Envelope<KeyringMember>>) -> Result<()>;

    /// Register freshly generated keypairs. One batch, all-or-nothing.
    async fn post_keypairs(&self, uploads: Vec<KeypairUpload>) -> Result<()>;

    /// Principal ids in one of an org's system teams.
    async fn system_team_members(&self, org: &str, team: &str) -> Result<Vec<Id>>;

    /// Key-owning sub-identities of a machine (its active tokens).
    async fn machine_tokens(&self, machine: Id) -> Result<Vec<Id>>;

    /// Names of every project in an org.
    async fn org_projects(&self, org: &str) -> Result<Vec<String>>;
}

/// The public-key directory.
#[async_trait]
pub trait KeyDirectory: Send + Sync {
    /// The currently active (non-revoked) key of `owner` for `key_type`,
    /// or `RegistryError::MissingKeyForOwner`.
    async fn find_active(&self, owner: Id, key_type: KeyType) -> Result<PublicKeySegment>;

    /// Look up a key by id, or `RegistryError::KeyNotFound`. With
    /// `require_active`, a revoked key is treated as absent.
    async fn find(&self, key_id: Id, require_active: bool) -> Result<PublicKeySegment>;
}

/// The authenticated local session of the acting principal.
pub trait Session: Send + Sync {
    fn auth_id(&self) -> Id;

    /// The passphrase, used once per workflow to unseal the master key.
    fn passphrase(&self) -> SecretVec;

    fn sealed_master_key(&self) -> SealedMasterKey;

    /// The principal's current keypairs for an org.
    fn keypairs(&self, org: &str) -> Result<SealedKeypairs>;

    /// A (possibly historical) encryption keypair by key id.
    fn encryption_key(&self, key_id: Id) -> Result<SealedKeypair>;
}
