//! Credential record.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::crypto::kdf::NONCE_LEN;
use crate::envelope::Body;
use crate::types::{serde_hex, Id};

/// Lifecycle state of a credential version.
///
/// An `Unset` version carries no retrievable plaintext; it exists to
/// terminate its `previous` chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialState {
    Set,
    Unset,
}

/// One version of a named secret at an exact address.
///
/// Versions never mutate; a new value appends a new credential whose
/// `previous` points at the version it supersedes. `previous` is an id,
/// not an owning reference — traversal is arena lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Keyring whose MEK encrypts this value.
    pub keyring_id: Id,
    /// Exact (never wildcarded) address.
    pub address: Address,
    /// Unique within the exact address.
    pub name: String,
    #[serde(with = "serde_hex::vec")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "serde_hex::nonce")]
    pub nonce: [u8; NONCE_LEN],
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub previous: Option<Id>,
    /// Strictly increasing along a `previous` chain.
    pub version: u32,
    pub state: CredentialState,
}

impl Body for Credential {
    const TYPE_TAG: &'static str = "credential";
}

impl Credential {
    pub fn is_set(&self) -> bool {
        self.state == CredentialState::Set
    }
}
