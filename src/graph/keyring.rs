//! Keyring, membership, and revocation records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::crypto::kdf::NONCE_LEN;
use crate::envelope::Body;
use crate::types::{serde_hex, Id};

/// Versioned container owning one Master Encryption Key for an address
/// family (instance segment wildcarded). The MEK itself is never stored;
/// only per-member wrappings of it are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyring {
    /// Address with the instance segment forced to the wildcard.
    pub address: Address,
    /// Increases each time the keyring is replaced.
    pub keyring_version: u32,
    /// Keyring this one replaces, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub previous: Option<Id>,
    pub created_at: DateTime<Utc>,
}

impl Body for Keyring {
    const TYPE_TAG: &'static str = "keyring";
}

/// A member's wrapped copy of the MEK: box-encrypted to the member's
/// public encryption key by the holder of `encrypting_key_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MekShare {
    #[serde(with = "serde_hex::vec")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "serde_hex::nonce")]
    pub nonce: [u8; NONCE_LEN],
}

/// Membership record schemas.
///
/// V1 records predate revocation claims; the engine only ever writes V2.
/// The variant is decided once at deserialization, and the shared query
/// surface below dispatches per variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "schema", rename_all = "snake_case")]
pub enum KeyringMember {
    V1(MemberV1),
    V2(MemberV2),
}

/// Legacy membership: share inline, no claims existed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberV1 {
    pub keyring_id: Id,
    pub owner_id: Id,
    /// The member's public encryption key the share is wrapped to.
    pub public_key_id: Id,
    /// The wrapper's public encryption key.
    pub encrypting_key_id: Id,
    pub share: MekShare,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberV2 {
    pub keyring_id: Id,
    pub owner_id: Id,
    pub public_key_id: Id,
    pub encrypting_key_id: Id,
    pub share: MekShare,
    pub created_at: DateTime<Utc>,
}

impl Body for KeyringMember {
    const TYPE_TAG: &'static str = "keyring_member";
}

impl KeyringMember {
    pub fn keyring_id(&self) -> Id {
        match self {
            Self::V1(m) => m.keyring_id,
            Self::V2(m) => m.keyring_id,
        }
    }

    pub fn owner_id(&self) -> Id {
        match self {
            Self::V1(m) => m.owner_id,
            Self::V2(m) => m.owner_id,
        }
    }

    /// The member's key generation this share is wrapped to.
    pub fn public_key_id(&self) -> Id {
        match self {
            Self::V1(m) => m.public_key_id,
            Self::V2(m) => m.public_key_id,
        }
    }

    /// The key that produced the wrapping (whose owner we open against).
    pub fn encrypting_key_id(&self) -> Id {
        match self {
            Self::V1(m) => m.encrypting_key_id,
            Self::V2(m) => m.encrypting_key_id,
        }
    }

    pub fn share(&self) -> &MekShare {
        match self {
            Self::V1(m) => &m.share,
            Self::V2(m) => &m.share,
        }
    }
}

/// Claim kinds. Revocations are append-only and terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    Revocation,
}

/// An assertion against a specific membership envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub member_id: Id,
    pub kind: ClaimKind,
    pub created_at: DateTime<Utc>,
}

impl Body for Claim {
    const TYPE_TAG: &'static str = "claim";
}
