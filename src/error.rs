//! Error taxonomy.
//!
//! Every failure a caller can observe is a typed variant they can match on.
//! The top-level [`Error`] wraps focused sub-enums per subsystem.

use thiserror::Error;

use crate::types::Id;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("malformed address: {0}")]
    MalformedAddress(String),

    #[error("operation canceled")]
    Cancelled,
}

/// Failures inside the crypto engine.
///
/// `Decryption` is deliberately payload-free: the cause (tamper vs wrong
/// key) is indistinguishable by construction and must never be guessed at.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("decryption failed: ciphertext rejected")]
    Decryption,

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("signature verification failed")]
    BadSignature,
}

/// Failures observed while reading or resolving credential graphs.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("no keyring membership for owner {0}")]
    MembershipNotFound(Id),

    #[error("no keyring for address {0}")]
    KeyringNotFound(String),

    #[error("credential not found: {0}")]
    CredentialNotFound(String),

    #[error("multiple unrevoked memberships for owner {0}")]
    DuplicateMembership(Id),

    #[error("malformed graph data: {0}")]
    MalformedGraph(String),
}

/// Failures surfaced by the registry and public-key directory boundaries.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("no active {key_type} key for owner {owner}")]
    MissingKeyForOwner { owner: Id, key_type: &'static str },

    #[error("public key not found: {0}")]
    KeyNotFound(Id),

    #[error("no valid keypair for org {0}")]
    MissingValidKeypair(String),

    #[error("registry error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, Error>;
