//! Cryptographic primitives engine.
//!
//! Symmetric sealing under per-use derived keys, passphrase stretching,
//! Ed25519 signing, and X25519 box encryption for MEK distribution. All
//! unwrapped key material is held in the zeroizing containers from
//! [`secure`] and never outlives the call that needed it.

pub mod boxes;
pub mod kdf;
pub mod master;
pub mod seal;
pub mod secure;
pub mod sign;

pub use boxes::{box_open, box_seal, clone_wrapped, EncryptionKeyPair};
pub use kdf::{derive_key, generate_nonce, stretch_passphrase, NONCE_LEN, SALT_LEN};
pub use master::{MasterKey, SealedMasterKey};
pub use seal::{generate_key, seal, seal_with_nonce, unseal};
pub use secure::{SecretBytes32, SecretVec};
pub use sign::{verify, SigningKeyPair};
