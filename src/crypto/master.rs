//! Master key lifecycle.
//!
//! One master key per principal. At rest it is sealed under a
//! scrypt-stretched passphrase; it is decrypted on demand at the start of
//! a workflow and wiped when the workflow's scope ends.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::crypto::kdf::{self, NONCE_LEN, SALT_LEN};
use crate::crypto::secure::{SecretBytes32, SecretVec};
use crate::error::{CryptoError, Result};
use crate::types::serde_hex;

/// A principal's decrypted master key.
///
/// Root of every seal/unseal derivation; never persisted in plaintext.
pub struct MasterKey(SecretBytes32);

impl MasterKey {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(SecretBytes32::new(bytes))
    }

    pub fn from_secret(secret: SecretBytes32) -> Self {
        Self(secret)
    }

    pub fn secret(&self) -> &SecretBytes32 {
        &self.0
    }

    /// Seal the master key under a passphrase for storage at rest.
    pub fn seal_with_passphrase(&self, passphrase: &SecretVec) -> Result<SealedMasterKey> {
        let salt = kdf::generate_salt();
        let nonce = kdf::generate_nonce();
        let kek = kdf::stretch_passphrase(passphrase.as_bytes(), &salt)?;

        let cipher = XChaCha20Poly1305::new_from_slice(kek.as_bytes())
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let ciphertext = cipher
            .encrypt(XNonce::from_slice(&nonce), self.0.as_bytes().as_slice())
            .map_err(|_| CryptoError::InvalidKey("aead rejected master key".to_string()))?;

        Ok(SealedMasterKey {
            ciphertext,
            salt,
            nonce,
        })
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(..)")
    }
}

/// The at-rest form of a master key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedMasterKey {
    #[serde(with = "serde_hex::vec")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "serde_hex::salt")]
    pub salt: [u8; SALT_LEN],
    #[serde(with = "serde_hex::nonce")]
    pub nonce: [u8; NONCE_LEN],
}

impl SealedMasterKey {
    /// Decrypt the master key with the owning principal's passphrase.
    pub fn unseal(&self, passphrase: &SecretVec) -> Result<MasterKey> {
        let kek = kdf::stretch_passphrase(passphrase.as_bytes(), &self.salt)?;

        let cipher = XChaCha20Poly1305::new_from_slice(kek.as_bytes())
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let plaintext = cipher
            .decrypt(XNonce::from_slice(&self.nonce), self.ciphertext.as_slice())
            .map_err(|_| CryptoError::Decryption)?;

        let secret = SecretBytes32::from_slice(&plaintext)
            .ok_or_else(|| CryptoError::InvalidKey("master key is not 32 bytes".to_string()))?;
        Ok(MasterKey(secret))
    }
}
