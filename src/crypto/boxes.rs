//! Authenticated public-key encryption (box).
//!
//! Static-static X25519 Diffie-Hellman, wrapping key derived from the
//! shared secret via BLAKE3 keyed hash over the nonce, payload sealed with
//! XChaCha20-Poly1305. Used exclusively to wrap a keyring MEK for one
//! recipient.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::crypto::kdf::{self, NONCE_LEN};
use crate::crypto::secure::{SecretBytes32, SecretVec};
use crate::error::{CryptoError, Result};

/// An X25519 keypair. The private half leaves the engine only sealed.
pub struct EncryptionKeyPair {
    public: PublicKey,
    secret: StaticSecret,
}

impl EncryptionKeyPair {
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { public, secret }
    }

    /// Rebuild a keypair from a decrypted private half.
    pub fn from_secret(bytes: &SecretBytes32) -> Self {
        let secret = StaticSecret::from(*bytes.as_bytes());
        let public = PublicKey::from(&secret);
        Self { public, secret }
    }

    /// Private half, for sealing before storage.
    pub fn to_secret(&self) -> SecretBytes32 {
        SecretBytes32::new(self.secret.to_bytes())
    }

    pub fn public_bytes(&self) -> [u8; 32] {
        self.public.to_bytes()
    }

    pub fn secret_key(&self) -> &StaticSecret {
        &self.secret
    }
}

impl std::fmt::Debug for EncryptionKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKeyPair")
            .field("public", &hex::encode(self.public_bytes()))
            .finish()
    }
}

/// Derive the per-use wrapping key for a (shared secret, nonce) pair.
fn wrapping_key(
    my_secret: &StaticSecret,
    their_public: &[u8; 32],
    nonce: &[u8; NONCE_LEN],
) -> SecretBytes32 {
    let shared = my_secret.diffie_hellman(&PublicKey::from(*their_public));
    kdf::derive_key(&SecretBytes32::new(*shared.as_bytes()), nonce)
}

/// Wrap plaintext for one recipient. Returns (ciphertext-with-tag, nonce).
pub fn box_seal(
    plaintext: &[u8],
    my_secret: &StaticSecret,
    their_public: &[u8; 32],
) -> Result<(Vec<u8>, [u8; NONCE_LEN])> {
    let nonce = kdf::generate_nonce();
    let key = wrapping_key(my_secret, their_public, &nonce);
    let cipher = XChaCha20Poly1305::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|_| CryptoError::InvalidKey("aead rejected plaintext".to_string()))?;

    Ok((ciphertext, nonce))
}

/// Open a wrapped payload from a known sender.
///
/// Fails with `CryptoError::Decryption` on tamper or key mismatch.
pub fn box_open(
    ciphertext: &[u8],
    nonce: &[u8; NONCE_LEN],
    my_secret: &StaticSecret,
    their_public: &[u8; 32],
) -> Result<SecretVec> {
    let key = wrapping_key(my_secret, their_public, nonce);
    let cipher = XChaCha20Poly1305::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

    let plaintext = cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Decryption)?;

    Ok(SecretVec::new(plaintext))
}

/// Re-wrap a secret for a new recipient without exposing it to the caller.
///
/// Opens a wrapping addressed to `old_public`'s owner (us, via our own
/// secret) and produces a fresh wrapping addressed to `new_public`. The
/// plaintext exists only inside this function's scope.
pub fn clone_wrapped(
    ciphertext: &[u8],
    nonce: &[u8; NONCE_LEN],
    my_secret: &StaticSecret,
    old_public: &[u8; 32],
    new_public: &[u8; 32],
) -> Result<(Vec<u8>, [u8; NONCE_LEN])> {
    let plaintext = box_open(ciphertext, nonce, my_secret, old_public)?;
    box_seal(plaintext.as_bytes(), my_secret, new_public)
}
