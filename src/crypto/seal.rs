//! Symmetric authenticated sealing.
//!
//! Each seal draws a random 24-byte nonce, derives a one-time key from the
//! master key, and encrypts with XChaCha20-Poly1305 under that nonce. The
//! nonce is large enough for random generation without collision risk.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;

use crate::crypto::kdf::{self, NONCE_LEN};
use crate::crypto::secure::{SecretBytes32, SecretVec};
use crate::error::{CryptoError, Result};

/// Generate a random 256-bit symmetric key (a fresh MEK).
pub fn generate_key() -> SecretBytes32 {
    let mut key = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut key);
    SecretBytes32::new(key)
}

/// Seal plaintext under a per-use key derived from `master`.
///
/// Returns (ciphertext-with-tag, nonce).
pub fn seal(plaintext: &[u8], master: &SecretBytes32) -> Result<(Vec<u8>, [u8; NONCE_LEN])> {
    let nonce = kdf::generate_nonce();
    let ciphertext = seal_with_nonce(plaintext, master, &nonce)?;
    Ok((ciphertext, nonce))
}

/// Seal under a caller-supplied nonce. The nonce must be unique per master key.
pub fn seal_with_nonce(
    plaintext: &[u8],
    master: &SecretBytes32,
    nonce: &[u8; NONCE_LEN],
) -> Result<Vec<u8>> {
    let key = kdf::derive_key(master, nonce);
    let cipher = XChaCha20Poly1305::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

    cipher
        .encrypt(XNonce::from_slice(nonce), plaintext)
        .map_err(|_| CryptoError::InvalidKey("aead rejected plaintext".to_string()).into())
}

/// Open a sealed ciphertext.
///
/// Fails with `CryptoError::Decryption` on tamper or wrong master key;
/// never returns wrong plaintext.
pub fn unseal(
    ciphertext: &[u8],
    nonce: &[u8; NONCE_LEN],
    master: &SecretBytes32,
) -> Result<SecretVec> {
    let key = kdf::derive_key(master, nonce);
    let cipher = XChaCha20Poly1305::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

    let plaintext = cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Decryption)?;

    Ok(SecretVec::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn master() -> SecretBytes32 {
        SecretBytes32::new([0x13; 32])
    }

    #[test]
    fn test_seal_unseal_roundtrip() {
        let (ciphertext, nonce) = seal(b"hunter2", &master()).unwrap();
        let plaintext = unseal(&ciphertext, &nonce, &master()).unwrap();
        assert_eq!(plaintext.as_bytes(), b"hunter2");
    }

    #[test]
    fn test_seal_fresh_nonce_each_call() {
        let (c1, n1) = seal(b"same", &master()).unwrap();
        let (c2, n2) = seal(b"same", &master()).unwrap();
        assert_ne!(n1, n2);
        assert_ne!(c1, c2);
    }

    #[test]
    fn test_unseal_wrong_master_fails() {
        let (ciphertext, nonce) = seal(b"secret", &master()).unwrap();
        let other = SecretBytes32::new([0x14; 32]);
        assert!(unseal(&ciphertext, &nonce, &other).is_err());
    }

    #[test]
    fn test_unseal_corrupted_ciphertext_fails() {
        let (mut ciphertext, nonce) = seal(b"secret", &master()).unwrap();
        ciphertext[0] ^= 0x01;
        assert!(unseal(&ciphertext, &nonce, &master()).is_err());
    }

    #[test]
    fn test_unseal_wrong_nonce_fails() {
        let (ciphertext, mut nonce) = seal(b"secret", &master()).unwrap();
        nonce[0] ^= 0x01;
        assert!(unseal(&ciphertext, &nonce, &master()).is_err());
    }

    #[test]
    fn test_seal_empty_plaintext() {
        let (ciphertext, nonce) = seal(b"", &master()).unwrap();
        let plaintext = unseal(&ciphertext, &nonce, &master()).unwrap();
        assert!(plaintext.is_empty());
    }
}
