//! Key derivation.
//!
//! Two derivations live here: the scrypt stretch that turns a passphrase
//! into the key protecting the master key at rest, and the BLAKE3 keyed
//! hash that produces a fresh per-use key for every sealing operation.
//! A master key is never handed to a cipher directly.

use rand::RngCore;

use crate::crypto::secure::SecretBytes32;
use crate::error::{CryptoError, Result};

/// Salt length for passphrase stretching (16 bytes).
pub const SALT_LEN: usize = 16;

/// Nonce length shared by every sealing operation (24 bytes).
pub const NONCE_LEN: usize = 24;

// scrypt cost parameters: N=2^15, r=8, p=1.
const SCRYPT_LOG_N: u8 = 15;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

/// Generate a random salt for passphrase stretching.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}

/// Generate a random 24-byte nonce.
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Stretch a passphrase into a 32-byte key with scrypt.
pub fn stretch_passphrase(passphrase: &[u8], salt: &[u8]) -> Result<SecretBytes32> {
    stretch_with(passphrase, salt, SCRYPT_LOG_N)
}

/// Stretch with reduced cost for tests (fast but insecure).
#[cfg(test)]
pub fn stretch_passphrase_fast(passphrase: &[u8], salt: &[u8]) -> Result<SecretBytes32> {
    stretch_with(passphrase, salt, 4)
}

fn stretch_with(passphrase: &[u8], salt: &[u8], log_n: u8) -> Result<SecretBytes32> {
    let params = scrypt::Params::new(log_n, SCRYPT_R, SCRYPT_P, 32)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    let mut output = [0u8; 32];
    scrypt::scrypt(passphrase, salt, &params, &mut output)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    Ok(SecretBytes32::new(output))
}

/// Derive a one-time symmetric key from a master key and a nonce.
///
/// BLAKE3 keyed hash: the master key keys the hash, the nonce is the
/// message, so every nonce yields an independent cipher key.
pub fn derive_key(master: &SecretBytes32, nonce: &[u8; NONCE_LEN]) -> SecretBytes32 {
    SecretBytes32::new(blake3::keyed_hash(master.as_bytes(), nonce).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stretch_deterministic() {
        let salt = [0x42u8; SALT_LEN];
        let k1 = stretch_passphrase_fast(b"my passphrase", &salt).unwrap();
        let k2 = stretch_passphrase_fast(b"my passphrase", &salt).unwrap();
        assert_eq!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn test_stretch_different_passphrase() {
        let salt = [0x42u8; SALT_LEN];
        let k1 = stretch_passphrase_fast(b"passphrase1", &salt).unwrap();
        let k2 = stretch_passphrase_fast(b"passphrase2", &salt).unwrap();
        assert_ne!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn test_stretch_different_salt() {
        let k1 = stretch_passphrase_fast(b"passphrase", &[0x01; SALT_LEN]).unwrap();
        let k2 = stretch_passphrase_fast(b"passphrase", &[0x02; SALT_LEN]).unwrap();
        assert_ne!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn test_derive_key_varies_with_nonce() {
        let master = SecretBytes32::new([0x07; 32]);
        let k1 = derive_key(&master, &[0x01; NONCE_LEN]);
        let k2 = derive_key(&master, &[0x02; NONCE_LEN]);
        assert_ne!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn test_derive_key_varies_with_master() {
        let nonce = [0x05; NONCE_LEN];
        let k1 = derive_key(&SecretBytes32::new([0x01; 32]), &nonce);
        let k2 = derive_key(&SecretBytes32::new([0x02; 32]), &nonce);
        assert_ne!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn test_derive_key_never_echoes_master() {
        let master = SecretBytes32::new([0x07; 32]);
        let derived = derive_key(&master, &[0x00; NONCE_LEN]);
        assert_ne!(derived.as_bytes(), master.as_bytes());
    }

    #[test]
    fn test_generate_salt_unique() {
        assert_ne!(generate_salt(), generate_salt());
    }

    #[test]
    fn test_generate_nonce_unique() {
        assert_ne!(generate_nonce(), generate_nonce());
    }
}
