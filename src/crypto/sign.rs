//! Ed25519 signing.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use crate::crypto::secure::SecretBytes32;
use crate::error::{CryptoError, Result};

pub const SIGNATURE_LEN: usize = 64;
pub const PUBLIC_KEY_LEN: usize = 32;

/// An Ed25519 keypair. The private half leaves the engine only sealed.
pub struct SigningKeyPair {
    verifying: VerifyingKey,
    signing: SigningKey,
}

impl SigningKeyPair {
    pub fn generate() -> Self {
        let signing = SigningKey::generate(&mut OsRng);
        let verifying = signing.verifying_key();
        Self { verifying, signing }
    }

    /// Rebuild a keypair from a decrypted private half.
    pub fn from_secret(secret: &SecretBytes32) -> Self {
        let signing = SigningKey::from_bytes(secret.as_bytes());
        let verifying = signing.verifying_key();
        Self { verifying, signing }
    }

    /// Private half, for sealing before storage.
    pub fn to_secret(&self) -> SecretBytes32 {
        SecretBytes32::new(self.signing.to_bytes())
    }

    pub fn public_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.verifying.to_bytes()
    }

    pub fn sign(&self, payload: &[u8]) -> [u8; SIGNATURE_LEN] {
        self.signing.sign(payload).to_bytes()
    }
}

impl std::fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("public", &hex::encode(self.public_bytes()))
            .finish()
    }
}

/// Verify a signature over a payload.
pub fn verify(
    payload: &[u8],
    signature: &[u8; SIGNATURE_LEN],
    public_key: &[u8; PUBLIC_KEY_LEN],
) -> Result<()> {
    let verifying = VerifyingKey::from_bytes(public_key).map_err(|_| CryptoError::BadSignature)?;
    let signature = Signature::from_bytes(signature);
    verifying
        .verify(payload, &signature)
        .map_err(|_| CryptoError::BadSignature.into())
}
