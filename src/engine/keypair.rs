//! Generate-keypair workflow.

use tracing::debug;

use crate::crypto::{self, EncryptionKeyPair, SigningKeyPair};
use crate::engine::{Engine, OpContext};
use crate::envelope::Envelope;
use crate::progress::steps;
use crate::registry::{
    KeyClaim, KeyDirectory, KeypairUpload, PublicKeySegment, Registry, SealedPrivateKey, Session,
};
use crate::error::Result;
use crate::types::{Id, KeyType};

const SCHEMA_VERSION: u8 = 2;

/// Directory ids of a freshly registered pair of keypairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratedKeypairs {
    pub signing_key_id: Id,
    pub encryption_key_id: Id,
}

impl<R: Registry, D: KeyDirectory, S: Session> Engine<R, D, S> {
    /// Generate and register signing and encryption keypairs for an org.
    ///
    /// Used for first enrollment and for rotating the principal's own
    /// keys; retiring the previous generation is a separate, explicit
    /// revocation. Private halves leave this function only sealed under
    /// the master key; both uploads land in one all-or-nothing batch.
    pub async fn generate_keypair(&self, ctx: &OpContext, org: &str) -> Result<GeneratedKeypairs> {
        ctx.checkpoint()?;
        let master = self.unseal_master()?;
        let me = self.session().auth_id();

        let signing = SigningKeyPair::generate();
        let encryption = EncryptionKeyPair::generate();

        let (signing_ciphertext, signing_nonce) =
            crypto::seal(signing.to_secret().as_bytes(), master.secret())?;
        let (encryption_ciphertext, encryption_nonce) =
            crypto::seal(encryption.to_secret().as_bytes(), master.secret())?;

        // Each claim is signed by the new signing key; the signing key's
        // own claim is self-signed and carries no key id.
        let signing_claim = Envelope::sign(
            SCHEMA_VERSION,
            KeyClaim {
                owner_id: me,
                key_type: KeyType::Signing,
                public_key: signing.public_bytes(),
            },
            &signing,
            None,
        )?;
        let signing_key_id = PublicKeySegment::derive_key_id(&signing.public_bytes());
        let encryption_claim = Envelope::sign(
            SCHEMA_VERSION,
            KeyClaim {
                owner_id: me,
                key_type: KeyType::Encryption,
                public_key: encryption.public_bytes(),
            },
            &signing,
            Some(signing_key_id),
        )?;
        let encryption_key_id = PublicKeySegment::derive_key_id(&encryption.public_bytes());

        let uploads = vec![
            KeypairUpload {
                org: org.to_string(),
                owner_id: me,
                key_type: KeyType::Signing,
                public_key: signing.public_bytes(),
                sealed_private_key: SealedPrivateKey {
                    ciphertext: signing_ciphertext,
                    nonce: signing_nonce,
                },
                claim: signing_claim,
            },
            KeypairUpload {
                org: org.to_string(),
                owner_id: me,
                key_type: KeyType::Encryption,
                public_key: encryption.public_bytes(),
                sealed_private_key: SealedPrivateKey {
                    ciphertext: encryption_ciphertext,
                    nonce: encryption_nonce,
                },
                claim: encryption_claim,
            },
        ];

        ctx.checkpoint()?;
        self.registry().post_keypairs(uploads).await?;
        ctx.notify(steps::KEYPAIR_GENERATED);

        debug!(org, owner = %me, "keypairs registered");
        Ok(GeneratedKeypairs {
            signing_key_id,
            encryption_key_id,
        })
    }
}
