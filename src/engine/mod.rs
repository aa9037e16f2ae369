//! Orchestration engine.
//!
//! The four workflows that tie the credential graph, the crypto engine,
//! and the registry together: append a credential, retrieve credentials,
//! approve an invite, generate a principal's keypairs. Each workflow is a
//! single logical transaction on behalf of one principal — any step
//! failure aborts it with nothing half-persisted.

use crate::address::Address;
use crate::crypto::secure::{SecretBytes32, SecretVec};
use crate::crypto::{EncryptionKeyPair, MasterKey, SigningKeyPair};
use crate::error::{CryptoError, Result};
use crate::graph::{CredentialGraph, CredentialState};
use crate::registry::{KeyDirectory, Registry, SealedKeypair, SealedKeypairs, Session};
use crate::types::Id;

mod append;
mod context;
mod invite;
mod keypair;
mod retrieve;

pub use context::{CancellationToken, OpContext};
pub use invite::Invite;
pub use keypair::GeneratedKeypairs;

/// A decrypted credential as handed back to callers.
pub struct PlaintextCredential {
    pub address: Address,
    pub name: String,
    pub value: SecretVec,
    pub version: u32,
    pub state: CredentialState,
}

impl std::fmt::Debug for PlaintextCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaintextCredential")
            .field("address", &self.address.to_string())
            .field("name", &self.name)
            .field("version", &self.version)
            .field("state", &self.state)
            .finish()
    }
}

/// The orchestration engine over the three boundary dependencies.
pub struct Engine<R, D, S> {
    registry: R,
    directory: D,
    session: S,
}

impl<R: Registry, D: KeyDirectory, S: Session> Engine<R, D, S> {
    pub fn new(registry: R, directory: D, session: S) -> Self {
        Self {
            registry,
            directory,
            session,
        }
    }

    pub(crate) fn registry(&self) -> &R {
        &self.registry
    }

    pub(crate) fn directory(&self) -> &D {
        &self.directory
    }

    pub(crate) fn session(&self) -> &S {
        &self.session
    }

    /// Unseal the acting principal's master key for the duration of one
    /// workflow. Dropped (and wiped) when the workflow scope ends.
    pub(crate) fn unseal_master(&self) -> Result<MasterKey> {
        let passphrase = self.session.passphrase();
        self.session.sealed_master_key().unseal(&passphrase)
    }

    /// Unseal the principal's current signing and encryption keypairs.
    pub(crate) fn unseal_keypairs(
        &self,
        org: &str,
        master: &MasterKey,
    ) -> Result<(SigningKeyPair, EncryptionKeyPair, SealedKeypairs)> {
        let sealed = self.session.keypairs(org)?;
        let signing = SigningKeyPair::from_secret(&unseal_private(&sealed.signing, master)?);
        let encryption =
            EncryptionKeyPair::from_secret(&unseal_private(&sealed.encryption, master)?);
        Ok((signing, encryption, sealed))
    }

    /// Unseal one (possibly historical) encryption keypair by key id.
    pub(crate) fn unseal_encryption_key(
        &self,
        key_id: Id,
        master: &MasterKey,
    ) -> Result<EncryptionKeyPair> {
        let sealed = self.session.encryption_key(key_id)?;
        Ok(EncryptionKeyPair::from_secret(&unseal_private(
            &sealed, master,
        )?))
    }

    /// Open the acting principal's MEK share in `graph`.
    pub(crate) async fn unwrap_mek(
        &self,
        graph: &CredentialGraph,
        me: Id,
        encryption: &EncryptionKeyPair,
    ) -> Result<SecretBytes32> {
        let (member, share) = graph.find_member(me)?;
        let wrapper = self
            .directory
            .find(member.body.encrypting_key_id(), false)
            .await?;
        let raw = crate::crypto::box_open(
            &share.ciphertext,
            &share.nonce,
            encryption.secret_key(),
            &wrapper.public_key,
        )?;
        SecretBytes32::from_slice(raw.as_bytes())
            .ok_or_else(|| CryptoError::InvalidKey("mek is not 32 bytes".to_string()).into())
    }
}

fn unseal_private(sealed: &SealedKeypair, master: &MasterKey) -> Result<SecretBytes32> {
    let raw = crate::crypto::unseal(
        &sealed.private.ciphertext,
        &sealed.private.nonce,
        master.secret(),
    )?;
    SecretBytes32::from_slice(raw.as_bytes())
        .ok_or_else(|| CryptoError::InvalidKey("private key is not 32 bytes".to_string()).into())
}
