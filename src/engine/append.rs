//! Append-credential workflow.

use chrono::Utc;
use tracing::{debug, warn};

use crate::address::Address;
use crate::crypto::secure::SecretBytes32;
use crate::crypto::{self, EncryptionKeyPair, SigningKeyPair};
use crate::engine::{Engine, OpContext};
use crate::envelope::Envelope;
use crate::error::{Error, RegistryError, Result};
use crate::graph::{
    Credential, CredentialGraph, CredentialGraphSet, CredentialState, Keyring, KeyringMember,
    MekShare, MemberV2,
};
use crate::progress::steps;
use crate::registry::{
    KeyDirectory, Registry, SealedKeypairs, Session, SYSTEM_TEAM_MACHINE, SYSTEM_TEAM_MEMBER,
};
use crate::types::{Id, KeyType};

const SCHEMA_VERSION: u8 = 2;

impl<R: Registry, D: KeyDirectory, S: Session> Engine<R, D, S> {
    /// Append a new version of a named credential at an exact address.
    ///
    /// Creates a fresh keyring first when the address has none yet or when
    /// the current one carries a revocation claim; the new credential then
    /// rides along in the same all-or-nothing graph POST.
    pub async fn append_credential(
        &self,
        ctx: &OpContext,
        address: &Address,
        name: &str,
        value: &[u8],
    ) -> Result<Envelope<Credential>> {
        if !address.is_exact() {
            return Err(Error::MalformedAddress(
                "credential address must not contain wildcards".to_string(),
            ));
        }

        ctx.checkpoint()?;
        let group = address.with_wildcard_instance();
        let fetched = self.registry().graphs_by_pattern(&group, false).await?;
        let set = CredentialGraphSet::build(fetched)?;
        ctx.notify(steps::CREDENTIALS_RETRIEVED);

        let master = self.unseal_master()?;
        let (signing, encryption, sealed) = self.unseal_keypairs(address.org(), &master)?;
        ctx.notify(steps::KEYPAIRS_RETRIEVED);

        let me = self.session().auth_id();
        let head = set.head(address);
        let head_credential = set.head_credential(address, name);
        let previous = head_credential.map(|c| c.id);
        let version = head_credential.map_or(1, |c| c.body.version + 1);

        // A head keyring with a revocation is dead for appends: a revoked
        // member may have observed its MEK.
        let reuse_head = head.filter(|g| !g.has_revocations());

        let (mek, keyring_id, new_keyring) = match reuse_head {
            Some(graph) => {
                let mek = self.unwrap_mek(graph, me, &encryption).await?;
                ctx.notify(steps::ENCRYPTING_KEY_RETRIEVED);
                (mek, graph.keyring_id(), None)
            }
            None => {
                let keyring = Envelope::sign(
                    SCHEMA_VERSION,
                    Keyring {
                        address: group.clone(),
                        keyring_version: head.map_or(1, |g| g.keyring_version() + 1),
                        previous: head.map(|g| g.keyring_id()),
                        created_at: Utc::now(),
                    },
                    &signing,
                    Some(sealed.signing.key_id),
                )?;

                let mek = crypto::generate_key();
                let members = self
                    .distribute_mek(ctx, address.org(), me, &mek, keyring.id, &signing, &encryption, &sealed)
                    .await?;
                ctx.notify(steps::KEYRING_CREATED);

                let keyring_id = keyring.id;
                (mek, keyring_id, Some((keyring, members)))
            }
        };

        ctx.checkpoint()?;
        let (ciphertext, nonce) = crypto::seal(value, &mek)?;
        let credential = Envelope::sign(
            SCHEMA_VERSION,
            Credential {
                keyring_id,
                address: address.clone(),
                name: name.to_string(),
                ciphertext,
                nonce,
                previous,
                version,
                state: CredentialState::Set,
            },
            &signing,
            Some(sealed.signing.key_id),
        )?;
        ctx.notify(steps::CREDENTIAL_ENCRYPTED);

        ctx.checkpoint()?;
        match new_keyring {
            Some((keyring, members)) => {
                debug!(
                    keyring = %keyring.id,
                    members = members.len(),
                    "posting new graph"
                );
                let posted = self
                    .registry()
                    .post_graph(CredentialGraph {
                        keyring,
                        members,
                        claims: Vec::new(),
                        credentials: vec![credential],
                    })
                    .await?;
                posted.credentials.into_iter().next().ok_or_else(|| {
                    RegistryError::Backend("posted graph came back without its credential".to_string())
                        .into()
                })
            }
            None => self.registry().post_credential(credential).await,
        }
    }

    /// Wrap a fresh MEK for every principal that should hold it.
    ///
    /// The roster is the org's member and machine system teams, machines
    /// resolved to their key-owning tokens. Each recipient is an
    /// independent wrap producing its own `Result`; recipients without an
    /// active encryption key are skipped and reported in aggregate, but a
    /// missing share for the acting principal is fatal.
    #[allow(clippy::too_many_arguments)]
    async fn distribute_mek(
        &self,
        ctx: &OpContext,
        org: &str,
        me: Id,
        mek: &SecretBytes32,
        keyring_id: Id,
        signing: &SigningKeyPair,
        encryption: &EncryptionKeyPair,
        sealed: &SealedKeypairs,
    ) -> Result<Vec<Envelope<KeyringMember>>> {
        ctx.checkpoint()?;
        let (users, machines) = tokio::try_join!(
            self.registry().system_team_members(org, SYSTEM_TEAM_MEMBER),
            self.registry().system_team_members(org, SYSTEM_TEAM_MACHINE),
        )?;

        let mut recipients = users;
        for machine in machines {
            ctx.checkpoint()?;
            recipients.extend(self.registry().machine_tokens(machine).await?);
        }
        if !recipients.contains(&me) {
            recipients.push(me);
        }
        recipients.sort();
        recipients.dedup();

        let mut outcomes: Vec<(Id, Result<Envelope<KeyringMember>>)> =
            Vec::with_capacity(recipients.len());
        for owner in recipients {
            let wrapped = self
                .wrap_for_recipient(owner, mek, keyring_id, signing, encryption, sealed)
                .await;
            outcomes.push((owner, wrapped));
        }

        let mut members = Vec::new();
        let mut skipped = 0usize;
        for (owner, outcome) in outcomes {
            match outcome {
                Ok(member) => members.push(member),
                Err(Error::Registry(RegistryError::MissingKeyForOwner { .. })) if owner != me => {
                    warn!(owner = %owner, "recipient has no active encryption key, skipping");
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
        if skipped > 0 {
            warn!(skipped, keyring = %keyring_id, "key distribution skipped recipients");
        }

        Ok(members)
    }

    async fn wrap_for_recipient(
        &self,
        owner: Id,
        mek: &SecretBytes32,
        keyring_id: Id,
        signing: &SigningKeyPair,
        encryption: &EncryptionKeyPair,
        sealed: &SealedKeypairs,
    ) -> Result<Envelope<KeyringMember>> {
        let segment = self
            .directory()
            .find_active(owner, KeyType::Encryption)
            .await?;

        let (ciphertext, nonce) =
            crypto::box_seal(mek.as_bytes(), encryption.secret_key(), &segment.public_key)?;

        Envelope::sign(
            SCHEMA_VERSION,
            KeyringMember::V2(MemberV2 {
                keyring_id,
                owner_id: owner,
                public_key_id: segment.key_id,
                encrypting_key_id: sealed.encryption.key_id,
                share: MekShare { ciphertext, nonce },
                created_at: Utc::now(),
            }),
            signing,
            Some(sealed.signing.key_id),
        )
    }
}
