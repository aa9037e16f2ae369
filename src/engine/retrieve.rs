//! Retrieve-credentials workflow.

use tracing::{debug, warn};

use crate::address::Address;
use crate::crypto::{self, SecretVec};
use crate::engine::{Engine, OpContext, PlaintextCredential};
use crate::error::Result;
use crate::graph::{CredentialGraphSet, CredentialState, KeyIndex};
use crate::progress::steps;
use crate::registry::{KeyDirectory, Registry, Session};

impl<R: Registry, D: KeyDirectory, S: Session> Engine<R, D, S> {
    /// Decrypt every credential visible at an address or pattern.
    ///
    /// Only graphs that survive the shadow walk are decrypted. Per-
    /// credential decryption failures are isolated: the rest of the batch
    /// still decrypts and the first failure is surfaced at the end.
    pub async fn retrieve_credentials(
        &self,
        ctx: &OpContext,
        pattern: &Address,
    ) -> Result<Vec<PlaintextCredential>> {
        ctx.checkpoint()?;
        let fetched = if pattern.is_exact() {
            self.registry().graphs_by_path(pattern).await?
        } else {
            let contains = !pattern.project_is_literal();
            self.registry().graphs_by_pattern(pattern, contains).await?
        };
        let set = CredentialGraphSet::build(fetched)?;
        ctx.notify(steps::CREDENTIALS_RETRIEVED);

        let master = self.unseal_master()?;
        let me = self.session().auth_id();

        let active = set.active_credentials();
        let graphs: Vec<_> = active.iter().map(|(graph, _)| *graph).collect();
        let index = KeyIndex::build(&graphs, me)?;
        ctx.notify(steps::KEYPAIRS_RETRIEVED);

        let mut out = Vec::new();
        let mut first_error = None;
        for key_id in index.key_ids().collect::<Vec<_>>() {
            ctx.checkpoint()?;
            let encryption = self.unseal_encryption_key(key_id, &master)?;

            for &graph in index.graphs_for(key_id) {
                let mek = self.unwrap_mek(graph, me, &encryption).await?;
                ctx.notify(steps::ENCRYPTING_KEY_RETRIEVED);

                let keyring_id = graph.keyring_id();
                let credentials = active
                    .iter()
                    .find(|(candidate, _)| candidate.keyring_id() == keyring_id)
                    .map(|(_, credentials)| credentials.as_slice())
                    .unwrap_or_default();

                for credential in credentials {
                    let body = &credential.body;
                    if !pattern.contains(&body.address) {
                        continue;
                    }

                    if body.state == CredentialState::Unset {
                        // Tombstones carry no plaintext, only their state.
                        out.push(PlaintextCredential {
                            address: body.address.clone(),
                            name: body.name.clone(),
                            value: SecretVec::new(Vec::new()),
                            version: body.version,
                            state: body.state,
                        });
                        ctx.notify(steps::CREDENTIAL_DECRYPTED);
                        continue;
                    }

                    match crypto::unseal(&body.ciphertext, &body.nonce, &mek) {
                        Ok(value) => {
                            out.push(PlaintextCredential {
                                address: body.address.clone(),
                                name: body.name.clone(),
                                value,
                                version: body.version,
                                state: body.state,
                            });
                        }
                        Err(e) => {
                            warn!(
                                credential = %credential.id,
                                name = %body.name,
                                "credential failed to decrypt"
                            );
                            if first_error.is_none() {
                                first_error = Some(e);
                            }
                        }
                    }
                    ctx.notify(steps::CREDENTIAL_DECRYPTED);
                }
            }
        }

        if let Some(error) = first_error {
            return Err(error);
        }

        debug!(credentials = out.len(), pattern = %pattern, "retrieval complete");
        Ok(out)
    }
}
