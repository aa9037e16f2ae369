//! Approve-invite workflow.

use chrono::Utc;
use tracing::debug;

use crate::address::Address;
use crate::crypto;
use crate::engine::{Engine, OpContext};
use crate::envelope::Envelope;
use crate::error::{Error, GraphError, Result};
use crate::graph::{CredentialGraphSet, KeyringMember, MekShare, MemberV2};
use crate::progress::steps;
use crate::registry::{KeyDirectory, Registry, Session};
use crate::types::{Id, KeyType};

const SCHEMA_VERSION: u8 = 2;

/// An accepted invite ready for enrollment.
#[derive(Debug, Clone)]
pub struct Invite {
    pub org: String,
    pub invitee: Id,
}

impl<R: Registry, D: KeyDirectory, S: Session> Engine<R, D, S> {
    /// Enroll an invitee into every active graph of every project in the
    /// org by re-wrapping each MEK from the approver to the invitee. The
    /// MEK plaintext never reaches this function. Returns the number of
    /// memberships created.
    pub async fn approve_invite(&self, ctx: &OpContext, invite: &Invite) -> Result<usize> {
        ctx.checkpoint()?;
        let invitee_key = self
            .directory()
            .find_active(invite.invitee, KeyType::Encryption)
            .await?;

        let master = self.unseal_master()?;
        let (signing, encryption, sealed) = self.unseal_keypairs(&invite.org, &master)?;
        ctx.notify(steps::KEYPAIRS_RETRIEVED);

        let me = self.session().auth_id();

        let projects = self.registry().org_projects(&invite.org).await?;
        let mut graphs = Vec::new();
        for project in &projects {
            ctx.checkpoint()?;
            let pattern = Address::parse(&format!("/{}/{}/*/*/*/*", invite.org, project))?;
            graphs.extend(self.registry().graphs_by_pattern(&pattern, false).await?);
        }
        let set = CredentialGraphSet::build(graphs)?;
        ctx.notify(steps::CREDENTIALS_RETRIEVED);

        let mut memberships = Vec::new();
        for graph in set.active() {
            ctx.checkpoint()?;
            let (member, share) = match graph.find_member(me) {
                Ok(found) => found,
                Err(Error::Graph(GraphError::MembershipNotFound(_))) => {
                    // Not enrolled here, nothing to clone from.
                    debug!(keyring = %graph.keyring_id(), "approver not a member, skipping");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let wrapper = self
                .directory()
                .find(member.body.encrypting_key_id(), false)
                .await?;

            let (ciphertext, nonce) = crypto::clone_wrapped(
                &share.ciphertext,
                &share.nonce,
                encryption.secret_key(),
                &wrapper.public_key,
                &invitee_key.public_key,
            )?;

            memberships.push(Envelope::sign(
                SCHEMA_VERSION,
                KeyringMember::V2(MemberV2 {
                    keyring_id: graph.keyring_id(),
                    owner_id: invite.invitee,
                    public_key_id: invitee_key.key_id,
                    encrypting_key_id: sealed.encryption.key_id,
                    share: MekShare { ciphertext, nonce },
                    created_at: Utc::now(),
                }),
                &signing,
                Some(sealed.signing.key_id),
            )?);
            ctx.notify(steps::MEMBERSHIP_CLONED);
        }

        ctx.checkpoint()?;
        let enrolled = memberships.len();
        if enrolled > 0 {
            self.registry().post_members(memberships).await?;
        }

        debug!(invitee = %invite.invitee, enrolled, "invite approved");
        Ok(enrolled)
    }
}
