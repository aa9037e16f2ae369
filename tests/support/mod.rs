//! In-memory registry, directory, and session for workflow tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use keywell::address::Address;
use keywell::crypto::{
    self, EncryptionKeyPair, MasterKey, SealedMasterKey, SecretVec, SigningKeyPair,
};
use keywell::envelope::Envelope;
use keywell::error::{RegistryError, Result};
use keywell::graph::{Claim, ClaimKind, Credential, CredentialGraph, KeyringMember};
use keywell::registry::{
    KeyDirectory, KeypairUpload, PublicKeySegment, Registry, SealedKeypair, SealedKeypairs,
    SealedPrivateKey, Session, SYSTEM_TEAM_MEMBER,
};
use keywell::types::{Id, KeyType};

/// Install a subscriber once so `KEYWELL_LOG=debug cargo test` traces.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter =
        EnvFilter::try_from_env("KEYWELL_LOG").unwrap_or_else(|_| EnvFilter::new("off"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[derive(Default)]
pub struct WorldState {
    pub graphs: Vec<CredentialGraph>,
    pub directory: Vec<PublicKeySegment>,
    pub teams: HashMap<(String, String), Vec<Id>>,
    pub machine_tokens: HashMap<Id, Vec<Id>>,
    pub projects: HashMap<String, Vec<String>>,
    pub keypair_uploads: Vec<KeypairUpload>,
}

/// Shared fixture world; clones hand out registry/directory views over the
/// same state.
#[derive(Clone)]
pub struct World {
    state: Arc<Mutex<WorldState>>,
    admin_signer: Arc<SigningKeyPair>,
}

impl World {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(WorldState::default())),
            admin_signer: Arc::new(SigningKeyPair::generate()),
        }
    }

    pub fn with_org(org: &str, projects: &[&str]) -> Self {
        let world = Self::new();
        {
            let mut state = world.state.lock().unwrap();
            state.projects.insert(
                org.to_string(),
                projects.iter().map(|p| p.to_string()).collect(),
            );
        }
        world
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, WorldState> {
        self.state.lock().unwrap()
    }

    /// Create a principal with a master key, both keypairs, directory
    /// entries, and membership in the org's member team.
    pub fn enroll_principal(&self, org: &str, name: &str) -> Principal {
        let principal = self.principal_without_team(name);
        self.state()
            .teams
            .entry((org.to_string(), SYSTEM_TEAM_MEMBER.to_string()))
            .or_default()
            .push(principal.id);
        principal
    }

    /// Create a principal with keys in the directory but no team
    /// membership (an invitee).
    pub fn principal_without_team(&self, name: &str) -> Principal {
        let id = Id::derive("user", name.as_bytes());
        let passphrase = SecretVec::new(format!("pw-{}", name).into_bytes());
        let master = MasterKey::generate();
        let sealed_master = master.seal_with_passphrase(&passphrase).unwrap();

        let signing = SigningKeyPair::generate();
        let encryption = EncryptionKeyPair::generate();
        let signing_key_id = PublicKeySegment::derive_key_id(&signing.public_bytes());
        let encryption_key_id = PublicKeySegment::derive_key_id(&encryption.public_bytes());

        {
            let mut state = self.state();
            state.directory.push(PublicKeySegment {
                key_id: signing_key_id,
                owner_id: id,
                key_type: KeyType::Signing,
                public_key: signing.public_bytes(),
            });
            state.directory.push(PublicKeySegment {
                key_id: encryption_key_id,
                owner_id: id,
                key_type: KeyType::Encryption,
                public_key: encryption.public_bytes(),
            });
        }

        let (signing_ciphertext, signing_nonce) =
            crypto::seal(signing.to_secret().as_bytes(), master.secret()).unwrap();
        let (encryption_ciphertext, encryption_nonce) =
            crypto::seal(encryption.to_secret().as_bytes(), master.secret()).unwrap();

        let keypairs = SealedKeypairs {
            signing: SealedKeypair {
                key_id: signing_key_id,
                public_key: signing.public_bytes(),
                private: SealedPrivateKey {
                    ciphertext: signing_ciphertext,
                    nonce: signing_nonce,
                },
            },
            encryption: SealedKeypair {
                key_id: encryption_key_id,
                public_key: encryption.public_bytes(),
                private: SealedPrivateKey {
                    ciphertext: encryption_ciphertext,
                    nonce: encryption_nonce,
                },
            },
        };

        Principal {
            id,
            passphrase,
            sealed_master,
            keypairs,
        }
    }

    /// A principal id listed in the member team with no directory keys.
    pub fn enroll_keyless_member(&self, org: &str, name: &str) -> Id {
        let id = Id::derive("user", name.as_bytes());
        self.state()
            .teams
            .entry((org.to_string(), SYSTEM_TEAM_MEMBER.to_string()))
            .or_default()
            .push(id);
        id
    }

    pub fn remove_from_team(&self, org: &str, owner: Id) {
        if let Some(members) = self
            .state()
            .teams
            .get_mut(&(org.to_string(), SYSTEM_TEAM_MEMBER.to_string()))
        {
            members.retain(|m| *m != owner);
        }
    }

    /// Append a revocation claim against `owner`'s membership in the
    /// given keyring.
    pub fn revoke_membership(&self, keyring_id: Id, owner: Id) {
        let mut state = self.state();
        let graph = state
            .graphs
            .iter_mut()
            .find(|g| g.keyring_id() == keyring_id)
            .expect("keyring exists");

        let member_id = graph
            .members
            .iter()
            .find(|m| m.body.owner_id() == owner)
            .map(|m| m.id)
            .expect("membership exists");

        let claim = Envelope::sign(
            2,
            Claim {
                member_id,
                kind: ClaimKind::Revocation,
                created_at: Utc::now(),
            },
            self.admin_signer.as_ref(),
            None,
        )
        .unwrap();
        graph.claims.push(claim);
    }

    pub fn graphs(&self) -> Vec<CredentialGraph> {
        self.state().graphs.clone()
    }
}

/// A test principal's local credentials plus its session view.
pub struct Principal {
    pub id: Id,
    pub passphrase: SecretVec,
    pub sealed_master: SealedMasterKey,
    pub keypairs: SealedKeypairs,
}

impl Principal {
    pub fn session(&self) -> InMemorySession {
        InMemorySession {
            id: self.id,
            passphrase: self.passphrase.clone(),
            sealed_master: self.sealed_master.clone(),
            keypairs: self.keypairs.clone(),
        }
    }
}

pub struct InMemorySession {
    id: Id,
    passphrase: SecretVec,
    sealed_master: SealedMasterKey,
    keypairs: SealedKeypairs,
}

impl Session for InMemorySession {
    fn auth_id(&self) -> Id {
        self.id
    }

    fn passphrase(&self) -> SecretVec {
        self.passphrase.clone()
    }

    fn sealed_master_key(&self) -> SealedMasterKey {
        self.sealed_master.clone()
    }

    fn keypairs(&self, _org: &str) -> Result<SealedKeypairs> {
        Ok(self.keypairs.clone())
    }

    fn encryption_key(&self, key_id: Id) -> Result<SealedKeypair> {
        if self.keypairs.encryption.key_id == key_id {
            return Ok(self.keypairs.encryption.clone());
        }
        Err(RegistryError::KeyNotFound(key_id).into())
    }
}

#[derive(Clone)]
pub struct InMemoryRegistry {
    world: World,
}

impl InMemoryRegistry {
    pub fn new(world: &World) -> Self {
        Self {
            world: world.clone(),
        }
    }
}

#[async_trait]
impl Registry for InMemoryRegistry {
    async fn graphs_by_path(&self, path: &Address) -> Result<Vec<CredentialGraph>> {
        Ok(self
            .world
            .state()
            .graphs
            .iter()
            .filter(|g| g.keyring.body.address.contains(path))
            .cloned()
            .collect())
    }

    async fn graphs_by_pattern(
        &self,
        pattern: &Address,
        _contains: bool,
    ) -> Result<Vec<CredentialGraph>> {
        Ok(self
            .world
            .state()
            .graphs
            .iter()
            .filter(|g| pattern.contains(&g.keyring.body.address))
            .cloned()
            .collect())
    }

    async fn graphs_by_owner(&self, _org: &str, owner: Id) -> Result<Vec<CredentialGraph>> {
        Ok(self
            .world
            .state()
            .graphs
            .iter()
            .filter(|g| g.members.iter().any(|m| m.body.owner_id() == owner))
            .cloned()
            .collect())
    }

    async fn post_graph(&self, graph: CredentialGraph) -> Result<CredentialGraph> {
        self.world.state().graphs.push(graph.clone());
        Ok(graph)
    }

    async fn post_credential(
        &self,
        credential: Envelope<Credential>,
    ) -> Result<Envelope<Credential>> {
        let mut state = self.world.state();
        let graph = state
            .graphs
            .iter_mut()
            .find(|g| g.keyring_id() == credential.body.keyring_id)
            .ok_or_else(|| RegistryError::Backend("no such keyring".to_string()))?;
        graph.credentials.push(credential.clone());
        Ok(credential)
    }

    async fn post_members(&self, members: Vec<Envelope<KeyringMember>>) -> Result<()> {
        let mut state = self.world.state();
        for member in members {
            let graph = state
                .graphs
                .iter_mut()
                .find(|g| g.keyring_id() == member.body.keyring_id())
                .ok_or_else(|| RegistryError::Backend("no such keyring".to_string()))?;
            graph.members.push(member);
        }
        Ok(())
    }

    async fn post_keypairs(&self, uploads: Vec<KeypairUpload>) -> Result<()> {
        let mut state = self.world.state();
        for upload in uploads {
            state.directory.push(PublicKeySegment {
                key_id: PublicKeySegment::derive_key_id(&upload.public_key),
                owner_id: upload.owner_id,
                key_type: upload.key_type,
                public_key: upload.public_key,
            });
            state.keypair_uploads.push(upload);
        }
        Ok(())
    }

    async fn system_team_members(&self, org: &str, team: &str) -> Result<Vec<Id>> {
        Ok(self
            .world
            .state()
            .teams
            .get(&(org.to_string(), team.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn machine_tokens(&self, machine: Id) -> Result<Vec<Id>> {
        Ok(self
            .world
            .state()
            .machine_tokens
            .get(&machine)
            .cloned()
            .unwrap_or_default())
    }

    async fn org_projects(&self, org: &str) -> Result<Vec<String>> {
        Ok(self
            .world
            .state()
            .projects
            .get(org)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Clone)]
pub struct InMemoryDirectory {
    world: World,
}

impl InMemoryDirectory {
    pub fn new(world: &World) -> Self {
        Self {
            world: world.clone(),
        }
    }
}

#[async_trait]
impl KeyDirectory for InMemoryDirectory {
    async fn find_active(&self, owner: Id, key_type: KeyType) -> Result<PublicKeySegment> {
        self.world
            .state()
            .directory
            .iter()
            .rev()
            .find(|segment| segment.owner_id == owner && segment.key_type == key_type)
            .cloned()
            .ok_or_else(|| {
                RegistryError::MissingKeyForOwner {
                    owner,
                    key_type: key_type.name(),
                }
                .into()
            })
    }

    async fn find(&self, key_id: Id, _require_active: bool) -> Result<PublicKeySegment> {
        self.world
            .state()
            .directory
            .iter()
            .find(|segment| segment.key_id == key_id)
            .cloned()
            .ok_or_else(|| RegistryError::KeyNotFound(key_id).into())
    }
}
