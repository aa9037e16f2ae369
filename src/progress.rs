//! Progress notification.
//!
//! Workflows report coarse-grained step names through a fire-and-forget
//! sink. Purely observability: nothing in the core depends on a notify
//! being delivered or even received.

/// Observer for workflow step progress.
pub trait ProgressSink: Send + Sync {
    fn notify(&self, step: &str);
}

/// Sink that drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn notify(&self, _step: &str) {}
}

/// Step names emitted by the orchestration workflows.
pub mod steps {
    pub const CREDENTIALS_RETRIEVED: &str = "Credentials retrieved";
    pub const KEYPAIRS_RETRIEVED: &str = "Keypairs retrieved";
    pub const ENCRYPTING_KEY_RETRIEVED: &str = "Encrypting key retrieved";
    pub const KEYRING_CREATED: &str = "Keyring created";
    pub const CREDENTIAL_ENCRYPTED: &str = "Credential encrypted";
    pub const CREDENTIAL_DECRYPTED: &str = "Credential decrypted";
    pub const MEMBERSHIP_CLONED: &str = "Membership cloned";
    pub const KEYPAIR_GENERATED: &str = "Keypair generated";
}
