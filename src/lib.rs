//! Keywell - credential-graph core for a secrets-management platform.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── address       # Hierarchical path type with specificity ordering
//! ├── types         # Content-derived ids, wire encodings
//! ├── envelope      # Signed {id, version, body, signature} wire envelope
//! ├── crypto/       # Primitives engine
//! │   ├── secure    # Zeroize-on-drop key containers
//! │   ├── kdf       # scrypt stretch, BLAKE3 per-use key derivation
//! │   ├── seal      # XChaCha20-Poly1305 sealing under derived keys
//! │   ├── sign      # Ed25519 keypairs
//! │   ├── boxes     # X25519 box encryption, MEK re-wrapping
//! │   └── master    # Master key lifecycle
//! ├── graph/        # Credential graph model
//! │   ├── keyring   # Keyring, members (v1/v2), MEK shares, claims
//! │   ├── credential
//! │   ├── set       # Active/rotation/head resolution over graph versions
//! │   └── key_index # Graphs grouped by enrolling key generation
//! ├── registry      # Registry / key-directory / session boundary traits
//! ├── progress      # Fire-and-forget step notifications
//! ├── engine/       # The four orchestration workflows
//! └── resolve       # Specificity overlay across addresses
//! ```
//!
//! # Features
//!
//! - Per-address keyrings with one MEK, wrapped per member
//! - Append-only credential versioning with shadowing resolution
//! - Revocation-driven rotation tracking
//! - Invite enrollment that never exposes a MEK to the caller

pub mod address;
pub mod crypto;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod graph;
pub mod progress;
pub mod registry;
pub mod resolve;
pub mod types;

pub use address::{Address, Specificity};
pub use engine::{CancellationToken, Engine, Invite, OpContext, PlaintextCredential};
pub use error::{Error, Result};
pub use graph::{CredentialGraph, CredentialGraphSet};
