//! Signed wire envelope.
//!
//! Every record exchanged with the registry travels as an envelope:
//! a content-derived id, a schema version, the body, and a signature over
//! `(version, body)`. Self-signed public-key claims carry no
//! `public_key_id` — the asserted key is its own authority.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::crypto::sign::{self, SigningKeyPair, SIGNATURE_LEN};
use crate::error::{CryptoError, Result};
use crate::types::{serde_hex, Id};

const ALGORITHM_EDDSA: &str = "eddsa";

/// A type that can be carried as an envelope body.
pub trait Body: Serialize + DeserializeOwned {
    /// Domain tag mixed into the content-derived id.
    const TYPE_TAG: &'static str;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Signature {
    pub algorithm: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub public_key_id: Option<Id>,
    #[serde(with = "serde_hex::vec")]
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope<T> {
    pub id: Id,
    pub version: u8,
    pub body: T,
    pub signature: Signature,
}

impl<T: Body> Envelope<T> {
    /// Sign a body and derive its id.
    ///
    /// `public_key_id` is the directory id of the signing key, or `None`
    /// for a self-signed public-key claim.
    pub fn sign(
        version: u8,
        body: T,
        signer: &SigningKeyPair,
        public_key_id: Option<Id>,
    ) -> Result<Self> {
        let payload = signing_payload(version, &body)?;
        let value = signer.sign(&payload).to_vec();
        let id = Id::derive(T::TYPE_TAG, &payload);

        Ok(Self {
            id,
            version,
            body,
            signature: Signature {
                algorithm: ALGORITHM_EDDSA.to_string(),
                public_key_id,
                value,
            },
        })
    }

    /// Verify the signature against a public key.
    pub fn verify(&self, public_key: &[u8; 32]) -> Result<()> {
        let payload = signing_payload(self.version, &self.body)?;
        let value: [u8; SIGNATURE_LEN] = self
            .signature
            .value
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::BadSignature)?;
        sign::verify(&payload, &value, public_key)
    }

    /// The id this envelope's content hashes to.
    pub fn expected_id(&self) -> Result<Id> {
        let payload = signing_payload(self.version, &self.body)?;
        Ok(Id::derive(T::TYPE_TAG, &payload))
    }
}

fn signing_payload<T: Serialize>(version: u8, body: &T) -> Result<Vec<u8>> {
    let mut payload = vec![version];
    let json = serde_json::to_vec(body)
        .map_err(|e| CryptoError::InvalidKey(format!("unserializable body: {}", e)))?;
    payload.extend_from_slice(&json);
    Ok(payload)
}
