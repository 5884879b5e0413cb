// src/models/did.rs
//! Decentralized Identifier (DID) references.
//!
//! Two DID methods are produced by this system:
//! - `did:pkh:eip155:1:<address>` names an Ethereum account (credential
//!   recipients, wallet issuers, attesters)
//! - `did:key:z6Mk...` embeds an Ed25519 public key (server issuing sessions)
//!
//! Only `did:key` is resolved locally; everything else is treated as an
//! opaque identifier owned by the remote service's key scheme.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Prefix of every account DID produced by the credential builder.
///
/// The chain reference is fixed to Ethereum mainnet, matching the EIP-712
/// domain.
pub const PKH_MAINNET_PREFIX: &str = "did:pkh:eip155:1:";

const KEY_PREFIX: &str = "did:key:";

/// Multicodec prefix for an Ed25519 public key.
const ED25519_MULTICODEC: [u8; 2] = [0xed, 0x01];

#[derive(Error, Debug, PartialEq)]
pub enum DidError {
    #[error("not a did:key identifier: {0}")]
    NotDidKey(String),
    #[error("invalid multibase encoding: {0}")]
    Multibase(String),
    #[error("unsupported key type in did:key")]
    UnsupportedKey,
}

/// A DID string.
///
/// No syntax is enforced on construction: malformed recipient input flows
/// through to the remote service unchanged.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Did(String);

impl Did {
    pub fn new(id: impl Into<String>) -> Self {
        Did(id.into())
    }

    /// Builds a mainnet `did:pkh` from an address-like string.
    ///
    /// The address is lower-cased; an empty address yields the bare prefix.
    pub fn pkh(address: &str) -> Self {
        Did(format!("{}{}", PKH_MAINNET_PREFIX, address.to_lowercase()))
    }

    /// Builds a `did:key` for a raw 32-byte Ed25519 public key.
    pub fn ed25519_key(public_key: &[u8]) -> Self {
        let mut bytes = ED25519_MULTICODEC.to_vec();
        bytes.extend_from_slice(public_key);
        Did(format!(
            "{}{}",
            KEY_PREFIX,
            multibase::encode(multibase::Base::Base58Btc, bytes)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Strips a DID URL fragment (`did:key:z...#z...`) if present.
    pub fn without_fragment(&self) -> Did {
        match self.0.split_once('#') {
            Some((did, _)) => Did(did.to_string()),
            None => self.clone(),
        }
    }

    /// Verification method id conventionally used by `did:key`.
    pub fn key_id(&self) -> String {
        match self.0.strip_prefix(KEY_PREFIX) {
            Some(fingerprint) => format!("{}#{}", self.0, fingerprint),
            None => self.0.clone(),
        }
    }

    /// Resolves a `did:key` to its Ed25519 public key bytes.
    pub fn ed25519_public_key(&self) -> Result<Vec<u8>, DidError> {
        let did = self.without_fragment();
        let fingerprint = did
            .0
            .strip_prefix(KEY_PREFIX)
            .ok_or_else(|| DidError::NotDidKey(self.0.clone()))?;
        let (_base, data) =
            multibase::decode(fingerprint).map_err(|e| DidError::Multibase(e.to_string()))?;
        if data.len() != 34 || data[..2] != ED25519_MULTICODEC {
            return Err(DidError::UnsupportedKey);
        }
        Ok(data[2..].to_vec())
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Did {
    fn from(id: String) -> Self {
        Did(id)
    }
}
