// src/wallet/envelope.rs
//! Signed envelopes returned by signers.
//!
//! An [`Envelope`] is stored base64-encoded inside credentials
//! (`proof.proofValue`, `proof.jwt`, `jwt`). Two shapes exist:
//! - [`GeneralJws`]: the general JWS JSON serialization
//!   (`{payload, signatures: [{protected, signature}]}`), produced by
//!   `did:key` sessions
//! - [`EcdsaSignature`]: a recoverable secp256k1 signature `{r, s, v}`,
//!   produced by wallet sessions

use crate::models::did::{Did, DidError};
use crate::utils::crypto::eth_address;
use crate::utils::serialization::{from_base64_json, from_base64url, to_base64_json, EncodingError};
use ethers::types::Address;
use ethers::utils::hex;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::PublicKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("malformed compact JWS")]
    MalformedCompact,
    #[error("JWS has no signatures")]
    NoSignatures,
    #[error("JWS header has no kid")]
    MissingKid,
    #[error("cannot resolve signer key: {0}")]
    Resolution(#[from] DidError),
    #[error("signature verification failed: {0}")]
    Verification(#[from] jsonwebtoken::errors::Error),
    #[error("malformed ECDSA signature: {0}")]
    Ecdsa(String),
    #[error("envelope encoding: {0}")]
    Encoding(#[from] EncodingError),
    #[error("payload is not JSON: {0}")]
    Payload(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Envelope {
    Jws(GeneralJws),
    Ecdsa(EcdsaSignature),
}

impl Envelope {
    /// Base64 of the envelope's JSON form, as stored in credentials.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        to_base64_json(self)
    }

    pub fn decode(encoded: &str) -> Result<Self, EnvelopeError> {
        Ok(from_base64_json(encoded)?)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GeneralJws {
    pub payload: String,
    pub signatures: Vec<JwsSignature>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JwsSignature {
    pub protected: String,
    pub signature: String,
}

impl GeneralJws {
    /// Splits a compact `header.payload.signature` token.
    pub fn from_compact(token: &str) -> Result<Self, EnvelopeError> {
        let mut parts = token.split('.');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(protected), Some(payload), Some(signature), None) => Ok(GeneralJws {
                payload: payload.to_string(),
                signatures: vec![JwsSignature {
                    protected: protected.to_string(),
                    signature: signature.to_string(),
                }],
            }),
            _ => Err(EnvelopeError::MalformedCompact),
        }
    }

    /// Compact form of the first signature.
    pub fn to_compact(&self) -> Result<String, EnvelopeError> {
        let signature = self.signatures.first().ok_or(EnvelopeError::NoSignatures)?;
        Ok(format!("{}.{}.{}", signature.protected, self.payload, signature.signature))
    }

    /// The signed payload, decoded without verification.
    pub fn payload_json(&self) -> Result<Value, EnvelopeError> {
        let bytes = from_base64url(&self.payload).map_err(|e| EnvelopeError::Payload(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| EnvelopeError::Payload(e.to_string()))
    }

    /// DID named by the protected header's `kid`.
    pub fn signer(&self) -> Result<Did, EnvelopeError> {
        let header = jsonwebtoken::decode_header(&self.to_compact()?)?;
        let kid = header.kid.ok_or(EnvelopeError::MissingKid)?;
        Ok(Did::new(kid).without_fragment())
    }

    /// Verifies against the key of the DID in `kid` and returns the payload.
    pub fn verify(&self) -> Result<Value, EnvelopeError> {
        let public_key = self.signer()?.ed25519_public_key()?;
        self.verify_with(&public_key)
    }

    /// Verifies against a raw Ed25519 public key.
    pub fn verify_with(&self, public_key: &[u8]) -> Result<Value, EnvelopeError> {
        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.required_spec_claims = HashSet::new();
        validation.validate_exp = false;
        let data = jsonwebtoken::decode::<Value>(
            &self.to_compact()?,
            &DecodingKey::from_ed_der(public_key),
            &validation,
        )?;
        Ok(data.claims)
    }
}

/// Recoverable secp256k1 signature in Ethereum's `{r, s, v}` layout.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EcdsaSignature {
    pub r: String,
    pub s: String,
    pub v: u8,
}

impl EcdsaSignature {
    pub fn from_parts(signature: &Signature, recovery_id: RecoveryId) -> Self {
        let bytes = signature.to_bytes();
        EcdsaSignature {
            r: format!("0x{}", hex::encode(&bytes[..32])),
            s: format!("0x{}", hex::encode(&bytes[32..])),
            v: 27 + recovery_id.to_byte(),
        }
    }

    /// Recovers the signer's address from the signed digest.
    pub fn recover_address(&self, digest: &[u8; 32]) -> Result<Address, EnvelopeError> {
        let mut bytes = hex::decode(self.r.trim_start_matches("0x"))
            .map_err(|e| EnvelopeError::Ecdsa(e.to_string()))?;
        bytes.extend(
            hex::decode(self.s.trim_start_matches("0x")).map_err(|e| EnvelopeError::Ecdsa(e.to_string()))?,
        );
        let signature = Signature::from_slice(&bytes).map_err(|e| EnvelopeError::Ecdsa(e.to_string()))?;
        let recovery_id = RecoveryId::from_byte(self.v.wrapping_sub(27))
            .ok_or_else(|| EnvelopeError::Ecdsa(format!("invalid v: {}", self.v)))?;
        let key = VerifyingKey::recover_from_prehash(digest, &signature, recovery_id)
            .map_err(|e| EnvelopeError::Ecdsa(e.to_string()))?;
        Ok(eth_address(&PublicKey::from(&key)))
    }
}
