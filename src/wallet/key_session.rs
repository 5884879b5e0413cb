// src/wallet/key_session.rs
//! Ed25519 `did:key` sessions.
//!
//! A key session is derived from a 32-byte seed (the `SECRET_KEY` of the
//! issuing routes). Signatures are EdDSA JWS whose protected header names the
//! signing key through `kid`, so verifiers can resolve it from the DID alone.
//!
//! Uses the following primitives:
//! - Ed25519 key derivation (via `ring`)
//! - JWS encoding (via `jsonwebtoken`)

use crate::eip712::TypedDataPayload;
use crate::models::did::Did;
use crate::wallet::envelope::{Envelope, GeneralJws};
use crate::wallet::signer::{Signer, SignerError};
use async_trait::async_trait;
use ethers::utils::hex;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use ring::signature::{Ed25519KeyPair, KeyPair};
use serde_json::Value;

/// PKCS#8 v1 prefix of an Ed25519 private key; the 32-byte seed follows.
const ED25519_PKCS8_PREFIX: [u8; 16] = [
    0x30, 0x2e, 0x02, 0x01, 0x00, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x04, 0x22, 0x04, 0x20,
];

/// Signer backed by an Ed25519 seed.
///
/// # Security Notes
/// - The seed never leaves this struct
/// - The JWS `kid` is derived from the public key, not configured
pub struct KeySession {
    did: Did,
    public_key: Vec<u8>,
    encoding_key: EncodingKey,
}

impl KeySession {
    /// Derives a session from a raw 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Result<Self, SignerError> {
        let key_pair = Ed25519KeyPair::from_seed_unchecked(seed)
            .map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        let public_key = key_pair.public_key().as_ref().to_vec();

        let mut pkcs8 = ED25519_PKCS8_PREFIX.to_vec();
        pkcs8.extend_from_slice(seed);

        Ok(KeySession {
            did: Did::ed25519_key(&public_key),
            public_key,
            encoding_key: EncodingKey::from_ed_der(&pkcs8),
        })
    }

    /// Derives a session from a hex seed, as stored in `SECRET_KEY`.
    ///
    /// # Errors
    /// Returns `InvalidKey` unless the input is exactly 32 hex-encoded bytes.
    pub fn from_hex_seed(seed: &str) -> Result<Self, SignerError> {
        let bytes = hex::decode(seed.trim().trim_start_matches("0x"))
            .map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| SignerError::InvalidKey("seed must be 32 bytes".into()))?;
        Self::from_seed(&seed)
    }

    /// Generates a session from a fresh random seed.
    #[cfg(test)]
    pub fn generate() -> Result<Self, SignerError> {
        use rand::RngCore;
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        Self::from_seed(&seed)
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    fn sign_json(&self, payload: &Value) -> Result<GeneralJws, SignerError> {
        let mut header = Header::new(Algorithm::EdDSA);
        header.typ = None;
        header.kid = Some(self.did.key_id());
        let token = jsonwebtoken::encode(&header, payload, &self.encoding_key)?;
        GeneralJws::from_compact(&token).map_err(|e| SignerError::Envelope(e.to_string()))
    }
}

#[async_trait]
impl Signer for KeySession {
    fn did(&self) -> &Did {
        &self.did
    }

    async fn create_typed_signature(&self, payload: &TypedDataPayload) -> Result<Envelope, SignerError> {
        let payload = serde_json::to_value(payload)?;
        Ok(Envelope::Jws(self.sign_json(&payload)?))
    }

    async fn create_compact_signature(&self, payload: &Value) -> Result<Envelope, SignerError> {
        Ok(Envelope::Jws(self.sign_json(payload)?))
    }
}
