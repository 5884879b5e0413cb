// src/wallet/wallet_session.rs
//! secp256k1 wallet sessions.
//!
//! A wallet session stands in for an Ethereum account: its identity is the
//! account's `did:pkh` and its signatures are recoverable ECDSA signatures
//! that an EIP-712 verifier can check against that account.
//!
//! Uses the following cryptographic primitives:
//! - secp256k1 curve (via `k256` crate)
//! - Keccak-256 hashing and EIP-191 prefixing (via `ethers` crate)

use crate::eip712::TypedDataPayload;
use crate::models::did::Did;
use crate::utils::crypto::{eth_address, format_address, hash_personal_message};
use crate::wallet::envelope::{EcdsaSignature, Envelope};
use crate::wallet::signer::{Signer, SignerError};
use async_trait::async_trait;
use ethers::types::Address;
use ethers::utils::hex;
use k256::ecdsa::SigningKey;
use k256::SecretKey;
use serde_json::Value;

/// Signer holding a secp256k1 private key.
///
/// # Security Notes
/// - The secret key is never exposed publicly
/// - Signing is deterministic (RFC 6979)
#[derive(Clone)]
pub struct WalletSession {
    /// Securely stored private key (never exposed)
    secret_key: SecretKey,
    address: Address,
    did: Did,
}

impl WalletSession {
    /// Generates a session for a fresh random account.
    #[cfg(test)]
    pub fn random() -> Self {
        Self::from_secret_key(SecretKey::random(&mut rand::thread_rng()))
    }

    /// Loads a session from a hex private key (`0x` prefix optional).
    ///
    /// # Errors
    /// Returns `InvalidKey` if the input is not a valid secp256k1 scalar.
    pub fn from_private_key(private_key: &str) -> Result<Self, SignerError> {
        let bytes = hex::decode(private_key.trim().trim_start_matches("0x"))
            .map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        let secret_key =
            SecretKey::from_slice(&bytes).map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        Ok(Self::from_secret_key(secret_key))
    }

    fn from_secret_key(secret_key: SecretKey) -> Self {
        let address = eth_address(&secret_key.public_key());
        WalletSession {
            secret_key,
            address,
            did: Did::pkh(&format_address(&address)),
        }
    }

    /// Signs a 32-byte digest and returns the recoverable signature.
    ///
    /// # Arguments
    /// * `digest` - Already-hashed message (EIP-712 or EIP-191 digest)
    fn sign_digest(&self, digest: &[u8; 32]) -> Result<EcdsaSignature, SignerError> {
        let signing_key = SigningKey::from(&self.secret_key);
        let (signature, recovery_id) = signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|e| SignerError::Ecdsa(e.to_string()))?;
        Ok(EcdsaSignature::from_parts(&signature, recovery_id))
    }
}

#[async_trait]
impl Signer for WalletSession {
    fn did(&self) -> &Did {
        &self.did
    }

    fn address(&self) -> Option<Address> {
        Some(self.address)
    }

    async fn create_typed_signature(&self, payload: &TypedDataPayload) -> Result<Envelope, SignerError> {
        let digest = payload.signing_hash()?;
        Ok(Envelope::Ecdsa(self.sign_digest(&digest)?))
    }

    async fn create_compact_signature(&self, payload: &Value) -> Result<Envelope, SignerError> {
        let message = serde_json::to_vec(payload)?;
        Ok(Envelope::Ecdsa(self.sign_digest(&hash_personal_message(&message))?))
    }
}
