// src/wallet/signer.rs
//! Signing capability and the session object that carries it.

use crate::eip712::{TypedDataHashError, TypedDataPayload};
use crate::models::did::Did;
use crate::wallet::envelope::Envelope;
use async_trait::async_trait;
use ethers::types::Address;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignerError {
    #[error("invalid key material: {0}")]
    InvalidKey(String),
    #[error("JWS signing failed: {0}")]
    Jws(#[from] jsonwebtoken::errors::Error),
    #[error("ECDSA signing failed: {0}")]
    Ecdsa(String),
    #[error("typed data hashing failed: {0}")]
    TypedData(#[from] TypedDataHashError),
    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("malformed signer output: {0}")]
    Envelope(String),
}

/// A signing capability bound to one identity.
///
/// Implementations may be local keys or remote wallets; every call is a
/// suspension point.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Identity the signatures are attributed to.
    fn did(&self) -> &Did;

    /// Ethereum account of the signer, when it has one.
    fn address(&self) -> Option<Address> {
        None
    }

    /// Signs `{domain, types, message, primaryType}`.
    async fn create_typed_signature(&self, payload: &TypedDataPayload) -> Result<Envelope, SignerError>;

    /// Signs an arbitrary JSON payload into a compact envelope.
    async fn create_compact_signature(&self, payload: &Value) -> Result<Envelope, SignerError>;
}

/// An authenticated session.
///
/// Created once and passed by reference into every pipeline call; holding a
/// `Session` is what "authenticated" means.
#[derive(Clone)]
pub struct Session {
    signer: Arc<dyn Signer>,
}

impl Session {
    pub fn new(signer: impl Signer + 'static) -> Self {
        Session {
            signer: Arc::new(signer),
        }
    }

    /// The cached identity of this session.
    pub fn did(&self) -> &Did {
        self.signer.did()
    }

    pub fn signer(&self) -> &dyn Signer {
        self.signer.as_ref()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("did", self.did()).finish()
    }
}
