// src/blockchain/mod.rs
//! Ethereum Attestation Service integration: off-chain attestations and the
//! attestation indexer.

pub mod eas;
pub mod indexer;

pub use eas::{sign_attestation, trust_attestation, AttestationError};
pub use indexer::{AttestationIndexer, IndexerError};
