// src/lib.rs
//! # Trust Claims
//!
//! Builds, signs and publishes trust claims about Ethereum accounts.
//!
//! ## Architecture Overview
//! 1. **Models**: credential, attestation and DID shapes, claim schemas
//! 2. **Wallet**: `did:key` and `did:pkh` signing sessions, signed envelopes
//! 3. **EIP-712**: type generation and typed-data hashing
//! 4. **GraphQL**: literal and mutation formatting for the document service
//! 5. **Storage**: client for the remote document service
//! 6. **Blockchain**: EAS off-chain attestations and the attestation indexer
//! 7. **Services**: claim pipeline, query console and the HTTP API

pub mod blockchain;   // EAS attestations and indexer
pub mod eip712;       // Typed data
pub mod graphql;      // Query text generation
pub mod models;       // Data structures
pub mod services;     // Business logic and API
pub mod settings;     // Environment configuration
pub mod storage;      // Remote document service
pub mod utils;        // Helper functions
pub mod wallet;       // Signing sessions

#[cfg(test)]
mod testing;
