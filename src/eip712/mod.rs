// src/eip712/mod.rs
//! Typed-data adapter: EIP-712 types derivation and signing payloads.

pub mod typed_data;
pub mod types;

pub use typed_data::{TypedDataHashError, TypedDataPayload};
pub use types::{derive_types, TypesGenerationError, CREDENTIAL_PRIMARY_TYPE};
