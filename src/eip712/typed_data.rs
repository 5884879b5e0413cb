// src/eip712/typed_data.rs
//! Typed-data payloads handed to signers.

use crate::models::credential::{Eip712Info, Eip712Types};
use ethers_core::types::transaction::eip712::{Eip712, TypedData};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TypedDataHashError {
    #[error("typed data does not match the EIP-712 schema: {0}")]
    Shape(#[from] serde_json::Error),
    #[error("EIP-712 encoding failed: {0}")]
    Encoding(String),
}

/// `{domain, types, message, primaryType}`, the exact object a signer sees.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataPayload {
    pub domain: Value,
    pub types: Eip712Types,
    pub message: Value,
    pub primary_type: String,
}

impl TypedDataPayload {
    /// Pairs derived credential types with the credential being signed.
    pub fn from_info(info: &Eip712Info, message: Value) -> Result<Self, serde_json::Error> {
        Ok(TypedDataPayload {
            domain: serde_json::to_value(&info.domain)?,
            types: info.types.clone(),
            message,
            primary_type: info.primary_type.clone(),
        })
    }

    /// EIP-712 digest: `keccak256(0x1901 ‖ domainSeparator ‖ hashStruct(message))`.
    pub fn signing_hash(&self) -> Result<[u8; 32], TypedDataHashError> {
        let typed: TypedData = serde_json::from_value(serde_json::to_value(self)?)?;
        typed
            .encode_eip712()
            .map_err(|e| TypedDataHashError::Encoding(e.to_string()))
    }
}
