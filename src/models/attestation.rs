// src/models/attestation.rs
//! Attestation data model.
//!
//! Two families of types live here:
//! - [`OffchainAttestation`]: an EAS off-chain attestation as produced by
//!   signing the `Attest` typed-data struct, in the JSON layout the EAS SDK
//!   emits (`domain`, `primaryType`, `types`, `message`, `signature`, `uid`)
//! - Indexer records ([`IndexedAttestation`], [`EnsName`]) returned by the
//!   attestation-indexing service

use crate::models::credential::MemberVariable;
use crate::wallet::envelope::EcdsaSignature;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OffchainAttestation {
    /// Attestation UID, derived from the message fields when signed.
    #[serde(default)]
    pub uid: String,
    pub domain: AttestationDomain,
    pub primary_type: String,
    pub types: AttestTypes,
    pub message: AttestMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<EcdsaSignature>,
    /// Lower-cased address of the attester, filled in when signed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

/// EIP-712 domain of the EAS contract.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttestationDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AttestTypes {
    #[serde(rename = "Attest")]
    pub attest: Vec<MemberVariable>,
}

/// The signed `Attest` struct (off-chain attestation version 1).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttestMessage {
    pub version: u16,
    pub schema: String,
    pub recipient: String,
    pub time: u64,
    pub expiration_time: u64,
    pub revocable: bool,
    #[serde(rename = "refUID")]
    pub ref_uid: String,
    pub data: String,
}

/// An attestation as reported by the indexer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndexedAttestation {
    pub id: String,
    #[serde(default)]
    pub attester: String,
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub revocation_time: u64,
    #[serde(default)]
    pub expiration_time: u64,
    #[serde(default)]
    pub time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txid: Option<String>,
    #[serde(default)]
    pub data: String,
    #[serde(default, rename = "refUID", skip_serializing_if = "Option::is_none")]
    pub ref_uid: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EnsName {
    pub id: String,
    pub name: String,
}
