// src/blockchain/eas.rs
//! Ethereum Attestation Service off-chain attestations.
//!
//! An off-chain attestation is an EIP-712 signature over the EAS `Attest`
//! struct, bound to the EAS contract through the typed-data domain. Nothing
//! is sent to the chain; the signed attestation is stored as a document.
//!
//! The UID follows the EAS off-chain version 1 layout:
//! `keccak256(abi.encodePacked(uint16 version, bytes schema, address recipient,
//! address(0), uint64 time, uint64 expirationTime, bool revocable,
//! bytes32 refUID, bytes data, uint32 0))`.

use crate::eip712::{TypedDataHashError, TypedDataPayload};
use crate::models::attestation::{AttestMessage, AttestTypes, AttestationDomain, OffchainAttestation};
use crate::models::credential::{Eip712Types, MemberVariable};
use crate::models::schema::{EasChainConfig, TRUST_SCHEMA_UID, ZERO_UID};
use crate::utils::crypto::{format_address, hash_data};
use crate::wallet::{Envelope, EnvelopeError, Signer, SignerError};
use ethers::abi::{self, Token};
use ethers::types::Address;
use ethers::utils::hex;
use log::debug;
use serde_json::json;
use thiserror::Error;

pub const ATTEST_PRIMARY_TYPE: &str = "Attest";
pub const EAS_DOMAIN_NAME: &str = "EAS Attestation";
pub const OFFCHAIN_ATTESTATION_VERSION: u16 = 1;

#[derive(Error, Debug)]
pub enum AttestationError {
    #[error("signing failed: {0}")]
    Signer(#[from] SignerError),
    #[error("attestations need a recoverable ECDSA signature")]
    NotEcdsa,
    #[error("signer has no Ethereum account")]
    NoAccount,
    #[error("invalid hex in `{0}`")]
    Field(&'static str),
    #[error(transparent)]
    TypedData(#[from] TypedDataHashError),
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

/// Members of the `Attest` struct, in signing order.
pub fn attest_types() -> Vec<MemberVariable> {
    vec![
        MemberVariable::new("version", "uint16"),
        MemberVariable::new("schema", "bytes32"),
        MemberVariable::new("recipient", "address"),
        MemberVariable::new("time", "uint64"),
        MemberVariable::new("expirationTime", "uint64"),
        MemberVariable::new("revocable", "bool"),
        MemberVariable::new("refUID", "bytes32"),
        MemberVariable::new("data", "bytes"),
    ]
}

/// ABI encoding of the `bool trusted` schema.
pub fn encode_trusted(trusted: bool) -> String {
    format!("0x{}", hex::encode(abi::encode(&[Token::Bool(trusted)])))
}

/// Builds an unsigned trust attestation about `recipient`.
///
/// # Arguments
/// * `recipient` - Recipient address; lower-cased, not validated
/// * `time` - Attestation time in Unix seconds
/// * `config` - EAS deployment the signature is bound to
pub fn trust_attestation(recipient: &str, time: u64, config: &EasChainConfig) -> OffchainAttestation {
    OffchainAttestation {
        uid: String::new(),
        domain: AttestationDomain {
            name: EAS_DOMAIN_NAME.to_string(),
            version: config.version.to_string(),
            chain_id: config.chain_id,
            verifying_contract: config.contract_address.to_string(),
        },
        primary_type: ATTEST_PRIMARY_TYPE.to_string(),
        types: AttestTypes {
            attest: attest_types(),
        },
        message: AttestMessage {
            version: OFFCHAIN_ATTESTATION_VERSION,
            schema: TRUST_SCHEMA_UID.to_string(),
            recipient: recipient.to_lowercase(),
            time,
            expiration_time: 0,
            revocable: true,
            ref_uid: ZERO_UID.to_string(),
            data: encode_trusted(true),
        },
        signature: None,
        account: None,
    }
}

/// Address the signature commits to.
///
/// A recipient that is not an address (including the empty string) is
/// signed as the zero address, EAS's "no recipient".
fn signed_recipient(message: &AttestMessage) -> Address {
    message.recipient.parse().unwrap_or_else(|_| Address::zero())
}

fn decode_field(value: &str, name: &'static str) -> Result<Vec<u8>, AttestationError> {
    hex::decode(value.trim_start_matches("0x")).map_err(|_| AttestationError::Field(name))
}

/// Computes the off-chain UID of an attestation message.
pub fn offchain_uid(message: &AttestMessage) -> Result<String, AttestationError> {
    let mut packed = Vec::new();
    packed.extend_from_slice(&message.version.to_be_bytes());
    packed.extend(decode_field(&message.schema, "schema")?);
    packed.extend_from_slice(signed_recipient(message).as_bytes());
    packed.extend_from_slice(Address::zero().as_bytes());
    packed.extend_from_slice(&message.time.to_be_bytes());
    packed.extend_from_slice(&message.expiration_time.to_be_bytes());
    packed.push(u8::from(message.revocable));
    packed.extend(decode_field(&message.ref_uid, "refUID")?);
    packed.extend(decode_field(&message.data, "data")?);
    packed.extend_from_slice(&0u32.to_be_bytes());
    Ok(format!("0x{}", hex::encode(hash_data(&packed))))
}

/// The typed-data payload a signer sees for `attestation`.
pub fn typed_data(attestation: &OffchainAttestation) -> TypedDataPayload {
    let message = &attestation.message;
    let mut types = Eip712Types::new();
    types.insert(
        "EIP712Domain".to_string(),
        vec![
            MemberVariable::new("name", "string"),
            MemberVariable::new("version", "string"),
            MemberVariable::new("chainId", "uint256"),
            MemberVariable::new("verifyingContract", "address"),
        ],
    );
    types.insert(ATTEST_PRIMARY_TYPE.to_string(), attestation.types.attest.clone());
    TypedDataPayload {
        domain: json!({
            "name": attestation.domain.name,
            "version": attestation.domain.version,
            "chainId": attestation.domain.chain_id,
            "verifyingContract": attestation.domain.verifying_contract,
        }),
        types,
        message: json!({
            "version": message.version,
            "schema": message.schema,
            "recipient": format_address(&signed_recipient(message)),
            "time": message.time,
            "expirationTime": message.expiration_time,
            "revocable": message.revocable,
            "refUID": message.ref_uid,
            "data": message.data,
        }),
        primary_type: attestation.primary_type.clone(),
    }
}

/// Signs an attestation, filling in its UID, signature and attester account.
///
/// # Errors
/// * `NotEcdsa` - the signer produced a non-ECDSA envelope
/// * `NoAccount` - the signer has no Ethereum account to attest from
pub async fn sign_attestation(
    signer: &dyn Signer,
    mut attestation: OffchainAttestation,
) -> Result<OffchainAttestation, AttestationError> {
    let account = signer.address().ok_or(AttestationError::NoAccount)?;
    attestation.uid = offchain_uid(&attestation.message)?;
    let Envelope::Ecdsa(signature) = signer.create_typed_signature(&typed_data(&attestation)).await? else {
        return Err(AttestationError::NotEcdsa);
    };
    debug!("Signed attestation {}", attestation.uid);
    attestation.signature = Some(signature);
    attestation.account = Some(format_address(&account));
    Ok(attestation)
}

/// Recovers the address that signed `attestation`.
pub fn recover_attester(attestation: &OffchainAttestation) -> Result<Option<Address>, AttestationError> {
    let Some(signature) = &attestation.signature else {
        return Ok(None);
    };
    let digest = typed_data(attestation).signing_hash()?;
    Ok(Some(signature.recover_address(&digest)?))
}
